//! Response and body plumbing shared by the API route families.
//!
//! Every success wraps its payload in `{"data": ...}` and every failure is
//! `{"error": "...", "code": "..."}`. The error translation lives here and
//! nowhere else: handlers return `Result` and their dispatcher feeds
//! failures through [`error_response`].

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::types::{Result, TrellisError};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Request bodies larger than this are rejected before deserialization.
/// Application forms carry free-text answers, so this is roomier than a
/// typical login payload needs.
pub const MAX_BODY_BYTES: usize = 65536;

// ============================================================================
// Body helpers
// ============================================================================

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

/// Collect and deserialize a JSON request body.
pub async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
) -> Result<T> {
    let body = req
        .collect()
        .await
        .map_err(|e| TrellisError::Validation(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(TrellisError::Validation("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| TrellisError::Validation(format!("Invalid JSON body: {}", e)))
}

// ============================================================================
// Response envelopes
// ============================================================================

/// Success envelope: `{"data": <payload>}`.
pub fn data_response<T: Serialize>(status: StatusCode, payload: &T) -> Response<BoxBody> {
    let json = serde_json::json!({ "data": payload }).to_string();
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(full_body(json))
        .unwrap()
}

/// Error envelope: `{"error": ..., "code": ...}`. Server-class failures are
/// logged here with their real cause; the wire carries the scrubbed message
/// unless dev mode is on.
pub fn error_response(err: &TrellisError, dev_mode: bool) -> Response<BoxBody> {
    if err.is_server_error() {
        error!(code = err.code(), "Request failed: {}", err);
    }
    coded_response(err.status(), err.code(), &err.public_message(dev_mode))
}

/// Error envelope with an endpoint-specific code, for the few responses
/// whose contract pins a code the shared taxonomy does not carry
/// (`IDENTIFIER_EXISTS`, `INVALID_CREDENTIALS`).
pub fn coded_response(status: StatusCode, code: &str, message: &str) -> Response<BoxBody> {
    let json = serde_json::json!({
        "error": message,
        "code": code,
    })
    .to_string();
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(full_body(json))
        .unwrap()
}

/// 404 for paths no dispatcher claims.
pub fn not_found(path: &str) -> Response<BoxBody> {
    coded_response(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        &format!("No such endpoint: {}", path),
    )
}

/// 405 for a known path hit with the wrong verb.
pub fn method_not_allowed(path: &str) -> Response<BoxBody> {
    coded_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "METHOD_NOT_ALLOWED",
        &format!("Method not allowed for {}", path),
    )
}

/// CORS preflight for an API family. The allowed origin comes from
/// configuration; the server loop stamps it onto regular responses too.
pub fn cors_preflight(origin: &str) -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", origin)
        .header(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, PATCH, DELETE, OPTIONS",
        )
        .header(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        )
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

// ============================================================================
// Query strings and pagination
// ============================================================================

/// Decoded query string parameters.
#[derive(Debug, Default)]
pub struct Query(Vec<(String, String)>);

impl Query {
    pub fn parse(query: Option<&str>) -> Self {
        let Some(query) = query else {
            return Self(Vec::new());
        };
        let params = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                let key = urlencoding::decode(key).ok()?;
                let value = value.replace('+', " ");
                let value = urlencoding::decode(&value).ok()?;
                Some((key.into_owned(), value.into_owned()))
            })
            .collect();
        Self(params)
    }

    /// First value for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Pagination knobs shared by the list endpoints: 1-based `page`, `limit`
/// capped at 100 with a default of 20.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u64,
    pub limit: i64,
}

impl PageParams {
    pub fn from_query(query: &Query) -> Self {
        let page = query
            .get("page")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let limit = query
            .get("limit")
            .and_then(|v| v.parse::<i64>().ok())
            .map(|l| l.clamp(1, 100))
            .unwrap_or(20);
        Self { page, limit }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.limit as u64
    }
}

/// Escape regex metacharacters so search terms match literally inside a
/// `$regex` clause.
pub fn regex_escape(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if r"\.^$|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// RFC 3339 rendering for timestamps surfaced in responses.
pub fn rfc3339(ts: bson::DateTime) -> String {
    ts.try_to_rfc3339_string().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response<BoxBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn data_response_wraps_payload() {
        let response = data_response(StatusCode::CREATED, &serde_json::json!({ "name": "Acme" }));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "application/json"
        );

        let json = body_json(response).await;
        assert_eq!(json["data"]["name"], "Acme");
    }

    #[tokio::test]
    async fn error_response_carries_code_and_status() {
        let err = TrellisError::NotFound("Venture missing".into());
        let response = error_response(&err, false);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["error"], "Venture missing");
    }

    #[tokio::test]
    async fn server_errors_are_scrubbed_outside_dev_mode() {
        let err = TrellisError::Database("connection pool exhausted".into());
        let json = body_json(error_response(&err, false)).await;
        assert_eq!(json["error"], "internal error");
        assert_eq!(json["code"], "UPSTREAM");

        let dev_json = body_json(error_response(&err, true)).await;
        assert!(dev_json["error"]
            .as_str()
            .unwrap()
            .contains("connection pool exhausted"));
    }

    #[test]
    fn preflight_reflects_the_configured_origin() {
        let response = cors_preflight("https://portal.example.com");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response
                .headers()
                .get("Access-Control-Allow-Origin")
                .unwrap(),
            "https://portal.example.com"
        );
    }

    #[test]
    fn query_parsing_decodes_values() {
        let query = Query::parse(Some("search=gr%C3%BCn+labs&page=2&flag"));
        assert_eq!(query.get("search"), Some("grün labs"));
        assert_eq!(query.get("page"), Some("2"));
        assert_eq!(query.get("flag"), Some(""));
        assert_eq!(query.get("missing"), None);

        assert_eq!(Query::parse(None).get("anything"), None);
    }

    #[test]
    fn page_params_clamp_and_default() {
        let defaults = PageParams::from_query(&Query::parse(None));
        assert_eq!(defaults, PageParams { page: 1, limit: 20 });

        let capped = PageParams::from_query(&Query::parse(Some("page=3&limit=500")));
        assert_eq!(capped, PageParams { page: 3, limit: 100 });
        assert_eq!(capped.skip(), 200);

        let nonsense = PageParams::from_query(&Query::parse(Some("page=0&limit=-4")));
        assert_eq!(nonsense.page, 1);
        assert_eq!(nonsense.limit, 1);
    }

    #[test]
    fn regex_escape_neutralizes_metacharacters() {
        assert_eq!(regex_escape("a.b*c"), r"a\.b\*c");
        assert_eq!(regex_escape("plain"), "plain");
        assert_eq!(regex_escape("(x|y)"), r"\(x\|y\)");
    }
}
