//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Requests are logged,
//! dispatched to a route family, and capped by a per-request deadline so a
//! stuck store query cannot hold a connection open forever.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Args;
use crate::db::MongoClient;
use crate::logging::AuditLogger;
use crate::routes;
use crate::routes::respond::{self, BoxBody};
use crate::services::{HeuristicInsights, InsightsProvider};
use crate::types::{Result, TrellisError};

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: Option<MongoClient>,
    /// Append-only audit trail for auth and pipeline events
    pub audit: AuditLogger,
    /// Application analysis behind a trait so tests can substitute it
    pub insights: Arc<dyn InsightsProvider>,
    pub started_at: Instant,
}

impl AppState {
    /// Create AppState without a store (dev mode)
    pub fn new(args: Args) -> Self {
        Self {
            args,
            mongo: None,
            audit: AuditLogger::new(),
            insights: Arc::new(HeuristicInsights::new()),
            started_at: Instant::now(),
        }
    }

    /// Create AppState backed by MongoDB
    pub fn with_store(args: Args, mongo: MongoClient) -> Self {
        Self {
            args,
            mongo: Some(mongo),
            audit: AuditLogger::new(),
            insights: Arc::new(HeuristicInsights::new()),
            started_at: Instant::now(),
        }
    }

    /// Replace the insights provider (used by tests)
    pub fn with_insights(mut self, insights: Arc<dyn InsightsProvider>) -> Self {
        self.insights = insights;
        self
    }

    /// The store, or an error when running without one
    pub fn store(&self) -> Result<&MongoClient> {
        self.mongo
            .as_ref()
            .ok_or_else(|| TrellisError::Database("Store unavailable".to_string()))
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await.map_err(|e| {
        TrellisError::Internal(format!("Failed to bind {}: {}", state.args.listen, e))
    })?;

    info!("Trellis listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - tokens are signed with a fixed secret");
    }
    if state.mongo.is_none() {
        warn!("No MongoDB connection - venture endpoints will return errors");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let budget = Duration::from_millis(state.args.request_timeout_ms);
    let dev_mode = state.args.dev_mode;
    let origin = state.args.frontend_origin.clone();

    let mut response =
        match tokio::time::timeout(budget, dispatch(Arc::clone(&state), req, &method, &path)).await
        {
            Ok(response) => response,
            Err(_) => {
                error!(
                    "[{}] {} {} timed out after {} ms",
                    addr,
                    method,
                    path,
                    budget.as_millis()
                );
                let err = TrellisError::Database(format!(
                    "Request timed out after {} ms",
                    budget.as_millis()
                ));
                respond::error_response(&err, dev_mode)
            }
        };

    // Every response carries the configured origin, including errors, so
    // browser clients can read the body.
    if let Ok(value) = origin.parse() {
        response
            .headers_mut()
            .insert(hyper::header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }

    Ok(response)
}

/// Dispatch to probes and the API route families
async fn dispatch(
    state: Arc<AppState>,
    req: Request<Incoming>,
    method: &Method,
    path: &str,
) -> Response<BoxBody> {
    // Probes never touch the store and skip auth entirely
    match (method, path) {
        (&Method::GET, "/health") | (&Method::GET, "/healthz") | (&Method::GET, "/api/health") => {
            return to_boxed(routes::health_check(Arc::clone(&state)));
        }
        (&Method::GET, "/ready") | (&Method::GET, "/readyz") => {
            return to_boxed(routes::readiness_check(Arc::clone(&state)));
        }
        (&Method::GET, "/version") => {
            return to_boxed(routes::version_info());
        }
        _ => {}
    }

    // Route families consume the request; each answers its own preflight
    if path.starts_with("/api/auth") {
        if let Some(response) = routes::handle_auth_request(req, Arc::clone(&state)).await {
            return response;
        }
        return respond::not_found(path);
    }

    if path.starts_with("/api/ventures") {
        if let Some(response) = routes::handle_ventures_request(req, Arc::clone(&state)).await {
            return response;
        }
        return respond::not_found(path);
    }

    if path.starts_with("/api/interactions") {
        if let Some(response) = routes::handle_interactions_request(req, Arc::clone(&state)).await
        {
            return response;
        }
        return respond::not_found(path);
    }

    if path.starts_with("/api/admin/profiles") {
        if let Some(response) =
            routes::handle_admin_profiles_request(req, Arc::clone(&state)).await
        {
            return response;
        }
        return respond::not_found(path);
    }

    // Preflight for anything outside the families above
    if *method == Method::OPTIONS {
        return respond::cors_preflight(&state.args.frontend_origin);
    }

    respond::not_found(path)
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}
