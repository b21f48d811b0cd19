//! Admin profile management: listing, role assignment, activation, and
//! forced logout.
//!
//! Every handler requires the admin role. Role changes and deactivations
//! take effect on the target's next request because `authenticate` checks
//! the stored profile, not the token's claims.

use bson::{doc, Document};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::authenticate;
use crate::db::schemas::{ProfileDoc, PROFILE_COLLECTION};
use crate::db::FindOpts;
use crate::domain::Role;
use crate::logging::AuditKind;
use crate::routes::auth_routes::ProfileResponse;
use crate::routes::respond::{
    cors_preflight, data_response, error_response, method_not_allowed, not_found,
    parse_json_body, regex_escape, BoxBody, PageParams, Query,
};
use crate::routes::ventures::parse_object_id;
use crate::server::AppState;
use crate::types::{Result, TrellisError};

#[derive(Debug, Serialize)]
struct ProfileListResponse {
    items: Vec<ProfileResponse>,
    total: u64,
    page: u64,
    limit: i64,
}

/// Case-insensitive identifier/display-name search.
fn profile_search_filter(term: Option<&str>) -> Document {
    match term.map(str::trim).filter(|t| !t.is_empty()) {
        Some(term) => {
            let pattern = regex_escape(term);
            doc! {
                "$or": [
                    { "identifier": { "$regex": &pattern, "$options": "i" } },
                    { "display_name": { "$regex": &pattern, "$options": "i" } },
                ]
            }
        }
        None => doc! {},
    }
}

/// `Role::parse` falls back to entrepreneur for unknown strings, which is
/// the right default for tokens but wrong for an admin assigning roles.
fn parse_requested_role(raw: &str) -> Result<Role> {
    let requested = raw.trim();
    let role = Role::parse(requested);
    if role == Role::Entrepreneur && !requested.eq_ignore_ascii_case("entrepreneur") {
        return Err(TrellisError::Validation(format!(
            "Unknown role: {}",
            requested
        )));
    }
    Ok(role)
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_profiles(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    actor.require_admin()?;

    let query = Query::parse(req.uri().query());
    let pagination = PageParams::from_query(&query);
    let filter = profile_search_filter(query.get("search"));

    let profiles = state
        .store()?
        .collection::<ProfileDoc>(PROFILE_COLLECTION)
        .await?;
    let total = profiles.count(filter.clone()).await?;
    let docs = profiles
        .find_many(
            filter,
            FindOpts::page(
                doc! { "metadata.created_at": -1 },
                pagination.skip(),
                pagination.limit,
            ),
        )
        .await?;

    let items = docs.iter().map(ProfileResponse::from_doc).collect();

    Ok(data_response(
        StatusCode::OK,
        &ProfileListResponse {
            items,
            total,
            page: pagination.page,
            limit: pagination.limit,
        },
    ))
}

#[derive(Debug, Deserialize)]
struct SetRoleRequest {
    role: String,
}

async fn set_role(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    actor.require_admin()?;

    let id = parse_object_id(raw_id)?;
    let body: SetRoleRequest = parse_json_body(req).await?;
    let role = parse_requested_role(&body.role)?;

    let profiles = state
        .store()?
        .collection::<ProfileDoc>(PROFILE_COLLECTION)
        .await?;
    let profile = profiles
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| TrellisError::NotFound("Profile not found".into()))?;

    if profile.role != role {
        profiles
            .update_one(doc! { "_id": id }, doc! { "$set": { "role": role.as_str() } })
            .await?;

        state
            .audit
            .log_admin_action(
                AuditKind::RoleChange,
                &actor,
                id.to_hex(),
                Some(format!("{} -> {}", profile.role, role)),
            )
            .await;
        info!(profile = %id, role = %role, "Role updated");
    }

    let fresh = profiles
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| TrellisError::NotFound("Profile not found".into()))?;

    Ok(data_response(
        StatusCode::OK,
        &ProfileResponse::from_doc(&fresh),
    ))
}

#[derive(Debug, Deserialize)]
struct SetStatusRequest {
    is_active: bool,
}

async fn set_status(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    actor.require_admin()?;

    let id = parse_object_id(raw_id)?;
    let body: SetStatusRequest = parse_json_body(req).await?;

    let profiles = state
        .store()?
        .collection::<ProfileDoc>(PROFILE_COLLECTION)
        .await?;
    let profile = profiles
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| TrellisError::NotFound("Profile not found".into()))?;

    if profile.is_active != body.is_active {
        // Deactivation also revokes every outstanding token
        let update = if body.is_active {
            doc! { "$set": { "is_active": true } }
        } else {
            doc! {
                "$set": { "is_active": false },
                "$inc": { "token_version": 1 },
            }
        };
        profiles.update_one(doc! { "_id": id }, update).await?;

        state
            .audit
            .log_admin_action(
                AuditKind::ProfileStatusChange,
                &actor,
                id.to_hex(),
                Some(format!("is_active={}", body.is_active)),
            )
            .await;
        info!(profile = %id, is_active = body.is_active, "Profile status updated");
    }

    let fresh = profiles
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| TrellisError::NotFound("Profile not found".into()))?;

    Ok(data_response(
        StatusCode::OK,
        &ProfileResponse::from_doc(&fresh),
    ))
}

async fn force_logout(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    actor.require_admin()?;

    let id = parse_object_id(raw_id)?;

    let profiles = state
        .store()?
        .collection::<ProfileDoc>(PROFILE_COLLECTION)
        .await?;
    let result = profiles
        .update_one(doc! { "_id": id }, doc! { "$inc": { "token_version": 1 } })
        .await?;
    if result.matched_count == 0 {
        return Err(TrellisError::NotFound("Profile not found".into()));
    }

    state
        .audit
        .log_admin_action(AuditKind::ForceLogout, &actor, id.to_hex(), None)
        .await;
    info!(profile = %id, "Sessions invalidated");

    Ok(data_response(
        StatusCode::OK,
        &serde_json::json!({ "message": "Sessions invalidated" }),
    ))
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Route admin profile requests. Returns None for paths outside
/// `/api/admin/profiles`.
pub async fn handle_admin_profiles_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    if path != "/api/admin/profiles" && !path.starts_with("/api/admin/profiles/") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight(&state.args.frontend_origin));
    }

    let method = req.method().clone();
    let dev_mode = state.args.dev_mode;

    let result = match (method, path.as_str()) {
        (Method::GET, "/api/admin/profiles") => list_profiles(req, state).await,

        (Method::PUT, p) if p.ends_with("/role") => {
            let raw_id = subpath_id(p, "/role").to_string();
            set_role(req, state, &raw_id).await
        }
        (Method::PUT, p) if p.ends_with("/status") => {
            let raw_id = subpath_id(p, "/status").to_string();
            set_status(req, state, &raw_id).await
        }
        (Method::POST, p) if p.ends_with("/force-logout") => {
            let raw_id = subpath_id(p, "/force-logout").to_string();
            force_logout(req, state, &raw_id).await
        }

        (_, p)
            if p == "/api/admin/profiles"
                || p.ends_with("/role")
                || p.ends_with("/status")
                || p.ends_with("/force-logout") =>
        {
            Ok(method_not_allowed(p))
        }

        _ => Ok(not_found(&path)),
    };

    Some(result.unwrap_or_else(|err| error_response(&err, dev_mode)))
}

/// `/api/admin/profiles/:id<suffix>` -> `:id`.
fn subpath_id<'a>(path: &'a str, suffix: &str) -> &'a str {
    path.strip_prefix("/api/admin/profiles/")
        .and_then(|rest| rest.strip_suffix(suffix))
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_roles_must_be_known() {
        assert_eq!(parse_requested_role("committee").unwrap(), Role::Committee);
        assert_eq!(parse_requested_role("vsm").unwrap(), Role::SuccessMgr);
        assert_eq!(
            parse_requested_role("screening_manager").unwrap(),
            Role::SuccessMgr
        );
        assert_eq!(
            parse_requested_role(" entrepreneur ").unwrap(),
            Role::Entrepreneur
        );
        assert!(parse_requested_role("chief_vibes_officer").is_err());
        assert!(parse_requested_role("").is_err());
    }

    #[test]
    fn search_filter_escapes_regex_input() {
        let filter = profile_search_filter(Some("a.b"));
        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 2);
        let first = clauses[0].as_document().unwrap();
        assert_eq!(
            first
                .get_document("identifier")
                .unwrap()
                .get_str("$regex")
                .unwrap(),
            r"a\.b"
        );

        assert!(profile_search_filter(None).is_empty());
        assert!(profile_search_filter(Some("   ")).is_empty());
    }

    #[test]
    fn subpath_ids_are_extracted_between_prefix_and_suffix() {
        assert_eq!(
            subpath_id("/api/admin/profiles/68a1f0/role", "/role"),
            "68a1f0"
        );
        assert_eq!(subpath_id("/api/admin/profiles/role", "/role"), "");
    }
}
