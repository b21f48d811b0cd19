//! Authentication routes: signup, login, token refresh, logout, and the
//! current-profile lookup.
//!
//! Signup and login return the same session envelope so clients have one
//! code path for "I now hold a token". Login deliberately answers unknown
//! identifiers and wrong passwords identically.

use bson::doc;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{
    authenticate, check_password_strength, hash_password, jwt_validator, verify_password,
    TokenInput,
};
use crate::db::schemas::{ProfileDoc, PROFILE_COLLECTION};
use crate::domain::Role;
use crate::logging::{AuditEvent, AuditKind};
use crate::routes::respond::{
    coded_response, cors_preflight, data_response, error_response, method_not_allowed, not_found,
    parse_json_body, rfc3339, BoxBody,
};
use crate::server::AppState;
use crate::types::{Result, TrellisError};

// ============================================================================
// Request/response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub identifier: String,
    pub password: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

/// Session envelope returned by signup, login, and refresh.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    pub profile: ProfileResponse,
}

/// Profile as surfaced to clients. The password hash never leaves the store.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub identifier: String,
    pub display_name: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl ProfileResponse {
    pub fn from_doc(profile: &ProfileDoc) -> Self {
        Self {
            id: profile._id.map(|id| id.to_hex()).unwrap_or_default(),
            identifier: profile.identifier.clone(),
            display_name: profile.display_name.clone(),
            role: profile.role,
            is_active: profile.is_active,
            last_login: profile.last_login.map(rfc3339),
            created_at: profile.metadata.created_at.map(rfc3339),
        }
    }
}

/// Fall back to the identifier's local part when no display name was given.
fn derive_display_name(identifier: &str, provided: &str) -> String {
    let provided = provided.trim();
    if !provided.is_empty() {
        return provided.to_string();
    }
    identifier.split('@').next().unwrap_or("Founder").to_string()
}

// ============================================================================
// Handlers
// ============================================================================

async fn handle_signup(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let body: SignupRequest = parse_json_body(req).await?;

    let identifier = body.identifier.trim().to_ascii_lowercase();
    if identifier.is_empty() || !identifier.contains('@') {
        return Err(TrellisError::Validation(
            "A valid email identifier is required".into(),
        ));
    }
    check_password_strength(&body.password)?;

    let display_name = derive_display_name(&identifier, &body.display_name);

    // Operator-listed identifiers come up as admins; everyone else starts
    // as an entrepreneur and is promoted through the admin surface.
    let role = if state.args.is_bootstrap_admin(&identifier) {
        Role::Admin
    } else {
        Role::Entrepreneur
    };

    let password_hash = hash_password(&body.password)?;
    let mut profile = ProfileDoc::new(identifier.clone(), password_hash, display_name, role);

    let mongo = state.store()?;
    let profiles = mongo.collection::<ProfileDoc>(PROFILE_COLLECTION).await?;

    let profile_id = match profiles.insert_one(profile.clone()).await {
        Ok(id) => id,
        Err(TrellisError::Conflict(_)) => {
            return Ok(coded_response(
                StatusCode::CONFLICT,
                "IDENTIFIER_EXISTS",
                "That identifier is already registered",
            ));
        }
        Err(e) => return Err(e),
    };
    profile._id = Some(profile_id);

    let jwt = jwt_validator(&state)?;
    let token = jwt.generate_token(TokenInput {
        profile_id: profile_id.to_hex(),
        identifier: identifier.clone(),
        role: role.as_str().to_string(),
        token_version: profile.token_version,
    })?;

    state
        .audit
        .log_signup(profile_id.to_hex(), &identifier, role)
        .await;
    info!(identifier = %identifier, role = %role, "Profile created");

    Ok(data_response(
        StatusCode::CREATED,
        &SessionResponse {
            token,
            expires_in: jwt.expiry_seconds(),
            profile: ProfileResponse::from_doc(&profile),
        },
    ))
}

async fn handle_login(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let body: LoginRequest = parse_json_body(req).await?;
    let identifier = body.identifier.trim().to_ascii_lowercase();

    let mongo = state.store()?;
    let profiles = mongo.collection::<ProfileDoc>(PROFILE_COLLECTION).await?;
    let profile = profiles.find_one(doc! { "identifier": &identifier }).await?;

    // Unknown identifier and wrong password get the same answer, so the
    // endpoint cannot be used to enumerate accounts.
    let Some(profile) = profile else {
        state.audit.log_auth_attempt(&identifier, false).await;
        return Ok(invalid_credentials());
    };
    if !verify_password(&body.password, &profile.password_hash)? {
        state.audit.log_auth_attempt(&identifier, false).await;
        return Ok(invalid_credentials());
    }

    if !profile.is_active {
        state.audit.log_auth_attempt(&identifier, false).await;
        return Err(TrellisError::Forbidden("Account is deactivated".into()));
    }

    let profile_id = profile
        ._id
        .ok_or_else(|| TrellisError::Internal("stored profile has no id".into()))?;

    profiles
        .update_one(
            doc! { "_id": profile_id },
            doc! { "$set": { "last_login": bson::DateTime::now() } },
        )
        .await?;

    let jwt = jwt_validator(&state)?;
    let token = jwt.generate_token(TokenInput {
        profile_id: profile_id.to_hex(),
        identifier: profile.identifier.clone(),
        role: profile.role.as_str().to_string(),
        token_version: profile.token_version,
    })?;

    state.audit.log_auth_attempt(&profile.identifier, true).await;
    info!(identifier = %profile.identifier, "Login");

    Ok(data_response(
        StatusCode::OK,
        &SessionResponse {
            token,
            expires_in: jwt.expiry_seconds(),
            profile: ProfileResponse::from_doc(&profile),
        },
    ))
}

fn invalid_credentials() -> Response<BoxBody> {
    coded_response(
        StatusCode::UNAUTHORIZED,
        "INVALID_CREDENTIALS",
        "Invalid identifier or password",
    )
}

/// Issue a fresh token for a still-valid session. Runs the full
/// authentication path first, so revoked or deactivated sessions cannot
/// renew themselves.
async fn handle_refresh(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;

    let mongo = state.store()?;
    let profiles = mongo.collection::<ProfileDoc>(PROFILE_COLLECTION).await?;
    let profile = profiles
        .find_one(doc! { "_id": actor.profile_id })
        .await?
        .ok_or_else(|| TrellisError::Auth("Unknown profile".into()))?;

    let jwt = jwt_validator(&state)?;
    let token = jwt.generate_token(TokenInput {
        profile_id: actor.profile_id.to_hex(),
        identifier: profile.identifier.clone(),
        role: profile.role.as_str().to_string(),
        token_version: profile.token_version,
    })?;

    Ok(data_response(
        StatusCode::OK,
        &SessionResponse {
            token,
            expires_in: jwt.expiry_seconds(),
            profile: ProfileResponse::from_doc(&profile),
        },
    ))
}

/// Tokens are stateless, so logout is an acknowledgement plus an audit
/// line; the client discards its copy.
async fn handle_logout(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;

    state
        .audit
        .log(AuditEvent::new(AuditKind::Logout).with_actor(&actor))
        .await;
    info!(identifier = %actor.identifier, "Logout");

    Ok(data_response(
        StatusCode::OK,
        &serde_json::json!({ "message": "Logged out" }),
    ))
}

async fn handle_me(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;

    let profile = match state.mongo {
        Some(ref mongo) => {
            let profiles = mongo.collection::<ProfileDoc>(PROFILE_COLLECTION).await?;
            profiles
                .find_one(doc! { "_id": actor.profile_id })
                .await?
                .ok_or_else(|| TrellisError::Auth("Unknown profile".into()))?
        }
        // No store means dev mode: authenticate already trusted the claims
        None => {
            let mut profile = ProfileDoc::default();
            profile._id = Some(actor.profile_id);
            profile.identifier = actor.identifier.clone();
            profile.role = actor.role;
            profile.is_active = true;
            profile
        }
    };

    Ok(data_response(
        StatusCode::OK,
        &ProfileResponse::from_doc(&profile),
    ))
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Route auth API requests. Returns None for paths outside `/api/auth`.
pub async fn handle_auth_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    if !path.starts_with("/api/auth") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight(&state.args.frontend_origin));
    }

    let method = req.method().clone();
    let dev_mode = state.args.dev_mode;

    let result = match (method, path.as_str()) {
        (Method::POST, "/api/auth/signup") => handle_signup(req, state).await,
        (Method::POST, "/api/auth/login") => handle_login(req, state).await,
        (Method::POST, "/api/auth/refresh") => handle_refresh(req, state).await,
        (Method::POST, "/api/auth/logout") => handle_logout(req, state).await,
        (Method::GET, "/api/auth/me") => handle_me(req, state).await,

        (
            _,
            "/api/auth/signup" | "/api/auth/login" | "/api/auth/refresh" | "/api/auth/logout"
            | "/api/auth/me",
        ) => Ok(method_not_allowed(&path)),

        _ => Ok(not_found(&path)),
    };

    Some(result.unwrap_or_else(|err| error_response(&err, dev_mode)))
}
