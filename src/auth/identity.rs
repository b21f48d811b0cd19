//! Request authentication and role resolution.
//!
//! The role attached to an [`Identity`] comes from the stored profile
//! record, never from the token or the identifier. A stale `token_version`
//! or a deactivated profile fails authentication outright.

use bson::{doc, oid::ObjectId};
use hyper::Request;

use crate::auth::jwt::{extract_token_from_header, JwtValidator};
use crate::db::schemas::{ProfileDoc, PROFILE_COLLECTION};
use crate::domain::Role;
use crate::server::AppState;
use crate::types::{Result, TrellisError};

/// Authenticated actor for the current request.
#[derive(Debug, Clone)]
pub struct Identity {
    pub profile_id: ObjectId,
    pub identifier: String,
    pub role: Role,
}

impl Identity {
    pub fn require_admin(&self) -> Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(TrellisError::Forbidden("Admin role required".into()))
        }
    }
}

/// Build the validator configured for this deployment.
pub fn jwt_validator(state: &AppState) -> Result<JwtValidator> {
    if state.args.dev_mode {
        return Ok(JwtValidator::new_dev());
    }
    match state.args.jwt_secret.as_deref() {
        Some(secret) => JwtValidator::new(secret.to_string(), state.args.jwt_expiry_seconds),
        None => Err(TrellisError::Internal(
            "Authentication not configured (missing JWT_SECRET)".into(),
        )),
    }
}

/// Authenticate a request from its Authorization header.
///
/// Verifies the bearer token, loads the profile it names, and checks that
/// the account is active and the token generation is current. In dev mode
/// without a store, the claims themselves are trusted.
pub async fn authenticate<B>(req: &Request<B>, state: &AppState) -> Result<Identity> {
    let auth_header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = extract_token_from_header(auth_header)
        .ok_or_else(|| TrellisError::Auth("No token provided".into()))?;

    let jwt = jwt_validator(state)?;
    let result = jwt.verify_token(token);
    let claims = match (result.valid, result.claims) {
        (true, Some(claims)) => claims,
        _ => {
            return Err(TrellisError::Auth(
                result.error.unwrap_or_else(|| "Invalid token".into()),
            ))
        }
    };

    let profile_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| TrellisError::Auth("Malformed token subject".into()))?;

    let Some(ref mongo) = state.mongo else {
        if state.args.dev_mode {
            return Ok(Identity {
                profile_id,
                identifier: claims.identifier,
                role: Role::parse(&claims.role),
            });
        }
        return Err(TrellisError::Database("Store unavailable".into()));
    };

    let profiles = mongo.collection::<ProfileDoc>(PROFILE_COLLECTION).await?;
    let profile = profiles
        .find_one(doc! { "_id": profile_id })
        .await?
        .ok_or_else(|| TrellisError::Auth("Unknown profile".into()))?;

    if !profile.is_active {
        return Err(TrellisError::Auth("Account is deactivated".into()));
    }
    if profile.token_version != claims.token_version {
        return Err(TrellisError::Auth("Token has been revoked".into()));
    }

    Ok(Identity {
        profile_id,
        identifier: profile.identifier,
        role: profile.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_gate() {
        let admin = Identity {
            profile_id: ObjectId::new(),
            identifier: "ops@example.com".to_string(),
            role: Role::Admin,
        };
        assert!(admin.require_admin().is_ok());

        let committee = Identity {
            profile_id: ObjectId::new(),
            identifier: "committee@example.com".to_string(),
            role: Role::Committee,
        };
        assert!(matches!(
            committee.require_admin(),
            Err(TrellisError::Forbidden(_))
        ));
    }
}
