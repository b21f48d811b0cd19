//! HTTP routes for Trellis

pub mod admin_profiles;
pub mod auth_routes;
pub mod health;
pub mod interactions;
pub mod respond;
pub mod ventures;

pub use admin_profiles::handle_admin_profiles_request;
pub use auth_routes::handle_auth_request;
pub use health::{health_check, readiness_check, version_info};
pub use interactions::handle_interactions_request;
pub use ventures::handle_ventures_request;
