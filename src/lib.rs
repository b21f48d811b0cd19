//! Trellis - assisted growth platform for startup ventures
//!
//! Trellis backs the venture-support workflow: entrepreneurs submit
//! applications, screening managers assess them, the committee decides, and
//! accepted ventures move through agreement and contract signing into an
//! execution workbench of streams and milestones.
//!
//! ## Layers
//!
//! - **Routes**: hyper HTTP handlers grouped by resource family
//! - **Domain**: pipeline statuses, roles, and the transition table
//! - **Services**: transition execution, roadmap generation, insights
//! - **Db**: MongoDB access with soft-delete and retry conventions

pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod logging;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, TrellisError};
