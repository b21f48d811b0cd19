//! Configuration for Trellis
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;

/// Trellis - Assisted Growth Platform API
#[derive(Parser, Debug, Clone)]
#[command(name = "trellis")]
#[command(about = "HTTP gateway for venture intake, screening, and committee review")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (runs without MongoDB, uses a fixed JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "trellis")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "86400")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Timeout for the analysis provider in milliseconds
    #[arg(long, env = "INSIGHTS_TIMEOUT_MS", default_value = "2000")]
    pub insights_timeout_ms: u64,

    /// Allowed CORS origin for the frontend ("*" allows any)
    #[arg(long, env = "FRONTEND_ORIGIN", default_value = "*")]
    pub frontend_origin: String,

    /// Comma-separated identifiers granted the admin role at signup.
    /// This is the bootstrap path for the first operator account; every
    /// other role assignment goes through the admin provisioning API.
    #[arg(long, env = "BOOTSTRAP_ADMINS")]
    pub bootstrap_admins: Option<String>,

    /// Path for the JSONL audit log (unset disables file auditing)
    #[arg(long, env = "AUDIT_LOG_PATH")]
    pub audit_log_path: Option<String>,
}

impl Args {
    /// Identifiers from BOOTSTRAP_ADMINS, trimmed and lowercased.
    pub fn bootstrap_admin_list(&self) -> Vec<String> {
        self.bootstrap_admins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_ascii_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether an identifier is provisioned as admin at signup.
    pub fn is_bootstrap_admin(&self, identifier: &str) -> bool {
        let identifier = identifier.trim().to_ascii_lowercase();
        self.bootstrap_admin_list().iter().any(|a| *a == identifier)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match self.jwt_secret.as_deref() {
                None => return Err("JWT_SECRET is required in production mode".to_string()),
                Some(secret) if secret.len() < 16 => {
                    return Err("JWT_SECRET must be at least 16 characters".to_string())
                }
                _ => {}
            }
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be positive".to_string());
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be positive".to_string());
        }

        Ok(())
    }
}
