//! Health, readiness, and version probes.
//!
//! These endpoints are unauthenticated and never touch MongoDB, so a
//! wedged store cannot take the liveness probe down with it.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub database_connected: bool,
    pub mode: String,
    pub timestamp: String,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let database_connected = state.mongo.is_some();

    // The process is alive either way; "degraded" flags a missing store
    // outside development so dashboards can tell the two apart.
    let status = if database_connected || state.args.dev_mode {
        "online"
    } else {
        "degraded"
    };

    HealthResponse {
        healthy: true,
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        database_connected,
        mode: if state.args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// GET /health - liveness probe, always 200 while the process runs.
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let health = build_health_response(&state);

    let body = serde_json::to_string(&health)
        .unwrap_or_else(|_| r#"{"healthy":true,"status":"online"}"#.to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// GET /ready - readiness probe; 503 until the venture store is reachable.
pub fn readiness_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let ready = state.mongo.is_some() || state.args.dev_mode;

    let health = build_health_response(&state);
    let body = serde_json::to_string(&health)
        .unwrap_or_else(|_| r#"{"healthy":true,"status":"online"}"#.to_string());

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// GET /version - build metadata stamped in at compile time.
pub fn version_info() -> Response<Full<Bytes>> {
    let info = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "trellis",
    };

    let body = serde_json::to_string(&info)
        .unwrap_or_else(|_| r#"{"service":"trellis"}"#.to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;

    fn test_args(dev_mode: bool) -> Args {
        Args {
            listen: "127.0.0.1:8080".parse().unwrap(),
            dev_mode,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "trellis".to_string(),
            jwt_secret: Some("a-real-secret-of-decent-length".to_string()),
            jwt_expiry_seconds: 86400,
            log_level: "info".to_string(),
            request_timeout_ms: 30000,
            insights_timeout_ms: 2000,
            frontend_origin: "*".to_string(),
            bootstrap_admins: None,
            audit_log_path: None,
        }
    }

    #[test]
    fn health_is_degraded_without_store_in_production() {
        let state = AppState::new(test_args(false));
        let health = build_health_response(&state);

        assert!(health.healthy);
        assert_eq!(health.status, "degraded");
        assert!(!health.database_connected);
        assert_eq!(health.mode, "production");
    }

    #[test]
    fn health_is_online_in_dev_mode_without_store() {
        let state = AppState::new(test_args(true));
        let health = build_health_response(&state);

        assert_eq!(health.status, "online");
        assert_eq!(health.mode, "development");
    }

    #[test]
    fn liveness_always_returns_ok() {
        let state = Arc::new(AppState::new(test_args(false)));
        let response = health_check(state);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn readiness_fails_without_store_in_production() {
        let state = Arc::new(AppState::new(test_args(false)));
        let response = readiness_check(state);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn readiness_passes_in_dev_mode() {
        let state = Arc::new(AppState::new(test_args(true)));
        let response = readiness_check(state);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn version_names_the_service() {
        let response = version_info();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
