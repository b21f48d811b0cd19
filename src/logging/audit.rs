//! Audit trail for authentication and review-pipeline activity
//!
//! Writes one JSON object per line so the file can be shipped to any
//! log collector without parsing state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::Identity;
use crate::domain::{Role, VentureStatus};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// Login attempt (success recorded in metadata)
    AuthAttempt,
    /// New profile registered
    Signup,
    /// Token surrendered by the client
    Logout,
    /// Admin invalidated another profile's tokens
    ForceLogout,
    /// Venture moved between pipeline statuses
    StatusTransition,
    /// Admin changed a profile's role
    RoleChange,
    /// Admin activated or deactivated a profile
    ProfileStatusChange,
    /// Venture soft-deleted
    VentureDeleted,
}

/// A single audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event id, for correlating lines across collectors
    #[serde(default)]
    pub event_id: String,
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Event type
    pub kind: AuditKind,
    /// Acting profile id (hex), if authenticated
    pub actor_id: Option<String>,
    /// Acting profile's role
    pub actor_role: Option<Role>,
    /// Login identifier, for auth events
    pub identifier: Option<String>,
    /// Venture the event concerns
    pub venture_id: Option<String>,
    /// Pipeline status before the event
    pub from_status: Option<VentureStatus>,
    /// Pipeline status after the event
    pub to_status: Option<VentureStatus>,
    /// Profile acted upon, for admin operations
    pub subject_id: Option<String>,
    /// Free-form detail (new role, feedback summary, ...)
    pub detail: Option<String>,
    /// Additional metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl AuditEvent {
    /// Create a new audit event
    pub fn new(kind: AuditKind) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            actor_id: None,
            actor_role: None,
            identifier: None,
            venture_id: None,
            from_status: None,
            to_status: None,
            subject_id: None,
            detail: None,
            metadata: None,
        }
    }

    /// Set the acting profile
    pub fn with_actor(mut self, actor: &Identity) -> Self {
        self.actor_id = Some(actor.profile_id.to_hex());
        self.actor_role = Some(actor.role);
        self
    }

    /// Set the login identifier
    pub fn with_identifier(mut self, identifier: &str) -> Self {
        self.identifier = Some(identifier.to_string());
        self
    }

    /// Set the venture id
    pub fn with_venture(mut self, venture_id: String) -> Self {
        self.venture_id = Some(venture_id);
        self
    }

    /// Set the before/after pipeline statuses
    pub fn with_statuses(mut self, from: VentureStatus, to: VentureStatus) -> Self {
        self.from_status = Some(from);
        self.to_status = Some(to);
        self
    }

    /// Set the profile acted upon
    pub fn with_subject(mut self, subject_id: String) -> Self {
        self.subject_id = Some(subject_id);
        self
    }

    /// Set the detail string
    pub fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Convert to JSONL line
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Audit logger that appends events to a JSONL file
///
/// When no file is configured every `log` call is a no-op, so routes can
/// emit events unconditionally.
#[derive(Clone)]
pub struct AuditLogger {
    inner: Arc<Mutex<AuditLoggerInner>>,
}

struct AuditLoggerInner {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl AuditLogger {
    /// Create a new audit logger with no backing file
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(AuditLoggerInner {
                writer: None,
                path: None,
            })),
        }
    }

    /// Initialize file logging to the specified path
    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let writer = BufWriter::new(file);

        let mut inner = self.inner.lock().await;
        inner.writer = Some(writer);
        inner.path = Some(path.clone());

        info!("Audit logging initialized to {}", path.display());
        Ok(())
    }

    /// Log an audit event
    pub async fn log(&self, event: AuditEvent) {
        let jsonl = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;

        if let Some(ref mut writer) = inner.writer {
            if let Err(e) = writeln!(writer, "{}", jsonl) {
                error!("Failed to write audit event: {}", e);
            }
            // Flush per event; the audit file must survive a crash
            if let Err(e) = writer.flush() {
                error!("Failed to flush audit log: {}", e);
            }
        }
    }

    /// Log a login attempt
    pub async fn log_auth_attempt(&self, identifier: &str, success: bool) {
        let mut event = AuditEvent::new(AuditKind::AuthAttempt).with_identifier(identifier);

        event.metadata = Some(serde_json::json!({
            "success": success
        }));

        self.log(event).await;
    }

    /// Log a new registration
    pub async fn log_signup(&self, profile_id: String, identifier: &str, role: Role) {
        let mut event = AuditEvent::new(AuditKind::Signup)
            .with_identifier(identifier)
            .with_subject(profile_id);
        event.actor_role = Some(role);

        self.log(event).await;
    }

    /// Log a pipeline transition
    pub async fn log_transition(
        &self,
        actor: &Identity,
        venture_id: String,
        from: VentureStatus,
        to: VentureStatus,
    ) {
        let event = AuditEvent::new(AuditKind::StatusTransition)
            .with_actor(actor)
            .with_venture(venture_id)
            .with_statuses(from, to);

        self.log(event).await;
    }

    /// Log an admin operation against another profile
    pub async fn log_admin_action(
        &self,
        kind: AuditKind,
        actor: &Identity,
        subject_id: String,
        detail: Option<String>,
    ) {
        let mut event = AuditEvent::new(kind)
            .with_actor(actor)
            .with_subject(subject_id);

        if let Some(detail) = detail {
            event = event.with_detail(detail);
        }

        self.log(event).await;
    }

    /// Log a venture soft-delete
    pub async fn log_venture_deleted(&self, actor: &Identity, venture_id: String) {
        let event = AuditEvent::new(AuditKind::VentureDeleted)
            .with_actor(actor)
            .with_venture(venture_id);

        self.log(event).await;
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}
