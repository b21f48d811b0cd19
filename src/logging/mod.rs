//! Logging infrastructure for Trellis
//!
//! Structured audit records for authentication and pipeline activity.

pub mod audit;

pub use audit::{AuditEvent, AuditKind, AuditLogger};
