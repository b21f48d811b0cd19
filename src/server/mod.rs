//! HTTP server for Trellis

pub mod http;

pub use http::{run, AppState};
