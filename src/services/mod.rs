//! Services layer for Trellis
//!
//! Business logic that coordinates between the store, the domain rules, and
//! external capabilities.
//!
//! - **Pipeline**: transition execution, the only writer of `status`
//! - **Roadmap**: deterministic stream seeding and milestone generation
//! - **Insights**: application analysis behind a provider trait

pub mod insights;
pub mod pipeline;
pub mod roadmap;

pub use insights::{analyze_with_timeout, HeuristicInsights, InsightsProvider, InsightsReport};
pub use pipeline::{execute_transition, TransitionOutcome};
pub use roadmap::{build_milestones, planned_tier, seed_streams};
