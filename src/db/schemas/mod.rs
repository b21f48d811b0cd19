//! Database schemas for Trellis
//!
//! Defines MongoDB document structures for profiles, ventures, and the
//! venture's dependent collections.

mod history;
mod interaction;
mod metadata;
mod milestone;
mod profile;
mod stream;
mod support_hours;
mod venture;

pub use history::{HistoryDoc, HISTORY_COLLECTION};
pub use interaction::{InteractionDoc, InteractionKind, INTERACTION_COLLECTION};
pub use metadata::Metadata;
pub use milestone::{MilestoneDoc, MILESTONE_COLLECTION};
pub use profile::{ProfileDoc, PROFILE_COLLECTION};
pub use stream::{StreamDoc, STREAM_COLLECTION};
pub use support_hours::{SupportHoursDoc, SUPPORT_HOURS_COLLECTION};
pub use venture::{ApplicationAnswer, VentureDoc, VENTURE_COLLECTION};
