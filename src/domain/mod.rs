//! Venture workflow domain: vocabulary, transition table, and access gates.
//!
//! Everything in this module is pure. Persistence lives in `db`, side
//! effect execution in `services::pipeline`.

pub mod access;
pub mod program;
pub mod property_tests;
pub mod role;
pub mod status;
pub mod stream;
pub mod transition;

pub use program::ProgramTier;
pub use role::Role;
pub use status::VentureStatus;
pub use stream::{StreamCategory, StreamStatus};
pub use transition::{
    plan_transition, Effect, TransitionContext, TransitionError, TransitionPlan,
};
