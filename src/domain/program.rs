//! Program tiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Program tier a venture is recommended into and finally assigned.
///
/// Wire spellings are the human labels the platform uses everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgramTier {
    #[serde(rename = "Accelerate Core", alias = "accelerate_core")]
    AccelerateCore,
    #[serde(rename = "Accelerate Plus", alias = "accelerate_plus")]
    AcceleratePlus,
    #[serde(rename = "Scale Up", alias = "scale_up", alias = "ScaleUp")]
    ScaleUp,
}

impl ProgramTier {
    pub const ALL: [ProgramTier; 3] = [
        ProgramTier::AccelerateCore,
        ProgramTier::AcceleratePlus,
        ProgramTier::ScaleUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramTier::AccelerateCore => "Accelerate Core",
            ProgramTier::AcceleratePlus => "Accelerate Plus",
            ProgramTier::ScaleUp => "Scale Up",
        }
    }

    /// Tiers decided by the committee. Scale Up routes to venture managers.
    pub fn is_committee_tier(&self) -> bool {
        matches!(self, ProgramTier::AccelerateCore | ProgramTier::AcceleratePlus)
    }
}

impl fmt::Display for ProgramTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_labels_are_human_readable() {
        assert_eq!(
            serde_json::to_string(&ProgramTier::AccelerateCore).unwrap(),
            "\"Accelerate Core\""
        );
        assert_eq!(
            serde_json::to_string(&ProgramTier::ScaleUp).unwrap(),
            "\"Scale Up\""
        );
    }

    #[test]
    fn snake_case_aliases_accepted() {
        let tier: ProgramTier = serde_json::from_str("\"scale_up\"").unwrap();
        assert_eq!(tier, ProgramTier::ScaleUp);
        let tier: ProgramTier = serde_json::from_str("\"accelerate_plus\"").unwrap();
        assert_eq!(tier, ProgramTier::AcceleratePlus);
    }

    #[test]
    fn committee_owns_the_accelerate_tiers() {
        assert!(ProgramTier::AccelerateCore.is_committee_tier());
        assert!(ProgramTier::AcceleratePlus.is_committee_tier());
        assert!(!ProgramTier::ScaleUp.is_committee_tier());
    }
}
