//! Canonical venture status vocabulary.
//!
//! Storage and API responses always use the snake_case spellings below.
//! Earlier exports of the platform carried a mix of spellings ("Under
//! Review", "screening", "committee_review"); those are accepted on input
//! as aliases and never written back.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline status of a venture application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VentureStatus {
    /// Being drafted by the entrepreneur; freely editable
    #[default]
    #[serde(alias = "Draft")]
    Draft,
    /// Submitted for screening; application fields locked
    #[serde(alias = "Submitted")]
    Submitted,
    /// Screening assessment saved; awaiting committee decision
    #[serde(
        alias = "Under Review",
        alias = "screening",
        alias = "committee_review"
    )]
    UnderReview,
    /// Committee approved with a venture partner assigned
    #[serde(alias = "Approved")]
    Approved,
    /// Committee rejected with feedback; terminal
    #[serde(alias = "Rejected")]
    Rejected,
    /// Program agreement sent to the entrepreneur
    #[serde(alias = "Agreement Sent")]
    AgreementSent,
    /// Contract sent; workbench locked until signature
    #[serde(alias = "Contract Sent")]
    ContractSent,
    /// Contract signed; workbench active; terminal
    #[serde(alias = "Signed")]
    Signed,
}

impl VentureStatus {
    /// Every status, in pipeline order.
    pub const ALL: [VentureStatus; 8] = [
        VentureStatus::Draft,
        VentureStatus::Submitted,
        VentureStatus::UnderReview,
        VentureStatus::Approved,
        VentureStatus::Rejected,
        VentureStatus::AgreementSent,
        VentureStatus::ContractSent,
        VentureStatus::Signed,
    ];

    /// Canonical wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            VentureStatus::Draft => "draft",
            VentureStatus::Submitted => "submitted",
            VentureStatus::UnderReview => "under_review",
            VentureStatus::Approved => "approved",
            VentureStatus::Rejected => "rejected",
            VentureStatus::AgreementSent => "agreement_sent",
            VentureStatus::ContractSent => "contract_sent",
            VentureStatus::Signed => "signed",
        }
    }

    /// Terminal statuses admit no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VentureStatus::Rejected | VentureStatus::Signed)
    }

    /// Parse a canonical or legacy spelling.
    pub fn parse(s: &str) -> Option<VentureStatus> {
        match s.trim() {
            "draft" | "Draft" => Some(VentureStatus::Draft),
            "submitted" | "Submitted" => Some(VentureStatus::Submitted),
            "under_review" | "Under Review" | "screening" | "committee_review" => {
                Some(VentureStatus::UnderReview)
            }
            "approved" | "Approved" => Some(VentureStatus::Approved),
            "rejected" | "Rejected" => Some(VentureStatus::Rejected),
            "agreement_sent" | "Agreement Sent" => Some(VentureStatus::AgreementSent),
            "contract_sent" | "Contract Sent" => Some(VentureStatus::ContractSent),
            "signed" | "Signed" => Some(VentureStatus::Signed),
            _ => None,
        }
    }
}

impl fmt::Display for VentureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_canonical_spelling() {
        for status in VentureStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn accepts_legacy_spellings() {
        let cases = [
            ("\"Under Review\"", VentureStatus::UnderReview),
            ("\"screening\"", VentureStatus::UnderReview),
            ("\"committee_review\"", VentureStatus::UnderReview),
            ("\"Submitted\"", VentureStatus::Submitted),
            ("\"Agreement Sent\"", VentureStatus::AgreementSent),
            ("\"Contract Sent\"", VentureStatus::ContractSent),
            ("\"Approved\"", VentureStatus::Approved),
            ("\"Rejected\"", VentureStatus::Rejected),
            ("\"Signed\"", VentureStatus::Signed),
        ];
        for (raw, expected) in cases {
            let parsed: VentureStatus = serde_json::from_str(raw).unwrap();
            assert_eq!(parsed, expected, "failed for {}", raw);
        }
    }

    #[test]
    fn rejects_unknown_spellings() {
        assert!(serde_json::from_str::<VentureStatus>("\"pending\"").is_err());
        assert_eq!(VentureStatus::parse("pending"), None);
    }

    #[test]
    fn parse_matches_serde_aliases() {
        for raw in [
            "draft",
            "Submitted",
            "Under Review",
            "screening",
            "committee_review",
            "Approved",
            "rejected",
            "Agreement Sent",
            "contract_sent",
            "Signed",
        ] {
            let via_parse = VentureStatus::parse(raw).unwrap();
            let via_serde: VentureStatus =
                serde_json::from_str(&format!("\"{}\"", raw)).unwrap();
            assert_eq!(via_parse, via_serde, "mismatch for {}", raw);
        }
    }

    #[test]
    fn only_rejected_and_signed_are_terminal() {
        for status in VentureStatus::ALL {
            let expect = matches!(status, VentureStatus::Rejected | VentureStatus::Signed);
            assert_eq!(status.is_terminal(), expect, "terminality of {}", status);
        }
    }
}
