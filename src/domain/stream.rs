//! Work stream categories and statuses.
//!
//! The legacy stream vocabulary ("No help needed", "Needs help", "Blocked",
//! "Done") is mapped to the canonical enum here and only here; storage and
//! responses always carry the canonical spellings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The six execution streams seeded for every submitted venture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StreamCategory {
    #[default]
    #[serde(rename = "Product")]
    Product,
    #[serde(rename = "GTM")]
    Gtm,
    #[serde(rename = "Funding")]
    Funding,
    #[serde(rename = "Supply Chain")]
    SupplyChain,
    #[serde(rename = "Operations")]
    Operations,
    #[serde(rename = "Team")]
    Team,
}

impl StreamCategory {
    /// All categories in dashboard order. Seeding uses this order for
    /// `sort_order`.
    pub const ALL: [StreamCategory; 6] = [
        StreamCategory::Product,
        StreamCategory::Gtm,
        StreamCategory::Funding,
        StreamCategory::SupplyChain,
        StreamCategory::Operations,
        StreamCategory::Team,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamCategory::Product => "Product",
            StreamCategory::Gtm => "GTM",
            StreamCategory::Funding => "Funding",
            StreamCategory::SupplyChain => "Supply Chain",
            StreamCategory::Operations => "Operations",
            StreamCategory::Team => "Team",
        }
    }

    /// Position in [`Self::ALL`], used as the stream sort order.
    pub fn sort_order(&self) -> i32 {
        Self::ALL.iter().position(|c| c == self).unwrap_or(0) as i32
    }

    /// Parse a category from a path segment or payload. Tolerates case and
    /// separator differences ("supply-chain", "Supply Chain", "supply_chain").
    pub fn parse(s: &str) -> Option<StreamCategory> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "product" => Some(StreamCategory::Product),
            "gtm" => Some(StreamCategory::Gtm),
            "funding" => Some(StreamCategory::Funding),
            "supplychain" => Some(StreamCategory::SupplyChain),
            "operations" => Some(StreamCategory::Operations),
            "team" => Some(StreamCategory::Team),
            _ => None,
        }
    }
}

impl fmt::Display for StreamCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Health of a single work stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    #[serde(alias = "Not Started")]
    NotStarted,
    #[serde(alias = "On Track", alias = "No help needed")]
    OnTrack,
    #[serde(alias = "Needs Attention", alias = "Needs help")]
    NeedsAttention,
    #[serde(alias = "At Risk", alias = "Blocked")]
    AtRisk,
    #[serde(alias = "Complete", alias = "Done")]
    Complete,
}

impl StreamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::NotStarted => "not_started",
            StreamStatus::OnTrack => "on_track",
            StreamStatus::NeedsAttention => "needs_attention",
            StreamStatus::AtRisk => "at_risk",
            StreamStatus::Complete => "complete",
        }
    }
}

impl Default for StreamStatus {
    fn default() -> Self {
        StreamStatus::NotStarted
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_categories_in_stable_order() {
        assert_eq!(StreamCategory::ALL.len(), 6);
        assert_eq!(StreamCategory::Product.sort_order(), 0);
        assert_eq!(StreamCategory::Team.sort_order(), 5);
    }

    #[test]
    fn category_parse_tolerates_path_spellings() {
        assert_eq!(StreamCategory::parse("GTM"), Some(StreamCategory::Gtm));
        assert_eq!(StreamCategory::parse("gtm"), Some(StreamCategory::Gtm));
        assert_eq!(
            StreamCategory::parse("Supply Chain"),
            Some(StreamCategory::SupplyChain)
        );
        assert_eq!(
            StreamCategory::parse("supply-chain"),
            Some(StreamCategory::SupplyChain)
        );
        assert_eq!(
            StreamCategory::parse("supply_chain"),
            Some(StreamCategory::SupplyChain)
        );
        assert_eq!(StreamCategory::parse("marketing"), None);
    }

    #[test]
    fn legacy_stream_statuses_map_to_canonical() {
        let cases = [
            ("\"No help needed\"", StreamStatus::OnTrack),
            ("\"Needs help\"", StreamStatus::NeedsAttention),
            ("\"Blocked\"", StreamStatus::AtRisk),
            ("\"Done\"", StreamStatus::Complete),
            ("\"Not Started\"", StreamStatus::NotStarted),
        ];
        for (raw, expected) in cases {
            let parsed: StreamStatus = serde_json::from_str(raw).unwrap();
            assert_eq!(parsed, expected, "failed for {}", raw);
        }
    }

    #[test]
    fn canonical_stream_status_round_trip() {
        for status in [
            StreamStatus::NotStarted,
            StreamStatus::OnTrack,
            StreamStatus::NeedsAttention,
            StreamStatus::AtRisk,
            StreamStatus::Complete,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn new_streams_start_not_started() {
        assert_eq!(StreamStatus::default(), StreamStatus::NotStarted);
    }
}
