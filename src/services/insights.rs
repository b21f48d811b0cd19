//! Application analysis boundary
//!
//! `ai_summary` on a venture comes from an [`InsightsProvider`]. The trait
//! keeps the capability swappable (a hosted model, a scoring service); the
//! shipped implementation is a deterministic keyword heuristic so the
//! pipeline works with no external calls.
//!
//! Providers are advisory. A timeout or provider error degrades to "no
//! summary" and never fails the surrounding request.

use std::time::Duration;

use tracing::warn;

use crate::db::schemas::VentureDoc;
use crate::domain::ProgramTier;

/// What a provider extracts from an application
#[derive(Debug, Clone, PartialEq)]
pub struct InsightsReport {
    /// One-paragraph summary for reviewers
    pub summary: String,
    /// Program tier the signals point at, when they point anywhere
    pub suggested_program: Option<ProgramTier>,
}

/// Trait for application analysis (allows swapping providers)
#[async_trait::async_trait]
pub trait InsightsProvider: Send + Sync {
    /// Produce a report from the venture's application answers
    async fn analyze(&self, venture: &VentureDoc) -> anyhow::Result<InsightsReport>;
}

/// Run a provider under a deadline.
///
/// Returns `None` on timeout or provider failure; callers keep whatever
/// summary the venture already had.
pub async fn analyze_with_timeout(
    provider: &dyn InsightsProvider,
    venture: &VentureDoc,
    timeout_ms: u64,
) -> Option<InsightsReport> {
    match tokio::time::timeout(Duration::from_millis(timeout_ms), provider.analyze(venture)).await
    {
        Ok(Ok(report)) => Some(report),
        Ok(Err(e)) => {
            warn!(venture = %venture.name, "Insights provider failed: {}", e);
            None
        }
        Err(_) => {
            warn!(
                venture = %venture.name,
                timeout_ms, "Insights provider timed out"
            );
            None
        }
    }
}

// ============================================================================
// Heuristic provider
// ============================================================================

/// Keyword signals that pull a venture toward the scale tier
const SCALE_SIGNALS: &[&str] = &[
    "enterprise",
    "expansion",
    "international",
    "profitable",
    "scale",
    "series a",
    "series b",
];

/// Keyword signals that pull a venture toward the plus tier
const TRACTION_SIGNALS: &[&str] = &[
    "customers",
    "growth",
    "paying",
    "pilot",
    "recurring",
    "revenue",
];

/// Revenue bands treated as proven income
const EARNING_BANDS: &[&str] = &["10k-100k", "100k-1m", "1m+"];

/// Deterministic, local analysis over the application text.
///
/// Same venture in, same report out. No clock, no randomness, no network.
#[derive(Debug, Clone, Default)]
pub struct HeuristicInsights;

impl HeuristicInsights {
    pub fn new() -> Self {
        Self
    }

    fn corpus(venture: &VentureDoc) -> String {
        let mut text = String::new();
        for answer in &venture.answers {
            text.push_str(&answer.answer.to_lowercase());
            text.push(' ');
        }
        text.push_str(&venture.track.to_lowercase());
        text
    }

    fn count_hits(text: &str, signals: &[&str]) -> usize {
        signals.iter().filter(|s| text.contains(*s)).count()
    }

    fn build_report(venture: &VentureDoc) -> InsightsReport {
        let text = Self::corpus(venture);
        let scale_hits = Self::count_hits(&text, SCALE_SIGNALS);
        let traction_hits = Self::count_hits(&text, TRACTION_SIGNALS);
        let earning = EARNING_BANDS.contains(&venture.revenue_band.to_lowercase().as_str());
        let team = venture.team_size;

        let suggested_program = if venture.answers.is_empty() {
            None
        } else if scale_hits >= 2 || (earning && team >= 10) {
            Some(ProgramTier::ScaleUp)
        } else if traction_hits >= 2 || earning {
            Some(ProgramTier::AcceleratePlus)
        } else {
            Some(ProgramTier::AccelerateCore)
        };

        let summary = match suggested_program {
            None => format!(
                "{} has not completed the application questionnaire yet; no signals to report.",
                venture.name
            ),
            Some(ProgramTier::ScaleUp) => format!(
                "{} shows scale-stage signals ({} expansion markers, team of {}). \
                 Worth assessing for the scale track.",
                venture.name, scale_hits, team
            ),
            Some(ProgramTier::AcceleratePlus) => format!(
                "{} reports early traction ({} traction markers{}). \
                 Fits an accelerated cohort with commercial support.",
                venture.name,
                traction_hits,
                if earning { ", revenue-earning" } else { "" }
            ),
            Some(ProgramTier::AccelerateCore) => format!(
                "{} is at the validation stage with no strong traction markers yet. \
                 Core program support recommended.",
                venture.name
            ),
        };

        InsightsReport {
            summary,
            suggested_program,
        }
    }
}

#[async_trait::async_trait]
impl InsightsProvider for HeuristicInsights {
    async fn analyze(&self, venture: &VentureDoc) -> anyhow::Result<InsightsReport> {
        Ok(Self::build_report(venture))
    }
}
