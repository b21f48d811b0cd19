//! Venture document schema.
//!
//! The central record of the pipeline: application fields, the canonical
//! status, screening and committee fields, and paperwork timestamps.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::domain::access::VentureScope;
use crate::domain::{ProgramTier, TransitionContext, VentureStatus};

/// Collection name for ventures
pub const VENTURE_COLLECTION: &str = "ventures";

/// One application question and its answer.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplicationAnswer {
    pub question_key: String,
    pub answer: String,
}

/// Venture document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct VentureDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Profile of the entrepreneur who owns this venture. Immutable.
    pub owner_id: ObjectId,

    /// Venture name; must be non-empty to submit
    pub name: String,

    #[serde(default)]
    pub founder_name: String,

    #[serde(default)]
    pub city: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// Sector / vertical, free text
    #[serde(default)]
    pub track: String,

    #[serde(default)]
    pub team_size: i32,

    #[serde(default)]
    pub revenue_band: String,

    #[serde(default)]
    pub funding_stage: String,

    /// Application form answers; at least one is required to submit
    #[serde(default)]
    pub answers: Vec<ApplicationAnswer>,

    /// Canonical pipeline status
    #[serde(default)]
    pub status: VentureStatus,

    /// Tier picked by the screening manager
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_recommendation: Option<ProgramTier>,

    /// Tier finally assigned by the committee
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_program: Option<ProgramTier>,

    /// Partner assigned at approval; required to approve
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venture_partner: Option<String>,

    /// Screening manager's assessment notes; staff-only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vsm_notes: Option<String>,

    /// Decision feedback shown to the entrepreneur; required to reject
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committee_feedback: Option<String>,

    /// Committee-internal notes; never shown to entrepreneurs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_comments: Option<String>,

    /// Output of the analysis provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,

    /// True between contract_sent and signed
    #[serde(default)]
    pub workbench_locked: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime>,
}

impl VentureDoc {
    /// New draft owned by `owner_id`.
    pub fn new(owner_id: ObjectId, name: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            owner_id,
            name,
            status: VentureStatus::Draft,
            ..Default::default()
        }
    }

    /// Projection consumed by the access gates.
    pub fn scope(&self) -> VentureScope<'_> {
        VentureScope {
            owner_id: &self.owner_id,
            status: self.status,
            recommendation: self.program_recommendation,
            final_program: self.final_program,
        }
    }

    /// Projection consumed by the transition table. Milestone existence is
    /// a separate collection lookup, so the caller supplies it.
    pub fn transition_context(&self, has_milestones: bool) -> TransitionContext {
        TransitionContext {
            has_name: !self.name.trim().is_empty(),
            has_answers: self.answers.iter().any(|a| !a.answer.trim().is_empty()),
            has_recommendation: self.program_recommendation.is_some(),
            has_partner: self
                .venture_partner
                .as_deref()
                .is_some_and(|p| !p.trim().is_empty()),
            has_milestones,
            has_feedback: self
                .committee_feedback
                .as_deref()
                .is_some_and(|f| !f.trim().is_empty()),
        }
    }
}

impl IntoIndexes for VentureDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "owner_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("owner_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "status": 1 },
                Some(
                    IndexOptions::builder()
                        .name("status_index".to_string())
                        .build(),
                ),
            ),
            // Dashboard queries filter by status and tier together
            (
                doc! { "status": 1, "program_recommendation": 1 },
                Some(
                    IndexOptions::builder()
                        .name("status_tier_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for VentureDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ventures_start_as_drafts() {
        let owner = ObjectId::new();
        let venture = VentureDoc::new(owner, "Acme Robotics".to_string());
        assert_eq!(venture.status, VentureStatus::Draft);
        assert_eq!(venture.owner_id, owner);
        assert!(!venture.workbench_locked);
        assert!(venture.submitted_at.is_none());
    }

    #[test]
    fn transition_context_reflects_field_presence() {
        let mut venture = VentureDoc::new(ObjectId::new(), "Acme".to_string());
        let ctx = venture.transition_context(false);
        assert!(ctx.has_name);
        assert!(!ctx.has_answers);
        assert!(!ctx.has_partner);

        venture.answers.push(ApplicationAnswer {
            question_key: "problem".to_string(),
            answer: "Manual invoicing".to_string(),
        });
        venture.venture_partner = Some("J. Rivera".to_string());
        let ctx = venture.transition_context(true);
        assert!(ctx.has_answers);
        assert!(ctx.has_partner);
        assert!(ctx.has_milestones);
    }

    #[test]
    fn blank_strings_do_not_satisfy_requirements() {
        let mut venture = VentureDoc::new(ObjectId::new(), "  ".to_string());
        venture.venture_partner = Some("   ".to_string());
        venture.committee_feedback = Some("".to_string());
        venture.answers.push(ApplicationAnswer {
            question_key: "problem".to_string(),
            answer: " ".to_string(),
        });

        let ctx = venture.transition_context(false);
        assert!(!ctx.has_name);
        assert!(!ctx.has_answers);
        assert!(!ctx.has_partner);
        assert!(!ctx.has_feedback);
    }

    #[test]
    fn status_stores_canonically() {
        let venture = VentureDoc::new(ObjectId::new(), "Acme".to_string());
        let doc = bson::to_document(&venture).unwrap();
        assert_eq!(doc.get_str("status").unwrap(), "draft");
    }
}
