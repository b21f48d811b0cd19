//! Deterministic roadmap generation
//!
//! Streams and milestones are generated, not authored. The generator is a
//! pure function of venture fields so a regeneration with unchanged inputs
//! replaces the set with an identical one.

use bson::oid::ObjectId;

use crate::db::schemas::{MilestoneDoc, Metadata, StreamDoc, VentureDoc};
use crate::domain::{ProgramTier, StreamCategory};

/// One roadmap entry before it is bound to a venture
struct MilestoneTemplate {
    category: StreamCategory,
    title: &'static str,
    description: &'static str,
    /// Nominal program week the deliverable is due
    due_week: i32,
}

/// Deliverables every program starts from
const BASE_TEMPLATES: &[MilestoneTemplate] = &[
    MilestoneTemplate {
        category: StreamCategory::Product,
        title: "Problem interviews complete",
        description: "Fifteen structured interviews with target users, synthesized into a problem brief.",
        due_week: 2,
    },
    MilestoneTemplate {
        category: StreamCategory::Team,
        title: "Role map agreed",
        description: "Founder responsibilities split and the first-hire profile written.",
        due_week: 3,
    },
    MilestoneTemplate {
        category: StreamCategory::Gtm,
        title: "Positioning one-pager",
        description: "Target segment, pain, and differentiated promise on a single page.",
        due_week: 4,
    },
    MilestoneTemplate {
        category: StreamCategory::Operations,
        title: "Operating rhythm set",
        description: "Weekly metrics review and a monthly update cadence in the calendar.",
        due_week: 5,
    },
    MilestoneTemplate {
        category: StreamCategory::Product,
        title: "MVP scope locked",
        description: "Feature cut agreed with the venture partner; everything else parked.",
        due_week: 6,
    },
    MilestoneTemplate {
        category: StreamCategory::Funding,
        title: "Runway model",
        description: "Twelve-month cash model with the hiring plan attached.",
        due_week: 8,
    },
    MilestoneTemplate {
        category: StreamCategory::Gtm,
        title: "First ten prospect conversations",
        description: "Logged outreach with conversion notes for each conversation.",
        due_week: 10,
    },
    MilestoneTemplate {
        category: StreamCategory::SupplyChain,
        title: "Supplier risk pass",
        description: "Key dependencies listed with a fallback named for each.",
        due_week: 12,
    },
];

/// Added for the plus tier, which carries ventures toward a raise
const PLUS_TEMPLATES: &[MilestoneTemplate] = &[
    MilestoneTemplate {
        category: StreamCategory::Funding,
        title: "Investor narrative",
        description: "Deck and data room reviewed with the committee sponsor.",
        due_week: 14,
    },
    MilestoneTemplate {
        category: StreamCategory::Gtm,
        title: "Repeatable channel test",
        description: "One acquisition channel with a measured cost per qualified lead.",
        due_week: 16,
    },
];

/// Added for the scale tier
const SCALE_TEMPLATES: &[MilestoneTemplate] = &[
    MilestoneTemplate {
        category: StreamCategory::Team,
        title: "Leadership gaps assessed",
        description: "Org design reviewed against the scale plan.",
        due_week: 5,
    },
    MilestoneTemplate {
        category: StreamCategory::Funding,
        title: "Growth capital plan",
        description: "Use-of-funds model for the next raise, milestones tied to tranches.",
        due_week: 6,
    },
    MilestoneTemplate {
        category: StreamCategory::SupplyChain,
        title: "Capacity stress test",
        description: "Demonstrated fulfilment at three times current volume.",
        due_week: 8,
    },
    MilestoneTemplate {
        category: StreamCategory::Operations,
        title: "Hiring engine running",
        description: "Scorecards and an active pipeline for the next five roles.",
        due_week: 10,
    },
];

/// Scale-tier engagements run on a compressed calendar
fn days_per_week(tier: ProgramTier) -> i32 {
    match tier {
        ProgramTier::AccelerateCore | ProgramTier::AcceleratePlus => 7,
        ProgramTier::ScaleUp => 4,
    }
}

/// The tier a roadmap is built for: the committee's decision when present,
/// the screening recommendation otherwise, core program as the floor.
pub fn planned_tier(venture: &VentureDoc) -> ProgramTier {
    venture
        .final_program
        .or(venture.program_recommendation)
        .unwrap_or(ProgramTier::AccelerateCore)
}

/// One fresh stream per category, for seeding at submission.
pub fn seed_streams(venture_id: ObjectId) -> Vec<StreamDoc> {
    StreamCategory::ALL
        .iter()
        .map(|category| StreamDoc::new(venture_id, *category))
        .collect()
}

/// Build the full milestone set for a venture.
///
/// Pure: no clock, no randomness. Metadata is left unset; the insert path
/// stamps it.
pub fn build_milestones(venture_id: ObjectId, venture: &VentureDoc) -> Vec<MilestoneDoc> {
    let tier = planned_tier(venture);
    let pace = days_per_week(tier);

    let mut templates: Vec<&MilestoneTemplate> = BASE_TEMPLATES.iter().collect();
    match tier {
        ProgramTier::AccelerateCore => {}
        ProgramTier::AcceleratePlus => templates.extend(PLUS_TEMPLATES.iter()),
        ProgramTier::ScaleUp => templates.extend(SCALE_TEMPLATES.iter()),
    }

    templates.sort_by_key(|t| (t.due_week, t.category.sort_order(), t.title));

    templates
        .iter()
        .enumerate()
        .map(|(index, template)| MilestoneDoc {
            _id: None,
            metadata: Metadata::default(),
            venture_id,
            stream_category: template.category,
            title: template.title.to_string(),
            description: template.description.to_string(),
            due_offset_days: template.due_week * pace,
            sequence: index as i32,
            completed: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venture_for(tier: Option<ProgramTier>) -> (ObjectId, VentureDoc) {
        let id = ObjectId::new();
        let mut venture = VentureDoc::new(ObjectId::new(), "Brightline".to_string());
        venture._id = Some(id);
        venture.program_recommendation = tier;
        (id, venture)
    }

    #[test]
    fn regeneration_is_idempotent() {
        let (id, venture) = venture_for(Some(ProgramTier::AcceleratePlus));

        let first = build_milestones(id, &venture);
        let second = build_milestones(id, &venture);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.title, b.title);
            assert_eq!(a.sequence, b.sequence);
            assert_eq!(a.due_offset_days, b.due_offset_days);
            assert_eq!(a.stream_category, b.stream_category);
        }
    }

    #[test]
    fn sequences_are_dense_and_ordered() {
        let (id, venture) = venture_for(Some(ProgramTier::ScaleUp));
        let milestones = build_milestones(id, &venture);

        for (index, milestone) in milestones.iter().enumerate() {
            assert_eq!(milestone.sequence, index as i32);
        }
        let offsets: Vec<i32> = milestones.iter().map(|m| m.due_offset_days).collect();
        let sorted = {
            let mut s = offsets.clone();
            s.sort();
            s
        };
        assert_eq!(offsets, sorted);
    }

    #[test]
    fn tier_changes_the_set() {
        let (id, core) = venture_for(None);
        let (_, plus) = venture_for(Some(ProgramTier::AcceleratePlus));
        let (_, scale) = venture_for(Some(ProgramTier::ScaleUp));

        let core_set = build_milestones(id, &core);
        let plus_set = build_milestones(id, &plus);
        let scale_set = build_milestones(id, &scale);

        assert_eq!(core_set.len(), BASE_TEMPLATES.len());
        assert_eq!(plus_set.len(), BASE_TEMPLATES.len() + PLUS_TEMPLATES.len());
        assert_eq!(scale_set.len(), BASE_TEMPLATES.len() + SCALE_TEMPLATES.len());
    }

    #[test]
    fn final_program_outranks_recommendation() {
        let (id, mut venture) = venture_for(Some(ProgramTier::AccelerateCore));
        venture.final_program = Some(ProgramTier::ScaleUp);

        assert_eq!(planned_tier(&venture), ProgramTier::ScaleUp);
        let milestones = build_milestones(id, &venture);
        // Scale engagements run a four-day week
        assert!(milestones.iter().all(|m| m.due_offset_days % 4 == 0));
    }

    #[test]
    fn seeding_covers_every_category_once() {
        let venture_id = ObjectId::new();
        let streams = seed_streams(venture_id);

        assert_eq!(streams.len(), StreamCategory::ALL.len());
        for category in StreamCategory::ALL {
            assert_eq!(streams.iter().filter(|s| s.category == category).count(), 1);
        }
        assert!(streams.iter().all(|s| s.venture_id == venture_id));
    }
}
