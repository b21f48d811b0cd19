//! Centralized visibility and edit gates.
//!
//! Route handlers authenticate, then consult these predicates; nobody
//! hand-rolls role checks at call sites. The predicates are pure; the
//! matching Mongo filter for list endpoints is built here too so the two
//! can never drift apart.
//!
//! Gates compose: a write gate (`can_edit_*`, `can_update_workbench`) is
//! only consulted after `can_view_venture` has passed, so a screening
//! manager's write reach never exceeds their read reach.

use bson::{doc, oid::ObjectId, Document};

use super::program::ProgramTier;
use super::role::Role;
use super::status::VentureStatus;

/// The venture fields the gates inspect.
#[derive(Debug, Clone, Copy)]
pub struct VentureScope<'a> {
    pub owner_id: &'a ObjectId,
    pub status: VentureStatus,
    pub recommendation: Option<ProgramTier>,
    pub final_program: Option<ProgramTier>,
}

/// Whether the actor may read this venture at all.
///
/// Entrepreneurs see their own ventures. Screening managers see the
/// submitted queue. Venture managers see the Scale Up tier, the committee
/// the two Accelerate tiers. Admins see everything.
pub fn can_view_venture(role: Role, actor_id: &ObjectId, scope: &VentureScope) -> bool {
    match role {
        Role::Admin => true,
        Role::Entrepreneur => scope.owner_id == actor_id,
        Role::SuccessMgr => scope.status == VentureStatus::Submitted,
        Role::VentureMgr => {
            scope.recommendation == Some(ProgramTier::ScaleUp)
                || scope.final_program == Some(ProgramTier::ScaleUp)
        }
        Role::Committee => {
            scope.recommendation.is_some_and(|t| t.is_committee_tier())
                || scope.final_program.is_some_and(|t| t.is_committee_tier())
        }
    }
}

/// Mongo filter selecting exactly the ventures [`can_view_venture`] admits.
pub fn visibility_filter(role: Role, actor_id: &ObjectId) -> Document {
    match role {
        Role::Admin => doc! {},
        Role::Entrepreneur => doc! { "owner_id": actor_id },
        Role::SuccessMgr => doc! { "status": VentureStatus::Submitted.as_str() },
        Role::VentureMgr => doc! {
            "$or": [
                { "program_recommendation": ProgramTier::ScaleUp.as_str() },
                { "final_program": ProgramTier::ScaleUp.as_str() },
            ]
        },
        Role::Committee => doc! {
            "$or": [
                { "program_recommendation": { "$in": [
                    ProgramTier::AccelerateCore.as_str(),
                    ProgramTier::AcceleratePlus.as_str(),
                ] } },
                { "final_program": { "$in": [
                    ProgramTier::AccelerateCore.as_str(),
                    ProgramTier::AcceleratePlus.as_str(),
                ] } },
            ]
        },
    }
}

/// Application form fields: owner while drafting, admin any time.
pub fn can_edit_application(role: Role, actor_id: &ObjectId, scope: &VentureScope) -> bool {
    match role {
        Role::Admin => true,
        Role::Entrepreneur => {
            scope.owner_id == actor_id && scope.status == VentureStatus::Draft
        }
        _ => false,
    }
}

/// Screening fields (`vsm_notes`, `program_recommendation`).
pub fn can_edit_assessment(role: Role, scope: &VentureScope) -> bool {
    match role {
        Role::Admin => true,
        Role::SuccessMgr => matches!(
            scope.status,
            VentureStatus::Submitted | VentureStatus::UnderReview
        ),
        _ => false,
    }
}

/// Decision fields (`venture_partner`, `final_program`, `committee_feedback`,
/// `internal_comments`).
pub fn can_edit_decision(role: Role) -> bool {
    matches!(role, Role::Committee | Role::Admin)
}

/// Stream and milestone updates. The workbench lock is checked separately
/// because a locked workbench is a 409, not a 403.
pub fn can_update_workbench(role: Role, actor_id: &ObjectId, scope: &VentureScope) -> bool {
    match role {
        Role::Admin | Role::SuccessMgr | Role::VentureMgr | Role::Committee => {
            scope.status != VentureStatus::Draft
        }
        Role::Entrepreneur => {
            scope.owner_id == actor_id && scope.status == VentureStatus::Signed
        }
    }
}

/// Interaction entries may be changed or removed only by their author or an
/// admin.
pub fn can_edit_interaction(role: Role, actor_id: &ObjectId, author_id: &ObjectId) -> bool {
    role == Role::Admin || actor_id == author_id
}

/// Mentor time is recorded by staff roles.
pub fn can_record_support_hours(role: Role) -> bool {
    role.is_manager()
}

/// Screening notes and internal committee comments are hidden from
/// entrepreneurs.
pub fn sees_internal_fields(role: Role) -> bool {
    role.is_manager()
}

/// Recomputing the venture's analysis summary is a staff action.
pub fn can_refresh_insights(role: Role) -> bool {
    matches!(role, Role::SuccessMgr | Role::Committee | Role::Admin)
}

/// Roadmap regeneration: committee or admin, once screening has begun.
pub fn can_regenerate_roadmap(role: Role, scope: &VentureScope) -> bool {
    matches!(role, Role::Committee | Role::Admin)
        && !matches!(
            scope.status,
            VentureStatus::Draft | VentureStatus::Submitted
        )
}

/// Venture deletion: owner while drafting, admin any time.
pub fn can_delete_venture(role: Role, actor_id: &ObjectId, scope: &VentureScope) -> bool {
    can_edit_application(role, actor_id, scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope<'a>(
        owner: &'a ObjectId,
        status: VentureStatus,
        rec: Option<ProgramTier>,
        fin: Option<ProgramTier>,
    ) -> VentureScope<'a> {
        VentureScope {
            owner_id: owner,
            status,
            recommendation: rec,
            final_program: fin,
        }
    }

    #[test]
    fn entrepreneurs_see_only_their_own_ventures() {
        let owner = ObjectId::new();
        let stranger = ObjectId::new();
        let s = scope(&owner, VentureStatus::Submitted, None, None);

        assert!(can_view_venture(Role::Entrepreneur, &owner, &s));
        assert!(!can_view_venture(Role::Entrepreneur, &stranger, &s));
    }

    #[test]
    fn screening_managers_see_the_submitted_queue() {
        let owner = ObjectId::new();
        let actor = ObjectId::new();

        let submitted = scope(&owner, VentureStatus::Submitted, None, None);
        assert!(can_view_venture(Role::SuccessMgr, &actor, &submitted));

        let draft = scope(&owner, VentureStatus::Draft, None, None);
        assert!(!can_view_venture(Role::SuccessMgr, &actor, &draft));

        let reviewed = scope(
            &owner,
            VentureStatus::UnderReview,
            Some(ProgramTier::AccelerateCore),
            None,
        );
        assert!(!can_view_venture(Role::SuccessMgr, &actor, &reviewed));
    }

    #[test]
    fn venture_managers_see_only_scale_up() {
        let owner = ObjectId::new();
        let actor = ObjectId::new();

        let scale_up = scope(
            &owner,
            VentureStatus::UnderReview,
            Some(ProgramTier::ScaleUp),
            None,
        );
        assert!(can_view_venture(Role::VentureMgr, &actor, &scale_up));

        let core = scope(
            &owner,
            VentureStatus::UnderReview,
            Some(ProgramTier::AccelerateCore),
            None,
        );
        assert!(!can_view_venture(Role::VentureMgr, &actor, &core));

        let finalized = scope(
            &owner,
            VentureStatus::Approved,
            None,
            Some(ProgramTier::ScaleUp),
        );
        assert!(can_view_venture(Role::VentureMgr, &actor, &finalized));
    }

    #[test]
    fn committee_sees_only_accelerate_tiers() {
        let owner = ObjectId::new();
        let actor = ObjectId::new();

        for tier in [ProgramTier::AccelerateCore, ProgramTier::AcceleratePlus] {
            let s = scope(&owner, VentureStatus::UnderReview, Some(tier), None);
            assert!(can_view_venture(Role::Committee, &actor, &s), "{}", tier);
        }

        let scale_up = scope(
            &owner,
            VentureStatus::UnderReview,
            Some(ProgramTier::ScaleUp),
            None,
        );
        assert!(!can_view_venture(Role::Committee, &actor, &scale_up));

        let unassessed = scope(&owner, VentureStatus::Submitted, None, None);
        assert!(!can_view_venture(Role::Committee, &actor, &unassessed));
    }

    #[test]
    fn admin_sees_everything() {
        let owner = ObjectId::new();
        let actor = ObjectId::new();
        for status in VentureStatus::ALL {
            let s = scope(&owner, status, None, None);
            assert!(can_view_venture(Role::Admin, &actor, &s));
        }
    }

    #[test]
    fn application_edits_lock_at_submission() {
        let owner = ObjectId::new();
        let draft = scope(&owner, VentureStatus::Draft, None, None);
        let submitted = scope(&owner, VentureStatus::Submitted, None, None);

        assert!(can_edit_application(Role::Entrepreneur, &owner, &draft));
        assert!(!can_edit_application(
            Role::Entrepreneur,
            &owner,
            &submitted
        ));
        assert!(can_edit_application(Role::Admin, &owner, &submitted));
    }

    #[test]
    fn workbench_opens_to_the_owner_at_signing() {
        let owner = ObjectId::new();
        let contract = scope(&owner, VentureStatus::ContractSent, None, None);
        let signed = scope(&owner, VentureStatus::Signed, None, None);

        assert!(!can_update_workbench(
            Role::Entrepreneur,
            &owner,
            &contract
        ));
        assert!(can_update_workbench(Role::Entrepreneur, &owner, &signed));
        assert!(can_update_workbench(Role::Committee, &owner, &contract));
        assert!(!can_update_workbench(
            Role::Committee,
            &owner,
            &scope(&owner, VentureStatus::Draft, None, None)
        ));
    }

    #[test]
    fn interactions_are_author_or_admin_editable() {
        let author = ObjectId::new();
        let other = ObjectId::new();

        assert!(can_edit_interaction(Role::Entrepreneur, &author, &author));
        assert!(!can_edit_interaction(Role::Committee, &other, &author));
        assert!(can_edit_interaction(Role::Admin, &other, &author));
    }

    #[test]
    fn entrepreneur_visibility_filter_scopes_by_owner() {
        let actor = ObjectId::new();
        let filter = visibility_filter(Role::Entrepreneur, &actor);
        assert_eq!(filter.get_object_id("owner_id").unwrap(), actor);

        assert!(visibility_filter(Role::Admin, &actor).is_empty());
        assert_eq!(
            visibility_filter(Role::SuccessMgr, &actor)
                .get_str("status")
                .unwrap(),
            "submitted"
        );
    }

    #[test]
    fn staff_roles_record_support_hours() {
        assert!(!can_record_support_hours(Role::Entrepreneur));
        for role in [
            Role::SuccessMgr,
            Role::VentureMgr,
            Role::Committee,
            Role::Admin,
        ] {
            assert!(can_record_support_hours(role));
        }
    }
}
