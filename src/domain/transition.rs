//! The venture workflow transition table.
//!
//! Every status change in the system flows through [`plan_transition`]. The
//! table below is the single source of truth for which role may move a
//! venture between statuses, which fields must already be present, and
//! which side effects accompany the write. Route handlers never touch
//! `status` directly.

use thiserror::Error;

use super::role::Role;
use super::status::VentureStatus;

/// Typed rejection from the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot move venture from '{from}' to '{to}' as {role}")]
    InvalidTransition {
        from: VentureStatus,
        to: VentureStatus,
        role: Role,
    },
    #[error("transition requires '{field}' to be set")]
    MissingRequiredField { field: &'static str },
}

/// Field preconditions a table row can demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Non-empty name and at least one application answer
    SubmissionComplete,
    /// Screening manager picked a program tier
    ProgramRecommendation,
    /// Committee assigned a venture partner
    VenturePartner,
    /// A roadmap has been generated for the venture
    MilestonesExist,
    /// Committee wrote feedback for the entrepreneur
    CommitteeFeedback,
}

impl Requirement {
    fn check(&self, ctx: &TransitionContext) -> Result<(), &'static str> {
        match self {
            Requirement::SubmissionComplete => {
                if !ctx.has_name {
                    Err("name")
                } else if !ctx.has_answers {
                    Err("answers")
                } else {
                    Ok(())
                }
            }
            Requirement::ProgramRecommendation => {
                if ctx.has_recommendation {
                    Ok(())
                } else {
                    Err("program_recommendation")
                }
            }
            Requirement::VenturePartner => {
                if ctx.has_partner {
                    Ok(())
                } else {
                    Err("venture_partner")
                }
            }
            Requirement::MilestonesExist => {
                if ctx.has_milestones {
                    Ok(())
                } else {
                    Err("milestones")
                }
            }
            Requirement::CommitteeFeedback => {
                if ctx.has_feedback {
                    Ok(())
                } else {
                    Err("committee_feedback")
                }
            }
        }
    }
}

/// Side effects the caller must apply in the same write as the status flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Create the six work streams for the venture
    SeedStreams,
    /// Stamp `submitted_at`
    StampSubmittedAt,
    /// Stamp `decided_at`
    StampDecidedAt,
    /// Stamp `signed_at`
    StampSignedAt,
    /// Set `workbench_locked = true`
    LockWorkbench,
    /// Set `workbench_locked = false`
    UnlockWorkbench,
}

/// Snapshot of the venture fields the table's requirements inspect, taken
/// after any same-request field edits have been applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionContext {
    pub has_name: bool,
    pub has_answers: bool,
    pub has_recommendation: bool,
    pub has_partner: bool,
    pub has_milestones: bool,
    pub has_feedback: bool,
}

/// One row of the transition table.
struct Rule {
    from: VentureStatus,
    to: VentureStatus,
    roles: &'static [Role],
    requires: &'static [Requirement],
    effects: &'static [Effect],
}

const RULES: &[Rule] = &[
    Rule {
        from: VentureStatus::Draft,
        to: VentureStatus::Submitted,
        roles: &[Role::Entrepreneur, Role::Admin],
        requires: &[Requirement::SubmissionComplete],
        effects: &[Effect::SeedStreams, Effect::StampSubmittedAt],
    },
    Rule {
        from: VentureStatus::Submitted,
        to: VentureStatus::UnderReview,
        roles: &[Role::SuccessMgr, Role::Admin],
        requires: &[Requirement::ProgramRecommendation],
        effects: &[],
    },
    Rule {
        from: VentureStatus::UnderReview,
        to: VentureStatus::Approved,
        roles: &[Role::Committee, Role::Admin],
        requires: &[Requirement::VenturePartner],
        effects: &[Effect::StampDecidedAt],
    },
    Rule {
        from: VentureStatus::Approved,
        to: VentureStatus::AgreementSent,
        roles: &[Role::Committee, Role::Admin],
        requires: &[Requirement::MilestonesExist],
        effects: &[],
    },
    Rule {
        from: VentureStatus::AgreementSent,
        to: VentureStatus::ContractSent,
        roles: &[Role::Committee, Role::Admin],
        requires: &[],
        effects: &[Effect::LockWorkbench],
    },
    Rule {
        from: VentureStatus::ContractSent,
        to: VentureStatus::Signed,
        roles: &[Role::Entrepreneur, Role::Committee, Role::Admin],
        requires: &[],
        effects: &[Effect::UnlockWorkbench, Effect::StampSignedAt],
    },
];

// Rejection is row-independent: any non-terminal status can be rejected by
// the committee or an admin, always with feedback for the entrepreneur.
const REJECT_ROLES: &[Role] = &[Role::Committee, Role::Admin];
const REJECT_REQUIRES: &[Requirement] = &[Requirement::CommitteeFeedback];
const REJECT_EFFECTS: &[Effect] = &[Effect::StampDecidedAt];

/// A validated transition: target status plus the side effects the caller
/// must apply atomically with the status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: VentureStatus,
    pub to: VentureStatus,
    pub effects: &'static [Effect],
}

impl TransitionPlan {
    pub fn has_effect(&self, effect: Effect) -> bool {
        self.effects.contains(&effect)
    }
}

/// Validate a requested transition against the table.
///
/// Returns the plan to execute, or a typed error. Pure function; callers
/// are responsible for loading `ctx` from current venture state and for
/// writing the result with an optimistic `status == from` filter.
pub fn plan_transition(
    from: VentureStatus,
    to: VentureStatus,
    role: Role,
    ctx: &TransitionContext,
) -> Result<TransitionPlan, TransitionError> {
    let denied = TransitionError::InvalidTransition { from, to, role };

    let (requires, effects): (&[Requirement], &[Effect]) =
        if to == VentureStatus::Rejected {
            if from.is_terminal() || !REJECT_ROLES.contains(&role) {
                return Err(denied);
            }
            (REJECT_REQUIRES, REJECT_EFFECTS)
        } else {
            let rule = RULES
                .iter()
                .find(|r| r.from == from && r.to == to)
                .ok_or(denied)?;
            if !rule.roles.contains(&role) {
                return Err(denied);
            }
            (rule.requires, rule.effects)
        };

    for req in requires {
        if let Err(field) = req.check(ctx) {
            return Err(TransitionError::MissingRequiredField { field });
        }
    }

    Ok(TransitionPlan { from, to, effects })
}

/// Roles allowed to perform `from -> to`, straight from the table.
/// Empty when the pair is not a legal transition.
pub fn permitted_roles(from: VentureStatus, to: VentureStatus) -> &'static [Role] {
    if to == VentureStatus::Rejected {
        if from.is_terminal() {
            &[]
        } else {
            REJECT_ROLES
        }
    } else {
        RULES
            .iter()
            .find(|r| r.from == from && r.to == to)
            .map(|r| r.roles)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_ctx() -> TransitionContext {
        TransitionContext {
            has_name: true,
            has_answers: true,
            has_recommendation: true,
            has_partner: true,
            has_milestones: true,
            has_feedback: true,
        }
    }

    #[test]
    fn entrepreneur_submits_complete_draft() {
        let ctx = TransitionContext {
            has_name: true,
            has_answers: true,
            ..Default::default()
        };
        let plan = plan_transition(
            VentureStatus::Draft,
            VentureStatus::Submitted,
            Role::Entrepreneur,
            &ctx,
        )
        .unwrap();
        assert!(plan.has_effect(Effect::SeedStreams));
        assert!(plan.has_effect(Effect::StampSubmittedAt));
    }

    #[test]
    fn incomplete_draft_cannot_submit() {
        let no_name = TransitionContext {
            has_answers: true,
            ..Default::default()
        };
        assert_eq!(
            plan_transition(
                VentureStatus::Draft,
                VentureStatus::Submitted,
                Role::Entrepreneur,
                &no_name,
            ),
            Err(TransitionError::MissingRequiredField { field: "name" })
        );

        let no_answers = TransitionContext {
            has_name: true,
            ..Default::default()
        };
        assert_eq!(
            plan_transition(
                VentureStatus::Draft,
                VentureStatus::Submitted,
                Role::Entrepreneur,
                &no_answers,
            ),
            Err(TransitionError::MissingRequiredField { field: "answers" })
        );
    }

    #[test]
    fn screening_requires_recommendation() {
        assert_eq!(
            plan_transition(
                VentureStatus::Submitted,
                VentureStatus::UnderReview,
                Role::SuccessMgr,
                &TransitionContext::default(),
            ),
            Err(TransitionError::MissingRequiredField {
                field: "program_recommendation"
            })
        );
        assert!(plan_transition(
            VentureStatus::Submitted,
            VentureStatus::UnderReview,
            Role::SuccessMgr,
            &full_ctx(),
        )
        .is_ok());
    }

    #[test]
    fn approval_requires_venture_partner() {
        let mut ctx = full_ctx();
        ctx.has_partner = false;
        assert_eq!(
            plan_transition(
                VentureStatus::UnderReview,
                VentureStatus::Approved,
                Role::Committee,
                &ctx,
            ),
            Err(TransitionError::MissingRequiredField {
                field: "venture_partner"
            })
        );

        let plan = plan_transition(
            VentureStatus::UnderReview,
            VentureStatus::Approved,
            Role::Committee,
            &full_ctx(),
        )
        .unwrap();
        assert!(plan.has_effect(Effect::StampDecidedAt));
    }

    #[test]
    fn agreement_requires_milestones() {
        let mut ctx = full_ctx();
        ctx.has_milestones = false;
        assert_eq!(
            plan_transition(
                VentureStatus::Approved,
                VentureStatus::AgreementSent,
                Role::Committee,
                &ctx,
            ),
            Err(TransitionError::MissingRequiredField { field: "milestones" })
        );
    }

    #[test]
    fn contract_locks_workbench_and_signing_unlocks_it() {
        let lock = plan_transition(
            VentureStatus::AgreementSent,
            VentureStatus::ContractSent,
            Role::Committee,
            &full_ctx(),
        )
        .unwrap();
        assert!(lock.has_effect(Effect::LockWorkbench));

        let sign = plan_transition(
            VentureStatus::ContractSent,
            VentureStatus::Signed,
            Role::Entrepreneur,
            &full_ctx(),
        )
        .unwrap();
        assert!(sign.has_effect(Effect::UnlockWorkbench));
        assert!(sign.has_effect(Effect::StampSignedAt));
    }

    #[test]
    fn rejection_requires_feedback() {
        let mut ctx = full_ctx();
        ctx.has_feedback = false;
        assert_eq!(
            plan_transition(
                VentureStatus::UnderReview,
                VentureStatus::Rejected,
                Role::Committee,
                &ctx,
            ),
            Err(TransitionError::MissingRequiredField {
                field: "committee_feedback"
            })
        );
    }

    #[test]
    fn any_non_terminal_status_can_be_rejected() {
        for from in VentureStatus::ALL {
            let result = plan_transition(
                from,
                VentureStatus::Rejected,
                Role::Committee,
                &full_ctx(),
            );
            if from.is_terminal() {
                assert!(result.is_err(), "rejected terminal {} should fail", from);
            } else {
                let plan = result.unwrap();
                assert!(plan.has_effect(Effect::StampDecidedAt));
            }
        }
    }

    #[test]
    fn entrepreneur_cannot_reject_or_approve() {
        assert!(matches!(
            plan_transition(
                VentureStatus::UnderReview,
                VentureStatus::Rejected,
                Role::Entrepreneur,
                &full_ctx(),
            ),
            Err(TransitionError::InvalidTransition { .. })
        ));
        assert!(matches!(
            plan_transition(
                VentureStatus::UnderReview,
                VentureStatus::Approved,
                Role::SuccessMgr,
                &full_ctx(),
            ),
            Err(TransitionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn terminal_statuses_admit_no_transitions() {
        for from in [VentureStatus::Rejected, VentureStatus::Signed] {
            for to in VentureStatus::ALL {
                for role in Role::ALL {
                    assert!(
                        plan_transition(from, to, role, &full_ctx()).is_err(),
                        "{} -> {} as {} should be rejected",
                        from,
                        to,
                        role
                    );
                }
            }
        }
    }

    #[test]
    fn skipping_pipeline_stages_is_invalid() {
        assert!(matches!(
            plan_transition(
                VentureStatus::Draft,
                VentureStatus::Approved,
                Role::Admin,
                &full_ctx(),
            ),
            Err(TransitionError::InvalidTransition { .. })
        ));
        assert!(matches!(
            plan_transition(
                VentureStatus::Submitted,
                VentureStatus::Signed,
                Role::Admin,
                &full_ctx(),
            ),
            Err(TransitionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn permitted_roles_reflects_the_table() {
        assert_eq!(
            permitted_roles(VentureStatus::Draft, VentureStatus::Submitted),
            &[Role::Entrepreneur, Role::Admin]
        );
        assert_eq!(
            permitted_roles(VentureStatus::Signed, VentureStatus::Rejected),
            &[] as &[Role]
        );
        assert_eq!(
            permitted_roles(VentureStatus::Approved, VentureStatus::Rejected),
            &[Role::Committee, Role::Admin]
        );
    }
}
