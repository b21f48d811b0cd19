//! Transition execution
//!
//! [`execute_transition`] is the only code path that writes `status`. It
//! plans the move against the transition table, flips the status with an
//! optimistic `status == from` filter, applies the planned side effects,
//! and appends the history record.
//!
//! Ordering: the flip happens first, so concurrent requests race on the
//! filter instead of on side effects. Exactly one request wins; the loser
//! gets a conflict and nothing else is written for it. Stream seeding runs
//! after a won flip and rolls the flip back if the insert fails.

use bson::{doc, oid::ObjectId, DateTime, Document};
use tracing::{error, info, warn};

use crate::auth::Identity;
use crate::db::schemas::{
    HistoryDoc, MilestoneDoc, StreamDoc, VentureDoc, HISTORY_COLLECTION, MILESTONE_COLLECTION,
    STREAM_COLLECTION, VENTURE_COLLECTION,
};
use crate::db::MongoClient;
use crate::domain::{plan_transition, Effect, TransitionPlan, VentureStatus};
use crate::logging::AuditLogger;
use crate::services::roadmap;
use crate::types::{Result, TrellisError};

/// What a completed transition changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub from: VentureStatus,
    pub to: VentureStatus,
}

/// Fold the plan's venture-row effects into the `$set` document that will
/// land with the status flip.
fn apply_effect_stamps(plan: &TransitionPlan, set: &mut Document) {
    let now = DateTime::now();
    if plan.has_effect(Effect::StampSubmittedAt) {
        set.insert("submitted_at", now);
    }
    if plan.has_effect(Effect::StampDecidedAt) {
        set.insert("decided_at", now);
    }
    if plan.has_effect(Effect::StampSignedAt) {
        set.insert("signed_at", now);
    }
    if plan.has_effect(Effect::LockWorkbench) {
        set.insert("workbench_locked", true);
    }
    if plan.has_effect(Effect::UnlockWorkbench) {
        set.insert("workbench_locked", false);
    }
}

/// Move a venture to `target`, applying `set` (the request's already
/// validated field edits) atomically with the flip.
///
/// `venture` must carry those edits in memory as well, since the table's
/// requirements are checked against it.
pub async fn execute_transition(
    mongo: &MongoClient,
    audit: &AuditLogger,
    actor: &Identity,
    venture: &VentureDoc,
    target: VentureStatus,
    mut set: Document,
) -> Result<TransitionOutcome> {
    let venture_id = venture
        ._id
        .ok_or_else(|| TrellisError::Internal("venture record has no id".into()))?;

    let milestones = mongo
        .collection::<MilestoneDoc>(MILESTONE_COLLECTION)
        .await?;
    let milestone_count = milestones.count(doc! { "venture_id": venture_id }).await?;

    let plan = plan_transition(
        venture.status,
        target,
        actor.role,
        &venture.transition_context(milestone_count > 0),
    )?;

    apply_effect_stamps(&plan, &mut set);
    set.insert("status", plan.to.as_str());

    let ventures = mongo.collection::<VentureDoc>(VENTURE_COLLECTION).await?;
    let flip = ventures
        .update_one(
            doc! { "_id": venture_id, "status": plan.from.as_str() },
            doc! { "$set": set },
        )
        .await?;

    if flip.matched_count == 0 {
        return Err(TrellisError::Conflict(
            "venture status changed while the request was in flight".into(),
        ));
    }

    if plan.has_effect(Effect::SeedStreams) {
        if let Err(e) = seed_streams(mongo, venture_id).await {
            roll_back_submission(mongo, venture_id, &plan).await;
            return Err(e);
        }
    }

    // The flip is committed; a history write failure must not unwind it
    let note = if plan.to == VentureStatus::Rejected {
        venture.committee_feedback.clone()
    } else {
        None
    };
    let history = HistoryDoc::new(
        venture_id,
        plan.from,
        plan.to,
        actor.profile_id,
        actor.role,
        note,
    );
    match mongo.collection::<HistoryDoc>(HISTORY_COLLECTION).await {
        Ok(coll) => {
            if let Err(e) = coll.insert_one(history).await {
                error!(venture = %venture_id, "Failed to record transition history: {}", e);
            }
        }
        Err(e) => error!(venture = %venture_id, "History collection unavailable: {}", e),
    }

    audit
        .log_transition(actor, venture_id.to_hex(), plan.from, plan.to)
        .await;

    info!(
        venture = %venture_id,
        from = %plan.from,
        to = %plan.to,
        role = %actor.role,
        "Venture transitioned"
    );

    Ok(TransitionOutcome {
        from: plan.from,
        to: plan.to,
    })
}

async fn seed_streams(mongo: &MongoClient, venture_id: ObjectId) -> Result<()> {
    let streams = mongo.collection::<StreamDoc>(STREAM_COLLECTION).await?;

    // Insert one at a time so a retried submission fills in whatever a
    // failed earlier attempt left missing. The unique (venture_id,
    // category) index reports the ones already present as conflicts.
    let mut created = 0usize;
    let seeds = roadmap::seed_streams(venture_id);
    let total = seeds.len();
    for stream in seeds {
        match streams.insert_one(stream).await {
            Ok(_) => created += 1,
            Err(TrellisError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }
    }

    if created < total {
        warn!(
            venture = %venture_id,
            created, "Streams partially pre-seeded from an earlier attempt"
        );
    } else {
        info!(venture = %venture_id, count = created, "Seeded work streams");
    }
    Ok(())
}

/// Undo a won draft -> submitted flip whose stream seeding failed.
async fn roll_back_submission(mongo: &MongoClient, venture_id: ObjectId, plan: &TransitionPlan) {
    let rollback = doc! {
        "$set": { "status": plan.from.as_str() },
        "$unset": { "submitted_at": "" },
    };

    let result = match mongo.collection::<VentureDoc>(VENTURE_COLLECTION).await {
        Ok(coll) => {
            coll.update_one(
                doc! { "_id": venture_id, "status": plan.to.as_str() },
                rollback,
            )
            .await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!(
            venture = %venture_id,
            "Failed to roll back submission after seeding error: {}", e
        );
    }
}
