//! Venture routes: the application CRUD surface plus the per-venture
//! sub-resources (streams, milestones, support hours, history).
//!
//! Every handler authenticates, loads the venture, and consults the gates
//! in `domain::access` before touching anything. Status never changes
//! through a plain field write; the `status` key in a PATCH is routed
//! through the transition pipeline with the same request's field edits
//! already applied.

use bson::{doc, oid::ObjectId, Document};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{authenticate, Identity};
use crate::db::schemas::{
    ApplicationAnswer, HistoryDoc, MilestoneDoc, StreamDoc, SupportHoursDoc, VentureDoc,
    HISTORY_COLLECTION, MILESTONE_COLLECTION, STREAM_COLLECTION, SUPPORT_HOURS_COLLECTION,
    VENTURE_COLLECTION,
};
use crate::db::{FindOpts, MongoClient};
use crate::domain::{access, ProgramTier, Role, StreamCategory, StreamStatus, VentureStatus};
use crate::routes::interactions;
use crate::routes::respond::{
    cors_preflight, data_response, error_response, method_not_allowed, not_found,
    parse_json_body, regex_escape, rfc3339, BoxBody, PageParams, Query,
};
use crate::server::AppState;
use crate::services::{analyze_with_timeout, build_milestones, execute_transition};
use crate::types::{Result, TrellisError};

// ============================================================================
// Shared helpers
// ============================================================================

/// Parse a path segment as an ObjectId.
pub(crate) fn parse_object_id(raw: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| TrellisError::Validation(format!("Invalid id: {}", raw)))
}

async fn fetch_venture(mongo: &MongoClient, id: ObjectId) -> Result<VentureDoc> {
    let ventures = mongo.collection::<VentureDoc>(VENTURE_COLLECTION).await?;
    ventures
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| TrellisError::NotFound(format!("Venture {} not found", id.to_hex())))
}

/// Load a venture and apply the visibility gate: 404 when absent, 403 when
/// outside the actor's reach.
pub(crate) async fn fetch_visible_venture(
    mongo: &MongoClient,
    actor: &Identity,
    id: ObjectId,
) -> Result<VentureDoc> {
    let venture = fetch_venture(mongo, id).await?;
    if !access::can_view_venture(actor.role, &actor.profile_id, &venture.scope()) {
        return Err(TrellisError::Forbidden(
            "You do not have access to this venture".into(),
        ));
    }
    Ok(venture)
}

// ============================================================================
// Response types
// ============================================================================

/// Venture as surfaced to clients. Staff-only fields are omitted for
/// entrepreneurs rather than nulled, so the wire shape matches what the
/// role may know.
#[derive(Debug, Serialize)]
pub struct VentureResponse {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub founder_name: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub track: String,
    pub team_size: i32,
    pub revenue_band: String,
    pub funding_stage: String,
    pub answers: Vec<ApplicationAnswer>,
    pub status: VentureStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_recommendation: Option<ProgramTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_program: Option<ProgramTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venture_partner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vsm_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committee_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    pub workbench_locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl VentureResponse {
    /// Shape a venture for `role`. Screening notes and internal comments
    /// stay with the staff.
    pub fn shaped(venture: &VentureDoc, role: Role) -> Self {
        let internal = access::sees_internal_fields(role);
        Self {
            id: venture._id.map(|id| id.to_hex()).unwrap_or_default(),
            owner_id: venture.owner_id.to_hex(),
            name: venture.name.clone(),
            founder_name: venture.founder_name.clone(),
            city: venture.city.clone(),
            website: venture.website.clone(),
            track: venture.track.clone(),
            team_size: venture.team_size,
            revenue_band: venture.revenue_band.clone(),
            funding_stage: venture.funding_stage.clone(),
            answers: venture.answers.clone(),
            status: venture.status,
            program_recommendation: venture.program_recommendation,
            final_program: venture.final_program,
            venture_partner: venture.venture_partner.clone(),
            vsm_notes: internal.then(|| venture.vsm_notes.clone()).flatten(),
            committee_feedback: venture.committee_feedback.clone(),
            internal_comments: internal.then(|| venture.internal_comments.clone()).flatten(),
            ai_summary: venture.ai_summary.clone(),
            workbench_locked: venture.workbench_locked,
            submitted_at: venture.submitted_at.map(rfc3339),
            decided_at: venture.decided_at.map(rfc3339),
            signed_at: venture.signed_at.map(rfc3339),
            created_at: venture.metadata.created_at.map(rfc3339),
            updated_at: venture.metadata.updated_at.map(rfc3339),
        }
    }
}

#[derive(Debug, Serialize)]
struct VentureListResponse {
    items: Vec<VentureResponse>,
    total: u64,
    page: u64,
    limit: i64,
}

#[derive(Debug, Serialize)]
pub struct StreamResponse {
    pub id: String,
    pub venture_id: String,
    pub category: StreamCategory,
    pub status: StreamStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub sort_order: i32,
}

impl StreamResponse {
    fn from_doc(stream: &StreamDoc) -> Self {
        Self {
            id: stream._id.map(|id| id.to_hex()).unwrap_or_default(),
            venture_id: stream.venture_id.to_hex(),
            category: stream.category,
            status: stream.status,
            summary: stream.summary.clone(),
            sort_order: stream.sort_order,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MilestoneResponse {
    pub id: String,
    pub venture_id: String,
    pub stream_category: StreamCategory,
    pub title: String,
    pub description: String,
    pub due_offset_days: i32,
    pub sequence: i32,
    pub completed: bool,
}

impl MilestoneResponse {
    fn from_doc(milestone: &MilestoneDoc) -> Self {
        Self {
            id: milestone._id.map(|id| id.to_hex()).unwrap_or_default(),
            venture_id: milestone.venture_id.to_hex(),
            stream_category: milestone.stream_category,
            title: milestone.title.clone(),
            description: milestone.description.clone(),
            due_offset_days: milestone.due_offset_days,
            sequence: milestone.sequence,
            completed: milestone.completed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SupportHoursEntryResponse {
    pub id: String,
    pub venture_id: String,
    pub recorded_by: String,
    pub hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<StreamCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<String>,
}

impl SupportHoursEntryResponse {
    fn from_doc(entry: &SupportHoursDoc) -> Self {
        Self {
            id: entry._id.map(|id| id.to_hex()).unwrap_or_default(),
            venture_id: entry.venture_id.to_hex(),
            recorded_by: entry.recorded_by.to_hex(),
            hours: entry.hours,
            category: entry.category,
            note: entry.note.clone(),
            recorded_at: entry.metadata.created_at.map(rfc3339),
        }
    }
}

#[derive(Debug, Serialize)]
struct SupportHoursListResponse {
    entries: Vec<SupportHoursEntryResponse>,
    total_hours: f64,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    pub id: String,
    pub venture_id: String,
    pub from_status: VentureStatus,
    pub to_status: VentureStatus,
    pub actor_id: String,
    pub actor_role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<String>,
}

impl HistoryEntryResponse {
    fn from_doc(entry: &HistoryDoc) -> Self {
        Self {
            id: entry._id.map(|id| id.to_hex()).unwrap_or_default(),
            venture_id: entry.venture_id.to_hex(),
            from_status: entry.from_status,
            to_status: entry.to_status,
            actor_id: entry.actor_id.to_hex(),
            actor_role: entry.actor_role,
            note: entry.note.clone(),
            at: entry.metadata.created_at.map(rfc3339),
        }
    }
}

// ============================================================================
// Collection: list and create
// ============================================================================

async fn list_ventures(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let query = Query::parse(req.uri().query());
    let pagination = PageParams::from_query(&query);

    // The visibility filter can itself contain $or clauses, so extra
    // criteria are combined with $and instead of key insertion.
    let mut clauses = vec![access::visibility_filter(actor.role, &actor.profile_id)];
    if let Some(raw) = query.get("status") {
        let status = VentureStatus::parse(raw)
            .ok_or_else(|| TrellisError::Validation(format!("Unknown status filter: {}", raw)))?;
        clauses.push(doc! { "status": status.as_str() });
    }
    if let Some(term) = query.get("search") {
        let term = term.trim();
        if !term.is_empty() {
            clauses.push(doc! { "name": { "$regex": regex_escape(term), "$options": "i" } });
        }
    }
    let filter = doc! { "$and": clauses };

    let mongo = state.store()?;
    let ventures = mongo.collection::<VentureDoc>(VENTURE_COLLECTION).await?;
    let total = ventures.count(filter.clone()).await?;
    let docs = ventures
        .find_many(
            filter,
            FindOpts::page(
                doc! { "metadata.created_at": -1 },
                pagination.skip(),
                pagination.limit,
            ),
        )
        .await?;

    let items = docs
        .iter()
        .map(|v| VentureResponse::shaped(v, actor.role))
        .collect();

    Ok(data_response(
        StatusCode::OK,
        &VentureListResponse {
            items,
            total,
            page: pagination.page,
            limit: pagination.limit,
        },
    ))
}

/// New ventures always start as drafts; a `status` key in the payload is
/// ignored.
#[derive(Debug, Deserialize)]
struct CreateVentureRequest {
    name: String,
    #[serde(default)]
    founder_name: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    track: String,
    #[serde(default)]
    team_size: i32,
    #[serde(default)]
    revenue_band: String,
    #[serde(default)]
    funding_stage: String,
    #[serde(default)]
    answers: Vec<ApplicationAnswer>,
}

async fn create_venture(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let body: CreateVentureRequest = parse_json_body(req).await?;

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(TrellisError::Validation("Venture name is required".into()));
    }
    if body.team_size < 0 {
        return Err(TrellisError::Validation(
            "team_size must be zero or greater".into(),
        ));
    }

    let mut venture = VentureDoc::new(actor.profile_id, name);
    venture.founder_name = body.founder_name.trim().to_string();
    venture.city = body.city.trim().to_string();
    venture.website = body.website.filter(|w| !w.trim().is_empty());
    venture.track = body.track.trim().to_string();
    venture.team_size = body.team_size;
    venture.revenue_band = body.revenue_band.trim().to_string();
    venture.funding_stage = body.funding_stage.trim().to_string();
    venture.answers = body.answers;

    let mongo = state.store()?;
    let ventures = mongo.collection::<VentureDoc>(VENTURE_COLLECTION).await?;
    let id = ventures.insert_one(venture.clone()).await?;
    venture._id = Some(id);

    info!(venture = %id, owner = %actor.profile_id, "Venture draft created");

    Ok(data_response(
        StatusCode::CREATED,
        &VentureResponse::shaped(&venture, actor.role),
    ))
}

// ============================================================================
// Single venture: get, update, delete
// ============================================================================

async fn get_venture(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let id = parse_object_id(raw_id)?;
    let venture = fetch_visible_venture(state.store()?, &actor, id).await?;
    Ok(data_response(
        StatusCode::OK,
        &VentureResponse::shaped(&venture, actor.role),
    ))
}

/// Field edits plus the optional transition. Absent keys leave fields
/// unchanged; sending `status` routes the request through the transition
/// table after the edits are applied.
#[derive(Debug, Default, Deserialize)]
struct UpdateVentureRequest {
    // Application form
    name: Option<String>,
    founder_name: Option<String>,
    city: Option<String>,
    website: Option<String>,
    track: Option<String>,
    team_size: Option<i32>,
    revenue_band: Option<String>,
    funding_stage: Option<String>,
    answers: Option<Vec<ApplicationAnswer>>,
    // Screening
    vsm_notes: Option<String>,
    program_recommendation: Option<ProgramTier>,
    // Decision
    venture_partner: Option<String>,
    final_program: Option<ProgramTier>,
    committee_feedback: Option<String>,
    internal_comments: Option<String>,
    // Workflow
    status: Option<VentureStatus>,
    /// Recompute the analysis summary before responding (staff only)
    #[serde(default)]
    refresh_insights: bool,
}

impl UpdateVentureRequest {
    fn touches_application(&self) -> bool {
        self.name.is_some()
            || self.founder_name.is_some()
            || self.city.is_some()
            || self.website.is_some()
            || self.track.is_some()
            || self.team_size.is_some()
            || self.revenue_band.is_some()
            || self.funding_stage.is_some()
            || self.answers.is_some()
    }

    fn touches_assessment(&self) -> bool {
        self.vsm_notes.is_some() || self.program_recommendation.is_some()
    }

    fn touches_decision(&self) -> bool {
        self.venture_partner.is_some()
            || self.final_program.is_some()
            || self.committee_feedback.is_some()
            || self.internal_comments.is_some()
    }
}

/// A screening manager saving a recommendation on a submitted venture is
/// the assessment handoff: it carries the venture into review even when
/// the client does not send `status` explicitly.
fn implied_target(
    explicit: Option<VentureStatus>,
    saves_recommendation: bool,
    current: VentureStatus,
    role: Role,
) -> Option<VentureStatus> {
    if explicit.is_some() {
        return explicit;
    }
    if saves_recommendation
        && current == VentureStatus::Submitted
        && matches!(role, Role::SuccessMgr | Role::Admin)
    {
        return Some(VentureStatus::UnderReview);
    }
    None
}

/// Set a trimmed string field, or clear it when the client sent "".
fn set_or_clear(set: &mut Document, key: &str, value: String) -> Option<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        set.insert(key, bson::Bson::Null);
        None
    } else {
        set.insert(key, &value);
        Some(value)
    }
}

async fn update_venture(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let id = parse_object_id(raw_id)?;
    let update: UpdateVentureRequest = parse_json_body(req).await?;

    let mongo = state.store()?;
    let mut venture = fetch_visible_venture(mongo, &actor, id).await?;

    // Gate each field group before applying anything.
    if update.touches_application()
        && !access::can_edit_application(actor.role, &actor.profile_id, &venture.scope())
    {
        return Err(TrellisError::Forbidden(
            "The application form is editable by its owner while drafting".into(),
        ));
    }
    if update.touches_assessment() {
        if !access::can_edit_assessment(actor.role, &venture.scope()) {
            return Err(TrellisError::Forbidden(
                "Assessment fields belong to the screening manager".into(),
            ));
        }
        // The recommendation is set from the submitted queue; only note
        // edits continue during review.
        if update.program_recommendation.is_some()
            && actor.role != Role::Admin
            && venture.status != VentureStatus::Submitted
        {
            return Err(TrellisError::Conflict(
                "The recommendation can only change while the venture is submitted".into(),
            ));
        }
    }
    if update.touches_decision() && !access::can_edit_decision(actor.role) {
        return Err(TrellisError::Forbidden(
            "Decision fields belong to the committee".into(),
        ));
    }
    if update.refresh_insights && !access::can_refresh_insights(actor.role) {
        return Err(TrellisError::Forbidden(
            "Recomputing the analysis is a staff action".into(),
        ));
    }

    let target = implied_target(
        update.status,
        update.program_recommendation.is_some(),
        venture.status,
        actor.role,
    );

    // Apply edits to the in-memory venture and collect the $set document.
    // The transition pipeline evaluates its requirements against the
    // patched venture, so both must stay in step.
    let mut set = Document::new();

    if let Some(name) = update.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(TrellisError::Validation(
                "Venture name cannot be empty".into(),
            ));
        }
        set.insert("name", &name);
        venture.name = name;
    }
    if let Some(founder_name) = update.founder_name {
        let founder_name = founder_name.trim().to_string();
        set.insert("founder_name", &founder_name);
        venture.founder_name = founder_name;
    }
    if let Some(city) = update.city {
        let city = city.trim().to_string();
        set.insert("city", &city);
        venture.city = city;
    }
    if let Some(website) = update.website {
        venture.website = set_or_clear(&mut set, "website", website);
    }
    if let Some(track) = update.track {
        let track = track.trim().to_string();
        set.insert("track", &track);
        venture.track = track;
    }
    if let Some(team_size) = update.team_size {
        if team_size < 0 {
            return Err(TrellisError::Validation(
                "team_size must be zero or greater".into(),
            ));
        }
        set.insert("team_size", team_size);
        venture.team_size = team_size;
    }
    if let Some(revenue_band) = update.revenue_band {
        let revenue_band = revenue_band.trim().to_string();
        set.insert("revenue_band", &revenue_band);
        venture.revenue_band = revenue_band;
    }
    if let Some(funding_stage) = update.funding_stage {
        let funding_stage = funding_stage.trim().to_string();
        set.insert("funding_stage", &funding_stage);
        venture.funding_stage = funding_stage;
    }
    if let Some(answers) = update.answers {
        let encoded = bson::to_bson(&answers)
            .map_err(|e| TrellisError::Internal(format!("Failed to encode answers: {}", e)))?;
        set.insert("answers", encoded);
        venture.answers = answers;
    }
    if let Some(notes) = update.vsm_notes {
        venture.vsm_notes = set_or_clear(&mut set, "vsm_notes", notes);
    }
    if let Some(tier) = update.program_recommendation {
        set.insert("program_recommendation", tier.as_str());
        venture.program_recommendation = Some(tier);
    }
    if let Some(partner) = update.venture_partner {
        venture.venture_partner = set_or_clear(&mut set, "venture_partner", partner);
    }
    if let Some(tier) = update.final_program {
        set.insert("final_program", tier.as_str());
        venture.final_program = Some(tier);
    }
    if let Some(feedback) = update.committee_feedback {
        venture.committee_feedback = set_or_clear(&mut set, "committee_feedback", feedback);
    }
    if let Some(comments) = update.internal_comments {
        venture.internal_comments = set_or_clear(&mut set, "internal_comments", comments);
    }

    if update.refresh_insights {
        // Provider errors and timeouts degrade to a placeholder rather
        // than failing the whole request.
        let summary = match analyze_with_timeout(
            state.insights.as_ref(),
            &venture,
            state.args.insights_timeout_ms,
        )
        .await
        {
            Some(report) => report.summary,
            None => "analysis unavailable".to_string(),
        };
        set.insert("ai_summary", &summary);
        venture.ai_summary = Some(summary);
    }

    match target {
        Some(to) => {
            execute_transition(mongo, &state.audit, &actor, &venture, to, set).await?;
        }
        None => {
            if !set.is_empty() {
                let ventures = mongo.collection::<VentureDoc>(VENTURE_COLLECTION).await?;
                ventures
                    .update_one(doc! { "_id": id }, doc! { "$set": set })
                    .await?;
            }
        }
    }

    // Re-read so the response carries the stamps the write produced.
    let fresh = fetch_venture(mongo, id).await?;
    Ok(data_response(
        StatusCode::OK,
        &VentureResponse::shaped(&fresh, actor.role),
    ))
}

async fn delete_venture(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let id = parse_object_id(raw_id)?;
    let mongo = state.store()?;
    let venture = fetch_visible_venture(mongo, &actor, id).await?;

    if !access::can_delete_venture(actor.role, &actor.profile_id, &venture.scope()) {
        return Err(TrellisError::Forbidden(
            "Only the owner of a draft or an admin may delete a venture".into(),
        ));
    }

    let ventures = mongo.collection::<VentureDoc>(VENTURE_COLLECTION).await?;
    ventures.soft_delete(doc! { "_id": id }).await?;

    state.audit.log_venture_deleted(&actor, id.to_hex()).await;
    info!(venture = %id, actor = %actor.profile_id, "Venture deleted");

    Ok(data_response(
        StatusCode::OK,
        &serde_json::json!({ "deleted": true }),
    ))
}

// ============================================================================
// Streams
// ============================================================================

async fn list_streams(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let id = parse_object_id(raw_id)?;
    let mongo = state.store()?;
    fetch_visible_venture(mongo, &actor, id).await?;

    let streams = mongo.collection::<StreamDoc>(STREAM_COLLECTION).await?;
    let docs = streams
        .find_many(
            doc! { "venture_id": id },
            FindOpts::sorted(doc! { "sort_order": 1 }),
        )
        .await?;

    let items: Vec<StreamResponse> = docs.iter().map(StreamResponse::from_doc).collect();
    Ok(data_response(StatusCode::OK, &items))
}

#[derive(Debug, Deserialize)]
struct UpdateStreamRequest {
    status: Option<StreamStatus>,
    summary: Option<String>,
}

async fn update_stream(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
    raw_category: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let id = parse_object_id(raw_id)?;

    let decoded = urlencoding::decode(raw_category)
        .map_err(|_| TrellisError::Validation("Invalid stream category encoding".into()))?;
    let category = StreamCategory::parse(&decoded).ok_or_else(|| {
        TrellisError::Validation(format!("Unknown stream category: {}", decoded))
    })?;

    let body: UpdateStreamRequest = parse_json_body(req).await?;

    let mongo = state.store()?;
    let venture = fetch_visible_venture(mongo, &actor, id).await?;

    if !access::can_update_workbench(actor.role, &actor.profile_id, &venture.scope()) {
        return Err(TrellisError::Forbidden(
            "The workbench is not open to you at this stage".into(),
        ));
    }
    if venture.workbench_locked {
        return Err(TrellisError::Conflict(
            "The workbench is locked while the contract is out for signature".into(),
        ));
    }

    let mut set = Document::new();
    if let Some(status) = body.status {
        set.insert("status", status.as_str());
    }
    if let Some(summary) = body.summary {
        set_or_clear(&mut set, "summary", summary);
    }
    if set.is_empty() {
        return Err(TrellisError::Validation(
            "Nothing to update: send status and/or summary".into(),
        ));
    }

    let streams = mongo.collection::<StreamDoc>(STREAM_COLLECTION).await?;
    let filter = doc! { "venture_id": id, "category": category.as_str() };
    let result = streams.update_one(filter.clone(), doc! { "$set": set }).await?;
    if result.matched_count == 0 {
        return Err(TrellisError::NotFound(format!(
            "No {} stream for this venture",
            category
        )));
    }

    let stream = streams
        .find_one(filter)
        .await?
        .ok_or_else(|| TrellisError::NotFound(format!("No {} stream for this venture", category)))?;

    Ok(data_response(StatusCode::OK, &StreamResponse::from_doc(&stream)))
}

// ============================================================================
// Milestones
// ============================================================================

async fn list_milestones(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let id = parse_object_id(raw_id)?;
    let mongo = state.store()?;
    fetch_visible_venture(mongo, &actor, id).await?;

    let milestones = mongo.collection::<MilestoneDoc>(MILESTONE_COLLECTION).await?;
    let docs = milestones
        .find_many(
            doc! { "venture_id": id },
            FindOpts::sorted(doc! { "sequence": 1 }),
        )
        .await?;

    let items: Vec<MilestoneResponse> = docs.iter().map(MilestoneResponse::from_doc).collect();
    Ok(data_response(StatusCode::OK, &items))
}

async fn regenerate_milestones(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let id = parse_object_id(raw_id)?;
    let mongo = state.store()?;
    let venture = fetch_visible_venture(mongo, &actor, id).await?;

    if !access::can_regenerate_roadmap(actor.role, &venture.scope()) {
        return Err(TrellisError::Forbidden(
            "Roadmap regeneration is a committee action once screening has begun".into(),
        ));
    }

    // Replace wholesale. The generator is deterministic, so a retry after
    // a partial failure converges on the same set.
    let milestones = mongo.collection::<MilestoneDoc>(MILESTONE_COLLECTION).await?;
    milestones.delete_many(doc! { "venture_id": id }).await?;
    milestones.insert_many(build_milestones(id, &venture)).await?;

    let docs = milestones
        .find_many(
            doc! { "venture_id": id },
            FindOpts::sorted(doc! { "sequence": 1 }),
        )
        .await?;

    info!(venture = %id, count = docs.len(), "Roadmap regenerated");

    let items: Vec<MilestoneResponse> = docs.iter().map(MilestoneResponse::from_doc).collect();
    Ok(data_response(StatusCode::OK, &items))
}

/// Completion ticking opens once the agreement is out.
fn milestones_open(status: VentureStatus) -> bool {
    matches!(
        status,
        VentureStatus::AgreementSent | VentureStatus::ContractSent | VentureStatus::Signed
    )
}

#[derive(Debug, Deserialize)]
struct UpdateMilestoneRequest {
    completed: bool,
}

async fn update_milestone(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
    raw_mid: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let id = parse_object_id(raw_id)?;
    let mid = parse_object_id(raw_mid)?;
    let body: UpdateMilestoneRequest = parse_json_body(req).await?;

    let mongo = state.store()?;
    let venture = fetch_visible_venture(mongo, &actor, id).await?;

    if !access::can_update_workbench(actor.role, &actor.profile_id, &venture.scope()) {
        return Err(TrellisError::Forbidden(
            "The workbench is not open to you at this stage".into(),
        ));
    }
    if venture.workbench_locked {
        return Err(TrellisError::Conflict(
            "The workbench is locked while the contract is out for signature".into(),
        ));
    }
    if !milestones_open(venture.status) {
        return Err(TrellisError::Conflict(
            "Milestones open for updates once the agreement is sent".into(),
        ));
    }

    let milestones = mongo.collection::<MilestoneDoc>(MILESTONE_COLLECTION).await?;
    let result = milestones
        .update_one(
            doc! { "_id": mid, "venture_id": id },
            doc! { "$set": { "completed": body.completed } },
        )
        .await?;
    if result.matched_count == 0 {
        return Err(TrellisError::NotFound(
            "Milestone not found for this venture".into(),
        ));
    }

    let milestone = milestones
        .find_one(doc! { "_id": mid })
        .await?
        .ok_or_else(|| TrellisError::NotFound("Milestone not found for this venture".into()))?;

    Ok(data_response(
        StatusCode::OK,
        &MilestoneResponse::from_doc(&milestone),
    ))
}

// ============================================================================
// Support hours
// ============================================================================

async fn list_support_hours(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let id = parse_object_id(raw_id)?;
    let mongo = state.store()?;
    fetch_visible_venture(mongo, &actor, id).await?;

    let coll = mongo
        .collection::<SupportHoursDoc>(SUPPORT_HOURS_COLLECTION)
        .await?;
    let docs = coll
        .find_many(
            doc! { "venture_id": id },
            FindOpts::sorted(doc! { "metadata.created_at": -1 }),
        )
        .await?;

    let total_hours = docs.iter().map(|e| e.hours).sum();
    let entries = docs.iter().map(SupportHoursEntryResponse::from_doc).collect();

    Ok(data_response(
        StatusCode::OK,
        &SupportHoursListResponse {
            entries,
            total_hours,
        },
    ))
}

#[derive(Debug, Deserialize)]
struct RecordSupportHoursRequest {
    hours: f64,
    #[serde(default)]
    category: Option<StreamCategory>,
    #[serde(default)]
    note: Option<String>,
}

async fn record_support_hours(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    if !access::can_record_support_hours(actor.role) {
        return Err(TrellisError::Forbidden(
            "Support hours are recorded by staff roles".into(),
        ));
    }

    let id = parse_object_id(raw_id)?;
    let body: RecordSupportHoursRequest = parse_json_body(req).await?;

    if !body.hours.is_finite() || body.hours <= 0.0 || body.hours > 24.0 {
        return Err(TrellisError::Validation(
            "hours must be greater than 0 and at most 24".into(),
        ));
    }

    let mongo = state.store()?;
    fetch_visible_venture(mongo, &actor, id).await?;

    let mut entry = SupportHoursDoc::new(
        id,
        actor.profile_id,
        body.hours,
        body.category,
        body.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
    );

    let coll = mongo
        .collection::<SupportHoursDoc>(SUPPORT_HOURS_COLLECTION)
        .await?;
    let entry_id = coll.insert_one(entry.clone()).await?;
    entry._id = Some(entry_id);

    Ok(data_response(
        StatusCode::CREATED,
        &SupportHoursEntryResponse::from_doc(&entry),
    ))
}

// ============================================================================
// History
// ============================================================================

async fn list_history(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let id = parse_object_id(raw_id)?;
    let mongo = state.store()?;
    fetch_visible_venture(mongo, &actor, id).await?;

    let coll = mongo.collection::<HistoryDoc>(HISTORY_COLLECTION).await?;
    let docs = coll
        .find_many(
            doc! { "venture_id": id },
            FindOpts::sorted(doc! { "metadata.created_at": 1 }),
        )
        .await?;

    let items: Vec<HistoryEntryResponse> = docs.iter().map(HistoryEntryResponse::from_doc).collect();
    Ok(data_response(StatusCode::OK, &items))
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Route venture API requests. Returns None for paths outside
/// `/api/ventures`.
pub async fn handle_ventures_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    if path != "/api/ventures" && !path.starts_with("/api/ventures/") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight(&state.args.frontend_origin));
    }

    let method = req.method().clone();
    let dev_mode = state.args.dev_mode;

    let tail = path.strip_prefix("/api/ventures").unwrap_or("").to_string();
    let segments: Vec<&str> = tail.split('/').filter(|s| !s.is_empty()).collect();

    let result = match (method, segments.as_slice()) {
        (Method::GET, []) => list_ventures(req, state).await,
        (Method::POST, []) => create_venture(req, state).await,

        (Method::GET, [id]) => get_venture(req, state, id).await,
        (Method::PATCH, [id]) => update_venture(req, state, id).await,
        (Method::DELETE, [id]) => delete_venture(req, state, id).await,

        (Method::GET, [id, "streams"]) => list_streams(req, state, id).await,
        (Method::PATCH, [id, "streams", category]) => {
            update_stream(req, state, id, category).await
        }

        (Method::GET, [id, "milestones"]) => list_milestones(req, state, id).await,
        (Method::POST, [id, "milestones", "regenerate"]) => {
            regenerate_milestones(req, state, id).await
        }
        (Method::PATCH, [id, "milestones", mid]) => update_milestone(req, state, id, mid).await,

        (Method::GET, [id, "interactions"]) => {
            interactions::list_for_venture(req, state, id).await
        }
        (Method::POST, [id, "interactions"]) => {
            interactions::create_for_venture(req, state, id).await
        }

        (Method::GET, [id, "support-hours"]) => list_support_hours(req, state, id).await,
        (Method::POST, [id, "support-hours"]) => record_support_hours(req, state, id).await,

        (Method::GET, [id, "history"]) => list_history(req, state, id).await,

        (_, [])
        | (_, [_])
        | (_, [_, "streams"])
        | (_, [_, "streams", _])
        | (_, [_, "milestones"])
        | (_, [_, "milestones", _])
        | (_, [_, "interactions"])
        | (_, [_, "support-hours"])
        | (_, [_, "history"]) => Ok(method_not_allowed(&path)),

        _ => Ok(not_found(&path)),
    };

    Some(result.unwrap_or_else(|err| error_response(&err, dev_mode)))
}
