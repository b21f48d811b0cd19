//! Interaction log endpoints.
//!
//! Listing and creation hang off the venture (`/api/ventures/:id/interactions`)
//! and are dispatched from the ventures family; edits and deletes address
//! the entry directly at `/api/interactions/:id`.

use bson::{doc, Document};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{authenticate, Identity};
use crate::db::schemas::{InteractionDoc, InteractionKind, INTERACTION_COLLECTION};
use crate::db::FindOpts;
use crate::domain::access;
use crate::routes::respond::{
    cors_preflight, data_response, error_response, method_not_allowed, not_found,
    parse_json_body, rfc3339, BoxBody,
};
use crate::routes::ventures::{fetch_visible_venture, parse_object_id};
use crate::server::AppState;
use crate::types::{Result, TrellisError};

#[derive(Debug, Serialize)]
pub struct InteractionResponse {
    pub id: String,
    pub venture_id: String,
    pub author_id: String,
    pub kind: InteractionKind,
    pub body: String,
    pub occurred_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl InteractionResponse {
    fn from_doc(entry: &InteractionDoc) -> Self {
        Self {
            id: entry._id.map(|id| id.to_hex()).unwrap_or_default(),
            venture_id: entry.venture_id.to_hex(),
            author_id: entry.author_id.to_hex(),
            kind: entry.kind,
            body: entry.body.clone(),
            occurred_at: rfc3339(entry.occurred_at),
            created_at: entry.metadata.created_at.map(rfc3339),
        }
    }
}

// ============================================================================
// Venture-scoped: list and create
// ============================================================================

pub(crate) async fn list_for_venture(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let id = parse_object_id(raw_id)?;
    let mongo = state.store()?;
    fetch_visible_venture(mongo, &actor, id).await?;

    let coll = mongo
        .collection::<InteractionDoc>(INTERACTION_COLLECTION)
        .await?;
    let docs = coll
        .find_many(
            doc! { "venture_id": id },
            FindOpts::sorted(doc! { "occurred_at": -1 }),
        )
        .await?;

    let items: Vec<InteractionResponse> = docs.iter().map(InteractionResponse::from_doc).collect();
    Ok(data_response(StatusCode::OK, &items))
}

#[derive(Debug, Deserialize)]
struct CreateInteractionRequest {
    #[serde(default)]
    kind: InteractionKind,
    body: String,
    /// Defaults to now when omitted
    #[serde(default)]
    occurred_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub(crate) async fn create_for_venture(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let id = parse_object_id(raw_id)?;
    let body: CreateInteractionRequest = parse_json_body(req).await?;

    let text = body.body.trim().to_string();
    if text.is_empty() {
        return Err(TrellisError::Validation(
            "Interaction body cannot be empty".into(),
        ));
    }

    let mongo = state.store()?;
    fetch_visible_venture(mongo, &actor, id).await?;

    let mut entry = InteractionDoc::new(
        id,
        actor.profile_id,
        body.kind,
        text,
        body.occurred_at.map(bson::DateTime::from_chrono),
    );

    let coll = mongo
        .collection::<InteractionDoc>(INTERACTION_COLLECTION)
        .await?;
    let entry_id = coll.insert_one(entry.clone()).await?;
    entry._id = Some(entry_id);

    Ok(data_response(
        StatusCode::CREATED,
        &InteractionResponse::from_doc(&entry),
    ))
}

// ============================================================================
// Entry-scoped: update and delete
// ============================================================================

#[derive(Debug, Deserialize)]
struct UpdateInteractionRequest {
    kind: Option<InteractionKind>,
    body: Option<String>,
    occurred_at: Option<chrono::DateTime<chrono::Utc>>,
}

async fn load_editable(
    state: &AppState,
    actor: &Identity,
    raw_id: &str,
) -> Result<(bson::oid::ObjectId, InteractionDoc)> {
    let id = parse_object_id(raw_id)?;
    let coll = state
        .store()?
        .collection::<InteractionDoc>(INTERACTION_COLLECTION)
        .await?;
    let entry = coll
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| TrellisError::NotFound("Interaction not found".into()))?;

    if !access::can_edit_interaction(actor.role, &actor.profile_id, &entry.author_id) {
        return Err(TrellisError::Forbidden(
            "Only the author or an admin may change an interaction".into(),
        ));
    }
    Ok((id, entry))
}

async fn update_interaction(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let body: UpdateInteractionRequest = parse_json_body(req).await?;
    let (id, _) = load_editable(&state, &actor, raw_id).await?;

    let mut set = Document::new();
    if let Some(kind) = body.kind {
        set.insert("kind", kind.as_str());
    }
    if let Some(text) = body.body {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(TrellisError::Validation(
                "Interaction body cannot be empty".into(),
            ));
        }
        set.insert("body", text);
    }
    if let Some(at) = body.occurred_at {
        set.insert("occurred_at", bson::DateTime::from_chrono(at));
    }
    if set.is_empty() {
        return Err(TrellisError::Validation("Nothing to update".into()));
    }

    let coll = state
        .store()?
        .collection::<InteractionDoc>(INTERACTION_COLLECTION)
        .await?;
    coll.update_one(doc! { "_id": id }, doc! { "$set": set }).await?;

    let entry = coll
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| TrellisError::NotFound("Interaction not found".into()))?;

    Ok(data_response(
        StatusCode::OK,
        &InteractionResponse::from_doc(&entry),
    ))
}

async fn delete_interaction(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let actor = authenticate(&req, &state).await?;
    let (id, _) = load_editable(&state, &actor, raw_id).await?;

    let coll = state
        .store()?
        .collection::<InteractionDoc>(INTERACTION_COLLECTION)
        .await?;
    coll.soft_delete(doc! { "_id": id }).await?;

    Ok(data_response(
        StatusCode::OK,
        &serde_json::json!({ "deleted": true }),
    ))
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Route entry-scoped interaction requests. Returns None for paths outside
/// `/api/interactions/`.
pub async fn handle_interactions_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    if !path.starts_with("/api/interactions/") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight(&state.args.frontend_origin));
    }

    let method = req.method().clone();
    let dev_mode = state.args.dev_mode;

    let raw_id = path
        .strip_prefix("/api/interactions/")
        .unwrap_or("")
        .to_string();
    if raw_id.is_empty() || raw_id.contains('/') {
        return Some(not_found(&path));
    }

    let result = match method {
        Method::PATCH => update_interaction(req, state, &raw_id).await,
        Method::DELETE => delete_interaction(req, state, &raw_id).await,
        _ => return Some(method_not_allowed(&path)),
    };

    Some(result.unwrap_or_else(|err| error_response(&err, dev_mode)))
}
