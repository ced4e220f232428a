use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::Method,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use tribune_core::{
    BulkCoordinator, CoreError, DeliveryLedger, NewDirectMessage, PresenceTracker,
    TemplateCatalog, ValidationWorkflow,
};
use tribune_shared::{
    ConversationId, MessageId, PendingFilter, PendingMessageId, PendingSort, Priority, TemplateId,
    TemplateSort,
};

use crate::config::ServerConfig;
use crate::dto::{
    pending_ids, AuditDto, BulkReportDto, BulkValidateRequest, CategoryDto, CreatePendingRequest,
    CreateTemplateRequest, MessageDto, PendingDto, ReactionRequest, ReactionToggleDto, RenderDto,
    RenderRequest, ResolutionDto, SendMessageRequest, SendTemplateRequest, StatusRequest,
    TemplateDto, TypingDto, TypingRequest, UpdateTemplateRequest, ValidateRequest,
};
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<TemplateCatalog>,
    pub workflow: Arc<ValidationWorkflow>,
    pub bulk: Arc<BulkCoordinator>,
    pub ledger: Arc<DeliveryLedger>,
    pub presence: Arc<PresenceTracker>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/templates", post(create_template).get(list_templates))
        .route("/templates/categories", get(template_categories))
        .route(
            "/templates/:id",
            get(get_template)
                .patch(update_template)
                .delete(delete_template),
        )
        .route("/templates/:id/render", post(render_template))
        .route("/templates/:id/send", post(send_template))
        .route("/pending", post(create_pending).get(list_pending))
        .route("/pending/validate-bulk", post(validate_bulk))
        .route("/pending/:id/validate", post(validate_pending))
        .route("/pending/:id/audit", get(pending_audit))
        .route("/messages", post(send_message).get(list_messages))
        .route("/messages/:id/status", post(update_status))
        .route("/messages/:id/reactions", post(toggle_reaction))
        .route(
            "/conversations/:id/typing",
            put(set_typing).get(get_typing),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    storage: &'static str,
    bulk_concurrency: usize,
    typing_ttl_secs: u64,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        storage: if state.config.in_memory() {
            "memory"
        } else {
            "sqlite"
        },
        bulk_concurrency: state.config.bulk_concurrency,
        typing_ttl_secs: state.config.typing_ttl_secs,
    })
}

// ---------------------------------------------------------------------------
// Template catalog
// ---------------------------------------------------------------------------

async fn create_template(
    State(state): State<AppState>,
    Json(req): Json<CreateTemplateRequest>,
) -> Result<Json<TemplateDto>, ApiError> {
    let (actor, new) = req.split();
    let template = state.catalog.create(new, actor)?;
    Ok(Json(template.into()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTemplatesQuery {
    category: Option<String>,
    q: Option<String>,
    #[serde(default)]
    active_only: bool,
    #[serde(default)]
    sort: TemplateSort,
}

async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<ListTemplatesQuery>,
) -> Result<Json<Vec<TemplateDto>>, ApiError> {
    let filter = tribune_shared::TemplateFilter {
        category: query.category,
        query: query.q,
        active_only: query.active_only,
    };
    let templates = state.catalog.list(&filter, query.sort)?;
    Ok(Json(templates.into_iter().map(TemplateDto::from).collect()))
}

async fn template_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryDto>>, ApiError> {
    let categories = state
        .catalog
        .categories()?
        .into_iter()
        .map(|(name, count)| CategoryDto { name, count })
        .collect();
    Ok(Json(categories))
}

async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TemplateDto>, ApiError> {
    let template = state.catalog.get(TemplateId(id))?;
    Ok(Json(template.into()))
}

async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTemplateRequest>,
) -> Result<Json<TemplateDto>, ApiError> {
    let id = TemplateId(id);
    let has_field_changes = req.has_field_changes();
    let (update, active) = req.split();
    if !has_field_changes && active.is_none() {
        return Err(ApiError::BadRequest("no fields to update".to_string()));
    }

    let mut template = if has_field_changes {
        state.catalog.update(id, update).await?
    } else {
        state.catalog.get(id)?
    };
    if let Some(active) = active {
        template = state.catalog.set_active(id, active).await?;
    }
    Ok(Json(template.into()))
}

async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.catalog.remove(TemplateId(id))?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn render_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenderRequest>,
) -> Result<Json<RenderDto>, ApiError> {
    let outcome = state.catalog.render(TemplateId(id), &req.bindings)?;
    Ok(Json(outcome.into()))
}

/// The "use template" flow: render, publish to the ledger, bump usage.
async fn send_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SendTemplateRequest>,
) -> Result<Json<MessageDto>, ApiError> {
    let id = TemplateId(id);
    let outcome = state.catalog.render(id, &req.bindings)?;
    if !outcome.is_complete() {
        return Err(CoreError::Validation(format!(
            "missing required variables: {}",
            outcome.missing_variables.join(", ")
        ))
        .into());
    }

    let message = state.ledger.send_direct(NewDirectMessage {
        sender: req.actor,
        content: outcome.text,
        kind: None,
        template_id: Some(id),
        reply_to: req.reply_to.map(MessageId),
    })?;

    // The message is already on the ledger; a failed usage bump must not
    // turn the send into an error.
    if let Err(e) = state.catalog.record_use(id).await {
        warn!(template_id = %id, error = %e, "failed to record template use");
    }

    Ok(Json(message.into()))
}

// ---------------------------------------------------------------------------
// Moderation queue
// ---------------------------------------------------------------------------

async fn create_pending(
    State(state): State<AppState>,
    Json(req): Json<CreatePendingRequest>,
) -> Result<Json<PendingDto>, ApiError> {
    let pending = state.workflow.create_pending(req.into())?;
    Ok(Json(pending.into()))
}

#[derive(Deserialize)]
struct ListPendingQuery {
    priority: Option<Priority>,
    #[serde(default)]
    sort: PendingSort,
}

async fn list_pending(
    State(state): State<AppState>,
    Query(query): Query<ListPendingQuery>,
) -> Result<Json<Vec<PendingDto>>, ApiError> {
    let filter = PendingFilter {
        priority: query.priority,
    };
    let pending = state.workflow.list_pending(&filter, query.sort)?;
    Ok(Json(pending.into_iter().map(PendingDto::from).collect()))
}

async fn validate_pending(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ResolutionDto>, ApiError> {
    let resolution = state
        .workflow
        .validate(PendingMessageId(id), req.action, &req.actor)
        .await?;
    Ok(Json(resolution.into()))
}

async fn validate_bulk(
    State(state): State<AppState>,
    Json(req): Json<BulkValidateRequest>,
) -> Json<BulkReportDto> {
    let report = state
        .bulk
        .validate_batch(&pending_ids(req.ids), &req.action, &req.actor)
        .await;
    Json(report.into())
}

async fn pending_audit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AuditDto>>, ApiError> {
    let records = state.workflow.audit_for(PendingMessageId(id))?;
    Ok(Json(records.into_iter().map(AuditDto::from).collect()))
}

// ---------------------------------------------------------------------------
// Delivery ledger
// ---------------------------------------------------------------------------

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<MessageDto>, ApiError> {
    let message = state.ledger.send_direct(req.into())?;
    Ok(Json(message.into()))
}

#[derive(Deserialize)]
struct ListMessagesQuery {
    limit: Option<u32>,
    offset: Option<u32>,
}

async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let limit = query.limit.unwrap_or(50).min(200);
    let offset = query.offset.unwrap_or(0);
    let messages = state.ledger.list(limit, offset)?;
    Ok(Json(messages.into_iter().map(MessageDto::from).collect()))
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<MessageDto>, ApiError> {
    let message = state.ledger.advance_status(MessageId(id), req.status).await?;
    Ok(Json(message.into()))
}

async fn toggle_reaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReactionRequest>,
) -> Result<Json<ReactionToggleDto>, ApiError> {
    let id = MessageId(id);
    let added = state.ledger.toggle_reaction(id, &req.actor, &req.emoji).await?;
    let message = state.ledger.get(id)?;
    Ok(Json(ReactionToggleDto {
        added,
        reactions: MessageDto::from(message).reactions,
    }))
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

async fn set_typing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TypingRequest>,
) -> Json<serde_json::Value> {
    state
        .presence
        .set_typing(&ConversationId::new(id), &req.actor, req.typing)
        .await;
    Json(serde_json::json!({ "updated": true }))
}

async fn get_typing(State(state): State<AppState>, Path(id): Path<String>) -> Json<TypingDto> {
    let users = state
        .presence
        .typing_users(&ConversationId::new(id))
        .await
        .into_iter()
        .map(|u| u.0)
        .collect();
    Json(TypingDto { users })
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
