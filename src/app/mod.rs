//! HTTP surface of the blog flow, served by `blogflow-app`.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::formats::{BlogContent, Outline, TopicIdea};
use crate::generation::{
    BlogContentGenerationParams, Customization, ElaborateRequest, ElaborateResponse,
    GenerationError, Generator, OutlineGenerationParams, TopicGenerationParams,
};
use crate::outline::{MissingTarget, OutlineEdit, OutlineEditError, ensure_section_ids};
use crate::state_store::{FlowState, FlowStep, StateStore};

#[derive(Clone)]
pub struct AppState {
    pub generator: Generator,
    pub state_store: Arc<dyn StateStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/api/blog-flow/topic", post(generate_topics))
        .route(
            "/api/blog-flow/outline",
            post(generate_outline)
                .put(customize_outline)
                .patch(edit_outline),
        )
        .route("/api/blog-flow/content", post(generate_content))
        .route("/api/blog-flow/elaborate", post(elaborate))
        .route("/api/flow-state", get(load_flow_state).put(save_flow_state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    InvalidRequest(String),
    Validation { message: String, errors: Vec<String> },
    Collaborator(String),
    NotFound(String),
    Internal(anyhow::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            Self::InvalidRequest(message) => (StatusCode::BAD_REQUEST, message, Vec::new()),
            Self::Validation { message, errors } => {
                (StatusCode::UNPROCESSABLE_ENTITY, message, errors)
            }
            Self::Collaborator(message) => (StatusCode::BAD_GATEWAY, message, Vec::new()),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message, Vec::new()),
            Self::Internal(err) => {
                tracing::error!(error = %format!("{err:#}"), "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_owned(),
                    Vec::new(),
                )
            }
        };
        (status, Json(ErrorBody { error, details })).into_response()
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::InvalidRequest(message) => Self::InvalidRequest(message),
            GenerationError::Collaborator(message) => Self::Collaborator(message),
            GenerationError::Validation { message, errors } => Self::Validation { message, errors },
        }
    }
}

impl From<OutlineEditError> for ApiError {
    fn from(err: OutlineEditError) -> Self {
        match err {
            OutlineEditError::DuplicateId(_) => Self::InvalidRequest(err.to_string()),
            OutlineEditError::SectionNotFound(_) | OutlineEditError::ParentNotFound(_) => {
                Self::NotFound(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct TopicsResponse {
    pub topics: Vec<TopicIdea>,
}

async fn generate_topics(
    State(state): State<AppState>,
    body: Result<Json<TopicGenerationParams>, JsonRejection>,
) -> ApiResult<TopicsResponse> {
    let Json(params) = body?;
    let topics = state.generator.generate_topics(&params).await?;
    Ok(Json(TopicsResponse { topics }))
}

async fn generate_outline(
    State(state): State<AppState>,
    body: Result<Json<OutlineGenerationParams>, JsonRejection>,
) -> ApiResult<Outline> {
    let Json(params) = body?;
    let outline = state.generator.generate_outline(&params).await?;
    state.state_store.save_outline(&outline).await?;
    state
        .state_store
        .save_flow(&FlowState {
            current_step: FlowStep::Outline,
            selected_topic: Some(params.selected_topic),
        })
        .await?;
    Ok(Json(outline))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomizeRequest {
    pub outline: Outline,
    pub customization: Customization,
}

async fn customize_outline(
    State(state): State<AppState>,
    body: Result<Json<CustomizeRequest>, JsonRejection>,
) -> ApiResult<Outline> {
    let Json(request) = body?;
    let outline = state
        .generator
        .customize_outline(&request.outline, &request.customization)
        .await?;
    state.state_store.save_outline(&outline).await?;
    Ok(Json(outline))
}

/// Applies one structured edit to the stored outline. Unknown section or parent ids are a 404,
/// an edit that would repeat an id is a 400. Added sections without an id get a fresh one.
async fn edit_outline(
    State(state): State<AppState>,
    body: Result<Json<OutlineEdit>, JsonRejection>,
) -> ApiResult<Outline> {
    let Json(mut edit) = body?;
    if let OutlineEdit::Add { section, .. } = &mut edit
        && let Some(filled) = ensure_section_ids(std::slice::from_ref(section)).pop()
    {
        *section = filled;
    }
    let Some(outline) = state.state_store.load_outline().await? else {
        return Err(ApiError::NotFound("no outline has been generated yet".to_owned()));
    };
    outline.check_target(&edit)?;
    let edited = outline.apply(&edit, MissingTarget::Report)?;
    edited.check_unique_ids()?;
    state.state_store.save_outline(&edited).await?;
    Ok(Json(edited))
}

async fn generate_content(
    State(state): State<AppState>,
    body: Result<Json<BlogContentGenerationParams>, JsonRejection>,
) -> ApiResult<BlogContent> {
    let Json(params) = body?;
    let content = state.generator.generate_content(&params).await?;
    state.state_store.save_content(&content).await?;
    let mut flow = state.state_store.load_flow().await?.unwrap_or_default();
    flow.current_step = FlowStep::Content;
    state.state_store.save_flow(&flow).await?;
    Ok(Json(content))
}

async fn elaborate(
    State(state): State<AppState>,
    body: Result<Json<ElaborateRequest>, JsonRejection>,
) -> ApiResult<ElaborateResponse> {
    let Json(request) = body?;
    Ok(Json(state.generator.elaborate(&request).await?))
}

async fn load_flow_state(State(state): State<AppState>) -> ApiResult<FlowState> {
    Ok(Json(state.state_store.load_flow().await?.unwrap_or_default()))
}

async fn save_flow_state(
    State(state): State<AppState>,
    body: Result<Json<FlowState>, JsonRejection>,
) -> ApiResult<FlowState> {
    let Json(flow) = body?;
    state.state_store.save_flow(&flow).await?;
    Ok(Json(flow))
}
