// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP API and SSE room streams.
//!
//! Every route resolves the caller's bearer credential through the
//! `AuthGate` before invoking the controller. Responses carry the updated
//! project snapshot or a typed error payload.

use std::pin::Pin;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{sse::{Event, KeepAlive, Sse}, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::application::LifecycleController;
use crate::domain::auth::{AuthGate, Identity};
use crate::domain::project::{BidId, LifecycleError, ProjectId, ProjectStatus, UserId};
use crate::domain::repository::ProjectFilter;
use crate::infrastructure::rooms::RoomError;

pub struct AppState {
    pub lifecycle: Arc<LifecycleController>,
    pub auth: Arc<dyn AuthGate>,
}

pub fn app(lifecycle: Arc<LifecycleController>, auth: Arc<dyn AuthGate>) -> Router {
    let state = Arc::new(AppState { lifecycle, auth });

    Router::new()
        .route("/api/v1/projects", post(create_project).get(list_projects))
        .route(
            "/api/v1/projects/{id}",
            get(get_project).delete(delete_project),
        )
        .route("/api/v1/projects/{id}/cancel", post(cancel_project))
        .route("/api/v1/projects/{id}/status", post(update_status))
        .route("/api/v1/projects/{id}/complete", post(complete_project))
        .route("/api/v1/projects/{id}/bids", post(submit_bid))
        .route("/api/v1/projects/{id}/bids/{bid_id}/accept", post(accept_bid))
        .route("/api/v1/projects/{id}/bids/{bid_id}/reject", post(reject_bid))
        .route(
            "/api/v1/projects/{id}/bids/{bid_id}/counter-offer",
            post(counter_offer),
        )
        .route("/api/v1/projects/{id}/events", get(stream_events))
        .route("/health", get(|| async { Json(json!({"status": "ok"})) }))
        .with_state(state)
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unauthenticated() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "missing or malformed bearer credential".to_string(),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        let status = match err {
            LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
            LifecycleError::Unauthorized(_) => StatusCode::FORBIDDEN,
            LifecycleError::InvalidState(_) => StatusCode::CONFLICT,
            LifecycleError::Conflict(_) => StatusCode::CONFLICT,
            LifecycleError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LifecycleError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let credential = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(ApiError::unauthenticated)?;
    Ok(state.auth.resolve(credential).await?)
}

#[derive(Deserialize)]
struct ListQuery {
    status: Option<ProjectStatus>,
    client_id: Option<Uuid>,
    freelancer_id: Option<Uuid>,
}

#[derive(Deserialize)]
struct SubmitBidRequest {
    amount: f64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct CounterOfferRequest {
    amount: f64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct UpdateStatusRequest {
    status: ProjectStatus,
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(draft): Json<crate::domain::project::ProjectDraft>,
) -> Result<Response, ApiError> {
    let identity = authenticate(&state, &headers).await?;
    let project = state.lifecycle.create_project(identity, draft).await?;
    Ok((StatusCode::CREATED, Json(project)).into_response())
}

async fn list_projects(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authenticate(&state, &headers).await?;
    let filter = ProjectFilter {
        status: query.status,
        client_id: query.client_id.map(UserId),
        freelancer_id: query.freelancer_id.map(UserId),
    };
    let projects = state.lifecycle.list_projects(filter).await?;
    Ok(Json(projects))
}

async fn get_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    authenticate(&state, &headers).await?;
    let project = state.lifecycle.get_project(ProjectId(id)).await?;
    Ok(Json(project))
}

async fn delete_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = authenticate(&state, &headers).await?;
    state.lifecycle.delete_project(identity, ProjectId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn cancel_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = authenticate(&state, &headers).await?;
    let project = state.lifecycle.cancel_project(identity, ProjectId(id)).await?;
    Ok(Json(project))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = authenticate(&state, &headers).await?;
    let project = state
        .lifecycle
        .update_status(identity, ProjectId(id), body.status)
        .await?;
    Ok(Json(project))
}

async fn complete_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = authenticate(&state, &headers).await?;
    let project = state.lifecycle.complete_project(identity, ProjectId(id)).await?;
    Ok(Json(project))
}

async fn submit_bid(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitBidRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = authenticate(&state, &headers).await?;
    let project = state
        .lifecycle
        .submit_bid(identity, ProjectId(id), body.amount, body.message)
        .await?;
    Ok(Json(project))
}

async fn accept_bid(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, bid_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = authenticate(&state, &headers).await?;
    let project = state
        .lifecycle
        .accept_bid(identity, ProjectId(id), BidId(bid_id))
        .await?;
    Ok(Json(project))
}

async fn reject_bid(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, bid_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = authenticate(&state, &headers).await?;
    let project = state
        .lifecycle
        .reject_bid(identity, ProjectId(id), BidId(bid_id))
        .await?;
    Ok(Json(project))
}

async fn counter_offer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, bid_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<CounterOfferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = authenticate(&state, &headers).await?;
    let project = state
        .lifecycle
        .counter_offer(identity, ProjectId(id), BidId(bid_id), body.amount, body.message)
        .await?;
    Ok(Json(project))
}

/// Join the project's room and stream its events until the observer
/// disconnects. Disconnecting drops the subscription, which leaves the room.
async fn stream_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    authenticate(&state, &headers).await?;
    let project_id = ProjectId(id);
    // Reject streams for projects that do not exist.
    state.lifecycle.get_project(project_id).await?;

    let subscription = state.lifecycle.rooms().join(project_id);
    let stream: Pin<Box<dyn Stream<Item = Result<Event, axum::Error>> + Send>> =
        Box::pin(futures::stream::unfold(subscription, |mut sub| async move {
            loop {
                match sub.recv().await {
                    Ok(event) => {
                        let data = serde_json::to_string(&event).unwrap_or_default();
                        return Some((Ok(Event::default().data(data)), sub));
                    }
                    // Dropped events are gone; keep streaming what's next.
                    Err(RoomError::Lagged(_)) => continue,
                    Err(_) => return None,
                }
            }
        }));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
