use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::draw::{
        ActionResponse, DrawStateResponse, FrameSnapshotResponse, InputRequest, LoadDataRequest,
        StartRequest,
    },
    error::AppError,
    services::draw_service,
    state::SharedState,
};

/// Session control and draw state endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/draw/data", post(load_data))
        .route("/draw/start", post(start))
        .route("/draw/auto-now", post(start_auto_now))
        .route("/draw/spin", post(trigger_spin))
        .route("/draw/pause", post(toggle_pause))
        .route("/draw/configure", post(toggle_configuring))
        .route("/draw/celebration/present", post(confirm_present))
        .route("/draw/celebration/absent", post(mark_absent))
        .route("/draw/reset", post(reset))
        .route("/draw/input", post(handle_input))
        .route("/draw/state", get(draw_state))
        .route("/draw/frame", get(frame_snapshot))
}

/// Load prizes and participants into the session.
#[utoipa::path(
    post,
    path = "/draw/data",
    tag = "draw",
    request_body = LoadDataRequest,
    responses(
        (status = 200, description = "Data loaded", body = DrawStateResponse),
        (status = 400, description = "Empty or invalid names"),
        (status = 409, description = "Session is not idle or configuring")
    )
)]
pub async fn load_data(
    State(state): State<SharedState>,
    Json(payload): Json<LoadDataRequest>,
) -> Result<Json<DrawStateResponse>, AppError> {
    payload.validate()?;
    Ok(Json(draw_service::load_data(&state, payload).await?))
}

/// Operate in the requested mode.
#[utoipa::path(
    post,
    path = "/draw/start",
    tag = "draw",
    request_body = StartRequest,
    responses((status = 200, description = "Request processed", body = ActionResponse))
)]
pub async fn start(
    State(state): State<SharedState>,
    Json(payload): Json<StartRequest>,
) -> Json<ActionResponse> {
    Json(draw_service::start(&state, payload.mode))
}

/// Switch to auto mode and spin immediately.
#[utoipa::path(
    post,
    path = "/draw/auto-now",
    tag = "draw",
    responses((status = 200, description = "Request processed", body = ActionResponse))
)]
pub async fn start_auto_now(State(state): State<SharedState>) -> Json<ActionResponse> {
    Json(draw_service::start_auto_now(&state))
}

/// Spin now.
#[utoipa::path(
    post,
    path = "/draw/spin",
    tag = "draw",
    responses((status = 200, description = "Request processed", body = ActionResponse))
)]
pub async fn trigger_spin(State(state): State<SharedState>) -> Json<ActionResponse> {
    Json(draw_service::trigger_spin(&state))
}

/// Pause or resume.
#[utoipa::path(
    post,
    path = "/draw/pause",
    tag = "draw",
    responses((status = 200, description = "Request processed", body = ActionResponse))
)]
pub async fn toggle_pause(State(state): State<SharedState>) -> Json<ActionResponse> {
    Json(draw_service::toggle_pause(&state))
}

/// Open or close the configuration screen.
#[utoipa::path(
    post,
    path = "/draw/configure",
    tag = "draw",
    responses((status = 200, description = "Request processed", body = ActionResponse))
)]
pub async fn toggle_configuring(State(state): State<SharedState>) -> Json<ActionResponse> {
    Json(draw_service::toggle_configuring(&state))
}

/// Confirm the presented winner is present.
#[utoipa::path(
    post,
    path = "/draw/celebration/present",
    tag = "draw",
    responses((status = 200, description = "Request processed", body = ActionResponse))
)]
pub async fn confirm_present(State(state): State<SharedState>) -> Json<ActionResponse> {
    Json(draw_service::confirm_present(&state).await)
}

/// Mark the presented winner absent and put the prize back.
#[utoipa::path(
    post,
    path = "/draw/celebration/absent",
    tag = "draw",
    responses((status = 200, description = "Request processed", body = ActionResponse))
)]
pub async fn mark_absent(State(state): State<SharedState>) -> Json<ActionResponse> {
    Json(draw_service::mark_absent(&state).await)
}

/// Drop all data and return to idle.
#[utoipa::path(
    post,
    path = "/draw/reset",
    tag = "draw",
    responses((status = 200, description = "Session reset", body = DrawStateResponse))
)]
pub async fn reset(State(state): State<SharedState>) -> Json<DrawStateResponse> {
    Json(draw_service::reset(&state).await)
}

/// Forward a keyboard shortcut.
#[utoipa::path(
    post,
    path = "/draw/input",
    tag = "draw",
    request_body = InputRequest,
    responses((status = 200, description = "Request processed", body = ActionResponse))
)]
pub async fn handle_input(
    State(state): State<SharedState>,
    Json(payload): Json<InputRequest>,
) -> Json<ActionResponse> {
    Json(draw_service::handle_input(&state, payload))
}

/// Current state of the session.
#[utoipa::path(
    get,
    path = "/draw/state",
    tag = "draw",
    responses((status = 200, description = "Session state", body = DrawStateResponse))
)]
pub async fn draw_state(State(state): State<SharedState>) -> Json<DrawStateResponse> {
    Json(draw_service::describe(&state).await)
}

/// Last rendered animation frame.
#[utoipa::path(
    get,
    path = "/draw/frame",
    tag = "draw",
    responses((status = 200, description = "Frame snapshot", body = FrameSnapshotResponse))
)]
pub async fn frame_snapshot(State(state): State<SharedState>) -> Json<FrameSnapshotResponse> {
    Json(draw_service::frame_snapshot(&state))
}
