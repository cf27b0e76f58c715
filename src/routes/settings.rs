use axum::{Json, Router, extract::State, routing::get};
use validator::Validate;

use crate::{
    dto::settings::{ConfigResponse, ConfigUpdateRequest},
    error::AppError,
    services::draw_service,
    state::SharedState,
};

/// Live configuration endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/config", get(get_config).put(update_config))
}

/// Current configuration.
#[utoipa::path(
    get,
    path = "/config",
    tag = "config",
    responses((status = 200, description = "Configuration", body = ConfigResponse))
)]
pub async fn get_config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    Json(draw_service::get_config(&state).await)
}

/// Update and persist the configuration. Omitted fields keep their value.
#[utoipa::path(
    put,
    path = "/config",
    tag = "config",
    request_body = ConfigUpdateRequest,
    responses(
        (status = 200, description = "Configuration updated", body = ConfigResponse),
        (status = 400, description = "Out of range values"),
        (status = 500, description = "Configuration could not be written")
    )
)]
pub async fn update_config(
    State(state): State<SharedState>,
    Json(payload): Json<ConfigUpdateRequest>,
) -> Result<Json<ConfigResponse>, AppError> {
    payload.validate()?;
    Ok(Json(draw_service::update_config(&state, payload).await?))
}
