use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::roster::{
        FreezeRequest, HistoryEntryResponse, ParticipantSummary, PrizeListResponse, PrizeSummary,
        ReservationRequest,
    },
    error::AppError,
    services::draw_service,
    state::SharedState,
};

/// Participants, prizes, reservations and history.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/participants", get(list_participants))
        .route("/participants/{id}/freeze", post(freeze_participant))
        .route("/prizes", get(list_prizes))
        .route("/prizes/{id}/freeze", post(freeze_prize))
        .route(
            "/reservations/{prize_id}",
            put(reserve).delete(clear_reservation),
        )
        .route("/history", get(list_history))
}

/// Participants in load order.
#[utoipa::path(
    get,
    path = "/participants",
    tag = "roster",
    responses((status = 200, description = "Participants", body = [ParticipantSummary]))
)]
pub async fn list_participants(State(state): State<SharedState>) -> Json<Vec<ParticipantSummary>> {
    Json(draw_service::participants(&state).await)
}

/// Pin a participant out of random selection, or release them.
#[utoipa::path(
    post,
    path = "/participants/{id}/freeze",
    tag = "roster",
    params(("id" = Uuid, Path, description = "Participant identifier")),
    request_body = FreezeRequest,
    responses(
        (status = 200, description = "Participant updated", body = ParticipantSummary),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn freeze_participant(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FreezeRequest>,
) -> Result<Json<ParticipantSummary>, AppError> {
    let participant = draw_service::set_participant_frozen(&state, id, payload.frozen).await?;
    Ok(Json(participant))
}

/// Pending and awarded prizes.
#[utoipa::path(
    get,
    path = "/prizes",
    tag = "roster",
    responses((status = 200, description = "Prizes", body = PrizeListResponse))
)]
pub async fn list_prizes(State(state): State<SharedState>) -> Json<PrizeListResponse> {
    Json(draw_service::prizes(&state).await)
}

/// Skip a pending prize, or put it back in line.
#[utoipa::path(
    post,
    path = "/prizes/{id}/freeze",
    tag = "roster",
    params(("id" = Uuid, Path, description = "Prize identifier")),
    request_body = FreezeRequest,
    responses(
        (status = 200, description = "Prize updated", body = PrizeSummary),
        (status = 404, description = "Prize is not pending")
    )
)]
pub async fn freeze_prize(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FreezeRequest>,
) -> Result<Json<PrizeSummary>, AppError> {
    let prize = draw_service::set_prize_frozen(&state, id, payload.frozen).await?;
    Ok(Json(prize))
}

/// Reserve a participant for the next draw of a prize.
#[utoipa::path(
    put,
    path = "/reservations/{prize_id}",
    tag = "roster",
    params(("prize_id" = Uuid, Path, description = "Pending prize identifier")),
    request_body = ReservationRequest,
    responses(
        (status = 204, description = "Reservation stored"),
        (status = 400, description = "Participant already left the draw"),
        (status = 404, description = "Unknown prize or participant")
    )
)]
pub async fn reserve(
    State(state): State<SharedState>,
    Path(prize_id): Path<Uuid>,
    Json(payload): Json<ReservationRequest>,
) -> Result<StatusCode, AppError> {
    draw_service::reserve(&state, prize_id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Drop the reservation of a prize.
#[utoipa::path(
    delete,
    path = "/reservations/{prize_id}",
    tag = "roster",
    params(("prize_id" = Uuid, Path, description = "Prize identifier")),
    responses(
        (status = 204, description = "Reservation cleared"),
        (status = 404, description = "No reservation for this prize")
    )
)]
pub async fn clear_reservation(
    State(state): State<SharedState>,
    Path(prize_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    draw_service::clear_reservation(&state, prize_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Draw history, newest first.
#[utoipa::path(
    get,
    path = "/history",
    tag = "roster",
    responses(
        (status = 200, description = "History entries", body = [HistoryEntryResponse]),
        (status = 503, description = "History store unavailable")
    )
)]
pub async fn list_history(
    State(state): State<SharedState>,
) -> Result<Json<Vec<HistoryEntryResponse>>, AppError> {
    Ok(Json(draw_service::history(&state).await?))
}
