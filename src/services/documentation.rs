use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the raffle wheel backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::event_stream,
        crate::routes::draw::load_data,
        crate::routes::draw::start,
        crate::routes::draw::start_auto_now,
        crate::routes::draw::trigger_spin,
        crate::routes::draw::toggle_pause,
        crate::routes::draw::toggle_configuring,
        crate::routes::draw::confirm_present,
        crate::routes::draw::mark_absent,
        crate::routes::draw::reset,
        crate::routes::draw::handle_input,
        crate::routes::draw::draw_state,
        crate::routes::draw::frame_snapshot,
        crate::routes::roster::list_participants,
        crate::routes::roster::freeze_participant,
        crate::routes::roster::list_prizes,
        crate::routes::roster::freeze_prize,
        crate::routes::roster::reserve,
        crate::routes::roster::clear_reservation,
        crate::routes::roster::list_history,
        crate::routes::settings::get_config,
        crate::routes::settings::update_config,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::sse::Handshake,
            crate::dto::events::DrawEvent,
            crate::dto::events::SpinStartedPayload,
            crate::dto::phase::VisibleDrawState,
            crate::state::state_machine::OperatingMode,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "draw", description = "Session controls and draw state"),
        (name = "roster", description = "Participants, prizes, reservations and history"),
        (name = "config", description = "Live configuration"),
    )
)]
pub struct ApiDoc;

/// The OpenAPI document stamped with this build's package name and version.
pub fn document() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_the_draw_routes() {
        let doc = document();
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));
        assert!(doc.paths.paths.contains_key("/draw/spin"));
        assert!(doc.paths.paths.contains_key("/reservations/{prize_id}"));
        assert!(doc.paths.paths.contains_key("/sse/events"));
    }
}
