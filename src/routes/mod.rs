use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod draw;
pub mod health;
pub mod roster;
pub mod settings;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(draw::router())
        .merge(roster::router())
        .merge(settings::router())
        .merge(docs::router());

    api_router.with_state(state)
}
