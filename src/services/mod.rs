/// OpenAPI documentation generation.
pub mod documentation;
/// Operator controls and read models of the draw session.
pub mod draw_service;
/// Session driver executing queued state effects.
pub mod driver;
/// Health check service.
pub mod health_service;
/// Prize and winner selection, animation start and commit of one draw.
pub mod orchestrator;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
