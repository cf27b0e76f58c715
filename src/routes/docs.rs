use axum::Router;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation, state::SharedState};

/// Where the OpenAPI document is served.
pub const OPENAPI_PATH: &str = "/api-doc/openapi.json";

/// Swagger UI under `/docs`, backed by the document at [`OPENAPI_PATH`].
pub fn router() -> Router<SharedState> {
    SwaggerUi::new("/docs")
        .url(OPENAPI_PATH, documentation::document())
        .into()
}
