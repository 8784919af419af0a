mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::state::*;
use crate::search::{SearchHit, SearchResponse};

#[derive(OpenApi)]
#[openapi(
    paths(api::search_handler, api::image_handler),
    components(schemas(SearchResponse, SearchHit, types::ErrorResponse))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::index_handler))
        .route("/search", get(api::search_handler))
        .route("/images/{id}", get(api::image_handler))
        .route("/metrics", get(api::metrics_handler))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // 只有 GET 请求，限制请求体大小：64K
        .layer(RequestBodyLimitLayer::new(1024 * 64))
        .with_state(state)
}
