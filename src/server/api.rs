use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use log::warn;
use prometheus::{Encoder, TextEncoder};

use super::error::Result;
use super::state::AppState;
use super::types::*;
use crate::error::Error;
use crate::search::SearchResponse;

const INDEX_HTML: &str = include_str!("index.html");

/// 使用文字搜索图片
#[utoipa::path(
    get,
    path = "/search",
    params(SearchQuery),
    responses(
        (status = 200, body = SearchResponse),
        (status = 400, description = "查询文本为空", body = ErrorResponse),
        (status = 500, description = "查询向量计算失败", body = ErrorResponse),
    )
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let response = state.engine.search(&query.q).await?;
    Ok(Json(response))
}

/// 获取图片文件
#[utoipa::path(
    get,
    path = "/images/{id}",
    params(("id" = i64, Path, description = "图片 ID")),
    responses(
        (status = 200, description = "图片的原始内容"),
        (status = 404, description = "找不到图片", body = ErrorResponse),
    )
)]
pub async fn image_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response> {
    let record = state.engine.get(id).await?;
    let data = tokio::fs::read(&record.path).await.map_err(|e| {
        warn!("读取图片失败 {}: {e}", record.path);
        Error::NotFound(id)
    })?;
    Ok(([(header::CONTENT_TYPE, content_type(&record.path))], data).into_response())
}

/// 搜索页面
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// prometheus 指标
pub async fn metrics_handler() -> Result<String> {
    let mut buffer = vec![];
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| Error::SearchBackend(e.to_string()))?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn content_type(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
