use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;

use super::types::ErrorResponse;
use crate::error::Error;

/// API错误类型
pub struct AppError(pub Error);

pub type Result<T, E = AppError> = std::result::Result<T, E>;

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0 {
            Error::EmptyQuery => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("请求处理失败: {}", self.0);
        }
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
