use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// 搜索请求参数
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// 查询文本
    #[serde(default)]
    pub q: String,
}

/// 错误响应
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// 错误信息
    pub error: String,
}
