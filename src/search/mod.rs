//! 混合检索：关键词检索 + 图片向量检索 + 文字向量检索，通过 RRF 融合排序

mod engine;
mod fusion;

use serde::Serialize;
use utoipa::ToSchema;

pub use engine::SearchEngine;
pub use fusion::{FusedCandidate, reciprocal_rank_fusion};

/// 单条搜索结果
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SearchHit {
    /// 图片 ID
    pub id: i64,
    /// 图片路径
    pub image_path: String,
    /// 图片中识别出的文字
    pub ocr_text: String,
    /// RRF 融合分数
    pub score: f64,
}

/// 搜索响应
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchResponse {
    /// 查询文本
    pub query: String,
    /// 结果数量
    pub results_count: usize,
    /// 按分数从高到低排列的结果
    pub results: Vec<SearchHit>,
}
