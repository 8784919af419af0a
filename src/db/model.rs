use serde::Serialize;
use sqlx::FromRow;

/// 图片记录
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct ImageRecord {
    /// 图片 ID，同时也是向量索引中的 ID
    pub id: i64,
    /// 图片路径
    #[serde(rename = "image_path")]
    pub path: String,
    /// 图片中识别出的文字，可能为空
    pub ocr_text: String,
}
