//! 外部能力：OCR 与向量模型
//!
//! 索引构建和搜索只依赖这里的两个 trait，具体实现可以替换。

#[cfg(feature = "clip")]
mod clip;
mod tesseract;

use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "clip")]
pub use clip::ClipEmbedder;
pub use tesseract::TesseractOcr;

use crate::error::Result;

/// 将图片和文字映射到同一个向量空间
///
/// 同一个实例返回的向量维度必须一致，都等于 [`Embedder::dimension`]
pub trait Embedder: Send + Sync {
    /// 向量维度
    fn dimension(&self) -> usize;

    fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_image(&self, path: &Path) -> Result<Vec<f32>>;
}

/// 从图片中提取文字
pub trait Ocr: Send + Sync {
    fn extract_text(&self, path: &Path) -> Result<String>;
}

/// 根据模型名称加载向量模型
#[cfg(feature = "clip")]
pub fn load_embedder(model: &str) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(ClipEmbedder::load(model)?))
}

#[cfg(not(feature = "clip"))]
pub fn load_embedder(model: &str) -> Result<Arc<dyn Embedder>> {
    Err(crate::error::Error::ResourceLoad(format!(
        "未启用 clip 特性，无法加载向量模型: {model}"
    )))
}
