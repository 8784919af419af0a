use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use fastembed::{
    EmbeddingModel, ImageEmbedding, ImageEmbeddingModel, ImageInitOptions, InitOptions,
    TextEmbedding,
};
use log::info;

use super::Embedder;
use crate::error::{Error, Result};

/// CLIP 模型，图片和文字共用同一个向量空间
pub struct ClipEmbedder {
    text: TextEmbedding,
    image: ImageEmbedding,
    dimension: usize,
}

impl ClipEmbedder {
    pub fn load(model: &str) -> Result<Self> {
        let (text_model, image_model) = match model {
            "clip-ViT-B-32" | "Qdrant/clip-ViT-B-32-text" | "Qdrant/clip-ViT-B-32-vision" => {
                (EmbeddingModel::ClipVitB32, ImageEmbeddingModel::ClipVitB32)
            }
            _ => return Err(Error::ResourceLoad(format!("不支持的向量模型: {model}"))),
        };
        let cache_dir = model_cache_dir();

        info!("加载向量模型 {model}，缓存目录: {}", cache_dir.display());
        let text = TextEmbedding::try_new(
            InitOptions::new(text_model)
                .with_cache_dir(cache_dir.clone())
                .with_show_download_progress(true),
        )
        .map_err(|e| Error::ResourceLoad(format!("文字模型加载失败: {e}")))?;
        let image = ImageEmbedding::try_new(
            ImageInitOptions::new(image_model)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(true),
        )
        .map_err(|e| Error::ResourceLoad(format!("图片模型加载失败: {e}")))?;

        // 通过一次实际计算确定向量维度
        let dimension = text
            .embed(vec!["Determine embedding dimension"], None)
            .map_err(|e| Error::ResourceLoad(format!("无法确定向量维度: {e}")))?
            .first()
            .map(Vec::len)
            .filter(|&dim| dim > 0)
            .ok_or_else(|| Error::ResourceLoad("无法确定向量维度".to_string()))?;
        info!("向量维度: {dimension}");

        Ok(Self { text, image, dimension })
    }
}

impl Embedder for ClipEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.text
            .embed(vec![text], None)
            .map_err(|e| Error::Embedding(e.to_string()))?
            .pop()
            .ok_or_else(|| Error::Embedding("模型没有返回结果".to_string()))
    }

    fn embed_image(&self, path: &Path) -> Result<Vec<f32>> {
        self.image
            .embed(vec![path], None)
            .map_err(|e| Error::Embedding(format!("{}: {e}", path.display())))?
            .pop()
            .ok_or_else(|| Error::Embedding("模型没有返回结果".to_string()))
    }
}

fn model_cache_dir() -> PathBuf {
    ProjectDirs::from("", "memesearch", "memesearch")
        .map(|dirs| dirs.cache_dir().join("models"))
        .unwrap_or_else(|| PathBuf::from(".fastembed_cache"))
}
