use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::ProgressBar;
use log::{debug, info, warn};
use regex::Regex;
use serde::Serialize;
use tokio::task::spawn_blocking;

use crate::db::MetaDB;
use crate::embed::{Embedder, Ocr};
use crate::error::{Error, Result};
use crate::index::FlatIndex;
use crate::metrics;
use crate::utils::{pb_style, scan_images, suffix_regex};

pub const DEFAULT_SUFFIX: &str = "png,jpg,jpeg,bmp,gif,webp";

/// 索引构建结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// 成功计算向量的图片数量
    pub processed_count: usize,
    /// 已存在、处理失败或没有图片向量的图片数量
    pub skipped_count: usize,
}

/// 位置对齐的图片向量和文字向量
///
/// 第 i 个图片向量和第 i 个文字向量都属于 `ids[i]`
#[derive(Debug, Default)]
pub struct EmbeddingBatch {
    pub ids: Vec<i64>,
    pub image_vectors: Vec<Vec<f32>>,
    pub text_vectors: Vec<Vec<f32>>,
}

impl EmbeddingBatch {
    pub fn push(&mut self, id: i64, image_vector: Vec<f32>, text_vector: Vec<f32>) {
        self.ids.push(id);
        self.image_vectors.push(image_vector);
        self.text_vectors.push(text_vector);
    }

    pub fn extend(&mut self, other: EmbeddingBatch) {
        self.ids.extend(other.ids);
        self.image_vectors.extend(other.image_vectors);
        self.text_vectors.extend(other.text_vectors);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

enum FileOutcome {
    /// 已写入数据库并加入向量批次
    Embedded,
    /// 路径已存在
    Duplicate,
    /// 已写入数据库，但图片向量计算失败
    NoVectors,
}

/// 扫描图片目录，写入数据库并重建两个向量索引
pub struct IndexBuilder {
    db: MetaDB,
    ocr: Arc<dyn Ocr>,
    embedder: Arc<dyn Embedder>,
    image_index: PathBuf,
    text_index: PathBuf,
    regex_suf: Regex,
    merge: bool,
}

impl IndexBuilder {
    pub fn new(
        db: MetaDB,
        ocr: Arc<dyn Ocr>,
        embedder: Arc<dyn Embedder>,
        image_index: impl Into<PathBuf>,
        text_index: impl Into<PathBuf>,
    ) -> Self {
        Self {
            db,
            ocr,
            embedder,
            image_index: image_index.into(),
            text_index: text_index.into(),
            regex_suf: suffix_regex(DEFAULT_SUFFIX),
            merge: false,
        }
    }

    /// 扫描的文件后缀名，多个后缀用逗号分隔
    pub fn suffix(mut self, suffix: &str) -> Self {
        self.regex_suf = suffix_regex(suffix);
        self
    }

    /// 是否保留已有索引中的向量
    pub fn merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    /// 处理目录中的所有图片，单张图片的失败不会中断整个过程
    pub async fn build(&self, dir: impl AsRef<Path>) -> Result<BuildStats> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::ResourceLoad(format!("目录不存在: {}", dir.display())));
        }

        info!("开始扫描目录: {}", dir.display());
        let files = scan_images(dir, &self.regex_suf);
        info!("扫描完成，共 {} 张图片", files.len());

        let pb = ProgressBar::new(files.len() as u64).with_style(pb_style());
        let mut batch = EmbeddingBatch::default();
        let mut stats = BuildStats::default();

        for path in files {
            // 路径是数据库中的唯一键，也用于重新打开图片，必须能无损还原
            let Some(path_str) = path.to_str().map(str::to_owned) else {
                warn!("跳过非 UTF-8 路径: {}", path.display());
                stats.skipped_count += 1;
                metrics::inc_index_file("invalid_path");
                pb.inc(1);
                continue;
            };
            let outcome = self.process_file(&path, &path_str, &mut batch).await;
            let label = match outcome {
                Ok(FileOutcome::Embedded) => {
                    stats.processed_count += 1;
                    pb.set_message(path_str);
                    "embedded"
                }
                Ok(FileOutcome::Duplicate) => {
                    stats.skipped_count += 1;
                    pb.set_message(format!("跳过已添加图片: {path_str}"));
                    "duplicate"
                }
                Ok(FileOutcome::NoVectors) => {
                    stats.skipped_count += 1;
                    "no_vectors"
                }
                Err(e) => {
                    stats.skipped_count += 1;
                    warn!("处理图片失败 {path_str}: {e}");
                    "failed"
                }
            };
            metrics::inc_index_file(label);
            pb.inc(1);
        }

        pb.finish_with_message("图片处理完成");
        info!("成功: {}，跳过: {}", stats.processed_count, stats.skipped_count);

        if let Err(e) = self.write_indices(batch) {
            warn!("索引写入失败，原有索引保持不变: {e}");
            return Err(e);
        }

        Ok(stats)
    }

    async fn process_file(
        &self,
        path: &Path,
        path_str: &str,
        batch: &mut EmbeddingBatch,
    ) -> Result<FileOutcome> {
        if self.db.contains_path(path_str).await? {
            debug!("跳过已添加图片: {path_str}");
            return Ok(FileOutcome::Duplicate);
        }

        let ocr_text = match self.extract_text(path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{path_str}: {e}，使用空文本");
                String::new()
            }
        };

        // 这里仍可能出现重复，例如同一路径被其他进程添加
        let id = match self.db.insert(path_str, &ocr_text).await {
            Ok(id) => id,
            Err(Error::DuplicateRecord(_)) => {
                debug!("跳过已添加图片: {path_str}");
                return Ok(FileOutcome::Duplicate);
            }
            Err(e) => return Err(e),
        };

        let image_vector = match self.embed_image(path).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("{path_str}: {e}，该图片不会出现在向量检索中");
                return Ok(FileOutcome::NoVectors);
            }
        };

        // 文字向量失败时使用零向量占位，保持两个批次的位置对齐
        let text_vector = match self.embed_text(ocr_text).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("{path_str}: {e}，使用零向量代替文字向量");
                vec![0.0; self.embedder.dimension()]
            }
        };

        batch.push(id, image_vector, text_vector);
        Ok(FileOutcome::Embedded)
    }

    async fn extract_text(&self, path: &Path) -> Result<String> {
        let ocr = self.ocr.clone();
        let path = path.to_path_buf();
        spawn_blocking(move || ocr.extract_text(&path))
            .await
            .unwrap_or_else(|e| Err(Error::OcrExtraction(e.to_string())))
    }

    async fn embed_image(&self, path: &Path) -> Result<Vec<f32>> {
        let embedder = self.embedder.clone();
        let path = path.to_path_buf();
        let vector = spawn_blocking(move || embedder.embed_image(&path))
            .await
            .unwrap_or_else(|e| Err(Error::Embedding(e.to_string())))?;
        self.check_dimension(vector)
    }

    async fn embed_text(&self, text: String) -> Result<Vec<f32>> {
        let embedder = self.embedder.clone();
        let vector = spawn_blocking(move || embedder.embed_text(&text))
            .await
            .unwrap_or_else(|e| Err(Error::Embedding(e.to_string())))?;
        self.check_dimension(vector)
    }

    fn check_dimension(&self, vector: Vec<f32>) -> Result<Vec<f32>> {
        let dim = self.embedder.dimension();
        if vector.len() != dim {
            return Err(Error::Embedding(format!("向量维度为 {}，应为 {dim}", vector.len())));
        }
        Ok(vector)
    }

    /// 用整个批次重建两个索引，两个批次都校验通过后才写入文件
    fn write_indices(&self, batch: EmbeddingBatch) -> Result<()> {
        if batch.is_empty() {
            info!("没有新的向量，跳过索引构建");
            return Ok(());
        }

        let batch = if self.merge { self.merge_existing(batch) } else { batch };
        let dim = self.embedder.dimension();

        info!("构建向量索引，共 {} 条向量", batch.len());
        let image_index = FlatIndex::from_batch(dim, &batch.ids, &batch.image_vectors)?;
        let text_index = FlatIndex::from_batch(dim, &batch.ids, &batch.text_vectors)?;

        // 两个临时文件都写入成功后才替换，保证磁盘上的两个索引始终对齐
        let image_tmp = image_index.write_tmp(&self.image_index)?;
        let text_tmp = match text_index.write_tmp(&self.text_index) {
            Ok(tmp) => tmp,
            Err(e) => {
                let _ = fs::remove_file(&image_tmp);
                return Err(e);
            }
        };
        if let Err(e) = FlatIndex::commit(&image_tmp, &self.image_index) {
            let _ = fs::remove_file(&image_tmp);
            let _ = fs::remove_file(&text_tmp);
            return Err(e);
        }
        FlatIndex::commit(&text_tmp, &self.text_index)?;

        info!("构建索引成功");
        Ok(())
    }

    /// 将已有索引中的向量放到本次批次之前
    fn merge_existing(&self, batch: EmbeddingBatch) -> EmbeddingBatch {
        let (image_index, text_index) =
            match (FlatIndex::load(&self.image_index), FlatIndex::load(&self.text_index)) {
                (Ok(image), Ok(text)) => (image, text),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("无法读取已有索引，只使用本次的向量: {e}");
                    return batch;
                }
            };

        let dim = self.embedder.dimension();
        if image_index.dim() != dim || text_index.dim() != dim {
            warn!("已有索引的维度与当前模型不一致，只使用本次的向量");
            return batch;
        }
        if image_index.ids() != text_index.ids() {
            warn!("已有的两个索引没有对齐，只使用本次的向量");
            return batch;
        }

        let new_ids = batch.ids.iter().copied().collect::<HashSet<_>>();
        let mut merged = EmbeddingBatch::default();
        for ((id, image_vector), (_, text_vector)) in image_index.entries().zip(text_index.entries())
        {
            if !new_ids.contains(&id) {
                merged.push(id, image_vector.to_vec(), text_vector.to_vec());
            }
        }
        info!("合并已有索引中的 {} 条向量", merged.len());

        merged.extend(batch);
        merged
    }
}
