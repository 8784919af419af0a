#![allow(dead_code)]

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use memesearch::builder::IndexBuilder;
use memesearch::config::{Config, SearchParams};
use memesearch::db::MetaDB;
use memesearch::embed::{Embedder, Ocr};
use memesearch::index::FlatIndex;
use memesearch::{Error, Result, SearchEngine};
use tempfile::TempDir;

pub const DIM: usize = 8;

/// 根据字符串生成确定的向量，相同的字符串得到相同的向量
pub fn vector_of(s: &str) -> Vec<f32> {
    let mut state = s.bytes().fold(0xcbf29ce484222325u64, |h, b| {
        (h ^ b as u64).wrapping_mul(0x100000001b3)
    });
    (0..DIM)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
        })
        .collect()
}

/// 图片向量来自文件名（不含后缀），文字向量来自文字本身
///
/// 文件名为 `panic` 的图片会让模型 panic
#[derive(Default)]
pub struct MockEmbedder {
    pub fail_images: HashSet<String>,
    pub fail_texts: HashSet<String>,
    pub text_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn fail_image(mut self, stem: &str) -> Self {
        self.fail_images.insert(stem.to_string());
        self
    }

    pub fn fail_text(mut self, text: &str) -> Self {
        self.fail_texts.insert(text.to_string());
        self
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }
}

impl Embedder for MockEmbedder {
    fn dimension(&self) -> usize {
        DIM
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_texts.contains(text) {
            return Err(Error::Embedding(format!("mock failure: {text}")));
        }
        Ok(vector_of(text))
    }

    fn embed_image(&self, path: &Path) -> Result<Vec<f32>> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        let stem = path.file_stem().unwrap().to_string_lossy().to_string();
        if stem == "panic" {
            panic!("mock panic");
        }
        if self.fail_images.contains(&stem) {
            return Err(Error::Embedding(format!("mock failure: {stem}")));
        }
        Ok(vector_of(&stem))
    }
}

/// 直接把文件内容当作识别结果，内容为 `FAIL` 时识别失败
pub struct MockOcr;

impl Ocr for MockOcr {
    fn extract_text(&self, path: &Path) -> Result<String> {
        let text = fs::read_to_string(path)?;
        let text = text.trim();
        if text == "FAIL" {
            return Err(Error::OcrExtraction(format!("mock failure: {}", path.display())));
        }
        Ok(text.to_string())
    }
}

/// 测试用的工作目录
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    pub fn images(&self) -> PathBuf {
        self.dir.path().join("images")
    }

    pub fn db_file(&self) -> PathBuf {
        self.dir.path().join("meta.db")
    }

    pub fn image_index(&self) -> PathBuf {
        self.dir.path().join("image.index")
    }

    pub fn text_index(&self) -> PathBuf {
        self.dir.path().join("text.index")
    }

    /// 写入一张“图片”，内容即为 OCR 结果
    pub fn add_image(&self, name: &str, text: &str) -> PathBuf {
        self.add_image_in("images", name, text)
    }

    pub fn add_image_in(&self, sub: &str, name: &str, text: &str) -> PathBuf {
        let dir = self.dir.path().join(sub);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    pub async fn open_db(&self) -> MetaDB {
        MetaDB::open(self.db_file()).await.unwrap()
    }

    pub fn builder(&self, db: MetaDB, embedder: Arc<MockEmbedder>) -> IndexBuilder {
        IndexBuilder::new(db, Arc::new(MockOcr), embedder, self.image_index(), self.text_index())
    }

    /// 指向工作目录中数据库和索引的配置
    pub fn config(&self) -> Config {
        Config {
            database_file: self.db_file(),
            image_index_file: self.image_index(),
            text_index_file: self.text_index(),
            ..Default::default()
        }
    }

    pub fn load_index(&self, path: &Path) -> Option<FlatIndex> {
        FlatIndex::load(path).ok()
    }

    pub fn engine(&self, db: MetaDB, embedder: Arc<MockEmbedder>, params: SearchParams) -> SearchEngine {
        SearchEngine::new(
            db,
            embedder,
            self.load_index(&self.image_index()),
            self.load_index(&self.text_index()),
            params,
        )
    }
}
