use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;
use log::info;
use tokio::task::block_in_place;

use crate::builder::{DEFAULT_SUFFIX, IndexBuilder};
use crate::cli::SubCommandExtend;
use crate::config::{Config, Opts};
use crate::db::MetaDB;
use crate::embed::{TesseractOcr, load_embedder};

#[derive(Parser, Debug, Clone)]
pub struct IndexCommand {
    /// 图片目录
    pub dir: PathBuf,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = DEFAULT_SUFFIX)]
    pub suffix: String,
    /// 保留已有索引中的向量，只追加本次新增的图片
    #[arg(long)]
    pub merge: bool,
    /// 覆盖配置中的数据库路径
    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,
    /// 覆盖配置中的图片向量索引路径
    #[arg(long, value_name = "FILE")]
    pub image_index: Option<PathBuf>,
    /// 覆盖配置中的文字向量索引路径
    #[arg(long, value_name = "FILE")]
    pub text_index: Option<PathBuf>,
}

impl IndexCommand {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(db) = &self.db {
            config.database_file = db.clone();
        }
        if let Some(path) = &self.image_index {
            config.image_index_file = path.clone();
        }
        if let Some(path) = &self.text_index {
            config.text_index_file = path.clone();
        }
        config
    }
}

impl SubCommandExtend for IndexCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let config = self.apply(opts.load_config()?);

        // 在加载模型之前检查目录，避免无谓的等待
        if !self.dir.is_dir() {
            bail!("目录不存在: {}", self.dir.display());
        }

        let db = MetaDB::open(&config.database_file).await?;
        let embedder = block_in_place(|| load_embedder(&config.embedding_model))?;
        let ocr = Arc::new(TesseractOcr::new(&config.ocr));

        let stats = IndexBuilder::new(
            db.clone(),
            ocr,
            embedder,
            &config.image_index_file,
            &config.text_index_file,
        )
        .suffix(&self.suffix)
        .merge(self.merge)
        .build(&self.dir)
        .await?;

        info!("数据库中共有 {} 张图片", db.count().await?);
        db.close().await;

        println!("{}", serde_json::to_string_pretty(&stats)?);
        Ok(())
    }
}
