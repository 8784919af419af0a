use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use log::info;
use serde::{Deserialize, Serialize};

use crate::cli::*;
use crate::error::{Error, Result};

static CONF_DIR: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
    ProjectDirs::from("", "memesearch", "memesearch").map(|dirs| dirs.config_dir().to_path_buf())
});

/// 默认配置文件路径
pub fn default_config_file() -> Option<PathBuf> {
    CONF_DIR.as_ref().map(|dir| dir.join("config.json"))
}

#[derive(Parser, Debug, Clone)]
#[command(name = "memesearch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 配置文件路径，不指定时读取用户配置目录下的 config.json
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Opts {
    /// 读取配置文件
    ///
    /// 显式指定的配置文件必须存在；未指定且默认配置文件也不存在时使用默认配置
    pub fn load_config(&self) -> Result<Config> {
        if let Some(path) = &self.config {
            return Config::from_file(path);
        }
        match default_config_file() {
            Some(path) if path.is_file() => Config::from_file(path),
            _ => {
                info!("未找到配置文件，使用默认配置");
                Ok(Config::default())
            }
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 扫描目录中的图片，识别文字并构建索引
    Index(IndexCommand),
    /// 使用文字搜索图片
    Search(SearchCommand),
    /// 显示一条图片记录
    Show(ShowCommand),
    /// 启动 HTTP 搜索服务
    Server(ServerCommand),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 图片元数据库
    pub database_file: PathBuf,
    /// 图片向量索引
    pub image_index_file: PathBuf,
    /// 文字向量索引
    pub text_index_file: PathBuf,
    /// 向量模型名称
    pub embedding_model: String,
    pub search_params: SearchParams,
    pub server: ServerConfig,
    pub ocr: OcrConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_file: PathBuf::from("meme_metadata.db"),
            image_index_file: PathBuf::from("image_embeddings.index"),
            text_index_file: PathBuf::from("text_embeddings.index"),
            embedding_model: "clip-ViT-B-32".to_string(),
            search_params: SearchParams::default(),
            server: ServerConfig::default(),
            ocr: OcrConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("无法读取配置文件 {}: {e}", path.display())))?;
        let config = Self::from_json(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        info!("已加载配置文件: {}", path.display());
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| Error::Config(format!("格式错误: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let params = &self.search_params;
        if params.k_keyword == 0 || params.k_vector == 0 || params.max_results == 0 {
            return Err(Error::Config(
                "k_keyword、k_vector 和 max_results 必须大于 0".to_string(),
            ));
        }
        if !params.rrf_k.is_finite() || params.rrf_k <= 0.0 {
            return Err(Error::Config(format!("rrf_k 必须为正数: {}", params.rrf_k)));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(Error::Config("embedding_model 不能为空".to_string()));
        }
        Ok(())
    }
}

/// 检索参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// 关键词检索返回的数量
    pub k_keyword: usize,
    /// 每个向量索引返回的数量
    pub k_vector: usize,
    /// 融合后返回的最大结果数量
    pub max_results: usize,
    /// RRF 平滑常数
    pub rrf_k: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self { k_keyword: 50, k_vector: 50, max_results: 20, rrf_k: 60.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 5000 }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// tesseract 参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// tesseract 可执行文件
    pub command: String,
    /// 识别语言，例如 `eng`、`chi_sim`
    pub languages: Vec<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self { command: "tesseract".to_string(), languages: vec!["eng".to_string()] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config = Config::from_json(
            r#"{
                "database_file": "a.db",
                "search_params": { "max_results": 5, "rrf_k": 10 },
                "server": { "port": 8080 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.database_file, PathBuf::from("a.db"));
        assert_eq!(config.image_index_file, PathBuf::from("image_embeddings.index"));
        assert_eq!(config.search_params.max_results, 5);
        assert_eq!(config.search_params.k_keyword, 50);
        assert_eq!(config.search_params.rrf_k, 10.0);
        assert_eq!(config.server.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(Config::from_json("{"), Err(Error::Config(_))));
        assert!(matches!(
            Config::from_json(r#"{ "search_params": { "max_results": 0 } }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{ "search_params": { "rrf_k": -1 } }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{ "embedding_model": " " }"#),
            Err(Error::Config(_))
        ));
    }
}
