use anyhow::Result;
use clap::{Parser, ValueEnum};
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::embed::load_embedder;
use crate::error::Error;
use crate::search::{SearchEngine, SearchResponse};

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    /// 查询文本
    pub query: String,
    /// 覆盖配置中的最大结果数量
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub count: Option<usize>,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        // 空查询不需要加载任何资源
        if self.query.trim().is_empty() {
            return Err(Error::EmptyQuery.into());
        }

        let mut config = opts.load_config()?;
        if let Some(count) = self.count {
            config.search_params.max_results = count;
        }
        config.validate()?;

        let embedder = block_in_place(|| load_embedder(&config.embedding_model))?;
        let engine = SearchEngine::load(&config, embedder).await?;
        let response = engine.search(&self.query).await?;
        engine.close().await;

        print_result(&response, self)
    }
}

fn print_result(response: &SearchResponse, opts: &SearchCommand) -> Result<()> {
    match opts.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(response)?)
        }
        OutputFormat::Table => {
            for hit in &response.results {
                println!("{:.4}\t{}\t{}", hit.score, hit.id, hit.image_path);
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}
