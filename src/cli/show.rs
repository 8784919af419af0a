use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::db::MetaDB;

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// 图片 ID
    pub id: i64,
}

impl SubCommandExtend for ShowCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let config = opts.load_config()?;
        let db = MetaDB::open_existing(&config.database_file).await?;
        let record = db.get(self.id).await;
        db.close().await;

        println!("{}", serde_json::to_string_pretty(&record?)?);
        Ok(())
    }
}
