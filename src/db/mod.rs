use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};
use sqlx::{SqlitePool, sqlite::*};

pub mod crud;
pub mod model;

pub use model::*;

use crate::error::{Error, Result};

pub type Database = SqlitePool;

pub async fn init_db(filename: impl AsRef<Path>, create: bool) -> Result<Database, sqlx::Error> {
    let filename = filename.as_ref();
    info!("初始化数据库连接: {}", filename.display());

    let options = SqliteConnectOptions::new()
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .filename(filename)
        .create_if_missing(create);

    let pool = SqlitePool::connect_with(options).await?;

    info!("检查数据库迁移");
    sqlx::migrate!().run(&pool).await?;

    Ok(pool)
}

/// 图片元数据库，包含图片表和 OCR 文字的全文索引
#[derive(Clone)]
pub struct MetaDB {
    pool: Database,
}

impl MetaDB {
    /// 打开数据库，不存在时创建
    pub async fn open(filename: impl AsRef<Path>) -> Result<Self> {
        let pool = init_db(filename, true).await?;
        Ok(Self { pool })
    }

    /// 打开已有的数据库，用于搜索服务
    pub async fn open_existing(filename: impl AsRef<Path>) -> Result<Self> {
        let filename = filename.as_ref();
        if !filename.is_file() {
            return Err(Error::ResourceLoad(format!("数据库不存在: {}", filename.display())));
        }
        let pool = init_db(filename, false)
            .await
            .map_err(|e| Error::ResourceLoad(format!("{}: {e}", filename.display())))?;
        Ok(Self { pool })
    }

    /// 添加一条图片记录，并在同一事务中写入全文索引
    pub async fn insert(&self, path: &str, ocr_text: &str) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        let id = match crud::add_image(&mut *tx, path, ocr_text).await {
            Ok(id) => id,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(Error::DuplicateRecord(path.to_owned()));
            }
            Err(e) => return Err(e.into()),
        };
        crud::add_image_text(&mut *tx, id, ocr_text).await?;
        tx.commit().await?;
        Ok(id)
    }

    pub async fn contains_path(&self, path: &str) -> Result<bool> {
        Ok(crud::check_image_path(&self.pool, path).await?)
    }

    pub async fn get(&self, id: i64) -> Result<ImageRecord> {
        crud::get_image(&self.pool, id).await?.ok_or(Error::NotFound(id))
    }

    /// 批量获取图片记录，不存在的 ID 不会出现在结果中
    pub async fn fetch_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, ImageRecord>> {
        let records = crud::get_images(&self.pool, ids).await?;
        Ok(records.into_iter().map(|record| (record.id, record)).collect())
    }

    /// 在 OCR 文字中检索关键词，返回最多 k 个 `(ID, 相关度)`，相关度越大越好
    pub async fn keyword_search(&self, query: &str, k: usize) -> Result<Vec<(i64, f64)>> {
        let Some(expr) = match_expr(query) else {
            return Ok(vec![]);
        };
        if k == 0 {
            return Ok(vec![]);
        }
        debug!("全文检索表达式: {expr}");
        let rows = crud::search_text(&self.pool, &expr, k as i64).await?;
        // bm25 的值越小越相关，这里取反
        Ok(rows.into_iter().map(|(id, rank)| (id, -rank)).collect())
    }

    pub async fn count(&self) -> Result<i64> {
        Ok(crud::count_image(&self.pool).await?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// 将用户输入转换为 FTS5 查询表达式
///
/// 每个词都用双引号包裹，避免用户输入中的标点被当作 FTS5 语法，
/// 多个词之间为隐式 AND。只有标点的词不会产生任何 token，直接丢弃。
fn match_expr(query: &str) -> Option<String> {
    let terms = query
        .split_whitespace()
        .filter(|term| term.chars().any(char::is_alphanumeric))
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>();
    if terms.is_empty() { None } else { Some(terms.join(" ")) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_expr() {
        assert_eq!(match_expr(""), None);
        assert_eq!(match_expr("  \t "), None);
        assert_eq!(match_expr("hello"), Some("\"hello\"".to_string()));
        assert_eq!(match_expr("hello  world"), Some("\"hello\" \"world\"".to_string()));
        assert_eq!(match_expr("say \"hi\""), Some("\"say\" \"\"\"hi\"\"\"".to_string()));
        assert_eq!(match_expr("a-b OR c*"), Some("\"a-b\" \"OR\" \"c*\"".to_string()));
        assert_eq!(match_expr("-- \" !"), None);
        assert_eq!(match_expr("-- cat"), Some("\"cat\"".to_string()));
    }
}
