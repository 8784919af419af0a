use sqlx::{Executor, QueryBuilder, Result, Sqlite, SqlitePool};

use super::ImageRecord;

/// 添加图片记录
pub async fn add_image<'c, E>(executor: E, path: &str, ocr_text: &str) -> Result<i64>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_scalar(
        r#"
        INSERT INTO image (path, ocr_text)
        VALUES (?, ?)
        RETURNING id
        "#,
    )
    .bind(path)
    .bind(ocr_text)
    .fetch_one(executor)
    .await
}

/// 添加图片文字的全文索引
pub async fn add_image_text<'c, E>(executor: E, id: i64, ocr_text: &str) -> Result<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO image_fts (rowid, ocr_text)
        VALUES (?, ?)
        "#,
    )
    .bind(id)
    .bind(ocr_text)
    .execute(executor)
    .await?;

    Ok(())
}

/// 检查图片路径是否存在
pub async fn check_image_path(executor: &SqlitePool, path: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) as count FROM image WHERE path = ?
        "#,
    )
    .bind(path)
    .fetch_one(executor)
    .await?;

    Ok(count > 0)
}

pub async fn get_image(executor: &SqlitePool, id: i64) -> Result<Option<ImageRecord>> {
    sqlx::query_as(
        r#"
        SELECT id, path, ocr_text FROM image WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// 批量获取图片记录，不存在的 ID 会被忽略
pub async fn get_images(executor: &SqlitePool, ids: &[i64]) -> Result<Vec<ImageRecord>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let mut builder =
        QueryBuilder::<Sqlite>::new("SELECT id, path, ocr_text FROM image WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    builder.build_query_as().fetch_all(executor).await
}

/// 全文检索，返回 `(ID, bm25)`，bm25 越小越相关
pub async fn search_text(executor: &SqlitePool, expr: &str, limit: i64) -> Result<Vec<(i64, f64)>> {
    sqlx::query_as(
        r#"
        SELECT rowid, rank FROM image_fts
        WHERE image_fts MATCH ?
        ORDER BY rank, rowid
        LIMIT ?
        "#,
    )
    .bind(expr)
    .bind(limit)
    .fetch_all(executor)
    .await
}

/// 查询数据库中的图片数量
pub async fn count_image(executor: &SqlitePool) -> Result<i64> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM image
        "#,
    )
    .fetch_one(executor)
    .await
}
