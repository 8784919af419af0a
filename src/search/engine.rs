use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use tokio::task::spawn_blocking;

use super::fusion::{FusedCandidate, reciprocal_rank_fusion};
use super::{SearchHit, SearchResponse};
use crate::config::{Config, SearchParams};
use crate::db::{ImageRecord, MetaDB};
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::index::{FlatIndex, Modality};
use crate::metrics;

/// 混合检索引擎
///
/// 数据库是必需的；两个向量索引中任何一个不可用时，对应的检索分支返回空结果
pub struct SearchEngine {
    db: MetaDB,
    embedder: Arc<dyn Embedder>,
    image_index: Option<Arc<FlatIndex>>,
    text_index: Option<Arc<FlatIndex>>,
    params: SearchParams,
}

impl SearchEngine {
    pub fn new(
        db: MetaDB,
        embedder: Arc<dyn Embedder>,
        image_index: Option<FlatIndex>,
        text_index: Option<FlatIndex>,
        params: SearchParams,
    ) -> Self {
        let dim = embedder.dimension();
        let image_index = check_dimension(Modality::Image, image_index, dim);
        let text_index = check_dimension(Modality::Text, text_index, dim);
        if image_index.is_none() && text_index.is_none() {
            warn!("两个向量索引都不可用，只能使用关键词检索");
        }
        Self { db, embedder, image_index, text_index, params }
    }

    /// 根据配置打开数据库和向量索引
    pub async fn load(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let db = MetaDB::open_existing(&config.database_file).await?;
        info!("数据库中共有 {} 张图片", db.count().await?);

        let image_index = load_index(Modality::Image, &config.image_index_file);
        let text_index = load_index(Modality::Text, &config.text_index_file);

        Ok(Self::new(db, embedder, image_index, text_index, config.search_params.clone()))
    }

    pub fn has_index(&self, modality: Modality) -> bool {
        self.index(modality).is_some()
    }

    /// 使用文字搜索图片
    ///
    /// 单个检索分支的失败只会记录日志，不会让整个查询失败
    pub async fn search(&self, query: &str) -> Result<SearchResponse> {
        if query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }

        let start = Instant::now();
        info!("搜索: {query}");

        let query_vector = self.embed_query(query).await?;

        let (keyword, image, text) = tokio::join!(
            self.keyword_leg(query),
            self.vector_leg(Modality::Image, &query_vector),
            self.vector_leg(Modality::Text, &query_vector),
        );
        debug!(
            "关键词: {}，图片向量: {}，文字向量: {}",
            keyword.len(),
            image.len(),
            text.len()
        );

        let fused = reciprocal_rank_fusion(&[keyword, image, text], self.params.rrf_k);
        let top = &fused[..fused.len().min(self.params.max_results)];
        let results = self.hydrate(top).await?;

        let elapsed = start.elapsed();
        metrics::inc_search_count();
        metrics::observe_search_duration(elapsed.as_secs_f64());
        metrics::observe_search_results(results.len());
        info!("搜索完成，共 {} 个结果，耗时 {:.2?}", results.len(), elapsed);

        Ok(SearchResponse { query: query.to_string(), results_count: results.len(), results })
    }

    /// 按 ID 获取图片记录
    pub async fn get(&self, id: i64) -> Result<ImageRecord> {
        self.db.get(id).await
    }

    pub async fn close(&self) {
        self.db.close().await;
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let embedder = self.embedder.clone();
        let text = query.to_string();
        let vector = spawn_blocking(move || embedder.embed_text(&text))
            .await
            .unwrap_or_else(|e| Err(Error::Embedding(e.to_string())))
            .map_err(|e| Error::QueryEmbedding(e.to_string()))?;

        let dim = self.embedder.dimension();
        if vector.len() != dim {
            return Err(Error::QueryEmbedding(format!(
                "向量维度为 {}，应为 {dim}",
                vector.len()
            )));
        }
        Ok(vector)
    }

    async fn keyword_leg(&self, query: &str) -> Vec<i64> {
        match self.db.keyword_search(query, self.params.k_keyword).await {
            Ok(hits) => hits.into_iter().map(|(id, _)| id).collect(),
            Err(e) => {
                warn!("关键词检索失败: {e}");
                metrics::inc_leg_failure("keyword");
                vec![]
            }
        }
    }

    async fn vector_leg(&self, modality: Modality, query_vector: &[f32]) -> Vec<i64> {
        let Some(index) = self.index(modality).cloned() else {
            debug!("{modality} 索引不可用，跳过");
            return vec![];
        };

        let query_vector = query_vector.to_vec();
        let k = self.params.k_vector;
        let result = spawn_blocking(move || index.search(&query_vector, k))
            .await
            .unwrap_or_else(|e| Err(Error::SearchBackend(e.to_string())));

        match result {
            Ok(neighbors) => {
                if let Some(best) = neighbors.first() {
                    debug!("{modality} 向量检索最高分: {:.4} (id = {})", best.score(), best.id);
                }
                neighbors.into_iter().map(|n| n.id).collect()
            }
            Err(e) => {
                warn!("{modality} 向量检索失败: {e}");
                metrics::inc_leg_failure(&modality.to_string());
                vec![]
            }
        }
    }

    /// 补全图片路径和文字，数据库中已不存在的 ID 会被丢弃
    async fn hydrate(&self, candidates: &[FusedCandidate]) -> Result<Vec<SearchHit>> {
        let ids = candidates.iter().map(|c| c.id).collect::<Vec<_>>();
        let mut records = self.db.fetch_by_ids(&ids).await?;

        let hits = candidates
            .iter()
            .filter_map(|candidate| {
                let Some(record) = records.remove(&candidate.id) else {
                    debug!("ID {} 不在数据库中，忽略", candidate.id);
                    return None;
                };
                Some(SearchHit {
                    id: record.id,
                    image_path: record.path,
                    ocr_text: record.ocr_text,
                    score: candidate.score,
                })
            })
            .collect();
        Ok(hits)
    }

    fn index(&self, modality: Modality) -> Option<&Arc<FlatIndex>> {
        match modality {
            Modality::Image => self.image_index.as_ref(),
            Modality::Text => self.text_index.as_ref(),
        }
    }
}

fn load_index(modality: Modality, path: &Path) -> Option<FlatIndex> {
    match FlatIndex::load(path) {
        Ok(index) => Some(index),
        Err(e) => {
            warn!("{modality} 索引不可用: {e}");
            None
        }
    }
}

fn check_dimension(
    modality: Modality,
    index: Option<FlatIndex>,
    dim: usize,
) -> Option<Arc<FlatIndex>> {
    let index = index?;
    if index.dim() != dim {
        warn!("{modality} 索引维度为 {}，模型维度为 {dim}，不使用该索引", index.dim());
        return None;
    }
    Some(Arc::new(index))
}
