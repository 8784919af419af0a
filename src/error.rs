use thiserror::Error;

/// memesearch 的错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 配置文件缺失或无效，启动时致命
    #[error("配置错误: {0}")]
    Config(String),
    /// 模型、数据库或向量索引加载失败
    #[error("资源加载失败: {0}")]
    ResourceLoad(String),
    /// 图片路径已存在于数据库中
    #[error("图片已存在: {0}")]
    DuplicateRecord(String),
    /// OCR 识别失败
    #[error("OCR 识别失败: {0}")]
    OcrExtraction(String),
    /// 计算图片或文本向量失败
    #[error("向量计算失败: {0}")]
    Embedding(String),
    /// 向量批次不合法，索引没有被替换
    #[error("索引构建失败: {0}")]
    IndexBuild(String),
    /// 某一路检索失败
    #[error("检索失败: {0}")]
    SearchBackend(String),
    /// 找不到对应 ID 的记录
    #[error("找不到记录: {0}")]
    NotFound(i64),
    /// 查询文本为空
    #[error("查询文本不能为空")]
    EmptyQuery,
    /// 查询文本无法转换为向量，此时向量检索无法进行
    #[error("查询向量计算失败: {0}")]
    QueryEmbedding(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
