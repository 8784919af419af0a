use std::sync::Arc;

use crate::search::SearchEngine;

/// 应用状态
pub struct AppState {
    /// 检索引擎，所有请求共享
    pub engine: SearchEngine,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(engine: SearchEngine) -> Arc<Self> {
        Arc::new(AppState { engine })
    }
}
