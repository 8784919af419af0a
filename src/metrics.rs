use std::sync::LazyLock;

use prometheus::*;

static METRIC_SEARCH_COUNT: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("memesearch_search_count", "count of the search requests").unwrap()
});

static METRIC_SEARCH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!("memesearch_search_duration", "duration of the search in seconds")
        .unwrap()
});

static METRIC_SEARCH_RESULTS: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "memesearch_search_results",
        "number of results returned by the search",
        (0..=50).step_by(5).map(|x| x as f64).collect()
    )
    .unwrap()
});

static METRIC_LEG_FAILURE: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "memesearch_leg_failure_count",
        "count of the failed retrieval legs",
        &["leg"]
    )
    .unwrap()
});

static METRIC_INDEX_FILE: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "memesearch_index_file_count",
        "count of the files processed by the index builder",
        &["outcome"]
    )
    .unwrap()
});

pub fn inc_search_count() {
    METRIC_SEARCH_COUNT.inc();
}

pub fn observe_search_duration(seconds: f64) {
    METRIC_SEARCH_DURATION.observe(seconds);
}

pub fn observe_search_results(count: usize) {
    METRIC_SEARCH_RESULTS.observe(count as f64);
}

/// 检索分支失败计数，`leg` 为 keyword、image 或 text
pub fn inc_leg_failure(leg: &str) {
    METRIC_LEG_FAILURE.with_label_values(&[leg]).inc();
}

/// 索引构建时单个文件的处理结果计数
pub fn inc_index_file(outcome: &str) {
    METRIC_INDEX_FILE.with_label_values(&[outcome]).inc();
}
