//! 精确向量索引
//!
//! 每种模态（图片、文字）各有一个索引文件，索引中的 ID 与数据库中的图片 ID 一致。
//! 搜索为全量扫描的平方欧氏距离，不做任何近似或量化。

mod flat;
mod utils;

use std::cmp::Ordering;
use std::fmt;

pub use flat::FlatIndex;
pub use utils::*;

/// 防止距离为 0 时出现除零
pub const SCORE_EPSILON: f32 = 1e-6;

/// 向量模态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Image,
    Text,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => f.write_str("image"),
            Self::Text => f.write_str("text"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub id: i64,
    /// 平方欧氏距离
    pub distance: f32,
}

impl Neighbor {
    /// 将距离转换为 (0, 1] 之间的分数，距离越小分数越高
    pub fn score(&self) -> f32 {
        distance_to_score(self.distance)
    }
}

// 按 (距离, ID) 排序，保证相同距离时结果稳定
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance).then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

#[inline(always)]
pub fn distance_to_score(distance: f32) -> f32 {
    1.0 / (1.0 + distance + SCORE_EPSILON)
}

/// 平方欧氏距离
#[inline(always)]
pub fn l2_sqr(va: &[f32], vb: &[f32]) -> f32 {
    va.iter()
        .zip(vb)
        .map(|(a, b)| {
            let d = a - b;
            d * d
        })
        .sum()
}
