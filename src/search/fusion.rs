use std::collections::BTreeMap;

/// 融合后的候选结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedCandidate {
    pub id: i64,
    pub score: f64,
}

/// Reciprocal Rank Fusion
///
/// 每个列表中排名为 r（从 0 开始）的 ID 得到 `1 / (rrf_k + r)` 分，各列表的得分相加。
/// 结果按分数从高到低排列，分数相同时 ID 小的在前。
pub fn reciprocal_rank_fusion<L: AsRef<[i64]>>(lists: &[L], rrf_k: f64) -> Vec<FusedCandidate> {
    let mut scores = BTreeMap::<i64, f64>::new();
    for list in lists {
        for (rank, &id) in list.as_ref().iter().enumerate() {
            *scores.entry(id).or_insert(0.0) += 1.0 / (rrf_k + rank as f64);
        }
    }

    let mut fused = scores
        .into_iter()
        .map(|(id, score)| FusedCandidate { id, score })
        .collect::<Vec<_>>();
    fused.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rrf_tie() {
        let (d1, d2, d3) = (7, 3, 5);
        let fused = reciprocal_rank_fusion(&[vec![d1, d2, d3], vec![d2, d1]], 60.0);

        assert_eq!(fused.len(), 3);
        let score = |id| fused.iter().find(|c| c.id == id).unwrap().score;
        assert_eq!(score(d1), 1.0 / 60.0 + 1.0 / 61.0);
        assert_eq!(score(d2), 1.0 / 61.0 + 1.0 / 60.0);
        assert_eq!(score(d1), score(d2));
        assert_eq!(score(d3), 1.0 / 62.0);

        // 同分时按 ID 升序
        let ids = fused.iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![d2, d1, d3]);
        assert_eq!(reciprocal_rank_fusion(&[vec![d2, d1], vec![d1, d2, d3]], 60.0), fused);
    }

    #[test]
    fn test_rrf_empty() {
        let lists: [Vec<i64>; 3] = [vec![], vec![], vec![]];
        assert!(reciprocal_rank_fusion(&lists, 60.0).is_empty());

        let fused = reciprocal_rank_fusion(&[vec![], vec![4, 2], vec![]], 60.0);
        assert_eq!(fused.iter().map(|c| c.id).collect::<Vec<_>>(), vec![4, 2]);
    }

    #[test]
    fn test_rrf_order() {
        let fused =
            reciprocal_rank_fusion(&[vec![1, 2, 3, 4], vec![4, 3], vec![3, 9, 1]], 1.0);
        for pair in fused.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // 3: 1/3 + 1/2 + 1/1
        assert_eq!(fused[0].id, 3);
        assert!(fused.iter().all(|c| c.score > 0.0));
    }
}
