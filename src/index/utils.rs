use std::collections::BinaryHeap;

use super::Neighbor;

/// 保留距离最小的 k 个邻居
///
/// 堆顶为当前保留的最远邻居，新邻居只有比它更近时才会替换它
pub struct TopKNeighbors {
    heap: BinaryHeap<Neighbor>,
    k: usize,
}

impl TopKNeighbors {
    pub fn new(k: usize) -> Self {
        Self { heap: BinaryHeap::new(), k }
    }

    pub fn push(&mut self, neighbor: Neighbor) {
        if self.heap.len() < self.k {
            self.heap.push(neighbor);
        } else if let Some(mut top) = self.heap.peek_mut() {
            if neighbor < *top {
                *top = neighbor;
            }
        }
    }

    pub fn extend(&mut self, neighbors: impl IntoIterator<Item = Neighbor>) {
        for neighbor in neighbors {
            self.push(neighbor);
        }
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.extend(other.heap);
        self
    }

    /// 按距离从近到远返回
    pub fn into_sorted_vec(self) -> Vec<Neighbor> {
        self.heap.into_sorted_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topk() {
        let mut topk = TopKNeighbors::new(3);
        topk.extend([5.0, 1.0, 4.0, 2.0, 3.0, 0.5].iter().enumerate().map(|(i, &d)| Neighbor {
            id: i as i64,
            distance: d,
        }));
        let ids = topk.into_sorted_vec().into_iter().map(|n| n.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![5, 1, 3]);
    }

    #[test]
    fn test_topk_zero() {
        let mut topk = TopKNeighbors::new(0);
        topk.push(Neighbor { id: 1, distance: 0.0 });
        assert!(topk.into_sorted_vec().is_empty());
    }
}
