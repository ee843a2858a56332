use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::PathBuf;

use serde::Serialize;

/// 处理失败的条目使用的得分，低于任何正常得分
pub const FAILED_SCORE: i64 = -1;

/// 一个被搜索条目的得分，按 `(score, path)` 排序
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MatchResult {
    pub score: i64,
    pub path: PathBuf,
}

impl MatchResult {
    pub fn new(score: i64, path: impl Into<PathBuf>) -> Self {
        Self { score, path: path.into() }
    }

    pub fn failed(path: impl Into<PathBuf>) -> Self {
        Self::new(FAILED_SCORE, path)
    }

    pub fn is_failed(&self) -> bool {
        self.score < 0
    }
}

/// 只保留得分最高的 k 个结果
pub struct TopMatches {
    heap: BinaryHeap<Reverse<MatchResult>>,
    k: usize,
}

impl TopMatches {
    pub fn new(k: usize) -> Self {
        Self { heap: BinaryHeap::with_capacity(k + 1), k }
    }

    pub fn push(&mut self, result: MatchResult) {
        if self.k == 0 {
            return;
        }
        if self.heap.len() < self.k {
            self.heap.push(Reverse(result));
        } else if let Some(mut min) = self.heap.peek_mut() {
            if result > min.0 {
                *min = Reverse(result);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// 按 `(score, path)` 降序返回
    pub fn into_sorted_vec(self) -> Vec<MatchResult> {
        // Reverse 包装下的升序即为原值的降序
        self.heap.into_sorted_vec().into_iter().map(|r| r.0).collect()
    }
}

impl Extend<MatchResult> for TopMatches {
    fn extend<T: IntoIterator<Item = MatchResult>>(&mut self, iter: T) {
        for result in iter {
            self.push(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> Vec<MatchResult> {
        vec![
            MatchResult::new(3, "c"),
            MatchResult::failed("broken"),
            MatchResult::new(10, "a"),
            MatchResult::new(7, "x"),
            MatchResult::new(10, "b"),
            MatchResult::new(0, "z"),
        ]
    }

    #[test]
    fn order_by_score_then_path() {
        let mut all = results();
        all.sort();
        let order = all.iter().map(|r| (r.score, r.path.to_str().unwrap())).collect::<Vec<_>>();
        assert_eq!(order, vec![(-1, "broken"), (0, "z"), (3, "c"), (7, "x"), (10, "a"), (10, "b")]);
    }

    #[test]
    fn top_matches_descending() {
        let mut top = TopMatches::new(3);
        top.extend(results());
        assert_eq!(top.len(), 3);
        assert_eq!(
            top.into_sorted_vec(),
            vec![MatchResult::new(10, "b"), MatchResult::new(10, "a"), MatchResult::new(7, "x")]
        );
    }

    #[test]
    fn top_matches_equals_sort_then_tail() {
        let mut all = (0..200)
            .map(|i| MatchResult::new((i * 37 % 23) as i64 - 1, format!("{:03}", i)))
            .collect::<Vec<_>>();
        let mut top = TopMatches::new(50);
        top.extend(all.clone());

        all.sort();
        let expected = all[all.len() - 50..].iter().rev().cloned().collect::<Vec<_>>();
        assert_eq!(top.into_sorted_vec(), expected);
    }

    #[test]
    fn fewer_than_k() {
        let mut top = TopMatches::new(50);
        top.extend(results());
        assert_eq!(top.len(), 6);
        assert_eq!(top.into_sorted_vec().last(), Some(&MatchResult::failed("broken")));

        let mut top = TopMatches::new(0);
        top.extend(results());
        assert!(top.is_empty());
    }
}
