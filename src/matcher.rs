use opencv::core::{self, DMatch, Mat, Ptr, Vector};
use opencv::features2d::FlannBasedMatcher;
use opencv::flann;
use opencv::prelude::*;

use crate::descriptor::DescriptorSet;
use crate::error::{Error, Result};

/// Lowe 比值测试的阈值
pub const LOWE_RATIO: f32 = 0.7;
/// 每个查询向量取的近邻数量
pub const KNN_K: usize = 2;

const KDTREE_TREES: i32 = 5;
const FLANN_CHECKS: i32 = 50;
/// 随机 KD 树使用的随机数种子
const FLANN_SEED: i32 = 0x5eed;

/// 基于 FLANN 随机 KD 树的描述符匹配器
///
/// 得分是参考描述符中通过比值测试的向量个数，没有按描述符数量归一化，
/// 因此特征点多的图片天然更容易得到高分。
///
/// KD 树的构建依赖 OpenCV 的线程局部随机数生成器，每次建树前都会重置种子，
/// 所以同一对描述符的得分与调用顺序、所在线程无关。
pub struct Matcher {
    flann: FlannBasedMatcher,
}

impl Matcher {
    pub fn create() -> Result<Self> {
        let index_params =
            Ptr::new(flann::IndexParams::from(flann::KDTreeIndexParams::new(KDTREE_TREES)?));
        let search_params = Ptr::new(flann::SearchParams::new_1(FLANN_CHECKS, 0.0, true)?);
        let flann = FlannBasedMatcher::new(&index_params, &search_params)?;
        Ok(Self { flann })
    }

    /// 计算 `reference` 与 `candidate` 之间的可信匹配数量
    pub fn score(&self, reference: &DescriptorSet, candidate: &DescriptorSet) -> Result<u32> {
        // https://github.com/opencv/opencv/issues/10548
        if candidate.len() < KNN_K {
            return Err(Error::InsufficientCandidateSize(candidate.len()));
        }
        if reference.is_empty() {
            return Err(Error::NoMatches);
        }
        if reference.dim() != candidate.dim() {
            return Err(Error::DimensionMismatch(reference.dim(), candidate.dim()));
        }

        let query = reference.to_mat()?;
        let train = candidate.to_mat()?;
        let mut matches = Vector::<Vector<DMatch>>::new();
        let mask = Mat::default();
        core::set_rng_seed(FLANN_SEED)?;
        self.flann.knn_train_match(&query, &train, &mut matches, KNN_K as i32, &mask, false)?;

        let distances = matches
            .iter()
            .map(|m| m.iter().map(|m| m.distance).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        ratio_test(&distances, LOWE_RATIO)
    }
}

/// 对每个查询向量的近邻距离（升序）做比值测试，返回通过的数量
pub fn ratio_test<T: AsRef<[f32]>>(neighbors: &[T], ratio: f32) -> Result<u32> {
    if neighbors.is_empty() {
        return Err(Error::NoMatches);
    }
    let mut good = 0;
    for dists in neighbors {
        let &[d1, d2] = dists.as_ref() else {
            return Err(Error::MatchShapeMismatch(dists.as_ref().len()));
        };
        if d1 < ratio * d2 {
            good += 1;
        }
    }
    Ok(good)
}
