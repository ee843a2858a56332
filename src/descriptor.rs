use std::path::PathBuf;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use opencv::core::Mat;
use opencv::prelude::*;

use crate::error::Result;

/// 一张图片的全部局部特征描述符，每行一个特征向量，所有行维度相同
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DescriptorSet(Array2<f32>);

impl DescriptorSet {
    pub fn new(data: Array2<f32>) -> Self {
        Self(data)
    }

    /// 创建一个维度为 `dim` 的空集合
    pub fn empty(dim: usize) -> Self {
        Self(Array2::zeros((0, dim)))
    }

    /// 从 OpenCV 的 CV_32F 矩阵中复制数据
    pub fn from_mat(mat: &Mat) -> Result<Self> {
        let (rows, cols) = (mat.rows() as usize, mat.cols() as usize);
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..mat.rows() {
            data.extend_from_slice(mat.at_row::<f32>(i)?);
        }
        Ok(Self(Array2::from_shape_vec((rows, cols), data)?))
    }

    /// 转换为 OpenCV 矩阵，用于 FLANN 匹配
    pub fn to_mat(&self) -> Result<Mat> {
        if self.is_empty() {
            return Ok(Mat::default());
        }
        let data = self.0.as_standard_layout();
        let rows = data.rows().into_iter().filter_map(|row| row.to_slice()).collect::<Vec<_>>();
        Ok(Mat::from_slice_2d(&rows)?)
    }

    /// 特征向量数量
    pub fn len(&self) -> usize {
        self.0.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 特征向量维度
    pub fn dim(&self) -> usize {
        self.0.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.0.view()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = ArrayView1<'_, f32>> {
        self.0.axis_iter(Axis(0))
    }

    pub fn into_inner(self) -> Array2<f32> {
        self.0
    }
}

impl From<Array2<f32>> for DescriptorSet {
    fn from(data: Array2<f32>) -> Self {
        Self(data)
    }
}

/// 描述符记录，`path` 为相对于图片根目录的路径
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorRecord {
    pub path: PathBuf,
    pub descriptors: DescriptorSet,
}

impl DescriptorRecord {
    pub fn new(path: impl Into<PathBuf>, descriptors: DescriptorSet) -> Self {
        Self { path: path.into(), descriptors }
    }
}
