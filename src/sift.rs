use std::path::Path;

use log::trace;
use opencv::core::{Mat, Ptr, Vector};
use opencv::features2d::SIFT;
use opencv::prelude::*;

use crate::config::SiftOptions;
use crate::descriptor::DescriptorSet;
use crate::error::{Error, Result};
use crate::utils;

/// SIFT 特征提取器
///
/// 所有图片在提取之前都会被缩小到相同的最大尺寸，
/// 查询图片与被搜索图片必须使用同一个 `max_dimension`，否则得分没有可比性。
pub struct SiftExtractor {
    sift: Ptr<SIFT>,
    max_dimension: u32,
}

impl SiftExtractor {
    pub fn create(opts: &SiftOptions) -> Result<Self> {
        Ok(Self { sift: SIFT::create_def()?, max_dimension: opts.resize })
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// 读取图片文件并提取特征
    pub fn extract_file(&mut self, path: &Path) -> Result<DescriptorSet> {
        let image = utils::imread(path)?;
        self.extract_image(image)
    }

    /// 对灰度图片提取特征，必要时先缩小
    pub fn extract_image(&mut self, image: Mat) -> Result<DescriptorSet> {
        let image = utils::adjust_image_size(image, self.max_dimension)?;
        let mask = Mat::default();
        let mut kps = Vector::new();
        let mut des = Mat::default();
        self.sift.detect_and_compute(&image, &mask, &mut kps, &mut des, false)?;
        trace!("{}x{}: {} 个特征点", image.cols(), image.rows(), kps.len());

        if kps.is_empty() {
            return Err(Error::NoKeypoints);
        }
        if des.empty() {
            return Err(Error::EmptyDescriptor);
        }
        DescriptorSet::from_mat(&des)
    }
}
