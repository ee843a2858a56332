use std::path::{Path, PathBuf};

use indicatif::ProgressStyle;
use log::warn;
use opencv::core::{self, Mat};
use opencv::imgcodecs;
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// 以灰度模式读取图片，无法解码时返回 [`Error::DecodeFailure`]
pub fn imread(path: &Path) -> Result<Mat> {
    let filename = path.to_str().ok_or(Error::DecodeFailure)?;
    let img = imgcodecs::imread(filename, imgcodecs::IMREAD_GRAYSCALE)?;
    if img.empty() {
        return Err(Error::DecodeFailure);
    }
    Ok(img)
}

/// 等比缩小图片，使长边不超过 `max_dimension`，只缩小不放大
pub fn adjust_image_size(img: Mat, max_dimension: u32) -> opencv::Result<Mat> {
    let (w, h) = (img.cols(), img.rows());
    let longer = w.max(h).max(0) as u32;
    if longer <= max_dimension {
        return Ok(img);
    }
    // 此时 max_dimension < longer <= i32::MAX
    let max = max_dimension as i32;
    let scale = max_dimension as f64 / longer as f64;
    let size = core::Size::new(
        ((w as f64 * scale).round() as i32).clamp(1, max),
        ((h as f64 * scale).round() as i32).clamp(1, max),
    );
    let mut output = Mat::default();
    imgproc::resize(&img, &mut output, size, 0., 0., InterpolationFlags::INTER_AREA as i32)?;
    Ok(output)
}

/// 递归列出目录下的所有条目（不包含根目录本身，不跟随符号链接）
pub fn scan_tree(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.into_path()),
            Err(e) => {
                warn!("无法读取目录条目: {}", e);
                None
            }
        })
        .collect()
}

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {per_sec} {wide_msg}",
    )
    .expect("invalid progress bar template")
}
