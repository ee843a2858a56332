#![allow(dead_code)]

use std::path::Path;

use anyhow::Result;
use opencv::core::{self, Mat, Point, Rect, Scalar, Size, Vector};
use opencv::imgcodecs;
use opencv::imgproc;
use opencv::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 用随机几何图形生成一张灰度测试图片，同一个 seed 总是得到相同的图片
pub fn synthetic_scene(seed: u64, width: i32, height: i32) -> Result<Mat> {
    let mut rng = StdRng::seed_from_u64(seed);
    let background = Scalar::all(rng.random_range(0..64) as f64);
    let mut img = Mat::new_rows_cols_with_default(height, width, core::CV_8UC1, background)?;

    for _ in 0..150 {
        let shade = Scalar::all(rng.random_range(0..=255) as f64);
        let x = rng.random_range(0..width);
        let y = rng.random_range(0..height);
        match rng.random_range(0..3) {
            0 => {
                let w = rng.random_range(8..width / 5);
                let h = rng.random_range(8..height / 5);
                imgproc::rectangle(&mut img, Rect::new(x, y, w, h), shade, imgproc::FILLED, imgproc::LINE_8, 0)?;
            }
            1 => {
                let r = rng.random_range(4..width.min(height) / 10);
                imgproc::circle(&mut img, Point::new(x, y), r, shade, imgproc::FILLED, imgproc::LINE_8, 0)?;
            }
            _ => {
                let end = Point::new(rng.random_range(0..width), rng.random_range(0..height));
                let thickness = rng.random_range(1..6);
                imgproc::line(&mut img, Point::new(x, y), end, shade, thickness, imgproc::LINE_8, 0)?;
            }
        }
    }
    Ok(img)
}

/// 截取图片的一部分并按比例缩小
pub fn crop_and_shrink(img: &Mat, roi: Rect, scale: f64) -> Result<Mat> {
    let cropped = Mat::roi(img, roi)?.try_clone()?;
    let size = Size::new((roi.width as f64 * scale) as i32, (roi.height as f64 * scale) as i32);
    let mut output = Mat::default();
    imgproc::resize(&cropped, &mut output, size, 0., 0., imgproc::INTER_AREA)?;
    Ok(output)
}

pub fn write_image(path: &Path, img: &Mat) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let ok = imgcodecs::imwrite(path.to_str().unwrap(), img, &Vector::new())?;
    anyhow::ensure!(ok, "imwrite failed: {}", path.display());
    Ok(())
}

/// 生成测试用的图片集：y 为原图，z 为无关图片，x 为 y 的局部缩小版
pub fn write_dataset(corpus: &Path, query: &Path) -> Result<()> {
    let y = synthetic_scene(7, 640, 480)?;
    let z = synthetic_scene(1234, 640, 480)?;
    let x = crop_and_shrink(&y, Rect::new(80, 60, 420, 320), 0.75)?;
    write_image(&corpus.join("y.png"), &y)?;
    write_image(&corpus.join("nested/z.png"), &z)?;
    write_image(query, &x)?;
    Ok(())
}
