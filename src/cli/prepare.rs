use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, SiftOptions, existing_file};
use crate::sift::SiftExtractor;
use crate::store::{DESCRIPTOR_SUFFIX, save_descriptors, with_suffix};

#[derive(Parser, Debug, Clone)]
pub struct PrepareCommand {
    #[command(flatten)]
    pub sift: SiftOptions,
    /// 查询图片路径
    #[arg(value_parser = existing_file)]
    pub query_img: PathBuf,
    /// 输出的查询描述符路径，不以 .npy 结尾时会自动追加
    pub query_des: PathBuf,
}

impl SubCommandExtend for PrepareCommand {
    fn run(&self, _opts: &Opts) -> Result<()> {
        let mut extractor = SiftExtractor::create(&self.sift)?;
        let descriptors = extractor
            .extract_file(&self.query_img)
            .with_context(|| format!("无法提取图片特征: {}", self.query_img.display()))?;

        let path = with_suffix(self.query_des.clone());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        save_descriptors(&path, &descriptors)?;
        info!("已保存 {} 个特征到 {}", descriptors.len(), path.display());
        if path != self.query_des {
            info!("输出路径已追加 .{} 后缀", DESCRIPTOR_SUFFIX);
        }
        Ok(())
    }
}
