use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, RunnerOptions, SiftOptions, existing_dir};
use crate::descriptor::DescriptorRecord;
use crate::error;
use crate::ranking::MatchResult;
use crate::runner::{BatchRunner, Worker};
use crate::sift::SiftExtractor;
use crate::store::DescriptorStore;
use crate::utils;

#[derive(Parser, Debug, Clone)]
pub struct BuildCommand {
    #[command(flatten)]
    pub sift: SiftOptions,
    #[command(flatten)]
    pub runner: RunnerOptions,
    /// 描述符数据库根目录
    #[arg(long, value_name = "DIR", value_parser = existing_dir)]
    pub db: PathBuf,
    /// 需要扫描的图片根目录
    #[arg(value_parser = existing_dir)]
    pub source_imgs: PathBuf,
}

impl SubCommandExtend for BuildCommand {
    fn run(&self, _opts: &Opts) -> Result<()> {
        info!("开始扫描目录: {}", self.source_imgs.display());
        let items = utils::scan_tree(&self.source_imgs);
        info!("扫描完成，共 {} 个条目", items.len());

        let config = BuildConfig {
            source_imgs: self.source_imgs.clone(),
            db: self.db.clone(),
            sift: self.sift.clone(),
        };
        let runner = BatchRunner::from_options(&self.runner);
        let summary = runner.run_with::<BuildWorker, _>(items, &config, |_| {})?;
        info!("描述符数据库构建完成: {}", summary);
        Ok(())
    }
}

pub struct BuildConfig {
    pub source_imgs: PathBuf,
    pub db: PathBuf,
    pub sift: SiftOptions,
}

/// 提取图片特征并写入数据库，结果中的得分为特征数量
pub struct BuildWorker {
    extractor: SiftExtractor,
    store: DescriptorStore,
    source_imgs: PathBuf,
}

impl Worker for BuildWorker {
    type Config = BuildConfig;

    fn init(config: &BuildConfig) -> error::Result<Self> {
        Ok(Self {
            extractor: SiftExtractor::create(&config.sift)?,
            store: DescriptorStore::new(&config.db),
            source_imgs: config.source_imgs.clone(),
        })
    }

    fn process(&mut self, path: &Path) -> error::Result<MatchResult> {
        let descriptors = self.extractor.extract_file(path)?;
        let name = self.label(path);
        let count = descriptors.len();
        self.store.save(&DescriptorRecord::new(name.clone(), descriptors))?;
        Ok(MatchResult::new(count as i64, name))
    }

    fn label(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.source_imgs).unwrap_or(path).to_path_buf()
    }
}
