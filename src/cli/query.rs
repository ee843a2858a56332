use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::*;
use crate::descriptor::DescriptorSet;
use crate::error;
use crate::matcher::Matcher;
use crate::ranking::{MatchResult, TopMatches};
use crate::runner::{BatchRunner, Worker};
use crate::sift::SiftExtractor;
use crate::store::{DescriptorStore, load_descriptors};
use crate::utils;

#[derive(Parser, Debug, Clone)]
#[command(group(ArgGroup::new("candidates").required(true).args(["db", "img_root"])))]
pub struct QueryCommand {
    #[command(flatten)]
    pub sift: SiftOptions,
    #[command(flatten)]
    pub runner: RunnerOptions,
    /// 查询描述符文件，由 prepare 命令生成
    #[arg(value_parser = existing_file)]
    pub query_des: PathBuf,
    /// 被搜索的图片根目录，每张图片都会重新提取特征
    #[arg(value_parser = existing_dir)]
    pub img_root: Option<PathBuf>,
    /// 搜索由 build 命令生成的描述符数据库
    #[arg(long, value_name = "DIR", value_parser = existing_dir)]
    pub db: Option<PathBuf>,
    /// 显示的结果数量
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_TOP_COUNT)]
    pub count: usize,
    /// 输出格式
    #[arg(long, value_enum, value_name = "FORMAT", default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl QueryCommand {
    fn candidates(&self) -> Candidates {
        match (&self.db, &self.img_root) {
            (Some(db), _) => Candidates::Store(db.clone()),
            (None, Some(root)) => Candidates::Images(root.clone()),
            // clap 保证两者至少有一个
            (None, None) => unreachable!(),
        }
    }
}

impl SubCommandExtend for QueryCommand {
    fn run(&self, _opts: &Opts) -> Result<()> {
        let reference = load_descriptors(&self.query_des)
            .with_context(|| format!("无法读取查询描述符: {}", self.query_des.display()))?;
        info!("查询描述符共 {} 个特征", reference.len());

        let candidates = self.candidates();
        let items = utils::scan_tree(candidates.root());
        info!("扫描完成，共 {} 个条目", items.len());

        let config = QueryConfig { reference: self.query_des.clone(), candidates, sift: self.sift.clone() };
        let runner = BatchRunner::from_options(&self.runner);
        let mut top = TopMatches::new(self.count);
        let summary = runner.run_with::<QueryWorker, _>(items, &config, |result| {
            if !result.is_failed() {
                top.push(result);
            }
        })?;
        info!("搜索完成: {}", summary);
        info!("前 {} 个结果:", self.count);

        print_result(&top.into_sorted_vec(), self.output_format)
    }
}

fn print_result(result: &[MatchResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for r in result {
                println!("{}\t{}", r.score, r.path.display());
            }
        }
    }
    Ok(())
}

/// 被搜索对象的来源
#[derive(Debug, Clone)]
pub enum Candidates {
    /// build 生成的描述符数据库
    Store(PathBuf),
    /// 图片目录，逐张提取特征
    Images(PathBuf),
}

impl Candidates {
    pub fn root(&self) -> &Path {
        match self {
            Self::Store(root) | Self::Images(root) => root,
        }
    }
}

pub struct QueryConfig {
    /// 查询描述符文件，每个 worker 各自加载一份
    pub reference: PathBuf,
    pub candidates: Candidates,
    pub sift: SiftOptions,
}

enum CandidateSource {
    Store(DescriptorStore),
    Images { root: PathBuf, extractor: SiftExtractor },
}

/// 计算查询描述符与每个被搜索对象之间的得分
pub struct QueryWorker {
    reference: DescriptorSet,
    matcher: Matcher,
    source: CandidateSource,
}

impl Worker for QueryWorker {
    type Config = QueryConfig;

    fn init(config: &QueryConfig) -> error::Result<Self> {
        let source = match &config.candidates {
            Candidates::Store(root) => CandidateSource::Store(DescriptorStore::new(root)),
            Candidates::Images(root) => CandidateSource::Images {
                root: root.clone(),
                extractor: SiftExtractor::create(&config.sift)?,
            },
        };
        Ok(Self { reference: load_descriptors(&config.reference)?, matcher: Matcher::create()?, source })
    }

    fn process(&mut self, path: &Path) -> error::Result<MatchResult> {
        let candidate = match &mut self.source {
            CandidateSource::Store(_) => load_descriptors(path)?,
            CandidateSource::Images { extractor, .. } => extractor.extract_file(path)?,
        };
        let score = self.matcher.score(&self.reference, &candidate)?;
        Ok(MatchResult::new(score as i64, self.label(path)))
    }

    fn label(&self, path: &Path) -> PathBuf {
        match &self.source {
            CandidateSource::Store(store) => store.record_name(path),
            CandidateSource::Images { root, .. } => path.strip_prefix(root).ok().map(Path::to_path_buf),
        }
        .unwrap_or_else(|| path.to_path_buf())
    }
}
