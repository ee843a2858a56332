use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::*;

/// 默认的图片最大边长
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;
/// 默认输出的结果数量
pub const DEFAULT_TOP_COUNT: usize = 50;

#[derive(Parser, Debug, Clone)]
pub struct SiftOptions {
    /// 图片最大边长，长边超过这个尺寸的图片会被等比缩小
    /// 建库、生成查询描述符和搜索时必须使用相同的值
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_DIMENSION,
          value_parser = clap::value_parser!(u32).range(1..), verbatim_doc_comment)]
    pub resize: u32,
}

impl Default for SiftOptions {
    fn default() -> Self {
        Self { resize: DEFAULT_MAX_DIMENSION }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct RunnerOptions {
    /// worker 线程数量，默认为 CPU 线程数
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub workers: Option<u32>,
    /// 每次分发给 worker 的任务数量
    #[arg(long, value_name = "N", default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..))]
    pub chunksize: u32,
}

impl RunnerOptions {
    pub fn workers(&self) -> usize {
        self.workers.map(|n| n as usize).unwrap_or_else(num_cpus::get)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunksize as usize
    }
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self { workers: None, chunksize: 2 }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "picfind", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 提取目录下所有图片的特征并保存到描述符数据库
    Build(BuildCommand),
    /// 提取查询图片的特征并保存为查询描述符文件
    Prepare(PrepareCommand),
    /// 使用查询描述符搜索相似图片
    Query(QueryCommand),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}

pub(crate) fn existing_dir(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if !path.is_dir() {
        return Err(format!("不是一个已存在的目录: {}", s));
    }
    Ok(path)
}

pub(crate) fn existing_file(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if !path.is_file() {
        return Err(format!("不是一个已存在的文件: {}", s));
    }
    Ok(path)
}
