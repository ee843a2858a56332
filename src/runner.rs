//! 并行批处理
//!
//! 每个 worker 独占一个线程，并且只初始化一次；任务按 `chunk_size` 分批发送给空闲的 worker，
//! 结果按到达顺序收集。单个条目的失败不会中断整个批次。

use std::any::Any;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{bounded, unbounded};
use indicatif::ProgressBar;
use log::{debug, error, info, warn};
use rayon::ThreadPoolBuilder;

use crate::config::RunnerOptions;
use crate::error::{Error, Result};
use crate::ranking::{MatchResult, TopMatches};
use crate::utils::pb_style;

/// 批处理中的单个 worker，状态只属于它所在的线程
pub trait Worker: Sized {
    /// 所有 worker 共享的只读初始化参数
    type Config: Sync;

    /// 每个 worker 在处理任何条目之前调用一次
    fn init(config: &Self::Config) -> Result<Self>;

    /// 处理一个条目
    fn process(&mut self, path: &Path) -> Result<MatchResult>;

    /// 条目处理失败时，结果中记录的路径
    fn label(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Symlink,
    NotFile,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symlink => write!(f, "符号链接"),
            Self::NotFile => write!(f, "非文件"),
        }
    }
}

/// 单个条目的处理结果
#[derive(Debug)]
pub enum ItemOutcome {
    Scored(MatchResult),
    Failed { result: MatchResult, path: PathBuf, error: Error },
    Skipped { path: PathBuf, reason: SkipReason },
}

impl ItemOutcome {
    /// 跳过的条目不产生结果，失败的条目得分为 -1
    pub fn into_result(self) -> Option<MatchResult> {
        match self {
            Self::Scored(result) | Self::Failed { result, .. } => Some(result),
            Self::Skipped { .. } => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub scored: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Scored(_) => self.scored += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
            ItemOutcome::Skipped { .. } => self.skipped += 1,
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "成功 {}，失败 {}，跳过 {}", self.scored, self.failed, self.skipped)
    }
}

/// 只接受普通文件，符号链接和目录等一律跳过
pub fn check_regular_file(path: &Path) -> Result<(), SkipReason> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => Err(SkipReason::Symlink),
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(SkipReason::NotFile),
    }
}

/// 处理单个条目，任何错误（包括 panic）都在这里被截获
pub fn process_item<W: Worker>(worker: &mut W, path: &Path) -> ItemOutcome {
    if let Err(reason) = check_regular_file(path) {
        return ItemOutcome::Skipped { path: path.to_path_buf(), reason };
    }
    let result = panic::catch_unwind(AssertUnwindSafe(|| worker.process(path)))
        .unwrap_or_else(|payload| Err(Error::UnexpectedWorkerFailure(panic_message(&*payload))));
    match result {
        Ok(result) => ItemOutcome::Scored(result),
        Err(error) => ItemOutcome::Failed {
            result: MatchResult::failed(worker.label(path)),
            path: path.to_path_buf(),
            error,
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub struct BatchRunner {
    workers: usize,
    chunk_size: usize,
}

impl BatchRunner {
    pub fn new(workers: usize, chunk_size: usize) -> Self {
        Self { workers: workers.max(1), chunk_size: chunk_size.max(1) }
    }

    pub fn from_options(opts: &RunnerOptions) -> Self {
        Self::new(opts.workers(), opts.chunk_size())
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// 处理所有条目，返回按 `(score, path)` 升序排列的结果
    pub fn run<W: Worker>(&self, items: Vec<PathBuf>, config: &W::Config) -> Result<Vec<MatchResult>> {
        let mut results = vec![];
        self.run_with::<W, _>(items, config, |result| results.push(result))?;
        results.sort();
        Ok(results)
    }

    /// 处理所有条目，只保留得分最高的 `n` 个结果，按 `(score, path)` 降序返回
    pub fn run_top<W: Worker>(
        &self,
        items: Vec<PathBuf>,
        config: &W::Config,
        n: usize,
    ) -> Result<Vec<MatchResult>> {
        let mut top = TopMatches::new(n);
        self.run_with::<W, _>(items, config, |result| top.push(result))?;
        Ok(top.into_sorted_vec())
    }

    /// 处理所有条目，每得到一个结果就交给 `sink`
    ///
    /// 任意一个 worker 初始化失败时，整个批次会被中止并返回该错误。
    pub fn run_with<W, F>(&self, items: Vec<PathBuf>, config: &W::Config, mut sink: F) -> Result<BatchSummary>
    where
        W: Worker,
        F: FnMut(MatchResult),
    {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("picfind-worker-{}", i))
            .build()?;
        let pb = ProgressBar::new(items.len() as u64).with_style(pb_style());
        let abort = AtomicBool::new(false);
        let (job_tx, job_rx) = bounded::<Vec<PathBuf>>(self.workers * 2);
        let (out_tx, out_rx) = unbounded::<ItemOutcome>();
        let chunk_size = self.chunk_size;
        let mut summary = BatchSummary::default();

        debug!("启动 {} 个 worker，chunk_size = {}", self.workers, chunk_size);

        let joined = thread::scope(|s| {
            let abort = &abort;
            let pool = &pool;

            s.spawn(move || {
                for chunk in items.chunks(chunk_size) {
                    if abort.load(Ordering::Relaxed) || job_tx.send(chunk.to_vec()).is_err() {
                        break;
                    }
                }
            });

            let workers = s.spawn(move || {
                pool.broadcast(|ctx| {
                    let mut worker = match W::init(config) {
                        Ok(worker) => worker,
                        Err(e) => {
                            abort.store(true, Ordering::Relaxed);
                            return Err(e);
                        }
                    };
                    debug!("worker {} 初始化完成", ctx.index());
                    for chunk in job_rx.iter() {
                        if abort.load(Ordering::Relaxed) {
                            break;
                        }
                        for path in chunk {
                            if out_tx.send(process_item(&mut worker, &path)).is_err() {
                                return Ok(());
                            }
                        }
                    }
                    Ok(())
                })
            });

            for outcome in out_rx.iter() {
                pb.inc(1);
                match &outcome {
                    ItemOutcome::Scored(result) => pb.set_message(result.path.display().to_string()),
                    ItemOutcome::Failed { path, error, .. } if error.is_invalid_computation() => {
                        pb.suspend(|| warn!("跳过无效图片 {}: {}", path.display(), error))
                    }
                    ItemOutcome::Failed { path, error, .. } => {
                        pb.suspend(|| error!("处理 {} 时出错: {}", path.display(), error))
                    }
                    ItemOutcome::Skipped { path, reason } => {
                        pb.suspend(|| info!("跳过{}: {}", reason, path.display()))
                    }
                }
                summary.record(&outcome);
                if let Some(result) = outcome.into_result() {
                    sink(result);
                }
            }

            workers.join()
        });
        pb.finish_and_clear();

        let joined = joined
            .map_err(|_| Error::UnexpectedWorkerFailure("worker 线程崩溃".to_string()))?;
        for result in joined {
            result?;
        }
        Ok(summary)
    }
}
