// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 批量处理 (Batch Runner)
//!
//! 每个工作线程独占一套 `Pipeline` (模型实例不共享), 通过任务队列领取图片;
//! 结果按输入顺序汇总. 单张图片失败只记录为 Failure, 批次继续.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use image::DynamicImage;
use log::{debug, error, info, warn};
use serde::Serialize;

use super::orchestrator::Pipeline;
use crate::detection::{ImageOutcome, ImageResult};
use crate::error::{PpeError, Result};

/// 结果输出 (标注图片写盘等), 在工作线程中调用
pub trait ResultSink: Sync {
    fn accept(&self, result: &ImageResult, image: &DynamicImage) -> Result<()>;
}

/// 丢弃所有结果
pub struct NullSink;

impl ResultSink for NullSink {
    fn accept(&self, _result: &ImageResult, _image: &DynamicImage) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct BatchSummary {
    pub started_at: String,
    pub elapsed_ms: u64,
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_detections: usize,
    pub outcomes: Vec<ImageOutcome>,
}

impl BatchSummary {
    fn new(started_at: String, elapsed: Duration, outcomes: Vec<ImageOutcome>) -> Self {
        let mut summary = Self {
            started_at,
            elapsed_ms: elapsed.as_millis() as u64,
            processed: 0,
            failed: 0,
            skipped: 0,
            total_detections: 0,
            outcomes: Vec::new(),
        };
        for outcome in &outcomes {
            match outcome {
                ImageOutcome::Success(r) => {
                    summary.processed += 1;
                    summary.total_detections += r.detections().len();
                }
                ImageOutcome::Failure { .. } => summary.failed += 1,
                ImageOutcome::Skipped { .. } => summary.skipped += 1,
            }
        }
        summary.outcomes = outcomes;
        summary
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// 用给定的流水线 (每个工作线程一套) 处理全部图片.
/// `timeout` 到期后尚未开始的图片记为 Skipped.
pub fn run_batch(
    pipelines: Vec<Pipeline>,
    images: &[PathBuf],
    sink: &dyn ResultSink,
    timeout: Option<Duration>,
) -> Result<BatchSummary> {
    if pipelines.is_empty() {
        return Err(PpeError::config("batch needs at least one pipeline"));
    }

    let started_at = chrono::Utc::now().to_rfc3339();
    let t_start = Instant::now();
    let deadline = timeout.map(|t| t_start + t);
    let total = images.len();
    info!("processing {} images with {} workers", total, pipelines.len());

    let (job_tx, job_rx) = unbounded::<(usize, PathBuf)>();
    for job in images.iter().cloned().enumerate() {
        // 接收端在本函数内存活, 发送不会失败
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    let (res_tx, res_rx) = unbounded::<(usize, ImageOutcome)>();
    let mut slots: Vec<Option<ImageOutcome>> = vec![None; total];

    std::thread::scope(|s| {
        for (worker, mut pipeline) in pipelines.into_iter().enumerate() {
            let job_rx = job_rx.clone();
            let res_tx = res_tx.clone();
            s.spawn(move || {
                for (index, path) in job_rx.iter() {
                    let outcome = if deadline.is_some_and(|d| Instant::now() >= d) {
                        ImageOutcome::Skipped { source: path }
                    } else {
                        process_one(&mut pipeline, path, sink)
                    };
                    debug!("worker {} finished image {}", worker, index);
                    if res_tx.send((index, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(res_tx);

        for (done, (index, outcome)) in res_rx.iter().enumerate() {
            if let ImageOutcome::Success(r) = &outcome {
                info!(
                    "[{}/{}] {}: {} persons, {} detections",
                    done + 1,
                    total,
                    r.source().display(),
                    r.persons(),
                    r.detections().len()
                );
            }
            slots[index] = Some(outcome);
        }
    });

    let outcomes: Vec<ImageOutcome> = slots
        .into_iter()
        .zip(images)
        .map(|(slot, path)| {
            slot.unwrap_or_else(|| ImageOutcome::Skipped {
                source: path.clone(),
            })
        })
        .collect();

    let summary = BatchSummary::new(started_at, t_start.elapsed(), outcomes);
    if summary.skipped > 0 {
        warn!("batch deadline reached, {} images skipped", summary.skipped);
    }
    info!(
        "batch done in {} ms: {} processed, {} failed, {} skipped, {} detections",
        summary.elapsed_ms,
        summary.processed,
        summary.failed,
        summary.skipped,
        summary.total_detections
    );
    Ok(summary)
}

fn process_one(pipeline: &mut Pipeline, path: PathBuf, sink: &dyn ResultSink) -> ImageOutcome {
    let run = panic::catch_unwind(AssertUnwindSafe(|| pipeline.process_path(&path)));
    let (outcome, image) = match run {
        Ok(pair) => pair,
        Err(_) => {
            error!("{}: pipeline panicked", path.display());
            return ImageOutcome::Failure {
                source: path,
                reason: "pipeline panicked".to_string(),
            };
        }
    };

    if let (ImageOutcome::Success(result), Some(image)) = (&outcome, &image) {
        if let Err(e) = sink.accept(result, image) {
            error!("{}: {}", path.display(), e);
            return ImageOutcome::Failure {
                source: path,
                reason: e.to_string(),
            };
        }
    }
    outcome
}
