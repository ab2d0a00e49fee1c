// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 集成聚合器 (Ensemble Aggregator)
//! 职责: N个PPE模型 → 同一裁剪图 → 合并所有输出 → 贪心NMS

use std::panic::{self, AssertUnwindSafe};

use image::DynamicImage;
use log::{debug, warn};

use super::nms::{merge, NmsThresholds};
use super::types::{Detection, Frame, RawDetection};
use crate::error::{PpeError, Result};
use crate::models::PpeDetector;

pub struct Ensemble {
    detectors: Vec<Box<dyn PpeDetector>>,
    thresholds: NmsThresholds,
    parallel: bool,
}

impl Ensemble {
    /// 没有任何模型时返回配置错误
    pub fn new(detectors: Vec<Box<dyn PpeDetector>>, thresholds: NmsThresholds) -> Result<Self> {
        if detectors.is_empty() {
            return Err(PpeError::config("no PPE detectors configured"));
        }
        thresholds.validate()?;
        Ok(Self {
            detectors,
            thresholds,
            parallel: false,
        })
    }

    /// 每个模型在独立线程上推理 (各自独占实例, 共享只读裁剪图)
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn thresholds(&self) -> NmsThresholds {
        self.thresholds
    }

    pub fn detectors(&self) -> &[Box<dyn PpeDetector>] {
        &self.detectors
    }

    /// 对裁剪图运行全部模型, 返回合并后的裁剪图坐标检测结果
    pub fn detect(&mut self, crop: &DynamicImage, origin: (f32, f32)) -> Vec<Detection> {
        let per_model = if self.parallel && self.detectors.len() > 1 {
            self.collect_parallel(crop)
        } else {
            self.collect_sequential(crop)
        };

        let frame = Frame::crop(origin.0, origin.1);
        let pool: Vec<Detection> = per_model
            .into_iter()
            .flatten()
            .map(|raw| Detection::from_raw(raw, frame))
            .collect();

        let candidates = pool.len();
        let merged = merge(pool, self.thresholds);
        debug!(
            "ensemble: {} models, {} candidates -> {} kept",
            self.detectors.len(),
            candidates,
            merged.len()
        );
        merged
    }

    fn collect_sequential(&mut self, crop: &DynamicImage) -> Vec<Vec<RawDetection>> {
        self.detectors
            .iter_mut()
            .map(|d| {
                let name = d.name().to_string();
                let run = panic::catch_unwind(AssertUnwindSafe(|| d.detect(crop)));
                contribution(&name, run)
            })
            .collect()
    }

    fn collect_parallel(&mut self, crop: &DynamicImage) -> Vec<Vec<RawDetection>> {
        let names: Vec<String> = self.detectors.iter().map(|d| d.name().to_string()).collect();

        std::thread::scope(|s| {
            let handles: Vec<_> = self
                .detectors
                .iter_mut()
                .map(|d| s.spawn(move || d.detect(crop)))
                .collect();

            // 按模型顺序汇总, 与顺序执行结果一致
            handles
                .into_iter()
                .zip(names)
                .map(|(handle, name)| contribution(&name, handle.join()))
                .collect()
        })
    }
}

/// 单个模型的产出; 出错或 panic 时记 warn 并视为空
fn contribution<E>(
    name: &str,
    run: std::result::Result<anyhow::Result<Vec<RawDetection>>, E>,
) -> Vec<RawDetection> {
    match run {
        Ok(Ok(dets)) => dets,
        Ok(Err(e)) => {
            warn!("{}, contributing no detections", PpeError::inference(name, e));
            Vec::new()
        }
        Err(_) => {
            warn!("model '{}' panicked, contributing no detections", name);
            Vec::new()
        }
    }
}
