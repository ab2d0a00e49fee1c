// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 单张图片流水线 (Pipeline Orchestrator)
//! 流程: 读取图片 → 人体检测 → 逐人裁剪 → 集成PPE检测 → 坐标重映射 → 汇总

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use log::{debug, error, warn};

use crate::config::PipelineConfig;
use crate::detection::{remap_all, BBox, Detection, Ensemble, ImageOutcome, ImageResult};
use crate::error::{PpeError, Result};
use crate::models::{PersonDetector, PpeDetector};
use crate::taxonomy::ClassTaxonomy;

pub struct Pipeline {
    person: Box<dyn PersonDetector>,
    ensemble: Ensemble,
    taxonomy: Arc<ClassTaxonomy>,
    config: PipelineConfig,
}

impl Pipeline {
    /// 构建时完成全部配置校验: 没有PPE模型/阈值非法/类别表缺失类别 → 配置错误
    pub fn new(
        person: Box<dyn PersonDetector>,
        ppe: Vec<Box<dyn PpeDetector>>,
        taxonomy: Arc<ClassTaxonomy>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let ensemble =
            Ensemble::new(ppe, config.thresholds)?.with_parallel(config.parallel_ensemble);
        for detector in ensemble.detectors() {
            if let Some(nc) = detector.num_classes() {
                taxonomy.validate_classes(detector.name(), nc)?;
            }
        }
        Ok(Self {
            person,
            ensemble,
            taxonomy,
            config,
        })
    }

    pub fn ensemble_size(&self) -> usize {
        self.ensemble.len()
    }

    /// 处理单张图片文件; 任何错误都只体现为该图片的 Failure
    pub fn process_path(&mut self, path: &Path) -> (ImageOutcome, Option<DynamicImage>) {
        let image = match load_image(path) {
            Ok(image) => image,
            Err(e) => {
                warn!("{}", e);
                return (failure(path, &e), None);
            }
        };
        match self.process_image(path.to_path_buf(), &image) {
            Ok(result) => (ImageOutcome::Success(result), Some(image)),
            Err(e) => {
                if e.is_per_image() {
                    warn!("{}: {}", path.display(), e);
                } else {
                    error!("{}: {}", path.display(), e);
                }
                (failure(path, &e), None)
            }
        }
    }

    /// 对已解码图片运行完整流程
    pub fn process_image(&mut self, source: PathBuf, image: &DynamicImage) -> Result<ImageResult> {
        let t_start = Instant::now();
        let (width, height) = image.dimensions();

        let persons = self
            .person
            .detect(image)
            .map_err(|e| PpeError::inference(self.person.name(), e))?;
        let persons: Vec<_> = persons
            .into_iter()
            .filter(|p| p.score >= self.config.person_conf)
            .collect();
        debug!("{}: {} persons", source.display(), persons.len());

        let mut detections: Vec<Detection> = Vec::new();
        for person in &persons {
            let Some((crop, origin)) = crop_region(image, &person.bbox) else {
                debug!("person box {:?} is empty after clamping, skipped", person.bbox);
                continue;
            };
            let merged = self.ensemble.detect(&crop, origin);
            detections.extend(remap_all(&merged));
        }

        if let Some(unknown) = detections
            .iter()
            .find(|d| !self.taxonomy.contains(d.class_id()))
        {
            return Err(PpeError::config(format!(
                "detection class id {} is not in the taxonomy",
                unknown.class_id()
            )));
        }

        debug!(
            "{}: {} PPE detections in {:?}",
            source.display(),
            detections.len(),
            t_start.elapsed()
        );
        Ok(ImageResult::new(
            source,
            (width, height),
            persons.len(),
            detections,
        ))
    }
}

fn failure(path: &Path, err: &PpeError) -> ImageOutcome {
    ImageOutcome::Failure {
        source: path.to_path_buf(),
        reason: err.to_string(),
    }
}

pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|source| PpeError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })
}

/// 按人框裁剪 (限制在图片范围内, 坐标取整到像素), 返回裁剪图与其左上角偏移;
/// 裁剪区域为空时返回 None
pub fn crop_region(image: &DynamicImage, bbox: &BBox) -> Option<(DynamicImage, (f32, f32))> {
    let (width, height) = image.dimensions();
    let clamped = bbox.clamp(width as f32, height as f32);

    let x1 = clamped.x1().floor() as u32;
    let y1 = clamped.y1().floor() as u32;
    let x2 = clamped.x2().floor() as u32;
    let y2 = clamped.y2().floor() as u32;
    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    let crop = image.crop_imm(x1, y1, x2 - x1, y2 - y1);
    Some((crop, (x1 as f32, y1 as f32)))
}
