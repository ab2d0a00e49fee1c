// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ppe_ensemble::{
    BBox, ClassTaxonomy, PersonDetector, PersonRegion, Pipeline, PipelineConfig, PpeDetector,
    RawDetection,
};

/// 把图片左半部分当作一个人
pub struct LeftHalfPerson;

impl PersonDetector for LeftHalfPerson {
    fn name(&self) -> &str {
        "left-half"
    }

    fn detect(&mut self, image: &DynamicImage) -> anyhow::Result<Vec<PersonRegion>> {
        let (w, h) = image.dimensions();
        let bbox = BBox::new(0., 0., (w / 2) as f32, h as f32);
        Ok(vec![PersonRegion::new(bbox, 0.95)])
    }
}

/// 固定输出的PPE模型
pub struct FixedPpe {
    pub name: &'static str,
    pub output: Vec<RawDetection>,
}

impl PpeDetector for FixedPpe {
    fn name(&self) -> &str {
        self.name
    }

    fn num_classes(&self) -> Option<usize> {
        Some(7)
    }

    fn detect(&mut self, _crop: &DynamicImage) -> anyhow::Result<Vec<RawDetection>> {
        Ok(self.output.clone())
    }
}

pub fn raw(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, class_id: u32) -> RawDetection {
    RawDetection::new(BBox::new(x1, y1, x2, y2), score, class_id)
}

/// 两个模型在同一位置检测到安全帽 (分数 0.9 / 0.7)
pub fn hard_hat_pipeline(taxonomy: &Arc<ClassTaxonomy>, config: PipelineConfig) -> Pipeline {
    let models: Vec<Box<dyn PpeDetector>> = vec![
        Box::new(FixedPpe {
            name: "ppe_fold_0",
            output: vec![raw(10., 10., 40., 40., 0.9, 0)],
        }),
        Box::new(FixedPpe {
            name: "ppe_fold_1",
            output: vec![raw(12., 11., 41., 39., 0.7, 0), raw(5., 60., 30., 90., 0.2, 5)],
        }),
    ];
    Pipeline::new(Box::new(LeftHalfPerson), models, taxonomy.clone(), config).unwrap()
}

pub fn write_image(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(w, h, Rgb([200, 200, 200]))
        .save(&path)
        .unwrap();
    path
}
