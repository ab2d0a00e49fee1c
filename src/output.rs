// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 结果输出: 标注图片写入输出目录 (与原文件同名), 批次汇总写入 summary.json

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ab_glyph::FontVec;
use image::DynamicImage;
use log::{debug, info};
use serde::Serialize;

use crate::detection::ImageResult;
use crate::error::{PpeError, Result};
use crate::pipeline::{BatchSummary, ResultSink};
use crate::renderer::draw_detections;
use crate::taxonomy::{ClassInfo, ClassTaxonomy};

pub const SUMMARY_FILE: &str = "summary.json";

pub struct AnnotatedWriter {
    output_dir: PathBuf,
    taxonomy: Arc<ClassTaxonomy>,
    font: Option<FontVec>,
}

impl AnnotatedWriter {
    /// 输出目录不存在时创建
    pub fn new(
        output_dir: impl Into<PathBuf>,
        taxonomy: Arc<ClassTaxonomy>,
        font: Option<FontVec>,
    ) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).map_err(|e| PpeError::io(&output_dir, e))?;
        Ok(Self {
            output_dir,
            taxonomy,
            font,
        })
    }

    pub fn output_path(&self, source: &Path) -> PathBuf {
        let file_name = source
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("image.png"));
        self.output_dir.join(file_name)
    }
}

impl ResultSink for AnnotatedWriter {
    fn accept(&self, result: &ImageResult, image: &DynamicImage) -> Result<()> {
        let annotated = draw_detections(image, result, &self.taxonomy, self.font.as_ref());
        let path = self.output_path(result.source());
        annotated.save(&path).map_err(|e| match e {
            image::ImageError::IoError(source) => PpeError::io(&path, source),
            other => PpeError::io(&path, std::io::Error::other(other)),
        })?;
        debug!("saved {}", path.display());
        Ok(())
    }
}

#[derive(Serialize)]
struct SummaryFile<'a> {
    #[serde(flatten)]
    summary: &'a BatchSummary,
    classes: Vec<&'a ClassInfo>,
}

/// 写入 `<dir>/summary.json`, 返回文件路径
pub fn write_summary(dir: &Path, summary: &BatchSummary, taxonomy: &ClassTaxonomy) -> Result<PathBuf> {
    let path = dir.join(SUMMARY_FILE);
    let file = SummaryFile {
        summary,
        classes: taxonomy.iter().collect(),
    };
    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| PpeError::io(&path, std::io::Error::other(e)))?;
    std::fs::write(&path, json).map_err(|e| PpeError::io(&path, e))?;
    info!("summary written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{BBox, Detection, Frame, ImageOutcome};

    fn result(source: &Path) -> ImageResult {
        let det = Detection::new(BBox::new(2., 2., 10., 10.), 0, 0.9, Frame::ImageSpace);
        ImageResult::new(source.to_path_buf(), (16, 16), 1, vec![det])
    }

    #[test]
    fn test_annotated_image_keeps_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out/nested");
        let writer =
            AnnotatedWriter::new(&out_dir, Arc::new(ClassTaxonomy::default()), None).unwrap();

        let source = dir.path().join("site_01.png");
        writer
            .accept(&result(&source), &DynamicImage::new_rgb8(16, 16))
            .unwrap();

        let saved = image::open(out_dir.join("site_01.png")).unwrap().to_rgb8();
        assert_eq!(saved.dimensions(), (16, 16));
        assert_eq!(saved.get_pixel(2, 5).0, [0, 0, 255]);
    }

    #[test]
    fn test_summary_json() {
        let dir = tempfile::tempdir().unwrap();
        let summary = BatchSummary {
            started_at: "2024-01-01T00:00:00+00:00".to_string(),
            elapsed_ms: 12,
            processed: 1,
            failed: 1,
            skipped: 0,
            total_detections: 1,
            outcomes: vec![
                ImageOutcome::Success(result(Path::new("a.png"))),
                ImageOutcome::Failure {
                    source: "b.png".into(),
                    reason: "unreadable image".to_string(),
                },
            ],
        };
        let path = write_summary(dir.path(), &summary, &ClassTaxonomy::default()).unwrap();
        assert_eq!(path, dir.path().join(SUMMARY_FILE));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["processed"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["outcomes"].as_array().unwrap().len(), 2);
        assert_eq!(json["outcomes"][0]["status"], "success");
        assert_eq!(json["outcomes"][1]["status"], "failure");
        assert_eq!(json["classes"].as_array().unwrap().len(), 7);
        assert_eq!(json["classes"][0]["name"], "hard-hat");
    }
}
