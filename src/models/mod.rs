// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 模型统一接口与实现
///
/// # 架构说明
///
/// 流水线核心只依赖两个能力接口, 不依赖具体模型类型:
/// - **PersonDetector**: 第一阶段, 整图 → 人框
/// - **PpeDetector**: 第二阶段, 人的裁剪图 → PPE框 (裁剪图坐标)
///
/// 具体推理后端通过适配器实现这些 trait:
/// - **YOLOv8** (`onnx` feature): ONNX Runtime 推理, 文件: `yolov8.rs`
///
/// ## 使用示例
/// ```ignore
/// use ppe_ensemble::models::{PpeDetector, YOLOv8, YOLOv8Config};
///
/// let mut model = YOLOv8::new(YOLOv8Config::new("weights/ppe_fold_0.onnx"))?;
/// let raw = model.detect(&crop)?;
/// ```
use std::path::{Path, PathBuf};

use anyhow::Result;
use image::DynamicImage;

use crate::detection::{PersonRegion, RawDetection};
use crate::error::PpeError;

/// PPE模型文件名前缀 (交叉验证的各折模型)
pub const PPE_MODEL_PREFIX: &str = "ppe_fold_";
/// 模型文件扩展名
pub const MODEL_EXTENSION: &str = "onnx";

/// 第一阶段: 人体检测
///
/// `detect` 需要 `&mut self`: 推理会话按实例独占, 每个工作线程持有自己的一套模型.
pub trait PersonDetector: Send {
    /// 模型名称 (用于日志)
    fn name(&self) -> &str;

    /// 整图检测, 返回原图坐标的人框; 没有人时返回空列表
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<PersonRegion>>;
}

/// 第二阶段: PPE检测 (集成中的一个成员)
pub trait PpeDetector: Send {
    /// 模型名称 (用于日志)
    fn name(&self) -> &str;

    /// 模型可输出的类别数, 未知时返回 None
    fn num_classes(&self) -> Option<usize> {
        None
    }

    /// 裁剪图检测, 返回裁剪图坐标的检测框
    fn detect(&mut self, crop: &DynamicImage) -> Result<Vec<RawDetection>>;
}

/// 扫描PPE模型目录: `ppe_fold_*.onnx`, 按文件名排序
pub fn discover_ppe_models(dir: &Path) -> crate::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| PpeError::io(dir, e))?;

    let mut models = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PpeError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let is_model = name.starts_with(PPE_MODEL_PREFIX)
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(MODEL_EXTENSION));
        if is_model {
            models.push(path);
        } else {
            log::debug!("skipping non-model file {}", path.display());
        }
    }
    models.sort();
    Ok(models)
}

// 各模型的具体实现
#[cfg(feature = "onnx")]
pub mod yolov8; // YOLOv8 ONNX 适配器

#[cfg(feature = "onnx")]
pub use yolov8::{YOLOv8, YOLOv8Config};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_ppe_models_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "ppe_fold_2.onnx",
            "ppe_fold_0.onnx",
            "ppe_fold_1.ONNX",
            "ppe_fold_3.pt",
            "person.onnx",
            "notes.txt",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("ppe_fold_9.onnx")).unwrap();

        let found: Vec<String> = discover_ppe_models(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            found,
            vec!["ppe_fold_0.onnx", "ppe_fold_1.ONNX", "ppe_fold_2.onnx"]
        );
    }

    #[test]
    fn test_discover_missing_dir_is_io_error() {
        let err = discover_ppe_models(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, PpeError::Io { .. }));
    }
}
