// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 错误类型 (Error kinds)
//!
//! - 单张图片级别: `ImageDecode` / `ModelInference` → 记录为该图片的 Failure, 不影响批次
//! - 全局级别: `Configuration` / `ModelLoad` → 在处理任何图片之前报错退出

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PpeError>;

#[derive(Debug, Error)]
pub enum PpeError {
    /// 图片无法读取或解码
    #[error("unreadable image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// 单个模型推理失败
    #[error("model '{model}' inference failed: {message}")]
    ModelInference { model: String, message: String },

    /// 模型加载失败
    #[error("failed to load model {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },

    /// 配置错误 (无PPE模型、阈值非法、类别表缺失等)
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PpeError {
    pub fn config(message: impl Into<String>) -> Self {
        PpeError::Configuration(message.into())
    }

    pub fn inference(model: impl Into<String>, err: impl std::fmt::Display) -> Self {
        PpeError::ModelInference {
            model: model.into(),
            message: format!("{err:#}"),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PpeError::Io {
            path: path.into(),
            source,
        }
    }

    /// 是否只影响单张图片
    pub fn is_per_image(&self) -> bool {
        matches!(
            self,
            PpeError::ImageDecode { .. } | PpeError::ModelInference { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_image_classification() {
        assert!(PpeError::inference("fold_0", "boom").is_per_image());
        assert!(!PpeError::config("no PPE models").is_per_image());
        let io = PpeError::io("out", std::io::Error::other("disk full"));
        assert!(!io.is_per_image());
    }

    #[test]
    fn test_inference_message_keeps_chain() {
        let err = anyhow::anyhow!("shape mismatch").context("postprocess");
        let e = PpeError::inference("ppe_fold_1", err);
        assert_eq!(
            e.to_string(),
            "model 'ppe_fold_1' inference failed: postprocess: shape mismatch"
        );
    }
}
