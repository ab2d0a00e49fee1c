// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Result};
use log::{info, warn};
use ndarray::{Array, IxDyn};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use crate::error::PpeError;

/// YOLOv8 导出模型的默认输出名
pub const OUTPUT_NAME: &str = "output0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrtEP {
    CPU,
    CUDA(i32),
}

#[derive(Debug, Clone)]
pub struct OrtConfig {
    pub f: PathBuf,
    pub ep: OrtEP,
    /// (height, width)
    pub image_size: (u32, u32),
}

/// 单个 ONNX 会话, 由一个线程独占使用
pub struct OrtBackend {
    session: Session,
    name: String,
    height: u32,
    width: u32,
}

impl OrtBackend {
    pub fn build(config: OrtConfig) -> crate::Result<Self> {
        let path = config.f.as_path();
        if !path.is_file() {
            return Err(load_error(path, "model file does not exist"));
        }

        let builder = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .map_err(|e| load_error(path, e))?;

        let (builder, ep) = match config.ep {
            OrtEP::CPU => (builder, OrtEP::CPU),
            OrtEP::CUDA(device_id) => with_cuda(builder, device_id),
        };

        let session = builder
            .commit_from_file(path)
            .map_err(|e| load_error(path, e))?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let (height, width) = config.image_size;
        info!("loaded {} ({:?}, {}x{})", name, ep, width, height);

        Ok(Self {
            session,
            name,
            height,
            width,
        })
    }

    /// 输入 [1, 3, H, W], 返回第一个输出张量
    pub fn run(&mut self, xs: Array<f32, IxDyn>, profile: bool) -> Result<Array<f32, IxDyn>> {
        let t = Instant::now();
        let input = Tensor::from_array(xs)?;
        let outputs = self.session.run(ort::inputs![input])?;
        let output = outputs
            .get(OUTPUT_NAME)
            .ok_or_else(|| anyhow!("missing {} tensor", OUTPUT_NAME))?;
        let (shape, data) = output.try_extract_tensor::<f32>()?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let ys = Array::from_shape_vec(IxDyn(&dims), data.to_vec())?;
        if profile {
            info!("[{} inference]: {:?}", self.name, t.elapsed());
        }
        Ok(ys)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }
}

fn load_error(path: &Path, err: impl std::fmt::Display) -> PpeError {
    PpeError::ModelLoad {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[cfg(feature = "cuda")]
fn with_cuda(
    builder: ort::session::builder::SessionBuilder,
    device_id: i32,
) -> (ort::session::builder::SessionBuilder, OrtEP) {
    use ort::execution_providers::CUDAExecutionProvider;

    match builder
        .clone()
        .with_execution_providers([CUDAExecutionProvider::default()
            .with_device_id(device_id)
            .build()])
    {
        Ok(b) => (b, OrtEP::CUDA(device_id)),
        Err(e) => {
            warn!("CUDA execution provider unavailable ({}), using CPU", e);
            (builder, OrtEP::CPU)
        }
    }
}

#[cfg(not(feature = "cuda"))]
fn with_cuda(
    builder: ort::session::builder::SessionBuilder,
    _device_id: i32,
) -> (ort::session::builder::SessionBuilder, OrtEP) {
    warn!("built without the `cuda` feature, using CPU");
    (builder, OrtEP::CPU)
}
