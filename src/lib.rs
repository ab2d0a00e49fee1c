// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 运行参数与流水线配置
pub mod detection; // 检测融合: IoU / NMS / 集成 / 坐标重映射
pub mod error; // 错误类型
pub mod input; // 图片输入
pub mod models; // 模型接口与具体实现
pub mod output; // 标注图片与汇总输出
pub mod pipeline; // 单图流水线与批处理
pub mod renderer; // 检测框绘制
pub mod taxonomy; // PPE类别表

#[cfg(feature = "onnx")]
pub mod ort_backend;

pub use crate::config::{Args, PipelineConfig};
pub use crate::detection::{
    iou, merge, BBox, Detection, Ensemble, Frame, ImageOutcome, ImageResult, NmsThresholds,
    PersonRegion, RawDetection,
};
pub use crate::error::{PpeError, Result};
pub use crate::models::{discover_ppe_models, PersonDetector, PpeDetector};
#[cfg(feature = "onnx")]
pub use crate::models::{YOLOv8, YOLOv8Config};
#[cfg(feature = "onnx")]
pub use crate::ort_backend::{OrtBackend, OrtConfig, OrtEP};
pub use crate::pipeline::{run_batch, BatchSummary, Pipeline, ResultSink};
pub use crate::taxonomy::{ClassInfo, ClassTaxonomy};
