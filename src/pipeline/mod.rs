// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 图片处理流水线 (Image Processing Pipeline)
///
/// - orchestrator: 单张图片 人体检测 → 裁剪 → 集成PPE检测 → 重映射
/// - batch:        多工作线程批处理, 每个线程独占一套模型
pub mod batch;
pub mod orchestrator;

pub use batch::{run_batch, BatchSummary, NullSink, ResultSink};
pub use orchestrator::{crop_region, load_image, Pipeline};
