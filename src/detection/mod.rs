// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测融合系统 (Detection Fusion)
///
/// - types:    检测框 / 检测结果 / 图片结果
/// - iou:      交并比
/// - nms:      贪心NMS合并器 (类别无关)
/// - ensemble: 多模型集成聚合
/// - remap:    裁剪图坐标 → 原图坐标
pub mod ensemble;
pub mod iou;
pub mod nms;
pub mod remap;
pub mod types;

pub use ensemble::Ensemble;
pub use iou::{iou, iou_many};
pub use nms::{merge, merge_by_class, NmsThresholds};
pub use remap::{remap_all, to_crop_space, to_image_space};
pub use types::{BBox, Detection, Frame, ImageOutcome, ImageResult, PersonRegion, RawDetection};
