// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! IoU (Intersection over Union)

use super::types::BBox;

/// 两个框的 IoU, 并集面积为0时 (退化框) 返回0
pub fn iou(a: &BBox, b: &BBox) -> f32 {
    let intersection = a.intersection_area(b);
    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        0.0
    } else {
        (intersection / union).clamp(0.0, 1.0)
    }
}

/// 一个参考框对多个候选框, 输出长度与 `candidates` 相同
pub fn iou_many(reference: &BBox, candidates: &[BBox]) -> Vec<f32> {
    candidates.iter().map(|b| iou(reference, b)).collect()
}
