// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 贪心 NMS 合并器 (Greedy NMS Merger)
//!
//! 类别无关 (class-agnostic): 不同类别但高度重叠的框同样视为重复.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use super::iou::iou_many;
use super::types::{BBox, Detection};
use crate::error::{PpeError, Result};

/// 默认 IoU 阈值
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.5;
/// 默认分数阈值
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NmsThresholds {
    /// IoU >= iou 时抑制低分框
    pub iou: f32,
    /// 最终保留 score >= score 的框
    pub score: f32,
}

impl Default for NmsThresholds {
    fn default() -> Self {
        Self {
            iou: DEFAULT_IOU_THRESHOLD,
            score: DEFAULT_SCORE_THRESHOLD,
        }
    }
}

impl NmsThresholds {
    pub fn new(iou: f32, score: f32) -> Result<Self> {
        let t = Self { iou, score };
        t.validate()?;
        Ok(t)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.iou) {
            return Err(PpeError::config(format!(
                "iou threshold must be within [0, 1], got {}",
                self.iou
            )));
        }
        if !(0.0..=1.0).contains(&self.score) {
            return Err(PpeError::config(format!(
                "score threshold must be within [0, 1], got {}",
                self.score
            )));
        }
        Ok(())
    }
}

// NaN 排在最后
fn sort_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

/// 按分数降序稳定排序, 同分保持输入顺序
fn sort_by_score(detections: &mut [Detection]) {
    detections.sort_by(|a, b| sort_key(b.score()).total_cmp(&sort_key(a.score())));
}

/// 贪心NMS: 取最高分 → 删除与其 IoU >= τ_iou 的候选 → 重复; 最后按 τ_score 过滤
///
/// 输出是输入的子集, 输出内部两两 IoU < τ_iou.
pub fn merge(mut detections: Vec<Detection>, thresholds: NmsThresholds) -> Vec<Detection> {
    sort_by_score(&mut detections);

    let mut pool: VecDeque<Detection> = detections.into();
    let mut keep = Vec::with_capacity(pool.len());
    while let Some(best) = pool.pop_front() {
        let boxes: Vec<BBox> = pool.iter().map(|d| *d.bbox()).collect();
        let mut ious = iou_many(best.bbox(), &boxes).into_iter();
        pool.retain(|_| ious.next().is_some_and(|v| v < thresholds.iou));
        keep.push(best);
    }

    keep.retain(|d| d.score() >= thresholds.score);
    keep
}

/// 按类别分组分别做NMS (单模型后处理使用), 结果按分数降序
pub fn merge_by_class(detections: Vec<Detection>, thresholds: NmsThresholds) -> Vec<Detection> {
    let mut groups: BTreeMap<u32, Vec<Detection>> = BTreeMap::new();
    for d in detections {
        groups.entry(d.class_id()).or_default().push(d);
    }

    let mut merged: Vec<Detection> = groups
        .into_values()
        .flat_map(|group| merge(group, thresholds))
        .collect();
    sort_by_score(&mut merged);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::iou::iou;
    use crate::detection::types::Frame;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, class_id: u32, score: f32) -> Detection {
        Detection::new(BBox::new(x1, y1, x2, y2), class_id, score, Frame::ImageSpace)
    }

    #[test]
    fn test_empty_input() {
        assert!(merge(vec![], NmsThresholds::default()).is_empty());
    }

    #[test]
    fn test_single_detection_score_gate() {
        let t = NmsThresholds::default();
        assert_eq!(merge(vec![det(0., 0., 5., 5., 0, 0.5)], t).len(), 1);
        assert!(merge(vec![det(0., 0., 5., 5., 0, 0.3)], t).is_empty());
    }

    #[test]
    fn test_keeps_higher_score_of_duplicates() {
        let low = det(10., 10., 40., 40., 0, 0.7);
        let high = det(10., 10., 40., 40., 0, 0.9);
        let out = merge(vec![low, high], NmsThresholds::default());
        assert_eq!(out, vec![high]);
    }

    #[test]
    fn test_class_agnostic_suppression() {
        let hat = det(10., 10., 40., 40., 0, 0.9);
        let mask = det(11., 10., 40., 41., 2, 0.8);
        let out = merge(vec![mask, hat], NmsThresholds::default());
        assert_eq!(out, vec![hat]);
    }

    #[test]
    fn test_iou_equal_to_threshold_is_suppressed() {
        // 两个 10x10 框错开一半: 交集50, 并集150 → IoU = 1/3
        let a = det(0., 0., 10., 10., 0, 0.9);
        let b = det(5., 0., 15., 10., 0, 0.8);
        let third = iou(a.bbox(), b.bbox());
        let t = NmsThresholds::new(third, 0.5).unwrap();
        assert_eq!(merge(vec![a, b], t), vec![a]);
    }

    #[test]
    fn test_suppression_happens_before_score_filter() {
        // 高分框(0.4)低于τ_score, 但仍先抑制了重叠的0.35框; 两者最终都不保留
        let a = det(0., 0., 10., 10., 0, 0.4);
        let b = det(0., 0., 10., 10., 1, 0.35);
        let far = det(50., 50., 60., 60., 1, 0.6);
        let out = merge(vec![b, far, a], NmsThresholds::default());
        assert_eq!(out, vec![far]);
    }

    #[test]
    fn test_ties_are_stable_by_input_order() {
        let first = det(0., 0., 10., 10., 0, 0.8);
        let second = det(1., 1., 10., 10., 1, 0.8);
        assert_eq!(
            merge(vec![first, second], NmsThresholds::default()),
            vec![first]
        );
        assert_eq!(
            merge(vec![second, first], NmsThresholds::default()),
            vec![second]
        );
    }

    #[test]
    fn test_nan_score_is_dropped() {
        let nan = det(0., 0., 10., 10., 0, f32::NAN);
        let ok = det(0., 0., 10., 10., 0, 0.6);
        let out = merge(vec![nan, ok], NmsThresholds::default());
        assert_eq!(out, vec![ok]);
    }

    #[test]
    fn test_subset_non_overlapping_and_idempotent() {
        let input = vec![
            det(0., 0., 20., 20., 0, 0.55),
            det(2., 2., 22., 22., 1, 0.95),
            det(30., 30., 60., 60., 3, 0.7),
            det(31., 29., 61., 62., 3, 0.72),
            det(100., 0., 120., 10., 5, 0.51),
            det(101., 0., 121., 10., 5, 0.2),
            det(0., 100., 50., 150., 6, 0.49),
        ];
        let t = NmsThresholds::default();
        let out = merge(input.clone(), t);

        for d in &out {
            assert!(input.contains(d));
            assert!(d.score() >= t.score);
        }
        for (i, a) in out.iter().enumerate() {
            for b in &out[i + 1..] {
                assert!(iou(a.bbox(), b.bbox()) < t.iou);
            }
        }
        assert_eq!(out.len(), 3);
        assert_eq!(merge(out.clone(), t), out);
    }

    #[test]
    fn test_merge_by_class_keeps_overlapping_classes() {
        let hat = det(10., 10., 40., 40., 0, 0.9);
        let mask = det(11., 10., 40., 41., 2, 0.8);
        let dup = det(10., 10., 40., 40., 0, 0.6);
        let out = merge_by_class(vec![dup, mask, hat], NmsThresholds::default());
        assert_eq!(out, vec![hat, mask]);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(NmsThresholds::new(0.5, 0.5).is_ok());
        assert!(NmsThresholds::new(1.5, 0.5).is_err());
        assert!(NmsThresholds::new(0.5, -0.1).is_err());
        assert!(NmsThresholds::new(f32::NAN, 0.5).is_err());
    }
}
