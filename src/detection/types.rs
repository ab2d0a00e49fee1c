// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// PPE检测系统数据结构定义
/// Data structures for the PPE detection pipeline
use std::path::{Path, PathBuf};

use serde::Serialize;

// ========== 枚举类型 ==========

/// 坐标系 (Coordinate frame)
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "space", rename_all = "snake_case")]
pub enum Frame {
    /// 原图坐标
    ImageSpace,
    /// 裁剪图坐标, `origin` 为裁剪区域左上角在原图中的位置
    CropSpace { ox: f32, oy: f32 },
}

impl Frame {
    pub fn crop(ox: f32, oy: f32) -> Self {
        Frame::CropSpace { ox, oy }
    }

    pub fn origin(&self) -> (f32, f32) {
        match *self {
            Frame::ImageSpace => (0.0, 0.0),
            Frame::CropSpace { ox, oy } => (ox, oy),
        }
    }
}

// ========== 数据结构 ==========

/// 检测框 (x1, y1, x2, y2), 保证 x1 <= x2, y1 <= y2
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize)]
pub struct BBox {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl BBox {
    /// 角点顺序颠倒时自动交换
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn from_xywh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(x, y, x + w, y + h)
    }

    pub fn x1(&self) -> f32 {
        self.x1
    }

    pub fn y1(&self) -> f32 {
        self.y1
    }

    pub fn x2(&self) -> f32 {
        self.x2
    }

    pub fn y2(&self) -> f32 {
        self.y2
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn is_degenerate(&self) -> bool {
        self.area() <= 0.0
    }

    /// 平移 (dx, dy)
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }

    /// 限制在 [0, width] x [0, height] 范围内
    pub fn clamp(&self, width: f32, height: f32) -> Self {
        Self {
            x1: self.x1.clamp(0.0, width),
            y1: self.y1.clamp(0.0, height),
            x2: self.x2.clamp(0.0, width),
            y2: self.y2.clamp(0.0, height),
        }
    }

    pub fn intersection_area(&self, another: &BBox) -> f32 {
        let w = (self.x2.min(another.x2) - self.x1.max(another.x1)).max(0.0);
        let h = (self.y2.min(another.y2) - self.y1.max(another.y1)).max(0.0);
        w * h
    }
}

/// 检测器原始输出 (裁剪图坐标)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawDetection {
    pub bbox: BBox,
    pub score: f32,
    pub class_id: u32,
}

impl RawDetection {
    pub fn new(bbox: BBox, score: f32, class_id: u32) -> Self {
        Self {
            bbox,
            score,
            class_id,
        }
    }
}

/// 检测结果 (不可变, 重映射坐标时生成新实例)
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Detection {
    bbox: BBox,
    class_id: u32,
    score: f32,
    frame: Frame,
}

impl Detection {
    pub fn new(bbox: BBox, class_id: u32, score: f32, frame: Frame) -> Self {
        Self {
            bbox,
            class_id,
            score,
            frame,
        }
    }

    pub fn from_raw(raw: RawDetection, frame: Frame) -> Self {
        Self::new(raw.bbox, raw.class_id, raw.score, frame)
    }

    pub fn bbox(&self) -> &BBox {
        &self.bbox
    }

    pub fn class_id(&self) -> u32 {
        self.class_id
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }
}

/// 第一阶段检测出的人 (原图坐标)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PersonRegion {
    pub bbox: BBox,
    pub score: f32,
}

impl PersonRegion {
    pub fn new(bbox: BBox, score: f32) -> Self {
        Self { bbox, score }
    }
}

/// 单张图片的最终结果
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageResult {
    source: PathBuf,
    width: u32,
    height: u32,
    persons: usize,
    detections: Vec<Detection>,
}

impl ImageResult {
    pub fn new(
        source: PathBuf,
        (width, height): (u32, u32),
        persons: usize,
        detections: Vec<Detection>,
    ) -> Self {
        Self {
            source,
            width,
            height,
            persons,
            detections,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 第一阶段检测到的人数 (人框本身不在结果中)
    pub fn persons(&self) -> usize {
        self.persons
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

/// 单张图片处理的终态
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageOutcome {
    Success(ImageResult),
    Failure { source: PathBuf, reason: String },
    /// 批次超时, 未处理
    Skipped { source: PathBuf },
}

impl ImageOutcome {
    pub fn source(&self) -> &Path {
        match self {
            ImageOutcome::Success(r) => r.source(),
            ImageOutcome::Failure { source, .. } | ImageOutcome::Skipped { source } => source,
        }
    }

    pub fn result(&self) -> Option<&ImageResult> {
        match self {
            ImageOutcome::Success(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ImageOutcome::Success(_))
    }
}
