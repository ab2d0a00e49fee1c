// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv8 检测模型
// 包含: 模型加载、预处理、推理、后处理; 同一实现既可作人体检测器也可作PPE检测器

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use image::{DynamicImage, GenericImageView};
use log::info;
use ndarray::{s, Array, Axis, IxDyn};

use super::{PersonDetector, PpeDetector};
use crate::config::{DEFAULT_MODEL_CONF, DEFAULT_MODEL_IOU, INF_SIZE};
use crate::detection::{merge_by_class, BBox, Detection, Frame, NmsThresholds, PersonRegion, RawDetection};
use crate::error::PpeError;
use crate::ort_backend::{OrtBackend, OrtConfig, OrtEP};
use crate::taxonomy::PERSON_CLASS_ID;

const CXYWH_OFFSET: usize = 4;
/// letterbox 填充值
const PAD_VALUE: f32 = 144.0 / 255.0;

#[derive(Debug, Clone)]
pub struct YOLOv8Config {
    pub model: PathBuf,
    pub width: u32,
    pub height: u32,
    pub conf: f32,
    pub iou: f32,
    pub cuda: bool,
    pub device_id: i32,
    pub profile: bool,
}

impl YOLOv8Config {
    pub fn new(model: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            width: INF_SIZE,
            height: INF_SIZE,
            conf: DEFAULT_MODEL_CONF,
            iou: DEFAULT_MODEL_IOU,
            cuda: false,
            device_id: 0,
            profile: false,
        }
    }
}

pub struct YOLOv8 {
    engine: OrtBackend,
    nc: Option<usize>,
    conf: f32,
    iou: f32,
    profile: bool,
}

impl YOLOv8 {
    /// 加载模型并做一次预热推理 (同时确定类别数)
    pub fn new(config: YOLOv8Config) -> crate::Result<Self> {
        let ep = if config.cuda {
            OrtEP::CUDA(config.device_id)
        } else {
            OrtEP::CPU
        };
        let engine = OrtBackend::build(OrtConfig {
            f: config.model.clone(),
            ep,
            image_size: (config.height, config.width),
        })?;

        let mut model = Self {
            engine,
            nc: None,
            conf: config.conf,
            iou: config.iou,
            profile: config.profile,
        };

        let blank = DynamicImage::new_rgb8(model.width(), model.height());
        model.run(&blank).map_err(|e| PpeError::ModelLoad {
            path: config.model,
            message: format!("warm-up inference failed: {e:#}"),
        })?;
        Ok(model)
    }

    pub fn preprocess(&self, x: &DynamicImage) -> Result<Array<f32, IxDyn>> {
        letterbox(x, self.width(), self.height())
    }

    pub fn run(&mut self, x: &DynamicImage) -> Result<Vec<RawDetection>> {
        let t_pre = Instant::now();
        let xs = self.preprocess(x)?;
        if self.profile {
            info!("[{} preprocess]: {:?}", self.engine.name(), t_pre.elapsed());
        }

        let ys = self.engine.run(xs, self.profile)?;

        let t_post = Instant::now();
        let ys = self.postprocess(&ys, x.dimensions())?;
        if self.profile {
            info!("[{} postprocess]: {:?}", self.engine.name(), t_post.elapsed());
        }
        Ok(ys)
    }

    pub fn postprocess(
        &mut self,
        ys: &Array<f32, IxDyn>,
        original: (u32, u32),
    ) -> Result<Vec<RawDetection>> {
        let thresholds = NmsThresholds {
            iou: self.iou,
            score: self.conf,
        };
        let (nc, dets) = decode(ys, (self.width(), self.height()), original, thresholds)?;
        match self.nc {
            Some(known) if known != nc => {
                bail!("output has {} classes, model was loaded with {}", nc, known)
            }
            _ => self.nc = Some(nc),
        }
        Ok(dets)
    }

    pub fn width(&self) -> u32 {
        self.engine.width()
    }

    pub fn height(&self) -> u32 {
        self.engine.height()
    }
}

fn scale_wh(w0: f32, h0: f32, w1: f32, h1: f32) -> (f32, f32, f32) {
    let r = (w1 / w0).min(h1 / h0);
    (r, (w0 * r).round(), (h0 * r).round())
}

/// 等比缩放到左上角, 其余区域填充 → [1, 3, H, W]
pub fn letterbox(x: &DynamicImage, width: u32, height: u32) -> Result<Array<f32, IxDyn>> {
    let mut ys = Array::ones((1, 3, height as usize, width as usize)).into_dyn();
    ys.fill(PAD_VALUE);

    let (w0, h0) = x.dimensions();
    if w0 == 0 || h0 == 0 {
        bail!("empty input image");
    }
    let (_, w_new, h_new) = scale_wh(w0 as f32, h0 as f32, width as f32, height as f32);
    let img = x.resize_exact(
        (w_new as u32).clamp(1, width),
        (h_new as u32).clamp(1, height),
        image::imageops::FilterType::Triangle,
    );

    for (x, y, rgb) in img.pixels() {
        let x = x as usize;
        let y = y as usize;
        let [r, g, b, _] = rgb.0;
        ys[[0, 0, y, x]] = (r as f32) / 255.0;
        ys[[0, 1, y, x]] = (g as f32) / 255.0;
        ys[[0, 2, y, x]] = (b as f32) / 255.0;
    }
    Ok(ys)
}

/// 解码输出 [1, 4 + nc, anchors] (cx, cy, w, h + 各类别分数),
/// 坐标还原到原图并按类别做NMS. 返回 (nc, 检测结果)
pub fn decode(
    ys: &Array<f32, IxDyn>,
    (width, height): (u32, u32),
    (w0, h0): (u32, u32),
    thresholds: NmsThresholds,
) -> Result<(usize, Vec<RawDetection>)> {
    let shape = ys.shape();
    if shape.len() != 3 || shape[0] != 1 || shape[1] <= CXYWH_OFFSET {
        bail!("unexpected output shape {:?}, expected [1, 4 + nc, anchors]", shape);
    }
    let nc = shape[1] - CXYWH_OFFSET;
    let (width_original, height_original) = (w0 as f32, h0 as f32);
    let ratio = (width as f32 / width_original).min(height as f32 / height_original);

    let preds = ys.index_axis(Axis(0), 0);
    let mut data: Vec<Detection> = Vec::new();
    for pred in preds.axis_iter(Axis(1)) {
        let clss = pred.slice(s![CXYWH_OFFSET..]);
        let Some((id, &confidence)) = clss
            .iter()
            .enumerate()
            .reduce(|max, x| if x.1 > max.1 { x } else { max })
        else {
            continue;
        };
        if confidence < thresholds.score {
            continue;
        }

        let cx = pred[0] / ratio;
        let cy = pred[1] / ratio;
        let w = pred[2] / ratio;
        let h = pred[3] / ratio;
        let bbox = BBox::from_xywh(cx - w / 2., cy - h / 2., w, h)
            .clamp(width_original, height_original);
        data.push(Detection::new(bbox, id as u32, confidence, Frame::ImageSpace));
    }

    let dets = merge_by_class(data, thresholds)
        .into_iter()
        .map(|d| RawDetection::new(*d.bbox(), d.score(), d.class_id()))
        .collect();
    Ok((nc, dets))
}

/// 作为人体检测器: 只保留 person 类
impl PersonDetector for YOLOv8 {
    fn name(&self) -> &str {
        self.engine.name()
    }

    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<PersonRegion>> {
        Ok(self
            .run(image)?
            .into_iter()
            .filter(|d| d.class_id == PERSON_CLASS_ID)
            .map(|d| PersonRegion::new(d.bbox, d.score))
            .collect())
    }
}

impl PpeDetector for YOLOv8 {
    fn name(&self) -> &str {
        self.engine.name()
    }

    fn num_classes(&self) -> Option<usize> {
        self.nc
    }

    fn detect(&mut self, crop: &DynamicImage) -> Result<Vec<RawDetection>> {
        self.run(crop)
    }
}
