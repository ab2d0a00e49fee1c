// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 标注渲染: 在原图上画出PPE检测框 (类别颜色) 与 "标签: 分数"

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use log::debug;

use crate::detection::{BBox, ImageResult};
use crate::error::{PpeError, Result};
use crate::taxonomy::ClassTaxonomy;

/// 框线宽度 (像素)
pub const BOX_THICKNESS: i32 = 2;
pub const FONT_SCALE: f32 = 16.0;
/// 标签相对框顶的偏移
const LABEL_OFFSET: i32 = 10;

pub fn load_font(path: &Path) -> Result<FontVec> {
    let data = std::fs::read(path).map_err(|e| PpeError::io(path, e))?;
    FontVec::try_from_vec(data)
        .map_err(|_| PpeError::config(format!("failed to parse font file: {}", path.display())))
}

/// 不在类别表中的检测不绘制; 没有字体时只画框
pub fn draw_detections(
    image: &DynamicImage,
    result: &ImageResult,
    taxonomy: &ClassTaxonomy,
    font: Option<&FontVec>,
) -> RgbImage {
    let mut canvas = image.to_rgb8();
    let (w, h) = canvas.dimensions();
    if w == 0 || h == 0 {
        return canvas;
    }

    for det in result.detections() {
        let Some(class) = taxonomy.get(det.class_id()) else {
            debug!("class {} not in taxonomy, not drawn", det.class_id());
            continue;
        };
        let color = Rgb(class.color);

        for inset in 0..BOX_THICKNESS {
            if let Some(rect) = rect_from_bbox(det.bbox(), w, h, inset) {
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }
        }

        if let Some(font) = font {
            let text = format!("{}: {:.2}", class.name, det.score());
            let x = (det.bbox().x1() as i32).clamp(0, w as i32 - 1);
            let y = (det.bbox().y1() as i32 - LABEL_OFFSET).clamp(0, h as i32 - 1);
            draw_text_mut(&mut canvas, color, x, y, PxScale::from(FONT_SCALE), font, &text);
        }
    }
    canvas
}

/// 转为像素矩形 (限制在图片内), 向内收缩 `inset` 像素; 收缩后为空返回 None
fn rect_from_bbox(bbox: &BBox, img_w: u32, img_h: u32, inset: i32) -> Option<Rect> {
    let max_x = (img_w - 1) as f32;
    let max_y = (img_h - 1) as f32;

    let x1 = bbox.x1().clamp(0.0, max_x).round() as i32 + inset;
    let y1 = bbox.y1().clamp(0.0, max_y).round() as i32 + inset;
    let x2 = bbox.x2().clamp(0.0, max_x).round() as i32 - inset;
    let y2 = bbox.y2().clamp(0.0, max_y).round() as i32 - inset;
    if x2 < x1 || y2 < y1 {
        return None;
    }
    let width = (x2 - x1 + 1) as u32;
    let height = (y2 - y1 + 1) as u32;
    Some(Rect::at(x1, y1).of_size(width, height))
}
