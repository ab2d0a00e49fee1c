// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 坐标重映射: 裁剪图坐标 → 原图坐标

use super::types::{Detection, Frame};

/// CropSpace → ImageSpace, 类别与分数不变; ImageSpace 输入原样返回
pub fn to_image_space(det: &Detection) -> Detection {
    if det.frame() == Frame::ImageSpace {
        return *det;
    }
    let (ox, oy) = det.frame().origin();
    Detection::new(
        det.bbox().translate(ox, oy),
        det.class_id(),
        det.score(),
        Frame::ImageSpace,
    )
}

/// 逆变换: ImageSpace → 以 (ox, oy) 为原点的 CropSpace
pub fn to_crop_space(det: &Detection, (ox, oy): (f32, f32)) -> Detection {
    let image = to_image_space(det);
    Detection::new(
        image.bbox().translate(-ox, -oy),
        image.class_id(),
        image.score(),
        Frame::crop(ox, oy),
    )
}

pub fn remap_all(detections: &[Detection]) -> Vec<Detection> {
    detections.iter().map(to_image_space).collect()
}
