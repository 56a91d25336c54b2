use crate::digit::{NormalizedTensor, INPUT_SIZE};
use crate::image::{ImageLoader, ImageTransforms, LumaPlane};
use crate::Result;
use image::DynamicImage;
use ndarray::Axis;
use std::path::Path;

/// 平均亮度超过该值时视为浅色背景，需要反色
pub const INVERSION_THRESHOLD: f32 = 0.5;

/// 把任意上传图像转换为模型输入
pub struct ImageNormalizer;

impl ImageNormalizer {
    /// 从文件加载并归一化
    pub fn normalize(path: &Path) -> Result<NormalizedTensor> {
        let image = ImageLoader::from_path(path)?;
        Self::normalize_image(&image)
    }

    pub fn normalize_bytes(bytes: &[u8]) -> Result<NormalizedTensor> {
        let image = ImageLoader::from_bytes(bytes)?;
        Self::normalize_image(&image)
    }

    /// 归一化流程：去 alpha -> 灰度 -> 缩放到 28x28 -> [0, 1] -> 按需反色 -> (1, 28, 28, 1)
    pub fn normalize_image(image: &DynamicImage) -> Result<NormalizedTensor> {
        let plane = LumaPlane::new(image);
        let mut resized = ImageTransforms::resize_bilinear(&plane, INPUT_SIZE, INPUT_SIZE)?;
        resized.mapv_inplace(|v| (v / 255.0).clamp(0.0, 1.0));

        let mean = resized.mean().unwrap_or(0.0);
        if mean > INVERSION_THRESHOLD {
            tracing::debug!("Light background detected (mean={:.3}), inverting polarity", mean);
            resized.mapv_inplace(|v| 1.0 - v);
        }

        let tensor = resized.insert_axis(Axis(0)).insert_axis(Axis(3));
        NormalizedTensor::from_array(tensor)
    }
}
