use crate::utils::error::DigitError;
use crate::Result;
use image::DynamicImage;
use ndarray::Array2;
use std::borrow::Cow;

/// BT.601 亮度权重 (R, G, B)
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// 按像素读取亮度的视图
///
/// 8 位图像直接借用解码缓冲区，不生成整幅的浮点副本；alpha 通道被跳过，不与背景合成。
pub struct LumaPlane<'a> {
    data: Cow<'a, [u8]>,
    width: usize,
    height: usize,
    stride: usize,
    color: bool,
}

impl<'a> LumaPlane<'a> {
    pub fn new(image: &'a DynamicImage) -> Self {
        let (data, stride, color) = match image {
            DynamicImage::ImageLuma8(buf) => (Cow::Borrowed(buf.as_raw().as_slice()), 1, false),
            DynamicImage::ImageLumaA8(buf) => (Cow::Borrowed(buf.as_raw().as_slice()), 2, false),
            DynamicImage::ImageRgb8(buf) => (Cow::Borrowed(buf.as_raw().as_slice()), 3, true),
            DynamicImage::ImageRgba8(buf) => (Cow::Borrowed(buf.as_raw().as_slice()), 4, true),
            // 16 位和浮点图像先降到 8 位
            other if other.color().has_color() => (Cow::Owned(other.to_rgb8().into_raw()), 3, true),
            other => (Cow::Owned(other.to_luma8().into_raw()), 1, false),
        };

        Self {
            data,
            width: image.width() as usize,
            height: image.height() as usize,
            stride,
            color,
        }
    }

    /// (高, 宽)
    pub fn dim(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// 单个像素的亮度，取值 [0, 255]
    pub fn luma(&self, y: usize, x: usize) -> f32 {
        let i = (y * self.width + x) * self.stride;
        if self.color {
            self.data[i] as f32 * LUMA_WEIGHTS[0]
                + self.data[i + 1] as f32 * LUMA_WEIGHTS[1]
                + self.data[i + 2] as f32 * LUMA_WEIGHTS[2]
        } else {
            self.data[i] as f32
        }
    }
}

/// 图像变换工具集
pub struct ImageTransforms;

impl ImageTransforms {
    /// 双线性插值缩放，像素中心对齐，亮度按需从源像素读取
    pub fn resize_bilinear(
        plane: &LumaPlane<'_>,
        target_height: usize,
        target_width: usize,
    ) -> Result<Array2<f32>> {
        let (orig_h, orig_w) = plane.dim();
        if orig_h == 0 || orig_w == 0 || target_height == 0 || target_width == 0 {
            return Err(DigitError::InputShape(format!(
                "cannot resize {}x{} image to {}x{}",
                orig_w, orig_h, target_width, target_height
            )));
        }

        let scale_h = orig_h as f32 / target_height as f32;
        let scale_w = orig_w as f32 / target_width as f32;

        let mut resized = Array2::<f32>::zeros((target_height, target_width));

        for h in 0..target_height {
            let src_h = ((h as f32 + 0.5) * scale_h - 0.5).clamp(0.0, (orig_h - 1) as f32);
            let h1 = src_h.floor() as usize;
            let h2 = (h1 + 1).min(orig_h - 1);
            let dh = src_h - h1 as f32;

            for w in 0..target_width {
                let src_w = ((w as f32 + 0.5) * scale_w - 0.5).clamp(0.0, (orig_w - 1) as f32);
                let w1 = src_w.floor() as usize;
                let w2 = (w1 + 1).min(orig_w - 1);
                let dw = src_w - w1 as f32;

                let v11 = plane.luma(h1, w1);
                let v12 = plane.luma(h1, w2);
                let v21 = plane.luma(h2, w1);
                let v22 = plane.luma(h2, w2);

                resized[[h, w]] = v11 * (1.0 - dh) * (1.0 - dw)
                    + v12 * (1.0 - dh) * dw
                    + v21 * dh * (1.0 - dw)
                    + v22 * dh * dw;
            }
        }

        Ok(resized)
    }
}
