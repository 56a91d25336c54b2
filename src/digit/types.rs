use crate::utils::error::DigitError;
use crate::Result;
use axum::body::Bytes;
use image::{GrayImage, Luma};
use ndarray::{Array4, ArrayView4};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 模型输入边长
pub const INPUT_SIZE: usize = 28;

/// 模型输入形状 (N, H, W, C)
pub const TENSOR_SHAPE: [usize; 4] = [1, INPUT_SIZE, INPUT_SIZE, 1];

/// 单次请求上传的图像
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// 原始文件字节
    pub bytes: Bytes,
    /// 推断出的扩展名（不含点）
    pub extension: &'static str,
}

/// 归一化后的模型输入，形状固定为 (1, 28, 28, 1)，取值在 [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor(Array4<f32>);

impl NormalizedTensor {
    /// 校验形状与取值范围后构造
    pub fn from_array(array: Array4<f32>) -> Result<Self> {
        if array.shape() != TENSOR_SHAPE {
            return Err(DigitError::InputShape(format!(
                "expected {:?}, got {:?}",
                TENSOR_SHAPE,
                array.shape()
            )));
        }

        if let Some(bad) = array.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(DigitError::InputShape(format!(
                "tensor value {} outside [0, 1]",
                bad
            )));
        }

        Ok(Self(array))
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.0.view()
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn mean(&self) -> f32 {
        self.0.mean().unwrap_or(0.0)
    }

    /// 还原为 8 位灰度图
    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(INPUT_SIZE as u32, INPUT_SIZE as u32, |x, y| {
            let value = self.0[[0, y as usize, x as usize, 0]];
            Luma([(value * 255.0).round().clamp(0.0, 255.0) as u8])
        })
    }
}

/// 推理流水线的内部结果
#[derive(Debug, Clone)]
pub struct Prediction {
    /// 预测的数字类别
    pub label: u8,
    /// 模型输出的原始分数
    pub scores: Vec<f32>,
    /// 处理耗时
    pub elapsed: Duration,
}

/// `/predict` 的响应体，成功与失败二选一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Prediction { prediction: u8 },
    Error { error: String },
}

impl PredictionResponse {
    pub fn success(label: u8) -> Self {
        PredictionResponse::Prediction { prediction: label }
    }

    pub fn error(message: impl Into<String>) -> Self {
        PredictionResponse::Error {
            error: message.into(),
        }
    }
}
