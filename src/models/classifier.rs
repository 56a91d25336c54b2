use crate::digit::{NormalizedTensor, TENSOR_SHAPE};
use crate::utils::error::DigitError;
use crate::Result;
use ndarray::ArrayView4;
use std::sync::Arc;

/// 数字类别数量
pub const NUM_CLASSES: usize = 10;

/// 已加载的分类模型：输入 (1, 28, 28, 1)，输出每个数字一个分数
pub trait DigitModel: Send + Sync {
    fn scores(&self, input: ArrayView4<'_, f32>) -> Result<Vec<f32>>;
}

/// 推理适配器，请求间只读共享
#[derive(Clone)]
pub struct DigitClassifier {
    model: Arc<dyn DigitModel>,
}

impl DigitClassifier {
    pub fn new<M: DigitModel + 'static>(model: M) -> Self {
        Self {
            model: Arc::new(model),
        }
    }

    /// 预测数字类别
    pub fn predict(&self, tensor: &NormalizedTensor) -> Result<u8> {
        self.predict_scores(tensor).map(|(label, _)| label)
    }

    /// 预测数字类别，同时返回模型原始分数
    pub fn predict_scores(&self, tensor: &NormalizedTensor) -> Result<(u8, Vec<f32>)> {
        if tensor.shape() != TENSOR_SHAPE {
            return Err(DigitError::InputShape(format!(
                "expected {:?}, got {:?}",
                TENSOR_SHAPE,
                tensor.shape()
            )));
        }

        let scores = self.model.scores(tensor.view())?;
        let label = Self::parse_scores(&scores)?;

        Ok((label, scores))
    }

    /// 解析分数向量，返回最大值下标
    fn parse_scores(scores: &[f32]) -> Result<u8> {
        if scores.len() != NUM_CLASSES {
            return Err(DigitError::Inference(format!(
                "expected {} scores, model returned {}",
                NUM_CLASSES,
                scores.len()
            )));
        }

        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            return Err(DigitError::Inference(format!(
                "model returned non-finite score {}",
                bad
            )));
        }

        argmax(scores)
            .map(|idx| idx as u8)
            .ok_or_else(|| DigitError::Inference("empty score vector".to_string()))
    }
}

/// 最大值下标，并列时取最小下标
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut iter = values.iter().enumerate();
    let (mut max_idx, mut max_val) = iter.next().map(|(i, v)| (i, *v))?;

    for (i, &value) in iter {
        if value > max_val {
            max_val = value;
            max_idx = i;
        }
    }

    Some(max_idx)
}
