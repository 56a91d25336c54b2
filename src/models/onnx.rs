use crate::models::DigitModel;
use crate::utils::error::DigitError;
use crate::{Config, Result};
use ndarray::ArrayView4;
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::path::Path;

/// 基于 ONNX Runtime 的数字分类模型
pub struct OnnxDigitModel {
    session: Mutex<Session>,
    input_name: String,  // 动态发现的输入名称
    output_name: String, // 动态发现的输出名称
}

impl OnnxDigitModel {
    pub fn new(config: &Config) -> Result<Self> {
        Self::load(&config.model_path, config.onnx_config.intra_threads)
    }

    pub fn load(model_path: &Path, intra_threads: usize) -> Result<Self> {
        if !model_path.exists() {
            return Err(DigitError::ModelLoad(format!(
                "Model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading digit model from: {}", model_path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(model_path)?;

        let input_name = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => {
                return Err(DigitError::ModelLoad(
                    "Digit model has no inputs".to_string(),
                ))
            }
        };

        let output_name = match session.outputs.first() {
            Some(output) => output.name.clone(),
            None => {
                return Err(DigitError::ModelLoad(
                    "Digit model has no outputs".to_string(),
                ))
            }
        };

        tracing::info!(
            "Digit model ready: input='{}', output='{}'",
            input_name,
            output_name
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }
}

impl DigitModel for OnnxDigitModel {
    fn scores(&self, input: ArrayView4<'_, f32>) -> Result<Vec<f32>> {
        let input_tensor = Tensor::from_array(input.to_owned())?;

        // 立即提取数据，避免输出借用会话锁
        let scores = {
            let mut session = self.session.lock();
            let outputs = session.run(inputs![self.input_name.as_str() => input_tensor])?;

            match outputs.get(&self.output_name) {
                Some(output) => output.try_extract_array::<f32>()?.iter().copied().collect(),
                None => {
                    let available: Vec<String> = outputs.keys().map(|s| s.to_string()).collect();
                    return Err(DigitError::Inference(format!(
                        "Output '{}' not found. Available outputs: {:?}",
                        self.output_name, available
                    )));
                }
            }
        };

        Ok(scores)
    }
}
