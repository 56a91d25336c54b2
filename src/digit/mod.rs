pub mod pipeline;
pub mod types;

pub use pipeline::PredictionPipeline;
pub use types::{
    NormalizedTensor, Prediction, PredictionResponse, UploadedImage, INPUT_SIZE, TENSOR_SHAPE,
};
