pub mod classifier;
pub mod onnx;

pub use classifier::{argmax, DigitClassifier, DigitModel, NUM_CLASSES};
pub use onnx::OnnxDigitModel;
