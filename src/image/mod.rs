pub mod loader;
pub mod normalizer;
pub mod transforms;

pub use loader::ImageLoader;
pub use normalizer::ImageNormalizer;
pub use transforms::{ImageTransforms, LumaPlane};
