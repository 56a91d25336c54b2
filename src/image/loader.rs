use crate::utils::error::DigitError;
use crate::Result;
use image::error::{ParameterError, ParameterErrorKind};
use image::{DynamicImage, GenericImageView, ImageError, ImageFormat, ImageReader, Limits};
use std::io::{BufRead, Cursor, Seek};
use std::path::Path;

/// 默认扩展名（无法判断格式时使用）
pub const DEFAULT_EXTENSION: &str = "png";

/// 允许的最大边长，解码前按文件头检查
pub const MAX_DIMENSION: u32 = 8192;

pub struct ImageLoader;

impl ImageLoader {
    /// 从文件路径加载图像，格式按内容识别而非扩展名
    pub fn from_path(path: &Path) -> Result<DynamicImage> {
        let reader = ImageReader::open(path).map_err(ImageError::IoError)?;
        Self::decode(reader)
    }

    /// 从内存字节加载图像
    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        Self::decode(ImageReader::new(Cursor::new(bytes)))
    }

    fn decode<R: BufRead + Seek>(reader: ImageReader<R>) -> Result<DynamicImage> {
        let mut reader = reader.with_guessed_format().map_err(ImageError::IoError)?;
        reader.limits(Self::limits());

        let image = reader.decode()?;

        Self::validate_dimensions(&image)?;
        Ok(image)
    }

    /// 解码限制：超出边长的图像在分配像素缓冲前即被拒绝
    pub fn limits() -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(MAX_DIMENSION);
        limits.max_image_height = Some(MAX_DIMENSION);
        limits
    }

    /// 检测图像格式
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    /// 推断上传文件的扩展名：先看文件头，再看客户端文件名，最后回落到 png
    pub fn detect_extension(bytes: &[u8], file_name: Option<&str>) -> &'static str {
        match Self::detect_format(bytes) {
            Some(ImageFormat::Png) => return "png",
            Some(ImageFormat::Jpeg) => return "jpg",
            _ => {}
        }

        let from_name = file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match from_name.as_deref() {
            Some("png") => "png",
            Some("jpg") => "jpg",
            Some("jpeg") => "jpeg",
            _ => DEFAULT_EXTENSION,
        }
    }

    /// 验证图像尺寸
    fn validate_dimensions(image: &DynamicImage) -> Result<()> {
        let (width, height) = image.dimensions();

        if width == 0 || height == 0 {
            return Err(DigitError::Decode(ImageError::Parameter(
                ParameterError::from_kind(ParameterErrorKind::DimensionMismatch),
            )));
        }

        Ok(())
    }
}
