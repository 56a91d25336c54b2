use crate::{digit::UploadedImage, image::ImageLoader, utils::error::DigitError};
use axum::{
    async_trait,
    extract::{multipart::MultipartError, FromRequest, FromRequestParts, Multipart, Request},
    http::{request::Parts, StatusCode},
};

/// 图像文件所在的表单字段名
pub const FILE_FIELD: &str = "file";

/// 从 multipart 表单中提取上传图像
///
/// 优先使用名为 `file` 的字段，否则取第一个带文件名的字段。
pub struct ImageUpload(pub UploadedImage);

#[async_trait]
impl<S> FromRequest<S> for ImageUpload
where
    S: Send + Sync,
{
    type Rejection = DigitError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| DigitError::MalformedUpload(e.body_text()))?;

        let mut candidate: Option<UploadedImage> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| read_error("Failed to read multipart field", e))?
        {
            let is_file_field = field.name() == Some(FILE_FIELD);
            if !is_file_field && (candidate.is_some() || field.file_name().is_none()) {
                tracing::debug!("Ignoring multipart field: {:?}", field.name());
                continue;
            }

            let file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| read_error("Failed to read file data", e))?;

            let extension = ImageLoader::detect_extension(&bytes, file_name.as_deref());
            tracing::debug!(
                "Received file: name={:?}, bytes={}, extension={}",
                file_name,
                bytes.len(),
                extension
            );

            candidate = Some(UploadedImage { bytes, extension });
            if is_file_field {
                break;
            }
        }

        candidate
            .map(ImageUpload)
            .ok_or_else(|| DigitError::MalformedUpload("No image file provided".to_string()))
    }
}

/// 读取请求体时超出大小限制返回 413，其余均视为格式错误
fn read_error(context: &str, err: MultipartError) -> DigitError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        DigitError::PayloadTooLarge(format!("{}: {}", context, err.body_text()))
    } else {
        DigitError::MalformedUpload(format!("{}: {}", context, err))
    }
}

/// 请求ID提取器
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get("X-Request-ID")
            .and_then(|value| value.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(RequestId(request_id))
    }
}
