use crate::{
    digit::{Prediction, UploadedImage},
    image::ImageNormalizer,
    models::DigitClassifier,
    utils::error::DigitError,
    Result,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// 单次请求的上传临时文件，离开作用域时删除
struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    async fn write(dir: &Path, upload: &UploadedImage) -> Result<Self> {
        let path = dir.join(format!("{}.{}", uuid::Uuid::new_v4(), upload.extension));
        let guard = Self { path };
        tokio::fs::write(&guard.path, &upload.bytes).await?;
        Ok(guard)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove upload {}: {}", self.path.display(), e);
            }
        }
    }
}

/// 数字识别流水线：落盘 -> 归一化 -> 推理 -> 清理
pub struct PredictionPipeline {
    classifier: Arc<DigitClassifier>,
    upload_dir: PathBuf,
}

impl PredictionPipeline {
    pub fn new(classifier: Arc<DigitClassifier>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            classifier,
            upload_dir: upload_dir.into(),
        }
    }

    /// 处理一次上传
    pub async fn process_upload(&self, upload: UploadedImage, request_id: &str) -> Result<Prediction> {
        let start_time = Instant::now();

        let temp = TempUpload::write(&self.upload_dir, &upload).await?;
        tracing::debug!(
            "Upload stored: request_id={}, path={}, bytes={}",
            request_id,
            temp.path().display(),
            upload.bytes.len()
        );

        let classifier = Arc::clone(&self.classifier);
        let path = temp.path().to_path_buf();

        // 解码和推理是CPU密集型操作，放到阻塞线程池
        let (label, scores) = tokio::task::spawn_blocking(move || {
            let tensor = ImageNormalizer::normalize(&path)?;
            classifier.predict_scores(&tensor)
        })
        .await
        .map_err(|e| DigitError::Internal(format!("Prediction task failed: {}", e)))??;

        drop(temp);

        let elapsed = start_time.elapsed();
        tracing::debug!(
            "Scores: request_id={}, scores={:?}",
            request_id,
            scores
        );

        Ok(Prediction {
            label,
            scores,
            elapsed,
        })
    }
}
