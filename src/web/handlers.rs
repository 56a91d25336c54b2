use crate::{
    digit::PredictionResponse,
    web::{
        extractors::{ImageUpload, RequestId},
        AppState,
    },
    Result,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};

/// 数字识别处理器
pub async fn predict_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    ImageUpload(upload): ImageUpload,
) -> Result<impl IntoResponse> {
    tracing::info!(
        "Processing predict request: request_id={}, bytes={}, extension={}",
        request_id,
        upload.bytes.len(),
        upload.extension
    );

    let prediction = state.pipeline.process_upload(upload, &request_id).await?;

    tracing::info!(
        "Prediction completed: request_id={}, label={}, time={:.3}s",
        request_id,
        prediction.label,
        prediction.elapsed.as_secs_f32()
    );

    Ok((
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(PredictionResponse::success(prediction.label)),
    ))
}

/// 未知路径或方法：404，空响应体
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
