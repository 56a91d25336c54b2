use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use digit_serve::{
    config::ServerConfig,
    models::{DigitClassifier, DigitModel},
    web::{create_app, AppState},
    Result,
};
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgba, RgbaImage};
use ndarray::ArrayView4;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "digit-serve-test-boundary";

/// 按平均亮度分档：mean in [k/10, (k+1)/10) -> k
struct BrightnessModel;

impl DigitModel for BrightnessModel {
    fn scores(&self, input: ArrayView4<'_, f32>) -> Result<Vec<f32>> {
        let bucket = ((input.mean().unwrap_or(0.0) * 10.0) as usize).min(9);
        let mut scores = vec![0.0; 10];
        scores[bucket] = 1.0;
        Ok(scores)
    }
}

/// 推理前先阻塞一段时间
struct SlowModel(Duration);

impl DigitModel for SlowModel {
    fn scores(&self, input: ArrayView4<'_, f32>) -> Result<Vec<f32>> {
        std::thread::sleep(self.0);
        BrightnessModel.scores(input)
    }
}

fn app_with<M: DigitModel + 'static>(
    model: M,
    upload_dir: &Path,
    server_config: ServerConfig,
) -> Router {
    let state = AppState::new(DigitClassifier::new(model), upload_dir);
    create_app(state, &server_config)
}

fn test_app(upload_dir: &Path) -> Router {
    let server_config = ServerConfig {
        request_timeout: 30,
        max_request_size: 10 * 1024 * 1024,
    };
    app_with(BrightnessModel, upload_dir, server_config)
}

fn small_limit_app(upload_dir: &Path) -> Router {
    let server_config = ServerConfig {
        request_timeout: 30,
        max_request_size: 1024,
    };
    app_with(BrightnessModel, upload_dir, server_config)
}

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

/// 上方 `white_rows` 行为白色的 28x28 黑底图
fn striped_png(white_rows: u32) -> Vec<u8> {
    let image = GrayImage::from_fn(28, 28, |_, y| {
        if y < white_rows { Luma([255]) } else { Luma([0]) }
    });
    encode(DynamicImage::ImageLuma8(image), ImageFormat::Png)
}

fn multipart_body(field: &str, file_name: Option<&str>, data: &[u8]) -> Vec<u8> {
    let disposition = match file_name {
        Some(name) => format!("form-data; name=\"{}\"; filename=\"{}\"", field, name),
        None => format!("form-data; name=\"{}\"", field),
    };

    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: {}\r\nContent-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, disposition
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn predict_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn upload_request(data: &[u8]) -> Request<Body> {
    predict_request(multipart_body("file", Some("digit.png"), data))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cors = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, cors, body.to_vec())
}

fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}

fn is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

#[tokio::test]
async fn test_predict_returns_label_with_cors_header() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let (status, cors, body) = send(&app, upload_request(&striped_png(12))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cors.as_deref(), Some("*"));
    assert_eq!(json(&body), serde_json::json!({ "prediction": 4 }));
    assert!(is_empty(dir.path()));
}

#[tokio::test]
async fn test_light_background_is_inverted_before_inference() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    // 白底，仅左侧 3 列为黑色；反色后平均亮度约 0.11
    let image = GrayImage::from_fn(28, 28, |x, _| if x < 3 { Luma([0]) } else { Luma([255]) });
    let png = encode(DynamicImage::ImageLuma8(image), ImageFormat::Png);

    let (status, _, body) = send(&app, upload_request(&png)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!({ "prediction": 1 }));
}

#[tokio::test]
async fn test_rgba_and_jpeg_uploads_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let rgba = RgbaImage::from_pixel(64, 48, Rgba([0, 0, 0, 128]));
    let png = encode(DynamicImage::ImageRgba8(rgba), ImageFormat::Png);
    let (status, _, body) = send(&app, upload_request(&png)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!({ "prediction": 0 }));

    let jpeg = encode(DynamicImage::ImageLuma8(GrayImage::new(40, 40)), ImageFormat::Jpeg);
    let request = predict_request(multipart_body("file", Some("digit.jpg"), &jpeg));
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!({ "prediction": 0 }));

    assert!(is_empty(dir.path()));
}

#[tokio::test]
async fn test_non_image_upload_returns_500_and_server_survives() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let request = predict_request(multipart_body("file", Some("notes.txt"), b"just some text"));
    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = json(&body)["error"].as_str().unwrap().to_string();
    assert!(!error.is_empty());
    assert!(is_empty(dir.path()));

    let (status, _, _) = send(&app, upload_request(&striped_png(0))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_routes_return_empty_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let get_predict = Request::builder()
        .method("GET")
        .uri("/predict")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, get_predict).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());

    let post_unknown = Request::builder()
        .method("POST")
        .uri("/unknown")
        .body(Body::from("ignored"))
        .unwrap();
    let (status, _, body) = send(&app, post_unknown).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());

    let (status, _, _) = send(&app, upload_request(&striped_png(12))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_multipart_is_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("not multipart"))
        .unwrap();
    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().is_some());
}

#[tokio::test]
async fn test_missing_file_part_is_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let request = predict_request(multipart_body("comment", None, b"no image here"));
    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"]
        .as_str()
        .unwrap()
        .contains("No image file provided"));
}

#[tokio::test]
async fn test_any_file_part_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let request = predict_request(multipart_body("image", Some("seven.png"), &striped_png(12)));
    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!({ "prediction": 4 }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_requests_get_their_own_labels() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let dark = striped_png(0);
    let bright = striped_png(12);

    for _ in 0..8 {
        let (first, second) = tokio::join!(
            send(&app, upload_request(&dark)),
            send(&app, upload_request(&bright)),
        );

        assert_eq!(json(&first.2), serde_json::json!({ "prediction": 0 }));
        assert_eq!(json(&second.2), serde_json::json!({ "prediction": 4 }));
    }

    assert!(is_empty(dir.path()));
}

#[tokio::test]
async fn test_declared_oversized_body_is_rejected_with_413() {
    let dir = tempfile::tempdir().unwrap();
    let app = small_limit_app(dir.path());

    let body = multipart_body("file", Some("digit.png"), &vec![0u8; 4096]);
    let mut request = predict_request(body.clone());
    request
        .headers_mut()
        .insert(header::CONTENT_LENGTH, body.len().into());

    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(is_empty(dir.path()));
}

#[tokio::test]
async fn test_streamed_oversized_body_is_rejected_with_413() {
    let dir = tempfile::tempdir().unwrap();
    let app = small_limit_app(dir.path());

    // 没有 Content-Length，超限在读取 multipart 时才被发现
    let request = upload_request(&vec![0u8; 4096]);
    assert!(request.headers().get(header::CONTENT_LENGTH).is_none());

    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(json(&body)["error"].as_str().is_some());
    assert!(is_empty(dir.path()));

    // 限制以内的上传不受影响
    let (status, _, _) = send(&app, upload_request(&striped_png(0))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_slow_inference_times_out_with_408() {
    let dir = tempfile::tempdir().unwrap();
    let server_config = ServerConfig {
        request_timeout: 1,
        max_request_size: 10 * 1024 * 1024,
    };
    let app = app_with(SlowModel(Duration::from_secs(3)), dir.path(), server_config);

    let (status, _, _) = send(&app, upload_request(&striped_png(12))).await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert!(is_empty(dir.path()));
}
