mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{response_json, TestApp};

const BOUNDARY: &str = "mobistore-test-boundary";

/// (field name, file name, bytes)
fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, file_name, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(token: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/admin/uploads")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).expect("build upload request")
}

#[tokio::test]
async fn stores_images_and_serves_them_from_storage() {
    let app = TestApp::new().await;
    let body = multipart_body(&[
        ("file", "coque-face.JPG", &b"fake-jpeg-bytes"[..]),
        ("caption", "ignored.txt", &b"not an image"[..]),
        ("file", "coque-dos.png", &b"fake-png-bytes"[..]),
    ]);

    let response = app.send(upload_request(Some(app.token()), body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let stored = body["data"].as_array().expect("uploaded files");
    assert_eq!(stored.len(), 2);

    let first_path = stored[0]["path"].as_str().unwrap();
    assert!(first_path.starts_with("products/"));
    assert!(first_path.ends_with(".jpg"));
    assert!(stored[1]["path"].as_str().unwrap().ends_with(".png"));

    let public_url = stored[0]["public_url"].as_str().unwrap();
    assert_eq!(
        public_url,
        format!("http://localhost:18080/storage/products/{}", first_path)
    );

    let on_disk = app.state.config.bucket_dir().join(first_path);
    assert_eq!(std::fs::read(on_disk).unwrap(), &b"fake-jpeg-bytes"[..]);

    let served = app
        .request_public(
            Method::GET,
            &format!("/storage/products/{}", first_path),
            None,
        )
        .await;
    assert_eq!(served.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(served.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], &b"fake-jpeg-bytes"[..]);
}

#[tokio::test]
async fn rejects_unsupported_files() {
    let app = TestApp::new().await;
    let body = multipart_body(&[("file", "notes.pdf", &b"%PDF-1.7"[..])]);

    let response = app.send(upload_request(Some(app.token()), body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn a_rejected_file_leaves_nothing_in_the_bucket() {
    let app = TestApp::new().await;
    let body = multipart_body(&[
        ("file", "a.png", &b"first-png"[..]),
        ("file", "b.png", &b"second-png"[..]),
        ("file", "notes.txt", &b"not an image"[..]),
    ]);

    let response = app.send(upload_request(Some(app.token()), body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let products_dir = app.state.config.bucket_dir().join("products");
    let left_behind = std::fs::read_dir(&products_dir)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(left_behind, 0);
}

#[tokio::test]
async fn requires_at_least_one_file_field() {
    let app = TestApp::new().await;
    let body = multipart_body(&[("caption", "x.jpg", &b"bytes"[..])]);

    let response = app.send(upload_request(Some(app.token()), body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["details"], "upload_missing_file");
}

#[tokio::test]
async fn rejects_files_over_the_size_limit() {
    let app = TestApp::new().await;
    let oversized = vec![0u8; app.state.config.max_upload_bytes + 1];
    let body = multipart_body(&[("file", "huge.png", &oversized[..])]);

    let response = app.send(upload_request(Some(app.token()), body)).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn uploads_require_an_admin_token() {
    let app = TestApp::new().await;
    let body = multipart_body(&[("file", "a.jpg", &b"bytes"[..])]);

    let response = app.send(upload_request(None, body)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
