//! Transform API integration tests.
//!
//! Run with: `cargo test -p mediaform-api --test files_test`

mod helpers;

use axum::http::StatusCode;
use helpers::{fixtures, setup_test_app, setup_test_app_with};
use image::GenericImageView;
use mediaform_api::transform;
use mediaform_cache::CacheStatus;
use mediaform_core::AppError;
use mediaform_processing::RequestOptions;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_resize_and_grayscale() {
    let app = setup_test_app().await;
    let id = app
        .upload_ok("image", "photo.png", "image/png", fixtures::png(100, 100))
        .await;

    let response = app
        .client()
        .get(&format!("/files/{}", id))
        .add_raw_query_param("width=50&height=50&filter=grayscale")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), "image/png");
    assert_eq!(response.header("x-cache"), "MISS");

    let img = image::load_from_memory(response.as_bytes()).unwrap();
    assert_eq!(img.dimensions(), (50, 50));
    for pixel in img.to_rgb8().pixels() {
        assert_eq!(pixel.0[0], pixel.0[1]);
        assert_eq!(pixel.0[1], pixel.0[2]);
    }
}

#[tokio::test]
async fn test_parameter_order_shares_cache_entry() {
    let app = setup_test_app().await;
    let id = app
        .upload_ok("image", "photo.png", "image/png", fixtures::png(64, 64))
        .await;
    let path = format!("/files/{}", id);

    let first = app
        .client()
        .get(&path)
        .add_raw_query_param("width=10&height=20")
        .await;
    let second = app
        .client()
        .get(&path)
        .add_raw_query_param("height=20&width=10")
        .await;

    assert_eq!(first.status_code(), StatusCode::OK);
    assert_eq!(second.status_code(), StatusCode::OK);
    assert_eq!(first.header("etag"), second.header("etag"));
    assert_eq!(first.header("x-cache"), "MISS");
    assert_eq!(second.header("x-cache"), "HIT");
    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(app.state.cache.stats().entries, 1);
}

#[tokio::test]
async fn test_identical_bytes_under_new_id_share_cache_entry() {
    let app = setup_test_app().await;
    let first_id = app
        .upload_ok("image", "first.png", "image/png", fixtures::png(64, 64))
        .await;
    let second_id = app
        .upload_ok("image", "second.png", "image/png", fixtures::png(64, 64))
        .await;
    assert_ne!(first_id, second_id);

    let first = app
        .client()
        .get(&format!("/files/{}", first_id))
        .add_raw_query_param("width=32&filter=grayscale")
        .await;
    let second = app
        .client()
        .get(&format!("/files/{}", second_id))
        .add_raw_query_param("width=32&filter=grayscale")
        .await;

    assert_eq!(first.status_code(), StatusCode::OK);
    assert_eq!(second.status_code(), StatusCode::OK);
    assert_eq!(first.header("etag"), second.header("etag"));
    assert_eq!(first.header("x-cache"), "MISS");
    assert_eq!(second.header("x-cache"), "HIT");
    assert_eq!(app.state.cache.stats().entries, 1);
}

#[tokio::test]
async fn test_response_headers() {
    let app = setup_test_app().await;
    let id = app
        .upload_ok("image", "photo.png", "image/png", fixtures::png(40, 40))
        .await;

    let response = app
        .client()
        .get(&format!("/files/{}", id))
        .add_raw_query_param("format=jpg")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), "image/jpeg");
    assert_eq!(
        response.header("cache-control"),
        "public, max-age=31536000, immutable"
    );
    assert_eq!(
        response.header("content-length"),
        response.as_bytes().len().to_string().as_str()
    );

    let etag = response.header("etag");
    let etag = etag.to_str().unwrap();
    assert!(etag.starts_with('"') && etag.ends_with('"'));
    assert_eq!(etag.len(), 64 + 2);
    assert_eq!(
        image::guess_format(response.as_bytes()).unwrap(),
        image::ImageFormat::Jpeg
    );
}

#[tokio::test]
async fn test_no_parameters_serves_original() {
    let app = setup_test_app().await;
    let original = fixtures::png(30, 20);
    let id = app
        .upload_ok("image", "photo.png", "image/png", original.clone())
        .await;

    let response = app
        .client()
        .get(&format!("/files/{}", id))
        .add_raw_query_param("utm_source=newsletter")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.as_bytes().as_ref(), original.as_slice());
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let app = setup_test_app().await;

    let response = app.client().get("/files/does-not-exist.png").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_crop_bounds() {
    let app = setup_test_app().await;
    let narrow = app
        .upload_ok("image", "narrow.png", "image/png", fixtures::png(80, 200))
        .await;
    let square = app
        .upload_ok("image", "square.png", "image/png", fixtures::png(200, 200))
        .await;

    let response = app
        .client()
        .get(&format!("/files/{}", narrow))
        .add_raw_query_param("crop=5,5,100,100")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "INVALID_CROP");
    assert_eq!(app.state.cache.stats().misses, 0);

    let response = app
        .client()
        .get(&format!("/files/{}", square))
        .add_raw_query_param("crop=0,0,50,50")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let img = image::load_from_memory(response.as_bytes()).unwrap();
    assert_eq!(img.dimensions(), (50, 50));
}

#[tokio::test]
async fn test_malformed_parameters_are_bad_requests() {
    let app = setup_test_app().await;
    let id = app
        .upload_ok("image", "photo.jpg", "image/jpeg", fixtures::jpeg(32, 32))
        .await;
    let path = format!("/files/{}", id);

    for query in [
        "width=abc",
        "width=10&width=10",
        "format=bmp",
        "filter=sepia",
        "brightness=-2",
        "overlay_text=",
    ] {
        let response = app.client().get(&path).add_raw_query_param(query).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{}", query);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "INVALID_REQUEST", "{}", query);
    }
}

#[tokio::test]
async fn test_video_target_for_image_is_unsupported() {
    let app = setup_test_app().await;
    let id = app
        .upload_ok("image", "photo.png", "image/png", fixtures::png(16, 16))
        .await;

    let response = app
        .client()
        .get(&format!("/files/{}", id))
        .add_raw_query_param("format=mp4")
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "UNSUPPORTED_OPERATION");
    assert_eq!(app.state.cache.stats().entries, 0);
}

#[tokio::test]
async fn test_corrupt_video_fails_decode_and_is_not_cached() {
    let app = setup_test_app().await;
    let id = app
        .upload_ok("video", "clip.mp4", "video/mp4", fixtures::corrupt_mp4())
        .await;
    let path = format!("/files/{}", id);

    for _ in 0..2 {
        let response = app
            .client()
            .get(&path)
            .add_raw_query_param("filter=grayscale")
            .await;
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "DECODE_FAILED");
    }

    assert_eq!(app.state.cache.stats().entries, 0);
}

#[tokio::test]
async fn test_concurrent_requests_compute_once() {
    let app = setup_test_app().await;
    let id = app
        .upload_ok("image", "photo.png", "image/png", fixtures::png(120, 80))
        .await;
    let options = RequestOptions::from_pairs([("width", "60"), ("filter", "blur")]).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let state = Arc::clone(&app.state);
            let id = id.clone();
            let options = options.clone();
            tokio::spawn(async move { transform(&state, &id, &options).await })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    let stats = app.state.cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| o.status == CacheStatus::Miss)
            .count(),
        1
    );
    let first = &outcomes[0];
    assert!(app.state.cache.contains(&first.key));
    for outcome in &outcomes {
        assert_eq!(outcome.key, first.key);
        assert_eq!(outcome.artifact.bytes, first.artifact.bytes);
    }
}

#[tokio::test]
async fn test_timeout_reaches_every_caller_and_is_not_cached() {
    let app = setup_test_app_with(|config| config.transform_timeout = Duration::ZERO).await;
    let id = app
        .upload_ok("image", "photo.png", "image/png", fixtures::png(64, 64))
        .await;
    let options = RequestOptions::from_pairs([("width", "32"), ("filter", "blur")]).unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let state = Arc::clone(&app.state);
            let id = id.clone();
            let options = options.clone();
            tokio::spawn(async move { transform(&state, &id, &options).await })
        })
        .collect();

    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err, AppError::Timeout { budget_ms: 0 });
    }

    let stats = app.state.cache.stats();
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.entries, 0);

    let response = app
        .client()
        .get(&format!("/files/{}", id))
        .add_raw_query_param("width=32&filter=blur")
        .await;
    assert_eq!(response.status_code(), StatusCode::GATEWAY_TIMEOUT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "TRANSFORM_TIMEOUT");
    assert_eq!(app.state.cache.stats().entries, 0);
}
