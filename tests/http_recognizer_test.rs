//! Wiremock integration tests for HttpRecognizer.
//!
//! These tests verify the request shape, response validation and error
//! mapping using mocked responses.
#![cfg(feature = "http-recognizer")]

use std::time::Duration;

use fleamark::{FleamarkError, HttpRecognizer, LoadedImage, RecognitionOptions, Recognizer};
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn image() -> LoadedImage {
    LoadedImage {
        name: "shot.png".to_string(),
        mime_type: "image/png".to_string(),
        bytes: bytes::Bytes::from_static(b"\x89PNG fake"),
    }
}

/// Test a successful recognition with request shape checks.
#[tokio::test]
async fn test_recognize_success() {
    let mock_server = MockServer::start().await;

    let body = serde_json::json!({
        "status": "ok",
        "processingTimeMs": 84,
        "matches": [
            {
                "item": { "id": "5c0e874186f7745dc7616606", "name": "Maska-1SCh bulletproof helmet", "shortName": "Maska" },
                "confidence": 0.93,
                "boundingBox": { "x": 10.0, "y": 20.0, "width": 64.0, "height": 48.0 },
                "metadata": { "hasMultipleItems": true, "backgroundType": "stash", "imageQuality": 0.8 }
            },
            {
                "item": { "id": "59e7711e86f7746cae05fbe1", "name": "Kolpak-1S riot helmet" },
                "confidence": 0.55
            }
        ]
    });

    Mock::given(method("POST"))
        .and(path("/v1/recognize"))
        .and(header("Content-Type", "image/png"))
        .and(header("X-Image-Name", "shot.png"))
        .and(header("Authorization", "Bearer test_key"))
        .and(query_param("max_results", "5"))
        .and(query_param("min_confidence", "0.5"))
        .and(query_param("include_variants", "true"))
        .and(query_param("detect_multiple_items", "false"))
        .and(body_bytes(b"\x89PNG fake".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    let recognizer = HttpRecognizer::new(mock_server.uri())
        .unwrap()
        .with_api_key("test_key");
    let options = RecognitionOptions::default()
        .max_results(5)
        .detect_multiple_items(false);

    let results = recognizer
        .recognize(&image(), &options)
        .await
        .expect("recognize should succeed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].item.short_name, "Maska");
    assert_eq!(results[0].processing_time_ms, Some(84));
    assert!(results[0].metadata.has_multiple_items);
    assert_eq!(results[0].metadata.background_type, "stash");
    assert_eq!(results[0].bounding_box.map(|b| b.width), Some(64.0));
    assert_eq!(results[1].item.short_name, "Kolpak-1S riot helmet");
    assert_eq!(results[1].metadata.background_type, "unknown");
}

/// Requests without an API key carry no Authorization header.
#[tokio::test]
async fn test_recognize_without_api_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/recognize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "no_match"})))
        .mount(&mock_server)
        .await;

    let recognizer = HttpRecognizer::new(mock_server.uri()).unwrap();
    let results = recognizer
        .recognize(&image(), &RecognitionOptions::default())
        .await
        .unwrap();
    assert!(results.is_empty());

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

/// Matches failing validation are dropped.
#[tokio::test]
async fn test_invalid_matches_dropped() {
    let mock_server = MockServer::start().await;

    let body = serde_json::json!({
        "status": "ok",
        "matches": [
            { "item": { "id": "", "name": "nameless" }, "confidence": 0.9 },
            { "item": { "id": "x", "name": "too sure" }, "confidence": 1.01 },
            { "item": { "id": "y", "name": "fine" }, "confidence": 0.7 }
        ]
    });
    Mock::given(method("POST"))
        .and(path("/v1/recognize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    let recognizer = HttpRecognizer::new(mock_server.uri()).unwrap();
    let results = recognizer
        .recognize(&image(), &RecognitionOptions::default())
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].item.id, "y");
}

/// A service-reported error becomes a recognition error.
#[tokio::test]
async fn test_service_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/recognize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"status": "error", "message": "model unavailable"}),
        ))
        .mount(&mock_server)
        .await;

    let recognizer = HttpRecognizer::new(mock_server.uri()).unwrap();
    let err = recognizer
        .recognize(&image(), &RecognitionOptions::default())
        .await
        .unwrap_err();
    match err {
        FleamarkError::Recognition { recognizer, message } => {
            assert_eq!(recognizer, "http");
            assert_eq!(message, "model unavailable");
        }
        other => panic!("expected Recognition error, got {other:?}"),
    }
}

/// Test 401 maps to AuthenticationFailed.
#[tokio::test]
async fn test_auth_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/recognize"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let recognizer = HttpRecognizer::new(mock_server.uri())
        .unwrap()
        .with_api_key("bad_key");
    let err = recognizer
        .recognize(&image(), &RecognitionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FleamarkError::AuthenticationFailed));
    assert!(!err.is_transient());
}

/// Test 429 maps to RateLimited with the retry-after hint.
#[tokio::test]
async fn test_rate_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/recognize"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&mock_server)
        .await;

    let recognizer = HttpRecognizer::new(mock_server.uri()).unwrap();
    let err = recognizer
        .recognize(&image(), &RecognitionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FleamarkError::RateLimited { .. }));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
}

/// Test other non-2xx statuses map to Api errors.
#[tokio::test]
async fn test_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/recognize"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let recognizer = HttpRecognizer::new(mock_server.uri()).unwrap();
    let err = recognizer
        .recognize(&image(), &RecognitionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FleamarkError::Api { status: 503, .. }));
    assert!(err.is_transient());
}

/// Test an unparseable body maps to an Http error.
#[tokio::test]
async fn test_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/recognize"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let recognizer = HttpRecognizer::new(mock_server.uri()).unwrap();
    let err = recognizer
        .recognize(&image(), &RecognitionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FleamarkError::Http(_)));
}

/// Test connection failures map to Http errors.
#[tokio::test]
async fn test_connection_refused() {
    let recognizer = HttpRecognizer::new("http://127.0.0.1:1").unwrap();
    let err = recognizer
        .recognize(&image(), &RecognitionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FleamarkError::Http(_)));
}
