// Error handling tests
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::IntoResponse;
use smartsports_edge::error::EdgeError;

#[test]
fn test_error_display_messages() {
    let errors = vec![
        EdgeError::Config("bad origin".to_string()),
        EdgeError::Network("connection refused".to_string()),
        EdgeError::Storage("disk full".to_string()),
        EdgeError::InvalidRequest("Bad request".to_string()),
        EdgeError::NotificationNotFound("1234".to_string()),
        EdgeError::Internal("boom".to_string()),
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "Error should have display message");
    }
}

#[test]
fn test_seed_failed_names_url() {
    let error = EdgeError::SeedFailed {
        url: "/frontend/index.html".to_string(),
        reason: "HTTP 404".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("/frontend/index.html"));
    assert!(display.contains("HTTP 404"));
}

#[test]
fn test_url_parse_error_converts() {
    let error: EdgeError = url::Url::parse("not a url").unwrap_err().into();
    assert!(matches!(error, EdgeError::Url(_)));
}

#[tokio::test]
async fn test_error_response_statuses() {
    let cases = vec![
        (EdgeError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
        (EdgeError::NotificationNotFound("x".into()), StatusCode::NOT_FOUND),
        (EdgeError::Network("x".into()), StatusCode::BAD_GATEWAY),
        (
            EdgeError::SeedFailed {
                url: "/".into(),
                reason: "x".into(),
            },
            StatusCode::SERVICE_UNAVAILABLE,
        ),
        (EdgeError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (error, expected) in cases {
        assert_eq!(error.into_response().status(), expected);
    }
}

#[tokio::test]
async fn test_error_response_body_shape() {
    let response = EdgeError::NotificationNotFound("abc".into()).into_response();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["type"], "error");
    assert_eq!(json["error"]["type"], "not_found_error");
    assert!(json["error"]["message"].as_str().unwrap().contains("abc"));
}
