use super::*;
use serde_json::json;

fn status(status: u16, body: &str) -> ApiError {
    ApiError::Status { status, body: body.to_owned() }
}

// =============================================================================
// ApiError
// =============================================================================

#[test]
fn unauthorized_only_for_401() {
    assert!(status(401, "").is_unauthorized());
    assert!(!status(403, "").is_unauthorized());
    assert!(!ApiError::Transport("reset".into()).is_unauthorized());
}

#[test]
fn status_none_for_non_http_errors() {
    assert_eq!(ApiError::Decode("bad".into()).status(), None);
    assert_eq!(status(500, "").status(), Some(500));
}

#[test]
fn body_json_ignores_non_json_bodies() {
    assert!(status(502, "<html>bad gateway</html>").body_json().is_none());
    assert_eq!(status(400, r#"{"a":1}"#).body_json(), Some(json!({"a": 1})));
}

// =============================================================================
// Failure::from_api
// =============================================================================

#[test]
fn from_api_prefers_error_field() {
    let err = status(401, r#"{"error":"Invalid credentials","message":"ignored"}"#);
    let failure = Failure::from_api(&err, "Login failed");
    assert_eq!(failure.message, "Invalid credentials");
    assert!(failure.details.is_none());
}

#[test]
fn from_api_uses_message_field_when_error_missing() {
    let err = status(404, r#"{"message":"Email not found"}"#);
    assert_eq!(Failure::from_api(&err, "fallback").message, "Email not found");
}

#[test]
fn from_api_passes_details_through() {
    let err = status(
        400,
        r#"{"error":"Validation failed","details":[{"field":"email","msg":"taken"},"free text"]}"#,
    );
    let failure = Failure::from_api(&err, "Registration failed");
    assert_eq!(failure.message, "Validation failed");
    assert_eq!(
        failure.details,
        Some(vec![json!({"field": "email", "msg": "taken"}), json!("free text")])
    );
}

#[test]
fn from_api_falls_back_on_opaque_body() {
    let err = status(500, "Internal Server Error");
    assert_eq!(Failure::from_api(&err, "Login failed").message, "Login failed");
}

#[test]
fn from_api_falls_back_on_blank_error_string() {
    let err = status(400, r#"{"error":"   "}"#);
    assert_eq!(Failure::from_api(&err, "Login failed").message, "Login failed");
}

#[test]
fn from_api_transport_is_generic() {
    let err = ApiError::Transport("connection refused".into());
    assert_eq!(Failure::from_api(&err, "Login failed").message, UNREACHABLE_MESSAGE);
}

#[test]
fn failure_serializes_without_empty_details() {
    let value = serde_json::to_value(Failure::new("nope")).unwrap();
    assert_eq!(value, json!({"message": "nope"}));
}
