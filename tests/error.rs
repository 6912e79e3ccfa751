use std::path::PathBuf;

use serde_json::Value;
use taskflow::error::{exit_codes, Error, JsonError, NON_FIELD};

#[test]
fn exit_code_user_error() {
    let err = Error::InvalidArgument("bad input".to_string());
    assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    assert_eq!(Error::AlreadyConverted(3).exit_code(), exit_codes::USER_ERROR);
    assert_eq!(
        Error::NotInitialized(PathBuf::from("/tmp/x")).exit_code(),
        exit_codes::USER_ERROR
    );
}

#[test]
fn exit_code_conflict() {
    let err = Error::Conflict("task 1 is still in progress".to_string());
    assert_eq!(err.exit_code(), exit_codes::CONFLICT);
    let err = Error::PermissionDenied("staff only".to_string());
    assert_eq!(err.exit_code(), exit_codes::CONFLICT);
}

#[test]
fn exit_code_operation_failed() {
    let err = Error::OperationFailed("boom".to_string());
    assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED);
    let err = Error::InvalidSnapshot {
        name: "c.json".to_string(),
        reason: "cycle".to_string(),
    };
    assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED);
}

#[test]
fn validation_details_are_keyed_by_field() {
    let err = Error::validation("parent", "would create a cycle");
    assert_eq!(err.field(), Some("parent"));
    let details = err.details().expect("details");
    assert_eq!(details["parent"][0], Value::String("would create a cycle".to_string()));
}

#[test]
fn already_converted_is_a_non_field_error() {
    let err = Error::AlreadyConverted(7);
    assert_eq!(err.field(), Some(NON_FIELD));
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::USER_ERROR);
    assert_eq!(json.kind, "user_error");
    assert_eq!(json.field.as_deref(), Some(NON_FIELD));
    let details = json.details.expect("details");
    assert_eq!(details["detail"], Value::String("Already converted".to_string()));
    assert_eq!(details["need"], Value::from(7));
}

#[test]
fn json_error_body_matches_the_envelope_shape() {
    let err = Error::PermissionDenied("staff only".to_string());
    let body = serde_json::to_value(JsonError::from(&err)).expect("serialize");
    assert_eq!(body["message"], "Permission denied: staff only");
    assert_eq!(body["code"], exit_codes::CONFLICT);
    assert_eq!(body["kind"], "conflict");
    assert!(body.get("field").is_none());
    assert!(body.get("details").is_none());
}
