use serde_json::{json, Value};
use shiplog::core::feedback::parse_submission;
use shiplog::core::types::{ErrorCategory, FeedbackCategory};

fn valid_body() -> Value {
    json!({
        "score": 1,
        "input": "https://github.com/octocat/Hello-World",
        "output": "## Changes",
        "correlationId": "gen-123",
    })
}

#[test]
fn accepts_valid_positive_submission() {
    let submission = parse_submission(&valid_body()).unwrap();
    assert_eq!(submission.score, 1);
    assert_eq!(FeedbackCategory::from_score(submission.score), FeedbackCategory::Positive);
}

#[test]
fn accepts_valid_negative_submission() {
    let mut body = valid_body();
    body["score"] = json!(0);
    let submission = parse_submission(&body).unwrap();
    assert_eq!(submission.score, 0);
    assert_eq!(FeedbackCategory::from_score(submission.score), FeedbackCategory::Negative);
}

#[test]
fn rejects_every_non_binary_score() {
    for score in [
        json!(0.5),
        json!(2),
        json!(-1),
        json!(100),
        json!("1"),
        json!("positive"),
        json!(true),
        Value::Null,
    ] {
        let mut body = valid_body();
        body["score"] = score.clone();
        let err = parse_submission(&body).unwrap_err();
        assert_eq!(err.category, ErrorCategory::ValidationError, "score {:?}", score);
        assert_eq!(err.detail(), "Score must be 0 or 1", "score {:?}", score);
    }
}

#[test]
fn rejects_missing_score() {
    let mut body = valid_body();
    body.as_object_mut().unwrap().remove("score");
    let err = parse_submission(&body).unwrap_err();
    assert_eq!(err.detail(), "Score must be 0 or 1");
}

#[test]
fn rejects_missing_input_independently() {
    let mut body = valid_body();
    body.as_object_mut().unwrap().remove("input");
    let err = parse_submission(&body).unwrap_err();
    assert_eq!(err.detail(), "Input and output are required");
}

#[test]
fn rejects_missing_output_independently() {
    let mut body = valid_body();
    body.as_object_mut().unwrap().remove("output");
    let err = parse_submission(&body).unwrap_err();
    assert_eq!(err.detail(), "Input and output are required");
}

#[test]
fn rejects_missing_correlation_id_independently() {
    let mut body = valid_body();
    body.as_object_mut().unwrap().remove("correlationId");
    let err = parse_submission(&body).unwrap_err();
    assert_eq!(err.detail(), "correlationId is required");
}

#[test]
fn rejects_empty_correlation_id() {
    let mut body = valid_body();
    body["correlationId"] = json!("");
    let err = parse_submission(&body).unwrap_err();
    assert_eq!(err.detail(), "correlationId is required");
}

#[test]
fn score_failure_wins_over_missing_fields() {
    let err = parse_submission(&json!({ "score": 7 })).unwrap_err();
    assert_eq!(err.detail(), "Score must be 0 or 1");
}

#[test]
fn comment_is_trimmed_and_optional() {
    let mut body = valid_body();
    body["comment"] = json!("  too terse  ");
    let submission = parse_submission(&body).unwrap();
    assert_eq!(submission.comment.as_deref(), Some("too terse"));

    let submission = parse_submission(&valid_body()).unwrap();
    assert!(submission.comment.is_none());
}
