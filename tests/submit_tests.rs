mod common;

use std::sync::Arc;

use common::{ScriptedBackend, contact_form, settle};
use formbridge::{
    FieldErrors, SubmitError, SubmitOptions, SubmitResponse, TransportError, ValidationOutcome,
};
use parking_lot::Mutex;
use serde_json::{Value, json};

#[tokio::test]
async fn rejection_replaces_errors_and_releases_the_slot() {
    let backend = ScriptedBackend::manual();
    let form = contact_form(&backend);
    form.set_errors(FieldErrors::new().with("last_name", "required"));

    let pending = tokio::spawn(form.submit(SubmitOptions::new()));
    assert!(form.is_processing());
    settle().await;
    assert_eq!(backend.submission_count(), 1);

    let errors = FieldErrors::new().with("email", "already taken");
    backend.reply_submission(0, Ok(SubmitResponse::Rejected(errors.clone())));
    let result = pending.await.expect("task");

    assert_eq!(result, Err(SubmitError::Rejected(errors.clone())));
    assert_eq!(form.errors(), errors);
    assert!(!form.is_processing());
}

#[tokio::test]
async fn second_submit_while_in_flight_is_refused() {
    let backend = ScriptedBackend::manual();
    let form = contact_form(&backend);

    let first = tokio::spawn(form.submit(SubmitOptions::new()));
    let second = form.submit(SubmitOptions::new()).await;
    assert_eq!(second, Err(SubmitError::InFlight));

    settle().await;
    assert_eq!(backend.submission_count(), 1, "refused submit sends nothing");

    backend.reply_submission(0, Ok(SubmitResponse::Accepted(Value::Null)));
    assert_eq!(first.await.expect("task"), Ok(Value::Null));
    assert!(!form.is_processing());
}

#[tokio::test]
async fn success_clears_errors_resets_and_runs_callback() {
    let backend = ScriptedBackend::manual()
        .answering_submit(|data| Ok(SubmitResponse::Accepted(json!({"saved": data.to_json()}))));
    let form = contact_form(&backend);
    form.set_data("first_name", "Grace").expect("known field");
    form.set_errors(FieldErrors::new().with("email", "stale"));

    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let options = SubmitOptions::new()
        .with_reset_on_success(true)
        .on_success(move |body| *sink.lock() = Some(body.clone()));
    let body = form.submit(options).await.expect("accepted");

    assert_eq!(body["saved"]["first_name"], json!("Grace"));
    assert_eq!(seen.lock().as_ref(), Some(&body));
    assert!(!form.has_errors());
    assert!(!form.is_dirty(), "reset restores the initial values");
    assert!(!form.is_processing());
}

#[tokio::test]
async fn success_without_reset_keeps_values() {
    let backend = ScriptedBackend::manual()
        .answering_submit(|_| Ok(SubmitResponse::Accepted(Value::Null)));
    let form = contact_form(&backend);
    form.set_data("first_name", "Grace").expect("known field");

    form.submit(SubmitOptions::new()).await.expect("accepted");

    assert!(form.is_dirty());
}

#[tokio::test]
async fn transport_failure_keeps_errors_and_values() {
    let backend = ScriptedBackend::manual()
        .answering_submit(|_| Err(TransportError::Status { status: 500, body: "boom".into() }));
    let form = contact_form(&backend);
    form.set_errors(FieldErrors::new().with("email", "invalid"));

    let called = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&called);
    let err = form
        .submit(SubmitOptions::new().on_success(move |_| *flag.lock() = true))
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::Transport(TransportError::Status { status: 500, .. })));
    assert_eq!(form.error("email").as_deref(), Some("invalid"));
    assert!(!*called.lock());
    assert!(!form.is_processing());
}

#[tokio::test]
async fn submission_result_overrides_in_flight_validation() {
    let backend = ScriptedBackend::manual();
    let form = contact_form(&backend);

    let validation = tokio::spawn(form.validate("email").expect("known field"));
    let submission = tokio::spawn(form.submit(SubmitOptions::new()));
    settle().await;

    backend.reply_submission(
        0,
        Ok(SubmitResponse::Rejected(
            FieldErrors::new().with("email", "already taken"),
        )),
    );
    assert!(submission.await.expect("task").is_err());

    backend.reply_validation(0, Ok(FieldErrors::new()));
    let outcome = validation.await.expect("task");

    assert_eq!(
        outcome,
        ValidationOutcome::Settled {
            applied: Vec::new(),
            superseded: vec!["email".into()],
        }
    );
    assert_eq!(form.error("email").as_deref(), Some("already taken"));
}

#[test]
fn dropping_a_pending_submit_frees_the_slot() {
    let backend = ScriptedBackend::manual();
    let form = contact_form(&backend);

    let pending = form.submit(SubmitOptions::new());
    assert!(form.is_processing());
    drop(pending);
    assert!(!form.is_processing());
}

#[tokio::test]
async fn disposed_controller_refuses_to_submit() {
    let backend = ScriptedBackend::manual();
    let form = contact_form(&backend);
    form.dispose();

    assert_eq!(
        form.submit(SubmitOptions::new()).await,
        Err(SubmitError::Disposed)
    );
    assert_eq!(backend.submission_count(), 0);
}

#[tokio::test]
async fn dispose_during_submission_discards_the_answer() {
    let backend = ScriptedBackend::manual();
    let form = contact_form(&backend);

    let pending = tokio::spawn(form.submit(SubmitOptions::new()));
    settle().await;
    form.dispose();
    backend.reply_submission(
        0,
        Ok(SubmitResponse::Rejected(FieldErrors::new().with("email", "taken"))),
    );

    assert_eq!(pending.await.expect("task"), Err(SubmitError::Disposed));
    assert!(!form.has_errors());
    assert!(!form.is_processing());
}

#[tokio::test]
async fn validation_dispatched_during_submission_keeps_the_last_word() {
    let backend = ScriptedBackend::manual();
    let form = contact_form(&backend);

    let submission = tokio::spawn(form.submit(SubmitOptions::new()));
    settle().await;
    let validation = tokio::spawn(
        form.set_value("email", "fresh@example.com")
            .expect("known field"),
    );
    settle().await;

    backend.reply_submission(
        0,
        Ok(SubmitResponse::Rejected(
            FieldErrors::new().with("email", "already taken"),
        )),
    );
    assert!(submission.await.expect("task").is_err());
    assert_eq!(form.error("email").as_deref(), Some("already taken"));

    backend.reply_validation(0, Ok(FieldErrors::new()));
    let outcome = validation.await.expect("task");

    assert_eq!(outcome.applied(), ["email".to_string()]);
    assert_eq!(form.error("email"), None);
}

#[tokio::test]
async fn accepted_submission_keeps_later_validations() {
    let backend = ScriptedBackend::manual();
    let form = contact_form(&backend);

    let submission = tokio::spawn(form.submit(SubmitOptions::new()));
    settle().await;
    let validation = tokio::spawn(form.set_value("email", "nope").expect("known field"));
    settle().await;

    backend.reply_submission(0, Ok(SubmitResponse::Accepted(Value::Null)));
    submission.await.expect("task").expect("accepted");
    backend.reply_validation(0, Ok(FieldErrors::new().with("email", "invalid")));

    assert_eq!(
        validation.await.expect("task").applied(),
        ["email".to_string()]
    );
    assert_eq!(form.error("email").as_deref(), Some("invalid"));
}
