use std::sync::Arc;

use admindeck_core::{AppError, AppResult};
use admindeck_domain::AttributeSchema;
use serde_json::{Value, json};

use super::{FormMode, FormOrchestrator, FormPhase, SubmitOutcome};
use crate::field_renderer::FieldInput;
use crate::notice::NoticeLevel;
use crate::ports::{BackendResponse, CrudEndpoints, UploadFile};
use crate::test_support::{BackendCall, FakeBackend, FakeUploader, record, ticket_schema};

fn form_with(schema: AttributeSchema, backend: Arc<FakeBackend>) -> FormOrchestrator {
    FormOrchestrator::new(Arc::new(schema), backend, CrudEndpoints::resource("tickets"))
}

fn ticket_form(backend: Arc<FakeBackend>) -> FormOrchestrator {
    form_with(ticket_schema(), backend)
}

#[tokio::test]
async fn empty_required_title_blocks_submit_without_backend_calls() {
    let backend = Arc::new(FakeBackend::new());
    let schema = AttributeSchema::from_json_str(
        &json!([{"name": "title", "type": "text", "required": true}]).to_string(),
    )
    .unwrap_or_else(|_| unreachable!());
    let mut form = form_with(schema, backend.clone());

    form.open(FormMode::Create, None)
        .unwrap_or_else(|_| unreachable!());
    form.set_field("title", json!(""))
        .unwrap_or_else(|_| unreachable!());
    let outcome = form.submit().await.unwrap_or_else(|_| unreachable!());

    assert!(matches!(outcome, SubmitOutcome::Invalid { ref errors } if errors.contains_key("title")));
    assert_eq!(form.phase(), FormPhase::Open(FormMode::Create));
    assert!(
        form.state()
            .and_then(|state| state.error("title"))
            .is_some()
    );
    assert!(backend.calls().await.is_empty());
}

#[tokio::test]
async fn create_seeds_defaults_and_posts_add_visible_attributes() {
    let backend = Arc::new(FakeBackend::new());
    let mut form = ticket_form(backend.clone());

    form.open(FormMode::Create, None)
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(
        form.state().map(|state| state.values().value_or_null("on_sale").clone()),
        Some(json!(false))
    );

    form.set_field("title", json!("Early bird"))
        .unwrap_or_else(|_| unreachable!());
    form.set_field("created_by", json!("ops"))
        .unwrap_or_else(|_| unreachable!());
    let outcome = form.submit().await.unwrap_or_else(|_| unreachable!());

    match outcome {
        SubmitOutcome::Saved { mode, record } => {
            assert_eq!(mode, FormMode::Create);
            assert_eq!(
                record.and_then(|record| record.id("_id")).as_deref(),
                Some("new-1")
            );
        }
        other => panic!("expected saved outcome, got {other:?}"),
    }
    assert_eq!(form.phase(), FormPhase::Closed);
    assert!(form.state().is_none());
    assert_eq!(
        backend.calls().await,
        vec![BackendCall::Post {
            endpoint: "tickets".to_owned(),
            payload: json!({"title": "Early bird", "on_sale": false, "created_by": "ops"}),
        }]
    );
}

#[tokio::test]
async fn unchanged_update_submits_record_restricted_to_update_attributes() {
    let existing = record(json!({
        "_id": "t-7",
        "title": "Gala dinner",
        "price": 120,
        "on_sale": true,
        "tier": "vip",
        "created_by": "ops",
        "internal_notes": "not in schema"
    }));
    let backend = Arc::new(FakeBackend::with_records(vec![existing.clone()]));
    let mut form = ticket_form(backend.clone());

    form.open(FormMode::Update, Some(existing.clone()))
        .unwrap_or_else(|_| unreachable!());
    let request = form
        .begin_submit()
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());

    let expected = existing
        .restricted_to(["title", "price", "on_sale", "tier", "poster"])
        .into_value();
    assert_eq!(request.payload(), &expected);
    assert_eq!(form.phase(), FormPhase::Submitting(FormMode::Update));

    let outcome = form.complete_submit(request.send().await);
    assert!(matches!(outcome, SubmitOutcome::Saved { mode: FormMode::Update, .. }));
    assert_eq!(
        backend.calls().await,
        vec![BackendCall::Put {
            endpoint: "tickets".to_owned(),
            id: "t-7".to_owned(),
            payload: expected,
        }]
    );
}

#[tokio::test]
async fn update_requires_record_identifier() {
    let mut form = ticket_form(Arc::new(FakeBackend::new()));
    let result = form.open(FormMode::Update, Some(record(json!({"title": "No id"}))));

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(form.phase(), FormPhase::Closed);
}

#[tokio::test]
async fn set_field_applies_validation_rule() {
    let mut form = ticket_form(Arc::new(FakeBackend::new()));
    form.open(FormMode::Create, None)
        .unwrap_or_else(|_| unreachable!());

    form.set_field("title", Value::String("x".repeat(61)))
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(
        form.state().and_then(|state| state.error("title")),
        Some("Title must be at most 60 characters")
    );

    form.set_field("title", json!("Matinee"))
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(form.state().and_then(|state| state.error("title")), None);
}

#[tokio::test]
async fn set_field_rejects_unknown_and_structural_attributes() {
    let mut form = ticket_form(Arc::new(FakeBackend::new()));
    form.open(FormMode::Create, None)
        .unwrap_or_else(|_| unreachable!());

    assert!(matches!(
        form.set_field("seat_map", json!("A1")),
        Err(AppError::Configuration(_))
    ));
    assert!(matches!(
        form.set_field("basics", json!("x")),
        Err(AppError::Configuration(_))
    ));
}

#[tokio::test]
async fn unparsable_input_blocks_submit_until_corrected() {
    let backend = Arc::new(FakeBackend::new());
    let mut form = ticket_form(backend.clone());
    form.open(FormMode::Create, None)
        .unwrap_or_else(|_| unreachable!());
    form.set_field("title", json!("Workshop"))
        .unwrap_or_else(|_| unreachable!());

    form.set_input("price", FieldInput::Text("twelve".to_owned()), None)
        .unwrap_or_else(|_| unreachable!());
    let outcome = form.submit().await.unwrap_or_else(|_| unreachable!());
    assert!(matches!(outcome, SubmitOutcome::Invalid { ref errors } if errors.contains_key("price")));
    assert_eq!(backend.write_calls().await, 0);

    form.set_input("price", FieldInput::Text("12.5".to_owned()), None)
        .unwrap_or_else(|_| unreachable!());
    let outcome = form.submit().await.unwrap_or_else(|_| unreachable!());
    assert!(matches!(outcome, SubmitOutcome::Saved { .. }));
}

#[tokio::test]
async fn server_failure_keeps_form_open_for_retry() {
    let backend = Arc::new(FakeBackend::new());
    backend
        .script(Ok(BackendResponse::new(
            200,
            json!({"success": false, "message": "title already used"}),
        )))
        .await;
    let mut form = ticket_form(backend.clone());
    form.open(FormMode::Create, None)
        .unwrap_or_else(|_| unreachable!());
    form.set_field("title", json!("Gala"))
        .unwrap_or_else(|_| unreachable!());

    let outcome = form.submit().await.unwrap_or_else(|_| unreachable!());
    match outcome {
        SubmitOutcome::Failed(notice) => {
            assert_eq!(notice.level(), NoticeLevel::Error);
            assert_eq!(notice.message(), "Unable to save record: title already used");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(form.phase(), FormPhase::Open(FormMode::Create));
    assert!(form.notice().is_some());

    let retry = form.submit().await.unwrap_or_else(|_| unreachable!());
    assert!(matches!(retry, SubmitOutcome::Saved { .. }));
    assert_eq!(backend.write_calls().await, 2);
}

#[tokio::test]
async fn network_failure_is_reported_not_propagated() {
    let backend = Arc::new(FakeBackend::new());
    backend
        .script(Err(AppError::Network("connection refused".to_owned())))
        .await;
    let mut form = ticket_form(backend);
    form.open(FormMode::Create, None)
        .unwrap_or_else(|_| unreachable!());
    form.set_field("title", json!("Gala"))
        .unwrap_or_else(|_| unreachable!());

    let outcome: AppResult<SubmitOutcome> = form.submit().await;
    match outcome {
        Ok(SubmitOutcome::Failed(notice)) => assert!(notice.is_retryable()),
        other => panic!("expected failed outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn closing_mid_submit_discards_the_reply() {
    let backend = Arc::new(FakeBackend::new());
    let mut form = ticket_form(backend.clone());
    form.open(FormMode::Create, None)
        .unwrap_or_else(|_| unreachable!());
    form.set_field("title", json!("Late show"))
        .unwrap_or_else(|_| unreachable!());

    let request = form
        .begin_submit()
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    form.close();
    let outcome = form.complete_submit(request.send().await);

    assert_eq!(outcome, SubmitOutcome::Discarded);
    assert_eq!(form.phase(), FormPhase::Closed);
    assert_eq!(backend.records().await.len(), 1);
}

#[tokio::test]
async fn editing_and_submitting_are_blocked_while_submitting() {
    let mut form = ticket_form(Arc::new(FakeBackend::new()));
    form.open(FormMode::Create, None)
        .unwrap_or_else(|_| unreachable!());
    form.set_field("title", json!("Matinee"))
        .unwrap_or_else(|_| unreachable!());
    let _request = form.begin_submit().unwrap_or_else(|_| unreachable!());

    assert!(matches!(
        form.set_field("title", json!("Changed")),
        Err(AppError::InvalidState(_))
    ));
    assert!(matches!(form.begin_submit(), Err(AppError::InvalidState(_))));
    assert!(matches!(
        form.open(FormMode::Create, None),
        Err(AppError::InvalidState(_))
    ));
}

#[tokio::test]
async fn submit_on_closed_form_is_invalid_state() {
    let mut form = ticket_form(Arc::new(FakeBackend::new()));
    assert!(matches!(form.submit().await, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn attach_image_stores_upload_reference() {
    let mut form = ticket_form(Arc::new(FakeBackend::new()))
        .with_uploader(Arc::new(FakeUploader { fail: false }));
    form.open(FormMode::Create, None)
        .unwrap_or_else(|_| unreachable!());

    form.attach_image(
        "poster",
        UploadFile {
            file_name: "gala.png".to_owned(),
            content_type: "image/png".to_owned(),
            bytes: vec![0x89, 0x50],
        },
    )
    .await
    .unwrap_or_else(|_| unreachable!());

    assert_eq!(
        form.state().map(|state| state.values().value_or_null("poster").clone()),
        Some(json!("uploads/gala.png"))
    );
}

#[tokio::test]
async fn failed_upload_becomes_field_error() {
    let mut form = ticket_form(Arc::new(FakeBackend::new()))
        .with_uploader(Arc::new(FakeUploader { fail: true }));
    form.open(FormMode::Create, None)
        .unwrap_or_else(|_| unreachable!());

    let file = UploadFile {
        file_name: "gala.png".to_owned(),
        content_type: "image/png".to_owned(),
        bytes: Vec::new(),
    };
    form.attach_image("poster", file.clone())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(
        form.state().and_then(|state| state.error("poster")),
        Some("unable to upload image: upload endpoint unreachable")
    );
    assert!(matches!(
        form.attach_image("title", file).await,
        Err(AppError::Configuration(_))
    ));
}
