use std::sync::Arc;

use admindeck_core::AppError;
use admindeck_domain::{AttributeSchema, CellRenderer, QueryState, SortDirection};
use serde_json::{Value, json};

use super::{DeleteOutcome, ListOrchestrator, ListPage, LoadOutcome};
use crate::notice::NoticeLevel;
use crate::ports::{BackendResponse, CrudEndpoints};
use crate::test_support::{BackendCall, FakeBackend, numbered_tickets, record, ticket_schema};

fn list_with(
    schema: AttributeSchema,
    backend: Arc<FakeBackend>,
    page_size: usize,
) -> ListOrchestrator {
    ListOrchestrator::new(
        Arc::new(schema),
        backend,
        CrudEndpoints::resource("tickets"),
        QueryState::new(page_size).unwrap_or_else(|_| unreachable!()),
    )
}

fn ticket_list(backend: Arc<FakeBackend>, page_size: usize) -> ListOrchestrator {
    list_with(ticket_schema(), backend, page_size)
}

fn row_ids(list: &ListOrchestrator) -> Vec<String> {
    list.rows()
        .iter()
        .filter_map(|row| row.id("_id"))
        .collect()
}

async fn last_get_params(backend: &FakeBackend) -> Vec<(String, String)> {
    backend
        .calls()
        .await
        .into_iter()
        .rev()
        .find_map(|call| match call {
            BackendCall::Get { params, .. } => Some(params),
            _ => None,
        })
        .unwrap_or_default()
}

#[test]
fn list_page_reads_total_from_alternate_keys() {
    let page = ListPage::from_body(&json!({"data": [{"_id": "a"}], "count": 7}))
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.total, Some(7));

    let missing = ListPage::from_body(&json!({"items": []}));
    assert!(matches!(missing, Err(AppError::Server(_))));
}

#[tokio::test]
async fn saved_query_is_restored_in_one_load() {
    let backend = Arc::new(FakeBackend::with_records(numbered_tickets(12)));
    let mut list = ticket_list(backend.clone(), 10);

    let mut saved = QueryState::new(5).unwrap_or_else(|_| unreachable!());
    saved.set_search("Ticket");
    saved.set_page(1);
    let outcome = list.load_with(saved.clone()).await;

    assert!(matches!(outcome, LoadOutcome::Applied { .. }));
    assert_eq!(list.query(), &saved);
    let params = last_get_params(&backend).await;
    assert!(params.contains(&("skip".to_owned(), "5".to_owned())));
    assert!(params.contains(&("limit".to_owned(), "5".to_owned())));
    assert!(params.contains(&("search".to_owned(), "Ticket".to_owned())));
    assert_eq!(backend.calls().await.len(), 1);
}

#[tokio::test]
async fn load_fills_rows_and_total() {
    let backend = Arc::new(FakeBackend::with_records(numbered_tickets(12)));
    let mut list = ticket_list(backend.clone(), 10);

    let outcome = list.load().await;

    assert_eq!(outcome, LoadOutcome::Applied { rows: 10 });
    assert_eq!(list.total(), Some(12));
    assert!(!list.is_loading());
    assert_eq!(list.applied_sequence(), Some(1));
    assert_eq!(list.query().page_count(12), 2);
}

#[tokio::test]
async fn older_reply_arriving_last_is_discarded() {
    let mut records = numbered_tickets(3);
    records.push(record(json!({"_id": "v-1", "title": "VIP lounge"})));
    let backend = Arc::new(FakeBackend::with_records(records));
    let mut list = ticket_list(backend.clone(), 10);

    let first = list.begin_load();
    let second = list.begin_search("vip");
    let first_reply = first.fetch().await;
    let second_reply = second.fetch().await;

    assert_eq!(list.apply_load(second_reply), LoadOutcome::Applied { rows: 1 });
    assert_eq!(list.apply_load(first_reply), LoadOutcome::Superseded);
    assert_eq!(row_ids(&list), vec!["v-1".to_owned()]);
    assert_eq!(list.applied_sequence(), Some(2));
}

#[tokio::test]
async fn narrower_search_wins_over_late_broader_reply() {
    let backend = Arc::new(FakeBackend::with_records(vec![
        record(json!({"_id": "a-1", "title": "Alpha night"})),
        record(json!({"_id": "a-2", "title": "Alpine morning"})),
        record(json!({"_id": "b-1", "title": "Beta"})),
    ]));
    let mut list = ticket_list(backend.clone(), 10);

    let alpha = list.begin_search("alpha");
    let alp = list.begin_search("alp");
    let alp_reply = alp.fetch().await;
    let alpha_reply = alpha.fetch().await;

    assert_eq!(list.apply_load(alp_reply), LoadOutcome::Applied { rows: 2 });
    assert_eq!(list.apply_load(alpha_reply), LoadOutcome::Superseded);
    assert_eq!(row_ids(&list), vec!["a-1".to_owned(), "a-2".to_owned()]);
    assert_eq!(list.query().search(), Some("alp"));
}

#[tokio::test]
async fn superseded_reply_keeps_loading_flag_until_latest_arrives() {
    let backend = Arc::new(FakeBackend::with_records(numbered_tickets(2)));
    let mut list = ticket_list(backend, 10);

    let first = list.begin_load();
    let second = list.begin_load();
    let first_reply = first.fetch().await;
    assert_eq!(list.apply_load(first_reply), LoadOutcome::Superseded);
    assert!(list.is_loading());

    let second_reply = second.fetch().await;
    assert_eq!(list.apply_load(second_reply), LoadOutcome::Applied { rows: 2 });
    assert!(!list.is_loading());
}

#[tokio::test]
async fn failed_load_keeps_previous_rows_and_shows_banner() {
    let backend = Arc::new(FakeBackend::with_records(numbered_tickets(4)));
    let mut list = ticket_list(backend.clone(), 10);
    list.load().await;

    backend
        .script(Err(AppError::Network("connection reset".to_owned())))
        .await;
    let outcome = list.load().await;

    let LoadOutcome::Failed(notice) = outcome else {
        unreachable!()
    };
    assert_eq!(notice.message(), "Unable to load records: connection reset");
    assert!(notice.is_retryable());
    assert_eq!(list.rows().len(), 4);
    assert_eq!(list.notice().map(|notice| notice.level()), Some(NoticeLevel::Error));
    assert!(!list.is_loading());

    list.load().await;
    assert!(list.notice().is_none());
}

#[tokio::test]
async fn unsuccessful_reply_is_treated_as_failure() {
    let backend = Arc::new(FakeBackend::with_records(numbered_tickets(2)));
    backend
        .script(Ok(BackendResponse::new(
            200,
            json!({"success": false, "message": "token expired"}),
        )))
        .await;
    let mut list = ticket_list(backend, 10);

    let outcome = list.load().await;

    assert!(
        matches!(outcome, LoadOutcome::Failed(ref notice) if notice.message() == "Unable to load records: token expired")
    );
    assert!(list.rows().is_empty());
}

#[tokio::test]
async fn filter_page_and_sort_are_sent_as_params() {
    let backend = Arc::new(FakeBackend::with_records(numbered_tickets(30)));
    let mut list = ticket_list(backend.clone(), 10);

    list.set_page(2).await;
    let params = last_get_params(&backend).await;
    assert!(params.contains(&("skip".to_owned(), "20".to_owned())));
    assert!(params.contains(&("limit".to_owned(), "10".to_owned())));

    list.set_filter("tier", json!("vip"))
        .await
        .unwrap_or_else(|_| unreachable!());
    let params = last_get_params(&backend).await;
    assert!(params.contains(&("filter.tier".to_owned(), "vip".to_owned())));
    assert!(params.contains(&("skip".to_owned(), "0".to_owned())));

    list.set_sort(Some(("price", SortDirection::Desc)))
        .await
        .unwrap_or_else(|_| unreachable!());
    let params = last_get_params(&backend).await;
    assert!(params.contains(&("sort".to_owned(), "price".to_owned())));
    assert!(params.contains(&("order".to_owned(), "desc".to_owned())));

    list.set_page_size(25)
        .await
        .unwrap_or_else(|_| unreachable!());
    let params = last_get_params(&backend).await;
    assert!(params.contains(&("limit".to_owned(), "25".to_owned())));
}

#[tokio::test]
async fn sorting_by_unknown_attribute_is_rejected_without_fetch() {
    let backend = Arc::new(FakeBackend::new());
    let mut list = ticket_list(backend.clone(), 10);

    let result = list.set_sort(Some(("venue", SortDirection::Asc))).await;

    assert!(matches!(result, Err(AppError::Configuration(_))));
    assert!(backend.calls().await.is_empty());
}

#[tokio::test]
async fn rows_render_labels_flags_and_overrides() {
    let backend = Arc::new(FakeBackend::with_records(vec![record(json!({
        "_id": "t-1",
        "title": "Gala",
        "price": 30,
        "on_sale": true,
        "tier": "vip",
    }))]));
    let schema = ticket_schema()
        .with_render(
            "price",
            CellRenderer::new(|value, _, _| format!("${}", value.as_i64().unwrap_or_default())),
        )
        .unwrap_or_else(|_| unreachable!());
    let mut list = list_with(schema, backend, 10);
    list.load().await;

    let columns: Vec<String> = list.columns().into_iter().map(|column| column.name).collect();
    assert_eq!(
        columns,
        vec!["title", "price", "on_sale", "tier", "created_by", "poster"]
    );

    let rows = list.row_views();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record_id.as_deref(), Some("t-1"));
    let texts: Vec<&str> = rows[0].cells.iter().map(|cell| cell.text.as_str()).collect();
    assert_eq!(texts, vec!["Gala", "$30", "Yes", "VIP", "", ""]);
}

#[tokio::test]
async fn confirmed_delete_removes_exactly_one_row() {
    let backend = Arc::new(FakeBackend::with_records(numbered_tickets(10)));
    let mut list = ticket_list(backend.clone(), 10);
    list.load().await;

    list.request_delete("t-3")
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(list.pending_delete(), Some("t-3"));
    assert_eq!(list.rows().len(), 10);

    let outcome = list
        .delete_confirmed()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(
        outcome,
        DeleteOutcome::Deleted {
            record_id: "t-3".to_owned(),
            reload_required: false,
        }
    );
    assert_eq!(list.rows().len(), 9);
    assert_eq!(list.total(), Some(9));
    assert!(list.find("t-3").is_none());
    assert_eq!(list.notice().map(|notice| notice.level()), Some(NoticeLevel::Success));
    assert_eq!(backend.records().await.len(), 9);
}

#[tokio::test]
async fn row_disappears_before_backend_confirms() {
    let backend = Arc::new(FakeBackend::with_records(numbered_tickets(10)));
    let mut list = ticket_list(backend.clone(), 10);
    list.load().await;

    list.request_delete("t-3")
        .unwrap_or_else(|_| unreachable!());
    let request = list.confirm_delete().unwrap_or_else(|_| unreachable!());

    assert_eq!(request.record_id(), "t-3");
    assert!(list.find("t-3").is_none());
    assert!(list.is_deleting());
    assert!(matches!(
        list.request_delete("t-4"),
        Err(AppError::InvalidState(_))
    ));

    let response = request.send().await;
    list.finish_delete(response)
        .unwrap_or_else(|_| unreachable!());
    assert!(!list.is_deleting());
}

#[tokio::test]
async fn failed_delete_restores_row_in_place() {
    let backend = Arc::new(FakeBackend::with_records(numbered_tickets(10)));
    let mut list = ticket_list(backend.clone(), 10);
    list.load().await;
    let before = row_ids(&list);

    backend
        .script(Ok(BackendResponse::new(
            409,
            json!({"success": false, "message": "ticket has sales"}),
        )))
        .await;
    list.request_delete("t-3")
        .unwrap_or_else(|_| unreachable!());
    let outcome = list
        .delete_confirmed()
        .await
        .unwrap_or_else(|_| unreachable!());

    let DeleteOutcome::RolledBack(notice) = outcome else {
        unreachable!()
    };
    assert_eq!(notice.message(), "Unable to delete record: ticket has sales");
    assert_eq!(row_ids(&list), before);
    assert_eq!(list.total(), Some(10));
    assert_eq!(list.notice(), Some(&notice));
}

#[tokio::test]
async fn reload_during_delete_does_not_resurrect_row() {
    let backend = Arc::new(FakeBackend::with_records(numbered_tickets(10)));
    let mut list = ticket_list(backend.clone(), 10);
    list.load().await;

    list.request_delete("t-3")
        .unwrap_or_else(|_| unreachable!());
    let delete = list.confirm_delete().unwrap_or_else(|_| unreachable!());

    let reload = list.begin_load().fetch().await;
    list.apply_load(reload);
    assert!(list.find("t-3").is_some());
    assert_eq!(list.total(), Some(10));

    let response = delete.send().await;
    let outcome = list
        .finish_delete(response)
        .unwrap_or_else(|_| unreachable!());

    assert!(matches!(outcome, DeleteOutcome::Deleted { .. }));
    assert!(list.find("t-3").is_none());
    assert_eq!(list.rows().len(), 9);
    assert_eq!(list.total(), Some(9));
}

#[tokio::test]
async fn cancelled_delete_sends_nothing() {
    let backend = Arc::new(FakeBackend::with_records(numbered_tickets(3)));
    let mut list = ticket_list(backend.clone(), 10);
    list.load().await;

    list.request_delete("t-1")
        .unwrap_or_else(|_| unreachable!());
    list.cancel_delete();

    assert!(list.pending_delete().is_none());
    assert!(matches!(list.confirm_delete(), Err(AppError::InvalidState(_))));
    assert_eq!(list.rows().len(), 3);
    assert_eq!(backend.write_calls().await, 0);
}

#[tokio::test]
async fn deleting_unknown_row_is_not_found() {
    let backend = Arc::new(FakeBackend::with_records(numbered_tickets(3)));
    let mut list = ticket_list(backend, 10);
    list.load().await;

    assert!(matches!(
        list.request_delete("t-99"),
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn deleting_last_row_of_page_steps_back() {
    let backend = Arc::new(FakeBackend::with_records(numbered_tickets(6)));
    let mut list = ticket_list(backend.clone(), 5);
    list.set_page(1).await;
    assert_eq!(row_ids(&list), vec!["t-5".to_owned()]);

    list.request_delete("t-5")
        .unwrap_or_else(|_| unreachable!());
    let outcome = list
        .delete_confirmed()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(matches!(
        outcome,
        DeleteOutcome::Deleted {
            reload_required: true,
            ..
        }
    ));
    assert_eq!(list.query().pagination().page(), 0);
    assert_eq!(list.rows().len(), 5);
    assert_eq!(list.total(), Some(5));
}

#[tokio::test]
async fn delete_pulls_in_next_row_when_more_exist() {
    let backend = Arc::new(FakeBackend::with_records(numbered_tickets(10)));
    let mut list = ticket_list(backend.clone(), 5);
    list.load().await;

    list.request_delete("t-1")
        .unwrap_or_else(|_| unreachable!());
    list.delete_confirmed()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(
        row_ids(&list),
        vec!["t-0", "t-2", "t-3", "t-4", "t-5"]
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>()
    );
    assert_eq!(list.total(), Some(9));
}

#[tokio::test]
async fn numeric_identifiers_match_rows() {
    let backend = Arc::new(FakeBackend::with_records(vec![record(
        json!({"_id": 42, "title": "Numbered"}),
    )]));
    let mut list = ticket_list(backend, 10);
    list.load().await;

    assert_eq!(
        list.find("42").and_then(|row| row.get("title")),
        Some(&Value::String("Numbered".to_owned()))
    );
}
