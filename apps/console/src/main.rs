//! Console front end listing, searching, and deleting records of one resource.

#![forbid(unsafe_code)]

mod command;
mod console_config;
mod table;

use std::env;
use std::sync::Arc;

use admindeck_application::{
    AppContext, AppPorts, CrudEndpoints, CrudPage, DeleteOutcome, LoadOutcome, Notice,
};
use admindeck_core::{AppError, AppResult, UserIdentity};
use admindeck_domain::AttributeSchema;
use admindeck_infrastructure::{HttpRecordBackend, InMemoryLocalStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::command::Command;
use crate::console_config::ConsoleConfig;
use crate::table::render_table;

const STORAGE_NAMESPACE: &str = "admindeck";

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let arguments: Vec<String> = env::args().skip(1).collect();
    let command = Command::parse(&arguments)?;
    let config = ConsoleConfig::load()?;

    let schema_json = tokio::fs::read_to_string(config.schema_path.as_str())
        .await
        .map_err(|error| {
            AppError::Configuration(format!(
                "failed to read attribute schema '{}': {error}",
                config.schema_path
            ))
        })?;
    let schema = AttributeSchema::from_json_str(schema_json.as_str())?;

    let http_client = HttpRecordBackend::build_client(config.http_timeout)?;
    let backend = HttpRecordBackend::new(
        http_client,
        config.api_base_url.as_str(),
        config.api_token.clone(),
    )?;

    let mut context = AppContext::new(
        AppPorts {
            backend: Arc::new(backend),
            uploader: None,
            store: Arc::new(InMemoryLocalStore::new()),
        },
        STORAGE_NAMESPACE,
    )?;
    context
        .init(UserIdentity::new("console")?.with_display_name("Console operator"))
        .await?;

    info!(
        api_base_url = %config.api_base_url,
        endpoint = %config.endpoint,
        attributes = schema.len(),
        "admindeck-console started"
    );

    let endpoints = CrudEndpoints::resource(config.endpoint.as_str())
        .with_id_field(config.id_field.as_str());
    let mut page = CrudPage::new(&context, schema, endpoints, config.page_size)?;

    let result = run(&mut page, command).await;
    context.teardown().await?;
    result
}

async fn run(page: &mut CrudPage, command: Command) -> AppResult<()> {
    page.refresh_options().await;

    match command {
        Command::List { search } => {
            let outcome = match search {
                Some(term) => page.list_mut().search(term.as_str()).await,
                None => page.list_mut().load().await,
            };
            if let LoadOutcome::Failed(notice) = outcome {
                return Err(notice_error(&notice));
            }
            print_page(page);
            Ok(())
        }
        Command::Delete { record_id } => {
            delete_record(page, record_id.as_str()).await?;
            print_page(page);
            Ok(())
        }
    }
}

/// Pages through the list until the record is found, then deletes it.
async fn delete_record(page: &mut CrudPage, record_id: &str) -> AppResult<()> {
    let mut page_index = 0;
    loop {
        if let LoadOutcome::Failed(notice) = page.list_mut().set_page(page_index).await {
            return Err(notice_error(&notice));
        }
        if page.list().find(record_id).is_some() {
            break;
        }

        let list = page.list();
        let seen = list.query().pagination().skip() + list.rows().len();
        if list.rows().is_empty() || list.total().is_none_or(|total| seen >= total) {
            return Err(AppError::NotFound(format!("record '{record_id}' was not found")));
        }
        page_index += 1;
    }

    page.list_mut().request_delete(record_id)?;
    match page.list_mut().delete_confirmed().await? {
        DeleteOutcome::Deleted { record_id, .. } => {
            info!(record_id = %record_id, "record deleted");
            Ok(())
        }
        DeleteOutcome::RolledBack(notice) => {
            warn!(record_id = %record_id, "delete rolled back");
            Err(notice_error(&notice))
        }
    }
}

fn print_page(page: &CrudPage) {
    let list = page.list();
    println!("{}", render_table(&list.columns(), &list.row_views()));

    let pagination = list.query().pagination();
    match list.total() {
        Some(total) => println!(
            "page {} of {} ({} records)",
            pagination.page() + 1,
            list.query().page_count(total),
            total
        ),
        None => println!("page {}", pagination.page() + 1),
    }
}

fn notice_error(notice: &Notice) -> AppError {
    if notice.is_retryable() {
        AppError::Network(notice.message().to_owned())
    } else {
        AppError::Server(notice.message().to_owned())
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
