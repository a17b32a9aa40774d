use std::collections::{HashMap, VecDeque};

use admindeck_core::{AppError, AppResult, StorageKey};
use admindeck_domain::{AttributeSchema, Record};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::ports::{BackendResponse, FileUploader, LocalStore, RecordBackend, UploadFile};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BackendCall {
    Get {
        endpoint: String,
        params: Vec<(String, String)>,
    },
    Post {
        endpoint: String,
        payload: Value,
    },
    Put {
        endpoint: String,
        id: String,
        payload: Value,
    },
    Delete {
        endpoint: String,
        id: String,
    },
}

/// Backend fake serving one collection; scripted replies take precedence.
pub(crate) struct FakeBackend {
    records: Mutex<Vec<Record>>,
    calls: Mutex<Vec<BackendCall>>,
    scripted: Mutex<VecDeque<AppResult<BackendResponse>>>,
    next_id: Mutex<u32>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::with_records(Vec::new())
    }

    pub(crate) fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
            calls: Mutex::new(Vec::new()),
            scripted: Mutex::new(VecDeque::new()),
            next_id: Mutex::new(1),
        }
    }

    pub(crate) async fn script(&self, reply: AppResult<BackendResponse>) {
        self.scripted.lock().await.push_back(reply);
    }

    pub(crate) async fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().await.clone()
    }

    pub(crate) async fn write_calls(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| !matches!(call, BackendCall::Get { .. }))
            .count()
    }

    pub(crate) async fn records(&self) -> Vec<Record> {
        self.records.lock().await.clone()
    }

    async fn scripted_reply(&self) -> Option<AppResult<BackendResponse>> {
        self.scripted.lock().await.pop_front()
    }
}

pub(crate) fn ok(data: Value) -> BackendResponse {
    BackendResponse::new(200, json!({"success": true, "data": data}))
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

#[async_trait]
impl RecordBackend for FakeBackend {
    async fn get_data(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> AppResult<BackendResponse> {
        self.calls.lock().await.push(BackendCall::Get {
            endpoint: endpoint.to_owned(),
            params: params.to_vec(),
        });
        if let Some(reply) = self.scripted_reply().await {
            return reply;
        }

        let search = param(params, "search").map(str::to_lowercase);
        let matching: Vec<Record> = self
            .records
            .lock()
            .await
            .iter()
            .filter(|record| match &search {
                Some(term) => record
                    .get("title")
                    .and_then(Value::as_str)
                    .is_some_and(|title| title.to_lowercase().contains(term)),
                None => true,
            })
            .cloned()
            .collect();

        let skip = param(params, "skip")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(0);
        let limit = param(params, "limit")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(usize::MAX);
        let page: Vec<Value> = matching
            .iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .map(Record::into_value)
            .collect();

        Ok(BackendResponse::new(
            200,
            json!({"success": true, "data": page, "total": matching.len()}),
        ))
    }

    async fn post_data(&self, endpoint: &str, payload: Value) -> AppResult<BackendResponse> {
        self.calls.lock().await.push(BackendCall::Post {
            endpoint: endpoint.to_owned(),
            payload: payload.clone(),
        });
        if let Some(reply) = self.scripted_reply().await {
            return reply;
        }

        let mut record = Record::from_value(payload)?;
        let mut next_id = self.next_id.lock().await;
        record.insert("_id", Value::String(format!("new-{}", *next_id)));
        *next_id += 1;
        self.records.lock().await.push(record.clone());
        Ok(ok(record.into_value()))
    }

    async fn put_data(
        &self,
        endpoint: &str,
        id: &str,
        payload: Value,
    ) -> AppResult<BackendResponse> {
        self.calls.lock().await.push(BackendCall::Put {
            endpoint: endpoint.to_owned(),
            id: id.to_owned(),
            payload: payload.clone(),
        });
        if let Some(reply) = self.scripted_reply().await {
            return reply;
        }

        let mut records = self.records.lock().await;
        let Some(existing) = records
            .iter_mut()
            .find(|record| record.id("_id").as_deref() == Some(id))
        else {
            return Ok(BackendResponse::new(
                404,
                json!({"success": false, "message": format!("record '{id}' not found")}),
            ));
        };
        if let Value::Object(fields) = payload {
            for (key, value) in fields {
                existing.insert(key, value);
            }
        }
        Ok(ok(existing.clone().into_value()))
    }

    async fn delete_data(&self, endpoint: &str, id: &str) -> AppResult<BackendResponse> {
        self.calls.lock().await.push(BackendCall::Delete {
            endpoint: endpoint.to_owned(),
            id: id.to_owned(),
        });
        if let Some(reply) = self.scripted_reply().await {
            return reply;
        }

        let mut records = self.records.lock().await;
        records.retain(|record| record.id("_id").as_deref() != Some(id));
        Ok(ok(json!({"_id": id})))
    }
}

/// Uploader returning a fixed reference, or failing.
pub(crate) struct FakeUploader {
    pub(crate) fail: bool,
}

#[async_trait]
impl FileUploader for FakeUploader {
    async fn upload(&self, file: UploadFile) -> AppResult<String> {
        if self.fail {
            return Err(AppError::Network("upload endpoint unreachable".to_owned()));
        }
        Ok(format!("uploads/{}", file.file_name))
    }
}

/// Store fake; `broken` makes every call fail.
#[derive(Default)]
pub(crate) struct FakeStore {
    pub(crate) entries: Mutex<HashMap<String, Value>>,
    pub(crate) broken: bool,
}

#[async_trait]
impl LocalStore for FakeStore {
    async fn get(&self, key: &StorageKey) -> AppResult<Option<Value>> {
        if self.broken {
            return Err(AppError::Internal("storage quota exceeded".to_owned()));
        }
        Ok(self.entries.lock().await.get(&key.to_string()).cloned())
    }

    async fn set(&self, key: &StorageKey, value: Value) -> AppResult<()> {
        if self.broken {
            return Err(AppError::Internal("storage quota exceeded".to_owned()));
        }
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &StorageKey) -> AppResult<()> {
        if self.broken {
            return Err(AppError::Internal("storage quota exceeded".to_owned()));
        }
        self.entries.lock().await.remove(&key.to_string());
        Ok(())
    }
}

pub(crate) fn record(value: Value) -> Record {
    Record::from_value(value).unwrap_or_else(|_| unreachable!())
}

pub(crate) fn numbered_tickets(count: usize) -> Vec<Record> {
    (0..count)
        .map(|index| {
            record(json!({
                "_id": format!("t-{index}"),
                "title": format!("Ticket {index}"),
                "price": 10 * index,
                "on_sale": index % 2 == 0,
            }))
        })
        .collect()
}

pub(crate) fn ticket_schema() -> AttributeSchema {
    AttributeSchema::from_json_str(
        &json!([
            {"name": "basics", "type": "title", "label": "Basics"},
            {"name": "title", "type": "text", "label": "Title", "required": true,
             "validation": {"maxLength": 60}},
            {"name": "price", "type": "number", "label": "Price"},
            {"name": "on_sale", "type": "toggle", "label": "On sale", "default": false},
            {"name": "tier", "type": "select", "label": "Tier",
             "options": {"apiType": "STATIC", "options": [
                 {"value": "ga", "label": "General admission"},
                 {"value": "vip", "label": "VIP"}
             ]}},
            {"name": "created_by", "type": "text", "label": "Created by",
             "visibility": {"update": false}},
            {"name": "poster", "type": "image", "label": "Poster"}
        ])
        .to_string(),
    )
    .unwrap_or_else(|_| unreachable!())
}
