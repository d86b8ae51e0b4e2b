use anyhow::Result;
use chrono::Utc;
use restbench_shared::{HistoryPage, HistoryRecord};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, QuerySelect,
    Set,
};
use std::collections::HashMap;

use crate::entity::request_history;
use crate::executor::{Execution, ExecutionFailure, PreparedRequest};
use crate::history_filter::HistoryFilter;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 50;
/// Longest `response` returned in list projections, in characters
pub const RESPONSE_PREVIEW_CHARS: usize = 1000;
const TRUNCATION_MARKER: &str = "...";

/// Status stored for attempts that never reached the remote
pub const FAILED_EXECUTION_STATUS: i32 = 0;

/// Fields supplied by the caller; id and created_at are assigned on insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    pub response: String,
    pub status: i32,
    pub response_time: i64,
}

impl NewRecord {
    pub fn from_execution(request: &PreparedRequest, execution: &Execution) -> Self {
        Self {
            method: request.method.to_string(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
            response: execution.body.to_text(),
            status: i32::from(execution.status),
            response_time: execution.response_time_ms as i64,
        }
    }

    /// Failed attempts stay visible in history with a sentinel status
    pub fn from_failure(request: &PreparedRequest, failure: &ExecutionFailure) -> Self {
        Self {
            method: request.method.to_string(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
            response: failure.client_message(),
            status: FAILED_EXECUTION_STATUS,
            response_time: failure.response_time_ms as i64,
        }
    }
}

/// Normalized list request: page >= 1, 1 <= limit <= MAX_PAGE_SIZE,
/// and the offset never exceeds i64::MAX
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub page: u64,
    pub limit: u64,
    pub filter: HistoryFilter,
}

impl HistoryQuery {
    pub fn new(page: Option<i64>, limit: Option<i64>, filter: HistoryFilter) -> Self {
        let limit = limit
            .unwrap_or(DEFAULT_PAGE_SIZE as i64)
            .clamp(1, MAX_PAGE_SIZE as i64) as u64;
        let page = (page.unwrap_or(1).max(1) as u64).min(Self::max_page(limit));

        Self { page, limit, filter }
    }

    /// Highest page whose offset still fits a signed 64-bit OFFSET
    pub fn max_page(limit: u64) -> u64 {
        i64::MAX as u64 / limit.max(1) + 1
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self::new(None, None, HistoryFilter::default())
    }
}

/// Append-only log of executed requests
#[derive(Clone)]
pub struct HistoryStore {
    db: DatabaseConnection,
}

impl HistoryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Persist a record and return its id. created_at is taken now.
    pub async fn insert(&self, record: NewRecord) -> Result<i32> {
        let headers = serde_json::to_value(&record.headers)?;

        let model = request_history::ActiveModel {
            method: Set(record.method),
            url: Set(record.url),
            headers: Set(headers),
            body: Set(record.body),
            response: Set(record.response),
            status: Set(record.status),
            response_time: Set(record.response_time.max(0)),
            created_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        };

        let inserted = model.insert(&self.db).await?;
        Ok(inserted.id)
    }

    /// Best-effort insert: storage errors are logged, never returned
    pub async fn record(&self, record: NewRecord) -> Option<i32> {
        let url = record.url.clone();
        match self.insert(record).await {
            Ok(id) => {
                log::debug!("Recorded request {} for {}", id, url);
                Some(id)
            }
            Err(e) => {
                log::error!("Failed to save request history for {}: {}", url, e);
                None
            }
        }
    }

    /// One page of history, newest first
    pub async fn query(&self, query: &HistoryQuery) -> Result<HistoryPage> {
        let select = query.filter.apply(request_history::Entity::find());

        let total = select.clone().count(&self.db).await?;

        let rows = select
            .order_by_desc(request_history::Column::CreatedAt)
            .order_by_desc(request_history::Column::Id)
            .offset(query.offset())
            .limit(query.limit)
            .all(&self.db)
            .await?;

        let requests = rows.into_iter().map(Self::entity_to_history_record).collect();

        Ok(HistoryPage::new(requests, query.page, query.limit, total))
    }

    /// Delete every record, returning how many were removed
    pub async fn clear_all(&self) -> Result<u64> {
        let result = request_history::Entity::delete_many().exec(&self.db).await?;
        log::info!("Cleared {} history records", result.rows_affected);
        Ok(result.rows_affected)
    }

    fn entity_to_history_record(entity: request_history::Model) -> HistoryRecord {
        let headers = serde_json::from_value(entity.headers).unwrap_or_else(|e| {
            log::warn!("Stored headers for request {} are not a string map: {}", entity.id, e);
            HashMap::new()
        });

        HistoryRecord {
            id: entity.id,
            method: entity.method,
            url: entity.url,
            headers,
            body: entity.body,
            response: truncate_response(entity.response),
            status: entity.status,
            response_time: entity.response_time,
            created_at: entity.created_at.with_timezone(&Utc),
        }
    }
}

fn truncate_response(response: String) -> String {
    match response.char_indices().nth(RESPONSE_PREVIEW_CHARS) {
        Some((cut, _)) => {
            let mut preview = response[..cut].to_string();
            preview.push_str(TRUNCATION_MARKER);
            preview
        }
        None => response,
    }
}
