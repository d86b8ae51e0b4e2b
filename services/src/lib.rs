pub mod executor;
pub mod cache_service;
pub mod database;
pub mod entity;
pub mod history_filter;
pub mod history_store;
pub mod cached_history_service;

pub use executor::{Execution, ExecutionFailure, InvalidRequest, PreparedRequest, RequestExecutor};
pub use cache_service::CacheService;
pub use database::{create_connection, DatabaseHandle, DatabaseSettings};
pub use history_filter::{HistoryFilter, StatusFilterMode, StatusPredicate};
pub use history_store::{HistoryQuery, HistoryStore, NewRecord, FAILED_EXECUTION_STATUS};
pub use cached_history_service::CachedHistoryService;

// Re-export entities for convenience
pub use entity::request_history;
