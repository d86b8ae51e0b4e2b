use restbench_shared::{ClearResponse, ErrorResponse, ExecuteFailure, ExecuteRequest, ExecuteResponse, SetupResponse};
use restbench_services::{CachedHistoryService, NewRecord, PreparedRequest, RequestExecutor};
use restbench_services::database::schema_sql_for;
use actix_web::http::header;
use actix_web::{web, HttpResponse, Responder};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use crate::query_validation::{HistoryParams, HistoryQueryValidator};

/// Lets browsers reuse a history page briefly while it revalidates
const HISTORY_CACHE_CONTROL: &str = "public, max-age=60, stale-while-revalidate=30";

pub struct AppState {
    pub executor: Arc<RequestExecutor>,
    pub db: Option<DatabaseConnection>,
    pub history: Option<Arc<CachedHistoryService>>,
    pub query_validator: HistoryQueryValidator,
}

fn database_unavailable() -> HttpResponse {
    HttpResponse::ServiceUnavailable().json(ErrorResponse::new("Database not available"))
}

/// Execute a request against the remote endpoint and record it in history.
/// The caller always gets the outcome, whether or not recording succeeds.
pub async fn execute_request(
    state: web::Data<AppState>,
    payload: web::Json<ExecuteRequest>,
) -> impl Responder {
    let prepared = match PreparedRequest::from_request(&payload) {
        Ok(prepared) => prepared,
        Err(e) => {
            log::debug!("Rejected request description: {}", e);
            return HttpResponse::BadRequest().json(ErrorResponse::new(e.to_string()));
        }
    };

    let outcome = state.executor.execute(&prepared).await;

    let record = match &outcome {
        Ok(execution) => NewRecord::from_execution(&prepared, execution),
        Err(failure) => NewRecord::from_failure(&prepared, failure),
    };

    match &state.history {
        Some(history) => {
            history.record(record).await;
        }
        None => log::warn!("Database not available, {} {} was not recorded", prepared.method, prepared.url),
    }

    match outcome {
        Ok(execution) => HttpResponse::Ok().json(ExecuteResponse {
            data: execution.body,
            status: execution.status,
            headers: execution.headers,
            response_time: execution.response_time_ms,
        }),
        Err(failure) => HttpResponse::InternalServerError().json(ExecuteFailure {
            error: failure.client_message(),
            response_time: failure.response_time_ms,
        }),
    }
}

/// Get one page of request history, newest first
pub async fn get_history(
    state: web::Data<AppState>,
    params: web::Query<HistoryParams>,
) -> impl Responder {
    let history = match &state.history {
        Some(history) => history,
        None => return database_unavailable(),
    };

    let query = match state.query_validator.validate(&params) {
        Ok(query) => query,
        Err(e) => {
            return HttpResponse::BadRequest().json(ErrorResponse::new(format!(
                "Invalid query parameters: {}",
                e
            )));
        }
    };

    match history.query(&query).await {
        Ok(page) => HttpResponse::Ok()
            .insert_header((header::CACHE_CONTROL, HISTORY_CACHE_CONTROL))
            .json(page),
        Err(e) => {
            log::error!("History fetch error: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse::new("Failed to fetch history"))
        }
    }
}

/// Delete every history record
pub async fn clear_history(state: web::Data<AppState>) -> impl Responder {
    let history = match &state.history {
        Some(history) => history,
        None => return database_unavailable(),
    };

    match history.clear_all().await {
        Ok(_) => HttpResponse::Ok().json(ClearResponse { success: true }),
        Err(e) => {
            log::error!("History clear error: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse::new("Failed to clear history"))
        }
    }
}

/// Show the DDL that provisioning runs for the connected backend
pub async fn get_setup(state: web::Data<AppState>) -> impl Responder {
    match &state.db {
        Some(db) => HttpResponse::Ok().json(SetupResponse {
            success: true,
            message: None,
            sql: Some(schema_sql_for(db)),
        }),
        None => database_unavailable(),
    }
}

/// Provision the schema by applying pending migrations
pub async fn run_setup(state: web::Data<AppState>) -> impl Responder {
    let db = match &state.db {
        Some(db) => db,
        None => return database_unavailable(),
    };

    match Migrator::up(db, None).await {
        Ok(()) => {
            log::info!("Database schema provisioned via setup endpoint");
            HttpResponse::Ok().json(SetupResponse {
                success: true,
                message: Some("Database schema created successfully".to_string()),
                sql: None,
            })
        }
        Err(e) => {
            log::error!("Schema creation error: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse::with_details(
                "Failed to create schema",
                e.to_string(),
            ))
        }
    }
}

pub async fn health() -> impl Responder {
    "OK"
}
