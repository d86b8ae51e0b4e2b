mod config;
mod handlers;
mod query_validation;
mod routes;

use actix_web::{web, App, HttpServer};
use config::Config;
use handlers::AppState;
use migration::{Migrator, MigratorTrait};
use query_validation::HistoryQueryValidator;
use restbench_services::{CacheService, CachedHistoryService, DatabaseHandle, HistoryStore, RequestExecutor};
use std::sync::Arc;
use actix_cors::Cors;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();

    log::info!("Starting REST client server on {}:{}", config.server_host, config.server_port);

    let executor = Arc::new(
        RequestExecutor::new(config.request_timeout)
            .expect("Failed to initialize HTTP client"),
    );
    log::info!("Outbound request timeout: {:?}", executor.timeout());

    // Initialize Redis cache if URL is provided
    let cache_service = Arc::new(
        CacheService::new(config.redis_url.clone())
            .unwrap_or_else(|e| {
                log::warn!("Failed to initialize Redis cache: {}. Continuing without cache.", e);
                CacheService::disabled()
            })
    );

    if cache_service.is_enabled() {
        log::info!("Redis cache enabled for history pages (ttl {:?})", config.history_cache_ttl);
    }

    // Initialize database if URL is provided
    let database = DatabaseHandle::new(config.database_settings());
    let db = if !config.database_url.is_empty() {
        match database.get().await {
            Ok(conn) => {
                log::info!("Database connection established");
                if config.auto_migrate {
                    match Migrator::up(conn, None).await {
                        Ok(()) => log::info!("Database migrations applied"),
                        Err(e) => log::error!("Failed to apply migrations: {}", e),
                    }
                } else {
                    log::info!("Note: Run migrations with 'cargo run -p migration -- up' or POST /api/setup if not already done");
                }
                Some(conn.clone())
            }
            Err(e) => {
                log::warn!("Failed to connect to database: {}. Continuing without history.", e);
                None
            }
        }
    } else {
        None
    };

    let history = db.clone().map(|conn| {
        Arc::new(CachedHistoryService::new(
            Arc::new(HistoryStore::new(conn)),
            Arc::clone(&cache_service),
            config.history_cache_ttl,
        ))
    });

    let app_state = web::Data::new(AppState {
        executor,
        db,
        history,
        query_validator: HistoryQueryValidator::new(config.status_filter_mode),
    });

    let result = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_method()
            .allow_any_origin()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind(format!("{}:{}", config.server_host, config.server_port))?
    .run()
    .await;

    if let Err(e) = database.close().await {
        log::error!("Failed to close database pool: {}", e);
    }

    result
}
