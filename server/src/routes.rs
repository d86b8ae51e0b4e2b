use crate::handlers;
use actix_web::{error, web, HttpResponse};
use restbench_shared::ErrorResponse;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Extractor failures are caller-input errors
        .app_data(web::JsonConfig::default().error_handler(|err, _req| {
            let response = HttpResponse::BadRequest()
                .json(ErrorResponse::new(format!("Invalid request body: {}", err)));
            error::InternalError::from_response(err, response).into()
        }))
        .app_data(web::QueryConfig::default().error_handler(|err, _req| {
            let response = HttpResponse::BadRequest()
                .json(ErrorResponse::new(format!("Invalid query parameters: {}", err)));
            error::InternalError::from_response(err, response).into()
        }))

        // Executor
        .route("/api/request", web::post().to(handlers::execute_request))

        // History endpoints
        .route("/api/history", web::get().to(handlers::get_history))
        .route("/api/history", web::delete().to(handlers::clear_history))

        // Schema provisioning
        .route("/api/setup", web::get().to(handlers::get_setup))
        .route("/api/setup", web::post().to(handlers::run_setup))

        .route("/health", web::get().to(handlers::health));
}
