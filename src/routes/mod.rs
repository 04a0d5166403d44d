pub mod auth;
pub mod categories;
pub mod health;
pub mod payments;
pub mod tasks;

use actix_web::{error, web};

use crate::error::AppError;

/// Mounts every API route. Expected to sit inside `/api` behind `AuthMiddleware`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::login)
            .service(auth::register),
    )
    .service(
        web::scope("/tasks")
            .service(tasks::get_tasks)
            .service(tasks::create_task)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task),
    )
    .service(web::scope("/categories").service(categories::list_categories))
    .service(
        web::scope("/payments")
            .service(payments::list_payments)
            .service(payments::create_payment),
    );
}

/// Reports unreadable JSON bodies in the same shape as other validation failures.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        log::debug!("rejected request body: {}", err);
        let message = match err {
            error::JsonPayloadError::ContentType => "Expected a JSON request body".to_string(),
            other => format!("Invalid request body: {}", other),
        };
        AppError::validation(message).into()
    })
}

/// Same as [`json_config`] for query strings and path segments.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::validation(format!("Invalid query parameters: {}", err)).into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|_err, _req| AppError::NotFound("Task not found".into()).into())
}
