use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use std::io;
use std::sync::Arc;

use taskdeck::{
    auth::AuthMiddleware,
    config::Config,
    routes::{self, health},
    store::PgStore,
    AppState,
};

fn cors(allowed_origins: &[String]) -> Cors {
    let cors = if allowed_origins.is_empty() {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::load().map_err(|e| {
        log::error!("configuration error: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let store = PgStore::connect(&config.database_url, config.database_max_connections)
        .await
        .map_err(|e| {
            log::error!("failed to connect to database: {}", e);
            io::Error::new(io::ErrorKind::Other, e.to_string())
        })?;
    store.migrate().await.map_err(|e| {
        log::error!("failed to run migrations: {}", e);
        io::Error::new(io::ErrorKind::Other, e.to_string())
    })?;

    let state = web::Data::new(AppState::new(
        Arc::new(store),
        &config.jwt,
        config.max_page_size,
    ));
    let allowed_origins = config.cors_allowed_origins.clone();

    log::info!("starting TaskDeck server at {}", config.server_url());

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(routes::json_config())
            .app_data(routes::query_config())
            .app_data(routes::path_config())
            .wrap(cors(&allowed_origins))
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
