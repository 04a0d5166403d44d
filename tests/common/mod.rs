#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use taskdeck::auth::{AuthResponse, TokenIssuer};
use taskdeck::config::JwtSettings;
use taskdeck::models::User;
use taskdeck::store::MemoryStore;
use taskdeck::AppState;

pub fn jwt_settings() -> JwtSettings {
    JwtSettings {
        secret: "integration-test-secret-0123456789abcdef".to_string(),
        issuer: "taskdeck".to_string(),
        audience: "taskdeck-clients".to_string(),
    }
}

/// Fresh in-memory state with a cheap bcrypt cost.
pub fn test_state() -> web::Data<AppState> {
    let store = Arc::new(MemoryStore::with_default_categories());
    web::Data::new(AppState::new(store, &jwt_settings(), 100).with_hash_cost(4))
}

/// Builds the full application the same way `main` does, minus CORS.
#[macro_export]
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.clone())
                .app_data(taskdeck::routes::json_config())
                .app_data(taskdeck::routes::query_config())
                .app_data(taskdeck::routes::path_config())
                .wrap(actix_web::middleware::Logger::default())
                .service(taskdeck::routes::health::health)
                .service(
                    actix_web::web::scope("/api")
                        .wrap(taskdeck::auth::AuthMiddleware)
                        .configure(taskdeck::routes::config),
                ),
        )
        .await
    };
}

pub async fn register_user(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    name: &str,
    email: &str,
    password: &str,
) -> AuthResponse {
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": name,
            "email": email,
            "password": password
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 200, "registration of {} failed", email);
    test::read_body_json(resp).await
}

/// Mints a token for `auth.user` as if it had been issued at `issued_at`.
pub fn token_issued_at(auth: &AuthResponse, settings: &JwtSettings, issued_at: DateTime<Utc>) -> String {
    let user = User {
        id: auth.user.id,
        name: auth.user.name.clone(),
        email: auth.user.email.clone(),
        password_hash: String::new(),
        created_at: issued_at,
    };
    TokenIssuer::new(settings)
        .issue_at(&user, issued_at)
        .expect("token issue")
        .token
}
