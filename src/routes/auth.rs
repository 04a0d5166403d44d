use actix_web::{post, web, HttpResponse, Responder};

use crate::{
    auth::{AuthResponse, LoginRequest, RegisterRequest},
    error::AppError,
    models::{User, UserSummary},
    state::AppState,
};

fn session_for(state: &AppState, user: &User) -> Result<AuthResponse, AppError> {
    let session = state.issuer.issue(user)?;
    Ok(AuthResponse {
        token: session.token,
        user: UserSummary::from(user),
    })
}

/// Register a new user
///
/// Creates the account and immediately returns a session for it, so the
/// caller does not need a separate login round trip.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let user = state.credentials.register(register_data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(session_for(&state, &user)?))
}

/// Login user
///
/// Authenticates a user and returns a fresh session token.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let user = state.credentials.authenticate(login_data.into_inner()).await?;
    log::info!("user {} logged in", user.id);
    Ok(HttpResponse::Ok().json(session_for(&state, &user)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtSettings;
    use crate::store::MemoryStore;
    use actix_web::{test, App};
    use serde_json::json;
    use std::sync::Arc;

    fn state() -> web::Data<AppState> {
        let jwt = JwtSettings {
            secret: "unit-test-secret-unit-test-secret".to_string(),
            issuer: "taskdeck".to_string(),
            audience: "taskdeck-clients".to_string(),
        };
        let store = Arc::new(MemoryStore::with_default_categories());
        web::Data::new(AppState::new(store, &jwt, 100).with_hash_cost(4))
    }

    #[actix_rt::test]
    async fn test_register_validation() {
        let app = test::init_service(
            App::new()
                .app_data(state())
                .app_data(crate::routes::json_config())
                .service(register),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/register")
            .set_json(json!({
                "name": "Tester",
                "email": "invalid-email",
                "password": "password123"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let req = test::TestRequest::post()
            .uri("/register")
            .set_json(json!({
                "name": "Tester",
                "email": "test@example.com",
                "password": "short"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_rt::test]
    async fn test_login_unknown_email() {
        let app = test::init_service(App::new().app_data(state()).service(login)).await;

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({
                "email": "nobody@example.com",
                "password": "password123"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid email or password");
    }
}
