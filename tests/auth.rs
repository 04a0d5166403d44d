mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use taskdeck::auth::{AuthResponse, TokenValidator};

use common::{jwt_settings, register_user, test_state, token_issued_at};

#[actix_rt::test]
async fn test_register_and_login_flow() {
    let state = test_state();
    let app = test_app!(state);

    // Register a new user
    let register_payload = json!({
        "name": "Ann Lee",
        "email": "ann@example.com",
        "password": "secret1"
    });
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&register_payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["token"].as_str().is_some_and(|token| !token.is_empty()));
    assert_eq!(body["user"]["name"], "Ann Lee");
    assert_eq!(body["user"]["email"], "ann@example.com");
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("password_hash").is_none());
    assert!(!body.to_string().contains("$2"));

    // Registering the same email again fails
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&register_payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Email already registered");

    // Login with the right password
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "ann@example.com", "password": "secret1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let auth: AuthResponse = test::read_body_json(resp).await;

    let claims = TokenValidator::new(&jwt_settings()).validate(&auth.token).unwrap();
    assert_eq!(claims.sub, auth.user.id.to_string());
    assert_eq!(claims.email, "ann@example.com");
    assert_eq!(claims.name, "Ann Lee");
    assert_eq!(claims.exp - claims.iat, Duration::hours(24).num_seconds());

    // Login with the wrong password
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "ann@example.com", "password": "wrong-password" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Invalid email or password");
}

#[actix_rt::test]
async fn test_email_uniqueness_ignores_case() {
    let state = test_state();
    let app = test_app!(state);
    register_user(&app, "Ann Lee", "ann@example.com", "secret1").await;

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "displayName": "Other Ann",
            "email": "ANN@Example.COM",
            "password": "secret2"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Login is case-insensitive on the email as well
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "ANN@EXAMPLE.COM", "password": "secret1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Case folding is not limited to ASCII
    register_user(&app, "Ann Bücher", "ann@bücher.de", "secret1").await;
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Other Ann",
            "email": "ann@BÜCHER.de",
            "password": "secret2"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Email already registered");
}

#[actix_rt::test]
async fn test_unknown_email_matches_wrong_password() {
    let state = test_state();
    let app = test_app!(state);
    register_user(&app, "Ann Lee", "ann@example.com", "secret1").await;

    let mut bodies = Vec::new();
    for payload in [
        json!({ "email": "nobody@example.com", "password": "secret1" }),
        json!({ "email": "ann@example.com", "password": "not-it" }),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        bodies.push(test::read_body(resp).await);
    }

    assert_eq!(bodies[0], bodies[1]);
}

#[actix_rt::test]
async fn test_register_validation() {
    let state = test_state();
    let app = test_app!(state);

    let cases = [
        json!({ "name": "Ann Lee", "email": "not-an-email", "password": "secret1" }),
        json!({ "name": "Ann Lee", "email": "ann@example.com", "password": "short" }),
        json!({ "name": "A", "email": "ann@example.com", "password": "secret1" }),
        json!({ "name": "   ", "email": "ann@example.com", "password": "secret1" }),
        json!({ "email": "ann@example.com", "password": "secret1" }),
    ];

    for payload in cases {
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "payload {} was accepted", payload);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["message"].is_string());
    }
}

#[actix_rt::test]
async fn test_malformed_json_is_a_validation_failure() {
    let state = test_state();
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"email\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].as_str().is_some_and(|m| m.starts_with("Invalid request body")));
}

#[actix_rt::test]
async fn test_token_validity_window() {
    let state = test_state();
    let app = test_app!(state);
    let auth = register_user(&app, "Ann Lee", "ann@example.com", "secret1").await;
    let validator = TokenValidator::new(&jwt_settings());

    let fresh = token_issued_at(&auth, &jwt_settings(), Utc::now() - Duration::hours(23));
    assert!(validator.validate(&fresh).is_ok());

    let stale = token_issued_at(&auth, &jwt_settings(), Utc::now() - Duration::hours(25));
    assert!(validator.validate(&stale).is_err());
}

#[actix_rt::test]
async fn test_health_is_public() {
    let state = test_state();
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
