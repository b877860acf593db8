#![allow(dead_code)]

use std::sync::Arc;

use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::header,
    middleware::Logger,
    test, web, App,
};
use serde_json::{json, Value};
use taskkeeper::{auth::AuthMiddleware, auth::TokenService, routes, store::MemoryStore, AppState};

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct TestUser {
    pub id: String,
    pub token: String,
}

pub fn test_state() -> (Arc<MemoryStore>, web::Data<AppState>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), TokenService::new(TEST_SECRET, None));
    (store, web::Data::new(state))
}

pub async fn init_app(
    state: web::Data<AppState>,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .app_data(state)
            .wrap(AuthMiddleware)
            .wrap(Logger::default())
            .configure(routes::config),
    )
    .await
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

pub async fn signup(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>,
    name: &str,
    email: &str,
    password: &str,
) -> TestUser {
    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({
            "name": name,
            "email": email,
            "password": password
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED, "signup failed");

    let body: Value = test::read_body_json(resp).await;
    TestUser {
        id: body["user"]["id"].as_str().unwrap().to_string(),
        token: body["token"].as_str().unwrap().to_string(),
    }
}

pub async fn create_task(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>,
    token: &str,
    payload: Value,
) -> Value {
    let req = test::TestRequest::post()
        .uri("/tasks")
        .insert_header(bearer(token))
        .set_json(payload)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED, "create task failed");
    test::read_body_json(resp).await
}
