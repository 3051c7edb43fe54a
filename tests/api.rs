use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use guardpost::{
    create_router,
    store::{MemoryStore, Store},
    utils::{hash_password, TokenKeys},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    token: String,
}

impl TestApp {
    async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let tokens = TokenKeys::new("integration-secret", 60);
        let user = store
            .create_user("dispatcher", "dispatch@example.com", &hash_password("password1").unwrap())
            .await
            .unwrap();
        let token = tokens.create_token(user.id, &user.username).unwrap();
        let router = create_router(AppState::new(store, tokens), None);
        Self { router, token }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>, auth: bool) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if auth {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, true).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body), true).await
    }

    async fn create_guard(&self, contact: &str) -> i64 {
        let (status, body) = self
            .post(
                "/guards",
                json!({
                    "name": "Imran Khan",
                    "contact_number": contact,
                    "current_salary": "30000",
                    "uniform_cost": "4000",
                    "monthly_deduction": "500"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn create_client(&self, name: &str) -> i64 {
        let (status, body) = self
            .post("/clients", json!({ "name": name, "contract_rate": "25000" }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }
}

fn money(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.as_f64().unwrap(),
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/health", None, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/guards", None, false).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn register_then_login_issues_a_working_token() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register",
            Some(json!({ "username": "supervisor", "email": "sup@example.com", "password": "secret99" })),
            false,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.get("password_hash").is_none());

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/register",
            Some(json!({ "username": "supervisor", "email": "other@example.com", "password": "secret99" })),
            false,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "sup@example.com", "password": "wrong" })),
            false,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "sup@example.com", "password": "secret99" })),
            false,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");

    let token = body["access_token"].as_str().unwrap();
    let request = Request::builder()
        .uri("/guards")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn guard_crud_and_error_shapes() {
    let app = TestApp::new().await;
    let id = app.create_guard("0300").await;

    let (status, body) = app
        .post("/guards", json!({ "name": "Other", "contact_number": "0300" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duplicate_key");
    assert!(body["timestamp"].is_string());

    let (status, body) = app.post("/guards", json!({ "name": "", "contact_number": "0399" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = app.get("/guards/by-contact/0300").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["status"], "active");

    let (status, body) = app
        .send(Method::PUT, &format!("/guards/{id}"), Some(json!({ "status": "on_leave" })), true)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "on_leave");
    assert_eq!(body["name"], "Imran Khan");

    let (status, body) = app.get("/guards/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = app.send(Method::DELETE, &format!("/guards/{id}"), None, true).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn uniform_is_amortised_over_eight_months() {
    let app = TestApp::new().await;
    let guard = app.create_guard("0300").await;

    for month in 1..=9 {
        let (status, body) = app
            .post("/salary-records", json!({ "guard_id": guard, "month": month, "year": 2024 }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let expected = if month <= 8 { 500.0 } else { 0.0 };
        assert_eq!(money(&body["uniform_deduction"]), expected);
        if month == 1 {
            assert_eq!(money(&body["final_salary"]), 29500.0);
        }
    }

    let (_, body) = app.get(&format!("/guards/{guard}")).await;
    assert_eq!(money(&body["uniform_deducted_amount"]), 4000.0);

    let (status, body) = app
        .post("/salary-records", json!({ "guard_id": guard, "month": 1, "year": 2024 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duplicate_key");

    let (status, _) = app
        .post("/salary-records", json!({ "guard_id": guard, "month": 13, "year": 2024 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reassigning_keeps_one_active_assignment() {
    let app = TestApp::new().await;
    let guard = app.create_guard("0300").await;
    let x = app.create_client("Client X").await;
    let y = app.create_client("Client Y").await;

    let (status, _) = app
        .post("/duty-assignments", json!({ "guard_id": guard, "client_id": x, "shift_type": "day" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post(&format!("/duty-assignments/reassign/{guard}"), json!({ "client_id": y }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client_id"], y);

    let (_, rows) = app.get(&format!("/duty-assignments?guard_id={guard}")).await;
    let rows = rows.as_array().unwrap();
    let active: Vec<&Value> = rows.iter().filter(|r| r["is_active"] == true).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["client_id"], y);
    let closed: Vec<&Value> = rows.iter().filter(|r| r["is_active"] == false).collect();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0]["client_id"], x);
    assert!(closed[0]["end_date"].is_string());

    let (_, grouped) = app.get("/duty-assignments/by-client").await;
    let grouped = grouped.as_array().unwrap();
    assert_eq!(grouped.len(), 1);
    assert_eq!(grouped[0]["client_id"], y);

    let (status, body) = app.send(Method::DELETE, &format!("/guards/{guard}"), None, true).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn inventory_cannot_be_returned_twice() {
    let app = TestApp::new().await;
    let guard = app.create_guard("0300").await;

    let (status, body) = app
        .post(
            "/inventory-records",
            json!({ "guard_id": guard, "item_name": "Baton", "item_type": "equipment", "cost": "800" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "issued");
    let id = body["id"].as_i64().unwrap();

    let (status, body) = app
        .post(&format!("/inventory-records/{id}/return"), json!({ "condition": "good" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "returned");
    assert!(body["return_date"].is_string());

    let (status, body) = app.post(&format!("/inventory-records/{id}/return"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_state");

    let (_, view) = app.get(&format!("/inventory-records/guard/{guard}")).await;
    assert_eq!(view["returned_count"], 1);
    assert_eq!(view["issued_count"], 0);
}

#[tokio::test]
async fn reports_reflect_current_state() {
    let app = TestApp::new().await;
    let guard = app.create_guard("0300").await;
    let idle = app.create_guard("0301").await;
    let client = app.create_client("Client X").await;
    app.post("/duty-assignments", json!({ "guard_id": guard, "client_id": client }))
        .await;
    app.post("/salary-records", json!({ "guard_id": guard, "month": 5, "year": 2024 }))
        .await;

    let (status, overview) = app.get("/stats/overview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["guards"]["total"], 2);
    assert_eq!(overview["assignments"]["active"], 1);
    assert_eq!(overview["clients"]["with_active_guards"], 1);

    let (status, summary) = app.get("/reports/monthly-summary?month=5&year=2024").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["salaries"]["records"], 1);
    assert_eq!(money(&summary["salaries"]["pending_total"]), 29500.0);

    let (status, _) = app.get("/reports/monthly-summary?month=5&year=2019").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, roster) = app.get(&format!("/reports/client-summary/{client}")).await;
    assert_eq!(roster["active_guard_count"], 1);
    assert_eq!(roster["total_historical_assignments"], 1);
    assert_eq!(money(&roster["monthly_cost"]), 25000.0);

    let (_, history) = app.get(&format!("/reports/guard-history/{guard}")).await;
    assert_eq!(history["assignments"].as_array().unwrap().len(), 1);
    assert_eq!(history["salary_totals"]["pending_count"], 1);

    let (_, available) = app.get("/search/guards?available_only=true").await;
    let available = available.as_array().unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0]["id"], idle);
    assert!(available[0]["current_assignment"].is_null());

    let (_, everyone) = app.get("/search/guards").await;
    let posted = everyone
        .as_array()
        .unwrap()
        .iter()
        .find(|hit| hit["id"] == guard)
        .unwrap();
    assert_eq!(posted["current_assignment"]["client_id"], client);

    let (_, staffed) = app.get("/search/clients?has_active_guards=true").await;
    assert_eq!(staffed.as_array().unwrap().len(), 1);
}
