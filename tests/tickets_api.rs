use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use ticketdesk::llm::{LLMError, LLMProvider};
use ticketdesk::main_module::build_app;
use ticketdesk::tickets::{InMemoryTicketRepository, TicketClassifier};
use ticketdesk::AppState;

struct FixedProvider(&'static str);

#[async_trait]
impl LLMProvider for FixedProvider {
    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LLMError> {
        Ok(self.0.to_string())
    }
}

struct BrokenProvider;

#[async_trait]
impl LLMProvider for BrokenProvider {
    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LLMError> {
        Err("connection refused".into())
    }
}

fn state_with(classifier: TicketClassifier) -> Arc<AppState> {
    Arc::new(AppState::new(
        Arc::new(InMemoryTicketRepository::new()),
        Arc::new(classifier),
    ))
}

fn state() -> Arc<AppState> {
    state_with(TicketClassifier::disabled())
}

fn classifier_answering(answer: &'static str) -> TicketClassifier {
    TicketClassifier::new(
        Some(Arc::new(FixedProvider(answer))),
        64,
        Duration::from_secs(5),
    )
}

async fn send(state: &Arc<AppState>, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = build_app(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

async fn create(state: &Arc<AppState>, body: Value) -> Value {
    let (status, ticket) = send(state, "POST", "/api/tickets", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{ticket}");
    ticket
}

#[tokio::test]
async fn create_applies_defaults_and_read_only_fields() {
    let state = state();
    let ticket = create(
        &state,
        json!({
            "title": "Cannot log in",
            "description": "Password reset mail never arrives",
            "created_at": "2001-01-01T00:00:00Z"
        }),
    )
    .await;

    assert_eq!(ticket["category"], "general");
    assert_eq!(ticket["priority"], "medium");
    assert_eq!(ticket["status"], "open");
    assert_ne!(ticket["created_at"], "2001-01-01T00:00:00Z");
    assert!(ticket["id"].as_str().is_some());
}

#[tokio::test]
async fn create_rejects_long_title() {
    let state = state();
    let (status, body) = send(
        &state,
        "POST",
        "/api/tickets",
        Some(json!({"title": "x".repeat(201), "description": "d"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("200"));
}

#[tokio::test]
async fn create_rejects_unknown_enum_value() {
    let state = state();
    let (status, body) = send(
        &state,
        "POST",
        "/api/tickets",
        Some(json!({"title": "t", "description": "d", "priority": "urgent"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn list_is_newest_first_and_accepts_trailing_slash() {
    let state = state();
    for title in ["first", "second", "third"] {
        create(&state, json!({"title": title, "description": "d"})).await;
    }

    let (status, body) = send(&state, "GET", "/api/tickets/", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn list_combines_category_and_search() {
    let state = state();
    create(
        &state,
        json!({"title": "Refund needed", "description": "double charge", "category": "billing"}),
    )
    .await;
    create(
        &state,
        json!({"title": "Invoice", "description": "Please REFUND me", "category": "billing"}),
    )
    .await;
    create(
        &state,
        json!({"title": "Invoice address", "description": "typo", "category": "billing"}),
    )
    .await;
    create(
        &state,
        json!({"title": "Refund button crashes", "description": "500", "category": "technical"}),
    )
    .await;

    let (status, body) = send(
        &state,
        "GET",
        "/api/tickets?category=billing&search=refund",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Invoice", "Refund needed"]);
}

#[tokio::test]
async fn list_unknown_filter_value_matches_nothing() {
    let state = state();
    create(&state, json!({"title": "t", "description": "d", "category": "billing"})).await;

    for uri in ["/api/tickets?category=sales", "/api/tickets?status=pending&search=t"] {
        let (status, body) = send(&state, "GET", uri, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, json!([]), "{uri}");
    }
}

#[tokio::test]
async fn list_search_uses_raw_value() {
    let state = state();
    create(&state, json!({"title": "xrefund", "description": "d"})).await;
    create(&state, json!({"title": "a refund", "description": "d"})).await;

    let (status, body) = send(&state, "GET", "/api/tickets?search=%20refund", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["a refund"]);
}

#[tokio::test]
async fn list_ignores_empty_filter_values() {
    let state = state();
    create(&state, json!({"title": "t", "description": "d"})).await;

    let (status, body) = send(&state, "GET", "/api/tickets?category=&search=", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn patch_updates_subset_of_fields() {
    let state = state();
    let ticket = create(&state, json!({"title": "Slow page", "description": "Dashboard takes 30s"})).await;
    let id = ticket["id"].as_str().unwrap();

    let (status, updated) = send(
        &state,
        "PATCH",
        &format!("/api/tickets/{id}/"),
        Some(json!({"status": "in_progress", "priority": "high"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "in_progress");
    assert_eq!(updated["priority"], "high");
    assert_eq!(updated["title"], "Slow page");
    assert_eq!(updated["created_at"], ticket["created_at"]);

    let (status, fetched) = send(&state, "GET", &format!("/api/tickets/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn patch_unknown_ticket_is_not_found() {
    let state = state();
    let (status, body) = send(
        &state,
        "PATCH",
        "/api/tickets/6f1c1f5e-8a1e-4f3b-9a53-1a6f0c2b7d11",
        Some(json!({"status": "closed"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn patch_malformed_id_is_not_found() {
    let state = state();
    let (status, body) = send(
        &state,
        "PATCH",
        "/api/tickets/42",
        Some(json!({"status": "closed"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, body) = send(&state, "GET", "/api/tickets/not-a-ticket/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn patch_rejects_long_title() {
    let state = state();
    let ticket = create(&state, json!({"title": "ok", "description": "d"})).await;
    let id = ticket["id"].as_str().unwrap();

    let (status, _) = send(
        &state,
        "PATCH",
        &format!("/api/tickets/{id}"),
        Some(json!({"title": "y".repeat(201)})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_on_empty_store_are_zero_filled() {
    let state = state();
    let (status, body) = send(&state, "GET", "/api/tickets/stats/", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_tickets"], 0);
    assert_eq!(body["open_tickets"], 0);
    assert_eq!(body["avg_tickets_per_day"], 0.0);
    assert_eq!(
        body["priority_breakdown"],
        json!({"low": 0, "medium": 0, "high": 0, "critical": 0})
    );
    assert_eq!(
        body["category_breakdown"],
        json!({"billing": 0, "technical": 0, "account": 0, "general": 0})
    );
}

#[tokio::test]
async fn stats_count_created_tickets() {
    let state = state();
    create(&state, json!({"title": "a", "description": "d", "priority": "high"})).await;
    create(&state, json!({"title": "b", "description": "d", "priority": "high", "status": "closed"})).await;
    create(&state, json!({"title": "c", "description": "d", "category": "account"})).await;

    let (_, body) = send(&state, "GET", "/api/tickets/stats", None).await;
    assert_eq!(body["total_tickets"], 3);
    assert_eq!(body["open_tickets"], 2);
    assert_eq!(body["priority_breakdown"]["high"], 2);
    assert_eq!(body["priority_breakdown"]["medium"], 1);
    assert_eq!(body["priority_breakdown"]["critical"], 0);
    assert_eq!(body["category_breakdown"]["account"], 1);
    assert!(body["avg_tickets_per_day"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn classify_without_credential_returns_fallback() {
    let state = state();
    let (status, body) = send(
        &state,
        "POST",
        "/api/tickets/classify/",
        Some(json!({"description": "anything"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"suggested_category": "general", "suggested_priority": "medium"})
    );
}

#[tokio::test]
async fn classify_requires_description() {
    let state = state();
    let (status, body) = send(
        &state,
        "POST",
        "/api/tickets/classify",
        Some(json!({"description": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "description is required");

    let (status, _) = send(&state, "POST", "/api/tickets/classify", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn classify_uses_provider_answer() {
    let state = state_with(classifier_answering(
        "```json\n{\"category\": \"account\", \"priority\": \"critical\"}\n```",
    ));
    let (status, body) = send(
        &state,
        "POST",
        "/api/tickets/classify",
        Some(json!({"description": "Someone else logged into my account"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggested_category"], "account");
    assert_eq!(body["suggested_priority"], "critical");
}

#[tokio::test]
async fn classify_substitutes_invalid_priority() {
    let state = state_with(classifier_answering(
        r#"{"category":"technical","priority":"bogus"}"#,
    ));
    let (_, body) = send(
        &state,
        "POST",
        "/api/tickets/classify",
        Some(json!({"description": "App crashes on start"})),
    )
    .await;

    assert_eq!(
        body,
        json!({"suggested_category": "technical", "suggested_priority": "medium"})
    );
}

#[tokio::test]
async fn classify_provider_failure_is_not_an_error() {
    let state = state_with(TicketClassifier::new(
        Some(Arc::new(BrokenProvider)),
        64,
        Duration::from_secs(5),
    ));
    let (status, body) = send(
        &state,
        "POST",
        "/api/tickets/classify",
        Some(json!({"description": "Help"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"suggested_category": "general", "suggested_priority": "medium"})
    );
}

#[tokio::test]
async fn health_reports_backends() {
    let state = state();
    let (status, body) = send(&state, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["llm_configured"], false);
}
