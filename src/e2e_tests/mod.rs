use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::controller::{ServerConfig, TodoController};
use crate::datastore::MemoryTodoStore;
use crate::model::{CorrelationId, Todo};

fn start_controller() -> TodoController {
    let datastore = Arc::new(RwLock::new(MemoryTodoStore::new()));
    let cfg = ServerConfig {
        addr: "127.0.0.1:0".parse().unwrap(),
        concurrent: Some(4),
        timeout: Some(std::time::Duration::from_secs(5)),
        allowed_origin: "http://localhost:3001".to_string(),
    };
    TodoController::start(datastore, cfg).expect("controller started")
}

// The controller owns its runtimes, so the client side gets a runtime of its own.
fn block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(f)
}

#[test]
fn test_e2e_todo_lifecycle() {
    let controller = start_controller();
    let base = format!("http://{}", controller.local_addr());

    block_on(async move {
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/todos", base))
            .json(&json!({"name": "write report", "dueDate": "2030-01-01"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key(CorrelationId::HEADER_NAME));
        let created: Todo = response.json().await.unwrap();
        assert_eq!(created.name, "write report");
        assert_eq!(created.due_date.as_deref(), Some("2030-01-01"));

        let response = client
            .patch(format!("{}/todos/{}/complete", base, created.id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let completed: Todo = response.json().await.unwrap();
        assert!(completed.completed);
        assert!(completed.completion_date.is_some());

        let pending: Vec<Todo> = client
            .get(format!("{}/todos", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(pending.is_empty());

        let all: Vec<Todo> = client
            .get(format!("{}/todos?showCompleted=true", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(all, vec![completed]);

        let response = client
            .delete(format!("{}/todos/{}", base, created.id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = client
            .patch(format!("{}/todos/{}/complete", base, created.id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"error": "Todo not found."}));
    });

    controller.stop().unwrap();
}

#[test]
fn test_e2e_cors_preflight() {
    let controller = start_controller();
    let base = format!("http://{}", controller.local_addr());

    block_on(async move {
        let client = reqwest::Client::new();
        let response = client
            .request(reqwest::Method::OPTIONS, format!("{}/todos", base))
            .header("origin", "http://localhost:3001")
            .header("access-control-request-method", "PATCH")
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "http://localhost:3001"
        );
    });

    controller.stop().unwrap();
}
