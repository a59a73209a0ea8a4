use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const CONTACT_PATH: &str = "/api/contact";

/// Stand-in for the contact submission handler which records every payload it receives and
/// answers with a fixed status and body.
#[derive(Clone)]
pub struct FakeContactEndpoint {
    status: StatusCode,
    body: Value,
    received: Arc<Mutex<Vec<Value>>>,
}

impl FakeContactEndpoint {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({ "message": "Email sent successfully" }),
            received: Default::default(),
        }
    }

    pub fn respond_with(self, status: u16, body: Value) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            body,
            ..self
        }
    }

    /// Serves on an ephemeral port and returns the endpoint URL.
    pub async fn spawn(&self) -> String {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let address = listener.local_addr().unwrap();
        let app = Router::new()
            .route(CONTACT_PATH, post(receive))
            .with_state(self.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{address}{CONTACT_PATH}")
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

impl Default for FakeContactEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

async fn receive(
    State(state): State<FakeContactEndpoint>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.received.lock().unwrap().push(payload);
    (state.status, Json(state.body.clone()))
}
