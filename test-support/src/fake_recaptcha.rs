use axum::{
    extract::{Form, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{
    borrow::Cow,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::net::TcpListener;

const RECAPTCHA_PORT: u16 = 5283;
const VERIFY_PATH: &str = "/recaptcha/api/siteverify";
const ACTION: &str = "contact_form_submit";

/// Stand-in for the reCAPTCHA siteverify endpoint.
#[derive(Clone)]
pub struct FakeRecaptcha {
    required_secret: Cow<'static, str>,
    required_token: Option<String>,
    score: f64,
    return_invalid_response: bool,
    requests: Arc<AtomicUsize>,
}

#[derive(Deserialize)]
struct VerifyRequestPayload {
    secret: String,
    response: String,
}

impl FakeRecaptcha {
    pub fn new(required_secret: impl Into<Cow<'static, str>>) -> Self {
        Self {
            required_secret: required_secret.into(),
            required_token: None,
            score: 0.9,
            return_invalid_response: false,
            requests: Default::default(),
        }
    }

    pub fn setup_environment() {
        std::env::set_var("RECAPTCHA_VERIFY_URL", Self::verify_url());
    }

    /// Binds the port before returning, so requests made afterwards are served.
    pub async fn spawn(self) {
        let listener = TcpListener::bind(("127.0.0.1", RECAPTCHA_PORT))
            .await
            .unwrap();
        let app = Router::new()
            .route(VERIFY_PATH, post(verify))
            .with_state(self);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
    }

    pub fn require_token(self, required_token: impl AsRef<str>) -> Self {
        Self {
            required_token: Some(required_token.as_ref().into()),
            ..self
        }
    }

    pub fn with_score(self, score: f64) -> Self {
        Self { score, ..self }
    }

    pub fn return_invalid_response(self) -> Self {
        Self {
            return_invalid_response: true,
            ..self
        }
    }

    /// Number of verification requests received by this fake and its clones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn verify_url() -> String {
        format!("http://127.0.0.1:{RECAPTCHA_PORT}{VERIFY_PATH}")
    }
}

async fn verify(
    State(state): State<FakeRecaptcha>,
    Form(payload): Form<VerifyRequestPayload>,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    if state.return_invalid_response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain")],
            "Invalid response",
        )
            .into_response()
    } else if payload.secret != state.required_secret {
        Json(json!({
            "success": false,
            "error-codes": ["invalid-input-secret"],
        }))
        .into_response()
    } else if state
        .required_token
        .as_ref()
        .is_some_and(|token| *token != payload.response)
    {
        Json(json!({
            "success": false,
            "error-codes": ["invalid-input-response"],
        }))
        .into_response()
    } else {
        Json(json!({
            "success": true,
            "score": state.score,
            "action": ACTION,
            "challenge_ts": "2024-01-01T00:00:00Z",
            "hostname": "localhost",
        }))
        .into_response()
    }
}
