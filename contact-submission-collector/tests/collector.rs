use async_trait::async_trait;
use contact_submission_collector::{
    Collector, CollectorError, ContactForm, StaticTokenProvider, SubmissionStatus, TokenProvider,
    SUBMIT_ACTION,
};
use googletest::prelude::*;
use serde_json::json;
use std::sync::{Arc, Mutex};
use test_support::fake_contact_endpoint::FakeContactEndpoint;

struct UnloadedTokenProvider;

#[async_trait]
impl TokenProvider for UnloadedTokenProvider {
    fn is_loaded(&self) -> bool {
        false
    }

    async fn execute(&self, _action: &str) -> std::result::Result<String, CollectorError> {
        Ok("unexpected token".into())
    }
}

/// Hands out a fixed token and remembers which actions it was asked for.
#[derive(Clone, Default)]
struct RecordingTokenProvider {
    actions: Arc<Mutex<Vec<String>>>,
}

impl RecordingTokenProvider {
    fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenProvider for RecordingTokenProvider {
    fn is_loaded(&self) -> bool {
        true
    }

    async fn execute(&self, action: &str) -> std::result::Result<String, CollectorError> {
        self.actions.lock().unwrap().push(action.into());
        Ok("tok1".into())
    }
}

fn filled_form() -> ContactForm {
    ContactForm {
        name: "Ann".into(),
        email: "ann@x.com".into(),
        phone: "555-0100".into(),
        message: "Hi".into(),
    }
}

#[googletest::test]
#[tokio::test]
async fn sends_one_request_with_fields_and_token() {
    let endpoint = FakeContactEndpoint::new();
    let url = endpoint.spawn().await;
    let mut collector = Collector::new(url, StaticTokenProvider::new("tok1"));
    *collector.form_mut() = filled_form();

    let result = collector.submit().await;

    expect_that!(result, ok(anything()));
    expect_that!(
        endpoint.received(),
        elements_are![eq(json!({
            "name": "Ann",
            "email": "ann@x.com",
            "phone": "555-0100",
            "message": "Hi",
            "recaptchaValue": "tok1",
        }))]
    );
}

#[googletest::test]
#[tokio::test]
async fn requests_token_for_contact_form_action() {
    let endpoint = FakeContactEndpoint::new();
    let url = endpoint.spawn().await;
    let token_provider = RecordingTokenProvider::default();
    let mut collector = Collector::new(url, token_provider.clone());
    *collector.form_mut() = filled_form();

    let result = collector.submit().await;

    expect_that!(result, ok(anything()));
    expect_that!(
        token_provider.actions(),
        elements_are![eq(SUBMIT_ACTION)]
    );
}

#[googletest::test]
#[tokio::test]
async fn clears_fields_and_reports_sent_on_success() {
    let endpoint = FakeContactEndpoint::new();
    let url = endpoint.spawn().await;
    let mut collector = Collector::new(url, StaticTokenProvider::new("tok1"));
    *collector.form_mut() = filled_form();

    collector.submit().await.unwrap();

    expect_that!(collector.status(), eq(&SubmissionStatus::Sent));
    expect_that!(collector.form(), eq(&ContactForm::default()));
}

#[googletest::test]
#[tokio::test]
async fn surfaces_server_error_and_keeps_fields() {
    let endpoint = FakeContactEndpoint::new().respond_with(
        400,
        json!({ "error": "reCAPTCHA verification failed", "score": 0.2 }),
    );
    let url = endpoint.spawn().await;
    let mut collector = Collector::new(url, StaticTokenProvider::new("tok1"));
    *collector.form_mut() = filled_form();

    let result = collector.submit().await;

    expect_that!(
        result,
        err(matches_pattern!(CollectorError::Rejected {
            status: eq(400),
        }))
    );
    expect_that!(
        collector.status(),
        eq(&SubmissionStatus::Failed(
            "reCAPTCHA verification failed".into()
        ))
    );
    expect_that!(collector.form(), eq(&filled_form()));
    expect_that!(endpoint.received(), len(eq(1)));
}

#[googletest::test]
#[tokio::test]
async fn falls_back_to_generic_message_when_error_body_is_unreadable() {
    let endpoint = FakeContactEndpoint::new().respond_with(500, json!("not an error object"));
    let url = endpoint.spawn().await;
    let mut collector = Collector::new(url, StaticTokenProvider::new("tok1"));
    *collector.form_mut() = filled_form();

    let _ = collector.submit().await;

    expect_that!(
        collector.status(),
        eq(&SubmissionStatus::Failed(
            "Error sending message. Please try again.".into()
        ))
    );
}

#[googletest::test]
#[tokio::test]
async fn refuses_to_submit_before_verification_script_loads() {
    let endpoint = FakeContactEndpoint::new();
    let url = endpoint.spawn().await;
    let mut collector = Collector::new(url, UnloadedTokenProvider);
    *collector.form_mut() = filled_form();

    let result = collector.submit().await;

    expect_that!(result, err(displays_as(eq("verification not loaded"))));
    expect_that!(collector.status(), eq(&SubmissionStatus::Idle));
    expect_that!(endpoint.received(), empty());
}

#[googletest::test]
#[tokio::test]
async fn refuses_blank_required_fields_without_sending() {
    let endpoint = FakeContactEndpoint::new();
    let url = endpoint.spawn().await;
    let mut collector = Collector::new(url, StaticTokenProvider::new("tok1"));
    *collector.form_mut() = ContactForm {
        email: "   ".into(),
        ..filled_form()
    };

    let result = collector.submit().await;

    expect_that!(
        result,
        err(displays_as(eq(
            "Missing required fields: name, email, and message are required"
        )))
    );
    expect_that!(
        collector.status(),
        points_to(matches_pattern!(SubmissionStatus::Failed(anything())))
    );
    expect_that!(endpoint.received(), empty());
}
