//! Client side of the website contact form.
//!
//! A [`Collector`] holds the form state, waits for the bot-verification script to be available,
//! obtains a fresh token for [`SUBMIT_ACTION`] and posts the submission exactly once. The outcome
//! is exposed as a [`SubmissionStatus`] for the page to render as a banner.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{info, warn};

/// Action label tokens are requested for. The handler logs a warning for any other action.
pub const SUBMIT_ACTION: &str = "contact_form_submit";

const GENERIC_FAILURE: &str = "Error sending message. Please try again.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

impl ContactForm {
    fn is_complete(&self) -> bool {
        [&self.name, &self.email, &self.message]
            .iter()
            .all(|field| !field.trim().is_empty())
    }

    fn payload<'a>(&'a self, recaptcha_value: &'a str) -> SubmissionPayload<'a> {
        let phone = self.phone.trim();
        SubmissionPayload {
            name: self.name.trim(),
            email: self.email.trim(),
            phone: (!phone.is_empty()).then_some(phone),
            message: &self.message,
            recaptcha_value,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionPayload<'a> {
    name: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    message: &'a str,
    recaptcha_value: &'a str,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStatus {
    Idle,
    Submitting,
    Sent,
    Failed(String),
}

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("verification not loaded")]
    NotLoaded,
    #[error("Missing required fields: name, email, and message are required")]
    MissingFields,
    #[error("No verification token available")]
    TokenUnavailable,
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Submission rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl CollectorError {
    fn user_message(&self) -> String {
        match self {
            CollectorError::Rejected { message, .. } => message.clone(),
            CollectorError::Transport(_) => GENERIC_FAILURE.into(),
            other => other.to_string(),
        }
    }
}

/// Source of bot-verification tokens, i.e. the challenge script on the page.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Whether the script has finished loading. Nothing may be submitted before it has.
    fn is_loaded(&self) -> bool;

    async fn execute(&self, action: &str) -> Result<String, CollectorError>;
}

/// A provider holding one token obtained out of band. Tokens are single-use, so it hands the
/// token out once.
pub struct StaticTokenProvider(Mutex<Option<String>>);

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Mutex::new(Some(token.into())))
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    fn is_loaded(&self) -> bool {
        true
    }

    async fn execute(&self, _action: &str) -> Result<String, CollectorError> {
        self.0
            .lock()
            .map_err(|_| CollectorError::TokenUnavailable)?
            .take()
            .ok_or(CollectorError::TokenUnavailable)
    }
}

pub struct Collector<P: TokenProvider> {
    endpoint: String,
    client: Client,
    token_provider: P,
    form: ContactForm,
    status: SubmissionStatus,
}

impl<P: TokenProvider> Collector<P> {
    pub fn new(endpoint: impl Into<String>, token_provider: P) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: Client::new(),
            token_provider,
            form: ContactForm::default(),
            status: SubmissionStatus::Idle,
        }
    }

    pub fn form(&self) -> &ContactForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ContactForm {
        &mut self.form
    }

    pub fn status(&self) -> &SubmissionStatus {
        &self.status
    }

    /// Submits the form once. On success the fields are cleared; on failure they are kept and
    /// the status carries the message to show. Never retries.
    pub async fn submit(&mut self) -> Result<(), CollectorError> {
        if !self.token_provider.is_loaded() {
            return Err(CollectorError::NotLoaded);
        }
        self.status = SubmissionStatus::Submitting;
        match self.send().await {
            Ok(()) => {
                info!("Contact form submitted");
                self.form = ContactForm::default();
                self.status = SubmissionStatus::Sent;
                Ok(())
            }
            Err(error) => {
                warn!("Contact form submission failed: {error}");
                self.status = SubmissionStatus::Failed(error.user_message());
                Err(error)
            }
        }
    }

    async fn send(&self) -> Result<(), CollectorError> {
        if !self.form.is_complete() {
            return Err(CollectorError::MissingFields);
        }
        let token = self.token_provider.execute(SUBMIT_ACTION).await?;
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.form.payload(&token))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response
            .json::<ErrorResponse>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| GENERIC_FAILURE.into());
        Err(CollectorError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
