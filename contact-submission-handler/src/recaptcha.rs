use crate::{error::ContactFormError, error::EnvironmentError, secrets::SecretRepository};
use async_once_cell::OnceCell;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{info, warn};

pub const RECAPTCHA_SECRET_KEY_NAME: &str = "RECAPTCHA_SECRET_KEY";
const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Submissions scoring below this are treated as bots.
pub const SCORE_THRESHOLD: f64 = 0.5;

/// Action label the contact form requests its token for.
pub const SUBMIT_ACTION: &str = "contact_form_submit";

const SECRET_ERROR_CODES: [&str; 2] = ["missing-input-secret", "invalid-input-secret"];

pub struct RecaptchaVerifier<SecretRepositoryT: SecretRepository> {
    secrets_repository: Arc<SecretRepositoryT>,
    secret_key: OnceCell<String>,
    client: Client,
}

impl<SecretRepositoryT: SecretRepository> RecaptchaVerifier<SecretRepositoryT> {
    pub fn new(secrets_repository: Arc<SecretRepositoryT>) -> Self {
        Self {
            secrets_repository,
            secret_key: Default::default(),
            client: Client::new(),
        }
    }

    /// Checks a token with the siteverify endpoint. Fails closed: if the verification service
    /// cannot be reached or answers nonsense, the submission is not let through.
    pub async fn verify_token(&self, token: &str) -> Result<(), RecaptchaError> {
        let secret = self
            .secret_key
            .get_or_try_init(self.secrets_repository.get_secret(RECAPTCHA_SECRET_KEY_NAME))
            .await?;
        let response = self
            .client
            .post(Self::verification_url().as_ref())
            .timeout(VERIFY_TIMEOUT)
            .form(&SiteVerifyPayload {
                secret: secret.as_str(),
                response: token,
            })
            .send()
            .await
            .map_err(RecaptchaError::Unavailable)?;
        if !response.status().is_success() {
            return Err(RecaptchaError::UnexpectedStatus(response.status()));
        }
        let body: SiteVerifyResponse = response
            .json()
            .await
            .map_err(RecaptchaError::InvalidResponse)?;
        info!(
            success = body.success,
            score = ?body.score,
            action = ?body.action,
            hostname = ?body.hostname,
            error_codes = ?body.error_codes,
            "reCAPTCHA response"
        );
        Self::assess(body)
    }

    fn assess(body: SiteVerifyResponse) -> Result<(), RecaptchaError> {
        if !body.success {
            if body
                .error_codes
                .iter()
                .any(|code| SECRET_ERROR_CODES.contains(&code.as_str()))
            {
                return Err(RecaptchaError::IncorrectSecret(body.error_codes));
            }
            return Err(RecaptchaError::Rejected {
                score: body.score,
                error_codes: body.error_codes,
            });
        }
        // Responses without a score come from non-scoring (v2) keys and pass on success alone.
        match body.score {
            Some(score) if score < SCORE_THRESHOLD => {
                return Err(RecaptchaError::Rejected {
                    score: Some(score),
                    error_codes: body.error_codes,
                })
            }
            _ => {}
        }
        if let Some(action) = body.action.as_deref() {
            if action != SUBMIT_ACTION {
                warn!("reCAPTCHA token was issued for action {action}, expected {SUBMIT_ACTION}");
            }
        }
        Ok(())
    }

    fn verification_url() -> Cow<'static, str> {
        std::env::var("RECAPTCHA_VERIFY_URL")
            .map(Cow::Owned)
            .unwrap_or(RECAPTCHA_VERIFY_URL.into())
    }
}

#[derive(Serialize)]
struct SiteVerifyPayload<'a> {
    secret: &'a str,
    response: &'a str,
}

#[derive(Deserialize, Debug)]
struct SiteVerifyResponse {
    success: bool,
    score: Option<f64>,
    action: Option<String>,
    hostname: Option<String>,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RecaptchaError {
    #[error("reCAPTCHA secret unavailable: {0}")]
    MissingSecret(#[from] EnvironmentError),
    #[error("reCAPTCHA rejected the configured secret: {0:?}")]
    IncorrectSecret(Vec<String>),
    #[error("Could not reach reCAPTCHA: {0}")]
    Unavailable(reqwest::Error),
    #[error("reCAPTCHA answered with status {0}")]
    UnexpectedStatus(StatusCode),
    #[error("Unreadable reCAPTCHA response: {0}")]
    InvalidResponse(reqwest::Error),
    #[error("reCAPTCHA rejected token (score {score:?}, errors {error_codes:?})")]
    Rejected {
        score: Option<f64>,
        error_codes: Vec<String>,
    },
}

impl From<RecaptchaError> for ContactFormError {
    fn from(error: RecaptchaError) -> Self {
        match error {
            RecaptchaError::Rejected { score, error_codes } => {
                ContactFormError::VerificationFailed { score, error_codes }
            }
            other => ContactFormError::InternalError(other.to_string()),
        }
    }
}
