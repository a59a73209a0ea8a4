mod error;
mod notification;
mod recaptcha;
mod secrets;
mod submission;

use async_once_cell::OnceCell;
use error::{json_response, ContactFormError};
use lambda_http::{
    http::{Method, StatusCode},
    run, service_fn, Body, Error, Request, RequestPayloadExt, Response,
};
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::{Credentials, Mechanism},
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use notification::render_notification;
use recaptcha::RecaptchaVerifier;
use secrets::{EnvironmentSecretRepository, SecretRepository};
use serde_json::json;
use std::{borrow::Cow, sync::Arc};
use submission::{ContactSubmission, ValidatedSubmission};
use tracing::info;
use tracing_subscriber::EnvFilter;

const FROM_NAME: &str = "Website contact form";
const TO_ADDRESS: &str = "CodePlex Sales <sales@codeplexllc.com>";

const SMTP_URL: &str = "smtps://smtp.gmail.com";
pub const EMAIL_USER_NAME: &str = "EMAIL_USER";
pub const EMAIL_PASSWORD_NAME: &str = "EMAIL_PASSWORD";

const SUCCESS_MESSAGE: &str = "Email sent successfully";

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();

    let handler = ContactSubmissionHandler::<EnvironmentSecretRepository>::new().await;
    run(service_fn(|event| handler.handle(event))).await
}

struct ContactSubmissionHandler<SecretRepositoryT: SecretRepository> {
    secrets_repository: Arc<SecretRepositoryT>,
    mailer: OnceCell<AsyncSmtpTransport<Tokio1Executor>>,
    recaptcha_verifier: RecaptchaVerifier<SecretRepositoryT>,
}

impl<SecretRepositoryT: SecretRepository> ContactSubmissionHandler<SecretRepositoryT> {
    async fn new() -> Self {
        let secrets_repository = Arc::new(SecretRepositoryT::open().await);
        Self {
            secrets_repository: secrets_repository.clone(),
            mailer: Default::default(),
            recaptcha_verifier: RecaptchaVerifier::new(secrets_repository),
        }
    }

    async fn handle(&self, event: Request) -> Result<Response<Body>, Error> {
        match self.process_request(event).await {
            Ok(()) => Ok(json_response(
                StatusCode::OK,
                json!({ "message": SUCCESS_MESSAGE }),
            )),
            Err(error) => {
                error.log();
                Ok(error.into_response())
            }
        }
    }

    async fn process_request(&self, event: Request) -> Result<(), ContactFormError> {
        if event.method() != Method::POST {
            return Err(ContactFormError::MethodNotAllowed);
        }
        let submission = Self::parse_submission(&event)?;
        submission.log_received();

        let validated_submission = submission.validate()?;
        self.recaptcha_verifier
            .verify_token(validated_submission.recaptcha_token)
            .await?;
        info!("reCAPTCHA verification successful");

        let email = self.construct_email_message(&validated_submission).await?;
        self.send_email(email).await
    }

    // Browsers posting a string body without a header send it as text/plain, which
    // `payload()` does not recognise.
    fn parse_submission(event: &Request) -> Result<ContactSubmission, ContactFormError> {
        if let Some(submission) = event
            .payload()
            .map_err(|error| ContactFormError::MalformedRequest(error.to_string()))?
        {
            return Ok(submission);
        }
        let body = event.body();
        if body.is_empty() {
            return Err(ContactFormError::MalformedRequest(
                "Missing request payload".into(),
            ));
        }
        serde_json::from_slice(body)
            .map_err(|error| ContactFormError::MalformedRequest(error.to_string()))
    }

    async fn construct_email_message(
        &self,
        submission: &ValidatedSubmission<'_>,
    ) -> Result<Message, ContactFormError> {
        let Ok(reply_to_address) = submission.email.parse::<Address>() else {
            return Err(ContactFormError::InvalidEmail(submission.email.into()));
        };
        let reply_to = Mailbox::new(Some(submission.name.into()), reply_to_address);
        let from = self.from_mailbox().await?;
        let to: Mailbox = TO_ADDRESS.parse().map_err(|error| {
            ContactFormError::InternalError(format!("Invalid recipient {TO_ADDRESS}: {error}"))
        })?;
        let notification = render_notification(submission).map_err(|error| {
            ContactFormError::InternalError(format!("Error rendering notification: {error}"))
        })?;

        Message::builder()
            .from(from)
            .reply_to(reply_to)
            .to(to)
            .subject(notification.subject)
            .multipart(MultiPart::alternative_plain_html(
                notification.text,
                notification.html,
            ))
            .map_err(|error| {
                ContactFormError::InternalError(format!("Error building message: {error}"))
            })
    }

    async fn from_mailbox(&self) -> Result<Mailbox, ContactFormError> {
        let user = self
            .secrets_repository
            .get_secret(EMAIL_USER_NAME)
            .await
            .map_err(|error| ContactFormError::InternalError(error.to_string()))?;
        let address = user.parse::<Address>().map_err(|error| {
            ContactFormError::InternalError(format!("Invalid {EMAIL_USER_NAME} {user}: {error}"))
        })?;
        Ok(Mailbox::new(Some(FROM_NAME.into()), address))
    }

    async fn send_email(&self, email: Message) -> Result<(), ContactFormError> {
        let mailer = self
            .mailer
            .get_or_try_init(self.initialise_mailer())
            .await?;
        let response = mailer.send(email).await.map_err(ContactFormError::dispatch)?;
        info!(
            code = %response.code(),
            "Email sent successfully"
        );
        Ok(())
    }

    async fn initialise_mailer(
        &self,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, ContactFormError> {
        let smtp_url = Self::smtp_url();
        info!("initialise_mailer: Connecting to {smtp_url}");
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::from_url(&smtp_url)
            .map_err(|error| {
                ContactFormError::InternalError(format!("Invalid SMTP URL {smtp_url}: {error}"))
            })?
            .authentication(vec![Mechanism::Plain]);

        // Credentials only travel over TLS. A plain-text URL (local development, tests) gets no
        // credentials and a real relay will refuse the message.
        if smtp_url.starts_with("smtps://") {
            let username = self.smtp_secret(EMAIL_USER_NAME).await?;
            let password = self.smtp_secret(EMAIL_PASSWORD_NAME).await?;
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(builder.build())
    }

    async fn smtp_secret(&self, name: &'static str) -> Result<String, ContactFormError> {
        self.secrets_repository
            .get_secret(name)
            .await
            .map_err(|error| {
                ContactFormError::InternalError(format!(
                    "Unable to configure SMTP transport: {error}"
                ))
            })
    }

    fn smtp_url() -> Cow<'static, str> {
        std::env::var("SMTP_URL")
            .map(Cow::Owned)
            .unwrap_or(SMTP_URL.into())
    }
}
