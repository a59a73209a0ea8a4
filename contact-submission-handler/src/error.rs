use lambda_http::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    Body, Response,
};
use lettre::transport::smtp;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

const MISSING_FIELDS_MESSAGE: &str =
    "Missing required fields: name, email, and message are required";
const UNEXPECTED_ERROR_MESSAGE: &str = "Failed to process request";

/// Every way a single contact submission can end without the email going out.
#[derive(Debug, Error)]
pub enum ContactFormError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
    #[error("Missing required fields")]
    MissingFields,
    #[error("Missing reCAPTCHA token")]
    MissingToken,
    #[error("Invalid email address {0}")]
    InvalidEmail(String),
    #[error("reCAPTCHA rejected submission (score {score:?}, errors {error_codes:?})")]
    VerificationFailed {
        score: Option<f64>,
        error_codes: Vec<String>,
    },
    #[error("Error sending message: {details} (code {code})")]
    DispatchFailed { details: String, code: String },
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ContactFormError {
    pub fn dispatch(error: smtp::Error) -> Self {
        ContactFormError::DispatchFailed {
            code: relay_error_code(&error),
            details: error.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ContactFormError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ContactFormError::MissingFields
            | ContactFormError::MissingToken
            | ContactFormError::InvalidEmail(_)
            | ContactFormError::VerificationFailed { .. } => StatusCode::BAD_REQUEST,
            ContactFormError::MalformedRequest(_)
            | ContactFormError::DispatchFailed { .. }
            | ContactFormError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn log(&self) {
        if self.status().is_server_error() {
            error!("Server error handling contact submission: {self}");
        } else {
            warn!("Rejected contact submission: {self}");
        }
    }

    pub fn into_response(self) -> Response<Body> {
        let status = self.status();
        let body = match self {
            ContactFormError::MethodNotAllowed => json!({ "error": "Method not allowed" }),
            ContactFormError::MalformedRequest(details) => json!({
                "error": UNEXPECTED_ERROR_MESSAGE,
                "details": details,
            }),
            ContactFormError::MissingFields => json!({ "error": MISSING_FIELDS_MESSAGE }),
            ContactFormError::MissingToken => {
                json!({ "error": "reCAPTCHA verification required" })
            }
            ContactFormError::InvalidEmail(email) => json!({
                "error": "Invalid email address",
                "details": email,
            }),
            ContactFormError::VerificationFailed { score, error_codes } => json!({
                "error": "reCAPTCHA verification failed",
                "score": score,
                "error-codes": error_codes,
            }),
            ContactFormError::DispatchFailed { details, code } => json!({
                "error": "Failed to send email",
                "details": details,
                "code": code,
            }),
            // Descriptions are only logged.
            ContactFormError::InternalError(_) => json!({ "error": UNEXPECTED_ERROR_MESSAGE }),
        };
        json_response(status, body)
    }
}

pub fn json_response(status: StatusCode, body: Value) -> Response<Body> {
    let mut response = Response::new(Body::Text(body.to_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// The relay's reply code when it sent one, otherwise a symbolic code for the
/// transport failure.
fn relay_error_code(error: &smtp::Error) -> String {
    if let Some(code) = error.status() {
        code.to_string()
    } else if error.is_timeout() {
        "ETIMEDOUT".into()
    } else if error.is_client() {
        "EENVELOPE".into()
    } else {
        "ECONNECTION".into()
    }
}

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("Missing secret {0}")]
    MissingSecret(&'static str),
}
