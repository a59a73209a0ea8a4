use crate::error::ContactFormError;
use serde::Deserialize;
use tracing::info;

/// The JSON body posted by the contact form. Every field is optional on the wire so that
/// missing fields produce a validation error rather than a deserialisation failure.
#[derive(Deserialize, Debug, Default)]
pub struct ContactSubmission {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    message: Option<String>,
    #[serde(rename = "recaptchaValue")]
    recaptcha_value: Option<String>,
}

impl ContactSubmission {
    pub fn validate(&self) -> Result<ValidatedSubmission, ContactFormError> {
        // The message is relayed as written; only the single-line fields are trimmed.
        let (Some(name), Some(email), Some(message)) = (
            present(&self.name).map(str::trim),
            present(&self.email).map(str::trim),
            present(&self.message),
        ) else {
            return Err(ContactFormError::MissingFields);
        };
        let Some(recaptcha_token) = present(&self.recaptcha_value).map(str::trim) else {
            return Err(ContactFormError::MissingToken);
        };

        Ok(ValidatedSubmission {
            name,
            email,
            phone: present(&self.phone).map(str::trim),
            message,
            recaptcha_token,
        })
    }

    pub fn log_received(&self) {
        info!(
            name = presence(&self.name),
            email = presence(&self.email),
            phone = presence(&self.phone),
            message_chars = self.message.as_ref().map_or(0, |m| m.chars().count()),
            recaptcha = presence(&self.recaptcha_value),
            "Received contact submission"
        );
    }
}

#[derive(Debug)]
pub struct ValidatedSubmission<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub message: &'a str,
    pub recaptcha_token: &'a str,
}

// Blank strings are treated the same as absent ones.
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.trim().is_empty())
}

fn presence(field: &Option<String>) -> &'static str {
    if present(field).is_some() {
        "provided"
    } else {
        "missing"
    }
}
