use crate::submission::ValidatedSubmission;
use serde::Serialize;
use serde_json::Value;
use tinytemplate::{error::Error, format, format_unescaped, TinyTemplate};

const HTML_TEMPLATE_NAME: &str = "notification-html";
const TEXT_TEMPLATE_NAME: &str = "notification-text";
const HTML_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/notification.html"
));
const TEXT_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/notification.txt"
));

const PHONE_PLACEHOLDER: &str = "Not provided";

#[derive(Serialize)]
struct Context<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    message: &'a str,
}

/// The email sent to the sales inbox for one submission.
#[derive(Debug)]
pub struct Notification {
    pub subject: String,
    pub text: String,
    pub html: String,
}

pub fn render_notification(submission: &ValidatedSubmission) -> Result<Notification, Error> {
    let context = Context {
        name: submission.name,
        email: submission.email,
        phone: submission.phone.unwrap_or(PHONE_PLACEHOLDER),
        message: submission.message,
    };

    let mut html = TinyTemplate::new();
    html.add_formatter("render_line_breaks", render_line_breaks);
    html.add_template(HTML_TEMPLATE_NAME, HTML_TEMPLATE)?;

    let mut text = TinyTemplate::new();
    text.set_default_formatter(&format_unescaped);
    text.add_template(TEXT_TEMPLATE_NAME, TEXT_TEMPLATE)?;

    Ok(Notification {
        subject: format!("New Contact Form Submission from {}", submission.name),
        text: text.render(TEXT_TEMPLATE_NAME, &context)?,
        html: html.render(HTML_TEMPLATE_NAME, &context)?,
    })
}

fn render_line_breaks(value: &Value, output: &mut String) -> Result<(), Error> {
    let mut formatted = String::new();
    format(value, &mut formatted)?;
    output.push_str(&formatted.replace('\n', "<br>"));
    Ok(())
}
