use anyhow::{Context, Result};
use clap::Parser;
use contact_submission_collector::{Collector, ContactForm, StaticTokenProvider};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "contact-submission-collector",
    about = "Send a message through the website contact form"
)]
struct Cli {
    /// URL of the contact submission endpoint.
    #[arg(long, env = "CONTACT_ENDPOINT")]
    endpoint: String,

    #[arg(long)]
    name: String,

    #[arg(long)]
    email: String,

    #[arg(long)]
    phone: Option<String>,

    #[arg(long)]
    message: String,

    /// reCAPTCHA token issued for the `contact_form_submit` action.
    #[arg(long, env = "RECAPTCHA_TOKEN")]
    token: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut collector = Collector::new(cli.endpoint, StaticTokenProvider::new(cli.token));
    *collector.form_mut() = ContactForm {
        name: cli.name,
        email: cli.email,
        phone: cli.phone.unwrap_or_default(),
        message: cli.message,
    };

    collector
        .submit()
        .await
        .context("Contact form submission failed")?;
    println!("Message sent successfully!");
    Ok(())
}
