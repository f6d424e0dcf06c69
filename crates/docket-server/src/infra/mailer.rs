//! Outgoing mail.
//!
//! SMTP settings live in the site settings row and can change at runtime, so
//! the transport is built per message from the settings passed in.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docket_core::SiteSettings;
use handlebars::Handlebars;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use thiserror::Error;

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("smtp is not configured")]
    NotConfigured,
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid tls mode: {0}")]
    InvalidTlsMode(String),
    #[error("message build failed: {0}")]
    Build(String),
    #[error("smtp send failed: {0}")]
    Transport(String),
    #[error("template render failed: {0}")]
    Template(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, settings: &SiteSettings, message: MailMessage) -> Result<(), MailError>;
}

pub fn build_mailer(config: &MailConfig) -> Arc<dyn Mailer> {
    if config.enabled {
        Arc::new(SmtpMailer::new(Duration::from_secs(config.timeout_seconds)))
    } else {
        Arc::new(NoopMailer)
    }
}

pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, _settings: &SiteSettings, message: MailMessage) -> Result<(), MailError> {
        tracing::debug!(event = "mail_skipped", to = %message.to, "Mail delivery disabled");
        Ok(())
    }
}

/// Keeps every message in memory; used by tests and dry runs.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, _settings: &SiteSettings, message: MailMessage) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .push(message);
        Ok(())
    }
}

pub struct SmtpMailer {
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

fn tls_for(mode: &str, host: &str) -> Result<Tls, MailError> {
    let params = || {
        TlsParameters::builder(host.to_string())
            .build()
            .map_err(|err| MailError::Build(err.to_string()))
    };
    match mode {
        "tls" => Ok(Tls::Wrapper(params()?)),
        "starttls" => Ok(Tls::Required(params()?)),
        "none" => Ok(Tls::None),
        other => Err(MailError::InvalidTlsMode(other.to_string())),
    }
}

fn build_message(settings: &SiteSettings, message: MailMessage) -> Result<Message, MailError> {
    let from_address = settings.smtp_from.as_deref().ok_or(MailError::NotConfigured)?;
    let from: Mailbox = format!("{} <{}>", settings.site_name, from_address)
        .parse()
        .or_else(|_| from_address.parse::<Mailbox>())
        .map_err(|_| MailError::InvalidAddress(from_address.to_string()))?;
    let to: Mailbox = message
        .to
        .parse()
        .map_err(|_| MailError::InvalidAddress(message.to.clone()))?;
    Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject)
        .multipart(
            MultiPart::alternative()
                .singlepart(SinglePart::plain(message.text_body))
                .singlepart(SinglePart::html(message.html_body)),
        )
        .map_err(|err| MailError::Build(err.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, settings: &SiteSettings, message: MailMessage) -> Result<(), MailError> {
        if !settings.smtp_configured() {
            return Err(MailError::NotConfigured);
        }
        let host = settings.smtp_host.as_deref().unwrap_or_default();
        let port = u16::try_from(settings.smtp_port).map_err(|_| MailError::NotConfigured)?;
        let to = message.to.clone();
        let email = build_message(settings, message)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .timeout(Some(self.timeout))
            .tls(tls_for(&settings.smtp_tls_mode, host)?);
        if let (Some(username), Some(password)) = (
            settings.smtp_username.as_deref().filter(|value| !value.is_empty()),
            settings.smtp_password.as_deref(),
        ) {
            builder = builder.credentials(Credentials::new(
                username.to_string(),
                password.to_string(),
            ));
        }
        let transport = builder.build();

        match transport.send(email).await {
            Ok(_) => {
                tracing::info!(event = "mail_sent", to = %to, host = %host);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(event = "mail_send_failed", to = %to, error = %err);
                Err(MailError::Transport(err.to_string()))
            }
        }
    }
}

const NEW_POST_HTML: &str = r#"<h2>{{site_name}}: new post in {{board}}</h2>
<table>
  <tr><th>Title</th><td>{{title}}</td></tr>
  <tr><th>Author</th><td>{{author}}</td></tr>
  {{#if email}}<tr><th>Email</th><td>{{email}}</td></tr>{{/if}}
  {{#if phone}}<tr><th>Phone</th><td>{{phone}}</td></tr>{{/if}}
</table>
<div>{{{body}}}</div>
"#;

const NEW_POST_TEXT: &str = "{{site_name}}: new post in {{board}}\n\nTitle: {{title}}\nAuthor: {{author}}\n{{#if email}}Email: {{email}}\n{{/if}}{{#if phone}}Phone: {{phone}}\n{{/if}}\n{{text}}\n";

#[derive(Debug, Serialize)]
pub struct NewPostNotice<'a> {
    pub site_name: &'a str,
    pub board: &'a str,
    pub title: &'a str,
    pub author: &'a str,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    /// Scrubbed HTML, inserted into the HTML part as is.
    pub body: &'a str,
    pub text: &'a str,
}

/// Renders the staff notification for a public board post. Every value but
/// `body` is HTML-escaped in the HTML part; plain values go in as given.
pub fn render_new_post(to: &str, notice: &NewPostNotice<'_>) -> Result<MailMessage, MailError> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(false);
    let html_body = handlebars
        .render_template(NEW_POST_HTML, notice)
        .map_err(|err| MailError::Template(err.to_string()))?;
    handlebars.register_escape_fn(handlebars::no_escape);
    let text_body = handlebars
        .render_template(NEW_POST_TEXT, notice)
        .map_err(|err| MailError::Template(err.to_string()))?;
    Ok(MailMessage {
        to: to.to_string(),
        subject: format!("[{}] {}", notice.board, notice.title),
        text_body,
        html_body,
    })
}
