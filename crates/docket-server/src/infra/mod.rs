pub mod cache;
pub mod guard;
pub mod mailer;
pub mod metrics;
pub mod recaptcha;
pub mod request_context;
pub mod uploads;
