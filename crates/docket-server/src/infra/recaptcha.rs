use std::time::Duration;

use serde::Deserialize;

use crate::config::RecaptchaConfig;

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    success: bool,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaOutcome {
    Skipped,
    Passed,
    Rejected,
}

#[derive(Clone)]
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    config: RecaptchaConfig,
}

impl RecaptchaVerifier {
    pub fn new(config: RecaptchaConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!(event = "recaptcha_client_failed", error = %err);
                reqwest::Client::new()
            });
        Self { client, config }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// A missing token or an unreachable verifier both count as rejection.
    pub async fn verify(&self, token: Option<&str>, remote_ip: Option<&str>) -> CaptchaOutcome {
        if !self.config.enabled {
            return CaptchaOutcome::Skipped;
        }
        let Some(token) = token.map(str::trim).filter(|value| !value.is_empty()) else {
            return CaptchaOutcome::Rejected;
        };
        let mut form = vec![
            ("secret", self.config.secret.as_str()),
            ("response", token),
        ];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }
        let response = match self
            .client
            .post(&self.config.verify_url)
            .form(&form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(event = "recaptcha_request_failed", error = %err);
                return CaptchaOutcome::Rejected;
            }
        };
        let body = match response.json::<VerifyResponse>().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(event = "recaptcha_response_invalid", error = %err);
                return CaptchaOutcome::Rejected;
            }
        };
        if !body.success {
            tracing::info!(event = "recaptcha_rejected", errors = ?body.error_codes);
            return CaptchaOutcome::Rejected;
        }
        match body.score {
            Some(score) if score < self.config.min_score => {
                tracing::info!(event = "recaptcha_low_score", score);
                CaptchaOutcome::Rejected
            }
            _ => CaptchaOutcome::Passed,
        }
    }
}
