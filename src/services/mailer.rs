//! Access-code delivery.
//!
//! `CodeMailer` is the seam between login and the outside world. Production
//! uses Resend; without credentials the code is written to the log so a
//! local deployment can still sign in.

use async_trait::async_trait;
use resend_rs::Resend;
use resend_rs::types::CreateEmailBaseOptions;
use tracing::info;

use crate::config::MailConfig;

const APP_NAME: &str = "GymDesk";
const ACCESS_CODE_TEMPLATE: &str = include_str!("../../templates/access_code.html");

#[derive(Debug, thiserror::Error)]
#[error("email delivery failed: {0}")]
pub struct MailError(pub String);

#[async_trait]
pub trait CodeMailer: Send + Sync {
    async fn send_code(&self, to_email: &str, code: &str) -> Result<(), MailError>;
}

#[must_use]
pub fn render_access_code_email(email: &str, code: &str) -> String {
    ACCESS_CODE_TEMPLATE
        .replace("{{GYM_APP}}", APP_NAME)
        .replace("{{EMAIL}}", email)
        .replace("{{CODE}}", code)
}

pub struct ResendMailer {
    client: Resend,
    from: String,
}

impl ResendMailer {
    #[must_use]
    pub fn new(config: &MailConfig) -> Self {
        Self { client: Resend::new(&config.api_key), from: config.from.clone() }
    }
}

#[async_trait]
impl CodeMailer for ResendMailer {
    async fn send_code(&self, to_email: &str, code: &str) -> Result<(), MailError> {
        let html = render_access_code_email(to_email, code);
        let subject = format!("Your {APP_NAME} sign-in code");
        let email = CreateEmailBaseOptions::new(&self.from, [to_email], subject).with_html(&html);
        self.client
            .emails
            .send(email)
            .await
            .map_err(|e| MailError(e.to_string()))?;
        Ok(())
    }
}

/// Development mailer: logs the code instead of sending it.
pub struct LogMailer;

#[async_trait]
impl CodeMailer for LogMailer {
    async fn send_code(&self, to_email: &str, code: &str) -> Result<(), MailError> {
        info!(email = %to_email, %code, "mail delivery not configured; access code logged");
        Ok(())
    }
}

#[cfg(test)]
#[path = "mailer_test.rs"]
mod tests;
