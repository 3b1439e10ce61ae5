//! Brevo (formerly Sendinblue) transactional email client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use crate::domain::{Mail, MailAddress};
use crate::error::CentralError;
use crate::ports::{MailError, MailProvider};

const BREVO_API_URL: &str = "https://api.brevo.com/v3/smtp/email";

pub const BREVO_SIGNATURE: &str = "sendinblue";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendSmtpEmail<'a> {
    sender: &'a MailAddress,
    to: &'a [MailAddress],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    cc: &'a [MailAddress],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    bcc: &'a [MailAddress],
    html_content: &'a str,
    subject: &'a str,
}

pub struct BrevoProvider {
    client: reqwest::Client,
    url: String,
    api_key: String,
    sender: MailAddress,
    enabled: bool,
}

impl BrevoProvider {
    pub fn new(
        api_key: String,
        sender: MailAddress,
        enabled: bool,
        timeout: Duration,
    ) -> Result<Self, CentralError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CentralError::Config(format!("failed to build brevo client: {e}")))?;
        Ok(Self {
            client,
            url: BREVO_API_URL.to_string(),
            api_key,
            sender,
            enabled,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn body<'a>(&'a self, mail: &'a Mail) -> SendSmtpEmail<'a> {
        SendSmtpEmail {
            sender: &self.sender,
            to: &mail.to,
            cc: &mail.cc,
            bcc: &mail.bcc,
            html_content: &mail.html_content,
            subject: &mail.subject,
        }
    }
}

#[async_trait]
impl MailProvider for BrevoProvider {
    async fn send_email(&self, mail: &Mail) -> Result<String, MailError> {
        if !self.enabled {
            return Err(MailError::NotActivated(BREVO_SIGNATURE.into()));
        }

        tracing::debug!(mail_id = %mail.id, "sending mail using brevo");

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .header("accept", "application/json")
            .json(&self.body(mail))
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        // 成功は 201 のみ
        if status != StatusCode::CREATED {
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    fn name(&self) -> &str {
        BREVO_SIGNATURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MailId, MailingInput};
    use chrono::Utc;
    use serde_json::json;

    fn provider(enabled: bool) -> BrevoProvider {
        let sender = MailAddress {
            email: "noreply@example.com".into(),
            name: Some("Central".into()),
        };
        BrevoProvider::new("key".into(), sender, enabled, Duration::from_secs(1)).unwrap()
    }

    fn mail() -> Mail {
        Mail::from_input(
            MailId::generate(),
            MailingInput {
                to: vec![MailAddress::new("a@example.com")],
                bcc: vec![MailAddress::new("b@example.com")],
                html_content: "<p>hi</p>".into(),
                subject: "hello".into(),
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn body_matches_the_smtp_api_shape() {
        let p = provider(true);
        let m = mail();
        let value = serde_json::to_value(p.body(&m)).unwrap();
        assert_eq!(
            value,
            json!({
                "sender": {"email": "noreply@example.com", "name": "Central"},
                "to": [{"email": "a@example.com"}],
                "bcc": [{"email": "b@example.com"}],
                "htmlContent": "<p>hi</p>",
                "subject": "hello",
            })
        );
    }

    #[tokio::test]
    async fn disabled_provider_never_calls_out() {
        let err = provider(false)
            .with_base_url("http://127.0.0.1:1/unreachable")
            .send_email(&mail())
            .await
            .unwrap_err();
        assert_eq!(err, MailError::NotActivated("sendinblue".into()));
    }
}
