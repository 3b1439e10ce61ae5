//! Mailgun messages API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{Mail, MailAddress};
use crate::error::CentralError;
use crate::ports::{MailError, MailProvider};

const MAILGUN_API_URL: &str = "https://api.mailgun.net";

pub const MAILGUN_SIGNATURE: &str = "mailgun";

#[derive(Debug, Deserialize)]
struct MailgunResponse {
    id: String,
    #[serde(default)]
    message: String,
}

pub struct MailgunProvider {
    client: reqwest::Client,
    base_url: String,
    domain: String,
    api_key: String,
    sender: MailAddress,
    enabled: bool,
}

impl MailgunProvider {
    pub fn new(
        domain: String,
        api_key: String,
        sender: MailAddress,
        enabled: bool,
        timeout: Duration,
    ) -> Result<Self, CentralError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CentralError::Config(format!("failed to build mailgun client: {e}")))?;
        Ok(Self {
            client,
            base_url: MAILGUN_API_URL.to_string(),
            domain,
            api_key,
            sender,
            enabled,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/v3/{}/messages",
            self.base_url.trim_end_matches('/'),
            self.domain
        )
    }

    fn form(&self, mail: &Mail) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("from", format_address(&self.sender)),
            ("to", join_addresses(&mail.to)),
            ("subject", mail.subject.clone()),
            ("html", mail.html_content.clone()),
        ];
        if !mail.cc.is_empty() {
            form.push(("cc", join_addresses(&mail.cc)));
        }
        if !mail.bcc.is_empty() {
            form.push(("bcc", join_addresses(&mail.bcc)));
        }
        form
    }
}

fn format_address(address: &MailAddress) -> String {
    match address.name.as_deref() {
        Some(name) if !name.is_empty() => format!("{name} <{}>", address.email),
        _ => address.email.clone(),
    }
}

fn join_addresses(addresses: &[MailAddress]) -> String {
    addresses
        .iter()
        .map(format_address)
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl MailProvider for MailgunProvider {
    async fn send_email(&self, mail: &Mail) -> Result<String, MailError> {
        if !self.enabled {
            return Err(MailError::NotActivated(MAILGUN_SIGNATURE.into()));
        }

        tracing::debug!(mail_id = %mail.id, "sending mail using mailgun");

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth("api", Some(&self.api_key))
            .form(&self.form(mail))
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MailgunResponse = serde_json::from_str(&body)
            .map_err(|e| MailError::Transport(format!("unexpected mailgun response: {e}")))?;
        tracing::debug!(mail_id = %mail.id, response = %parsed.message, "mailgun accepted the mail");
        Ok(parsed.id)
    }

    fn name(&self) -> &str {
        MAILGUN_SIGNATURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MailId, MailingInput};
    use chrono::Utc;

    fn provider() -> MailgunProvider {
        MailgunProvider::new(
            "mg.example.com".into(),
            "key".into(),
            MailAddress {
                email: "noreply@example.com".into(),
                name: Some("Central".into()),
            },
            true,
            Duration::from_secs(1),
        )
        .unwrap()
        .with_base_url("https://api.eu.mailgun.net/")
    }

    #[test]
    fn url_uses_the_sending_domain() {
        assert_eq!(
            provider().messages_url(),
            "https://api.eu.mailgun.net/v3/mg.example.com/messages"
        );
    }

    #[test]
    fn form_lists_recipients() {
        let mail = Mail::from_input(
            MailId::generate(),
            MailingInput {
                to: vec![
                    MailAddress::new("a@example.com"),
                    MailAddress {
                        email: "b@example.com".into(),
                        name: Some("Bee".into()),
                    },
                ],
                cc: vec![MailAddress::new("c@example.com")],
                html_content: "<p>hi</p>".into(),
                subject: "hello".into(),
                ..Default::default()
            },
            Utc::now(),
        );

        let form = provider().form(&mail);
        assert!(form.contains(&("from", "Central <noreply@example.com>".to_string())));
        assert!(form.contains(&("to", "a@example.com, Bee <b@example.com>".to_string())));
        assert!(form.contains(&("cc", "c@example.com".to_string())));
        assert!(!form.iter().any(|(k, _)| *k == "bcc"));
    }
}
