use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MailId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MailStatus {
    OnProgress,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailAddress {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }
}

/// Request body accepted by the mail enqueue path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailingInput {
    pub to: Vec<MailAddress>,
    #[serde(default)]
    pub cc: Vec<MailAddress>,
    #[serde(default)]
    pub bcc: Vec<MailAddress>,
    pub html_content: String,
    pub subject: String,
}

impl MailingInput {
    /// Returns the name of the first missing required field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.to.is_empty() || self.to.iter().any(|a| a.email.trim().is_empty()) {
            return Err("to");
        }
        if self.html_content.trim().is_empty() {
            return Err("html_content");
        }
        if self.subject.trim().is_empty() {
            return Err("subject");
        }
        Ok(())
    }
}

/// Persisted mail record.
///
/// Created by the API path in `OnProgress`; only the update-record task
/// writes `status`, `delivered_at` and `metadata` afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mail {
    pub id: MailId,
    pub to: Vec<MailAddress>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<MailAddress>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<MailAddress>,
    pub html_content: String,
    pub subject: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    pub status: MailStatus,
    /// JSON encoded [`MailResultMetadata`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl Mail {
    pub fn from_input(id: MailId, input: MailingInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            to: input.to,
            cc: input.cc,
            bcc: input.bcc,
            html_content: input.html_content,
            subject: input.subject,
            created_at: now,
            delivered_at: None,
            status: MailStatus::OnProgress,
            metadata: None,
        }
    }

    pub fn recipients(&self) -> Vec<&str> {
        self.to.iter().map(|a| a.email.as_str()).collect()
    }
}

/// Which provider delivered a mail, plus that provider's raw response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailResultMetadata {
    pub detail: String,
    pub signature: String,
}
