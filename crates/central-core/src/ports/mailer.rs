//! MailProvider port - 外部メール配信サービス

use async_trait::async_trait;

use crate::domain::Mail;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailError {
    /// Switched off by configuration; the failover chain moves on.
    #[error("{0} is not activated by configuration")]
    NotActivated(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider rejected the mail with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Returns the provider's raw response detail on success.
    async fn send_email(&self, mail: &Mail) -> Result<String, MailError>;

    /// Signature recorded in the mail metadata.
    fn name(&self) -> &str;
}
