//! ModerationSink implementations.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{MailAddress, MailingInput};
use crate::mailing::MailService;
use crate::ports::{GatewayError, ModerationReport, ModerationSink};

/// Mails every report to the moderation address through the mailing queue.
pub struct MailModerationSink {
    mail: Arc<MailService>,
    moderator: MailAddress,
}

impl MailModerationSink {
    pub fn new(mail: Arc<MailService>, moderator_email: impl Into<String>) -> Self {
        Self {
            mail,
            moderator: MailAddress::new(moderator_email),
        }
    }

    fn input(&self, report: &ModerationReport) -> MailingInput {
        let node = &report.node;
        let html_content = format!(
            "<p>A secret message has been reported.</p>\
             <ul>\
             <li>Reporter: {}</li>\
             <li>Session: {}</li>\
             <li>Message ID: {}</li>\
             <li>Sent at: {}</li>\
             </ul>\
             <p>Message:</p><blockquote>{}</blockquote>",
            report.reporter,
            node.session_id,
            node.id,
            node.created_at.to_rfc3339(),
            node.text,
        );
        MailingInput {
            to: vec![self.moderator.clone()],
            html_content,
            subject: format!("[Report] secret message {}", node.id),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ModerationSink for MailModerationSink {
    async fn submit(&self, report: &ModerationReport) -> Result<(), GatewayError> {
        self.mail
            .enqueue(self.input(report))
            .await
            .map(|mail| {
                tracing::info!(mail_id = %mail.id, node_id = report.node.id, "report mailed to moderation");
            })
            .map_err(|e| GatewayError::Api(e.to_string()))
    }
}

/// Only logs reports; used when no moderation address is configured.
#[derive(Debug, Default)]
pub struct LogModerationSink;

#[async_trait]
impl ModerationSink for LogModerationSink {
    async fn submit(&self, report: &ModerationReport) -> Result<(), GatewayError> {
        tracing::warn!(
            node_id = report.node.id,
            session_id = %report.node.session_id,
            reporter = report.reporter,
            "secret message reported"
        );
        Ok(())
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct RecordingModerationSink {
    reports: Mutex<Vec<ModerationReport>>,
}

impl RecordingModerationSink {
    pub fn reports(&self) -> Vec<ModerationReport> {
        self.reports
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ModerationSink for RecordingModerationSink {
    async fn submit(&self, report: &ModerationReport) -> Result<(), GatewayError> {
        self.reports
            .lock()
            .map_err(|_| GatewayError::Transport("poisoned".into()))?
            .push(report.clone());
        Ok(())
    }
}
