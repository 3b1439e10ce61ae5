//! Mailing - provider failover and the enqueue use case.

pub mod brevo;
pub mod failover;
pub mod mailgun;
pub mod service;

pub use self::brevo::BrevoProvider;
pub use self::failover::{Delivery, MailFailover};
pub use self::mailgun::MailgunProvider;
pub use self::service::MailService;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{MailConfig, MailProviderKind};
use crate::domain::MailAddress;
use crate::error::CentralError;
use crate::ports::MailProvider;

/// Builds the provider chain in configuration order.
pub fn failover_from_config(config: &MailConfig) -> Result<MailFailover, CentralError> {
    let sender = MailAddress {
        email: config.sender_email.clone(),
        name: (!config.sender_name.is_empty()).then(|| config.sender_name.clone()),
    };
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let mut providers: Vec<Arc<dyn MailProvider>> = Vec::with_capacity(config.providers.len());
    for provider in &config.providers {
        let built: Arc<dyn MailProvider> = match provider.kind {
            MailProviderKind::Brevo => {
                let mut p = BrevoProvider::new(
                    provider.api_key.clone(),
                    sender.clone(),
                    provider.enabled,
                    timeout,
                )?;
                if let Some(url) = &provider.base_url {
                    p = p.with_base_url(url.clone());
                }
                Arc::new(p)
            }
            MailProviderKind::Mailgun => {
                let mut p = MailgunProvider::new(
                    provider.domain.clone(),
                    provider.api_key.clone(),
                    sender.clone(),
                    provider.enabled,
                    timeout,
                )?;
                if let Some(url) = &provider.base_url {
                    p = p.with_base_url(url.clone());
                }
                Arc::new(p)
            }
        };
        tracing::info!(
            provider = built.name(),
            enabled = provider.enabled,
            "mail provider configured"
        );
        providers.push(built);
    }
    Ok(MailFailover::new(providers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn chain_follows_configuration_order() {
        let cfg = AppConfig::from_toml(
            r#"
            [mail]
            sender_email = "noreply@example.com"

            [[mail.providers]]
            kind = "mailgun"
            domain = "mg.example.com"

            [[mail.providers]]
            kind = "sendinblue"
            enabled = false
            "#,
        )
        .unwrap();

        let failover = failover_from_config(&cfg.mail).unwrap();
        assert_eq!(failover.provider_names(), vec!["mailgun", "sendinblue"]);
    }
}
