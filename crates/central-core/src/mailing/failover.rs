//! Provider failover - 先頭から順に試し、最初に成功した provider の結果を返す
//!
//! サーキットブレーカーは持たない。無効化された provider は毎回
//! NotActivated で失敗し、次の provider に進む。

use std::sync::Arc;

use crate::domain::Mail;
use crate::error::CentralError;
use crate::ports::MailProvider;

/// Which provider accepted a mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub detail: String,
    pub provider: String,
}

pub struct MailFailover {
    providers: Vec<Arc<dyn MailProvider>>,
}

impl MailFailover {
    /// First provider is primary, the rest are fallbacks in order.
    pub fn new(providers: Vec<Arc<dyn MailProvider>>) -> Self {
        Self { providers }
    }

    pub fn chain_len(&self) -> usize {
        self.providers.len()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn send_email(&self, mail: &Mail) -> Result<Delivery, CentralError> {
        let mut failures = Vec::with_capacity(self.providers.len());

        for (idx, provider) in self.providers.iter().enumerate() {
            match provider.send_email(mail).await {
                Ok(detail) => {
                    if idx > 0 {
                        tracing::info!(
                            mail_id = %mail.id,
                            provider = provider.name(),
                            skipped = idx,
                            "mail delivered by fallback provider"
                        );
                    }
                    return Ok(Delivery {
                        detail,
                        provider: provider.name().to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        mail_id = %mail.id,
                        provider = provider.name(),
                        error = %e,
                        "mail provider failed"
                    );
                    failures.push(format!("{}: {e}", provider.name()));
                }
            }
        }

        if failures.is_empty() {
            return Err(CentralError::AllProvidersFailed(
                "no mail provider configured".into(),
            ));
        }
        Err(CentralError::AllProvidersFailed(failures.join("; ")))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::ports::MailError;

    /// Provider with a fixed answer that records what it was asked to send.
    pub struct StubProvider {
        name: String,
        answer: Result<String, MailError>,
        calls: AtomicU32,
        pub sent: Mutex<Vec<Mail>>,
    }

    impl StubProvider {
        pub fn ok(name: &str, detail: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.into(),
                answer: Ok(detail.into()),
                calls: AtomicU32::new(0),
                sent: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(name: &str, error: MailError) -> Arc<Self> {
            Arc::new(Self {
                name: name.into(),
                answer: Err(error),
                calls: AtomicU32::new(0),
                sent: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MailProvider for StubProvider {
        async fn send_email(&self, mail: &Mail) -> Result<String, MailError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sent.lock().unwrap().push(mail.clone());
            self.answer.clone()
        }

        fn name(&self) -> &str {
            &self.name
        }
    }
}
