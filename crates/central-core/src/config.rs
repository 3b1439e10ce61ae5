//! Worker service configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! runnable in-process worker. Per-task policy overrides are keyed by the
//! task routing string:
//!
//! ```toml
//! [worker]
//! concurrency = 10
//!
//! [tasks."task:mailing"]
//! max_retry = 5
//! timeout_secs = 5
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CentralError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Policy overrides keyed by routing string.
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskPolicyConfig>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub secret_messaging: SecretMessagingConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub siakad: SiakadConfig,
}

impl AppConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CentralError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| CentralError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.worker.health_check_interval_secs == 0 {
            return Err(CentralError::Config(
                "worker.health_check_interval_secs must be at least 1".into(),
            ));
        }
        let ttl = self.secret_messaging.session_ttl_hours;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&ttl) {
            return Err(CentralError::Config(format!(
                "secret_messaging.session_ttl_hours must be between 1 and {MAX_SESSION_TTL_HOURS}, got {ttl}"
            )));
        }
        Ok(())
    }
}

/// Upper bound for `secret_messaging.session_ttl_hours` (one year).
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_secs: u64,
    /// Linear backoff step: the n-th retry waits n steps.
    #[serde(default = "default_retry_step")]
    pub retry_step_secs: u64,
    /// Fallback for kinds without a built-in or configured policy.
    #[serde(default = "default_max_retry")]
    pub default_max_retry: u32,
    #[serde(default = "default_timeout")]
    pub default_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            health_check_interval_secs: default_health_check_interval(),
            retry_step_secs: default_retry_step(),
            default_max_retry: default_max_retry(),
            default_timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPolicyConfig {
    pub max_retry: Option<u32>,
    pub timeout_secs: Option<u64>,
    /// Overrides the linear step for this kind only.
    pub retry_step_secs: Option<u64>,
    /// Switches this kind to exponential backoff starting at the step.
    pub backoff_multiplier: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_meme_cron")]
    pub meme_subscription_cron: String,
    #[serde(default = "default_true")]
    pub meme_subscription_enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            meme_subscription_cron: default_meme_cron(),
            meme_subscription_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretMessagingConfig {
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    /// Report acknowledgement TTL; also the callback cache time.
    #[serde(default = "default_report_cache_secs")]
    pub report_cache_secs: u64,
    /// Block-cache TTL; also the callback cache time.
    #[serde(default = "default_block_cache_secs")]
    pub block_cache_secs: u64,
    /// Shared in the invitation text after `/register`.
    #[serde(default)]
    pub bot_start_link: String,
    /// Where user reports are mailed. Reports are only logged when empty.
    #[serde(default)]
    pub moderation_email: String,
}

impl Default for SecretMessagingConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl_hours(),
            report_cache_secs: default_report_cache_secs(),
            block_cache_secs: default_block_cache_secs(),
            bot_start_link: String::new(),
            moderation_email: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_telegram_api")]
    pub api_base_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base_url: default_telegram_api(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailProviderKind {
    /// Formerly Sendinblue; the old name is still accepted.
    #[serde(alias = "sendinblue")]
    Brevo,
    Mailgun,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailProviderConfig {
    pub kind: MailProviderKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    /// Sending domain; Mailgun only.
    #[serde(default)]
    pub domain: String,
    /// Overrides the provider's public API endpoint.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub sender_email: String,
    #[serde(default)]
    pub sender_name: String,
    /// Tried in this order.
    #[serde(default)]
    pub providers: Vec<MailProviderConfig>,
    #[serde(default = "default_provider_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender_email: String::new(),
            sender_name: String::new(),
            providers: Vec::new(),
            request_timeout_secs: default_provider_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiakadConfig {
    #[serde(default = "default_siakad_base_url")]
    pub base_url: String,
    /// The upstream serves a self-signed certificate.
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,
}

impl Default for SiakadConfig {
    fn default() -> Self {
        Self {
            base_url: default_siakad_base_url(),
            accept_invalid_certs: true,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}
fn default_concurrency() -> usize {
    10
}
fn default_health_check_interval() -> u64 {
    180
}
fn default_retry_step() -> u64 {
    60
}
fn default_max_retry() -> u32 {
    5
}
fn default_timeout() -> u64 {
    10
}
fn default_meme_cron() -> String {
    "0 9 * * *".into()
}
fn default_true() -> bool {
    true
}
fn default_session_ttl_hours() -> i64 {
    24
}
fn default_report_cache_secs() -> u64 {
    3600
}
fn default_block_cache_secs() -> u64 {
    86_400
}
fn default_telegram_api() -> String {
    "https://api.telegram.org".into()
}
fn default_provider_timeout() -> u64 {
    10
}
fn default_siakad_base_url() -> String {
    "https://siakadu.unila.ac.id/uploads/fotomhs/".into()
}
