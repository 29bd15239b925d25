//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through the environment variable named next to
//! it. The argument groups convert into the typed configuration the services consume.

use crate::domain::ports::LockPolicy;
use crate::infrastructure::partner_http::{FinancialDataConfig, PartnerConfig};
use clap::{Args, ValueEnum};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LockMode {
    /// Fail immediately when another mutation holds the wallet.
    #[default]
    Nowait,
    /// Queue behind the holder up to the lock timeout.
    Wait,
}

#[derive(Debug, Clone, Args)]
pub struct TelemetryArgs {
    /// Log output format. Logs go to stderr; filtering follows RUST_LOG.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Args)]
pub struct LedgerArgs {
    /// How a contended wallet lock is handled.
    #[arg(long, env = "WALLET_LOCK_POLICY", value_enum, default_value_t = LockMode::Nowait)]
    pub lock_policy: LockMode,

    /// Upper bound on the wait under `--lock-policy wait`.
    #[arg(long, env = "WALLET_LOCK_TIMEOUT_MS", default_value_t = 250)]
    pub lock_timeout_ms: u64,
}

impl LedgerArgs {
    pub fn lock_policy(&self) -> LockPolicy {
        match self.lock_policy {
            LockMode::Nowait => LockPolicy::NoWait,
            LockMode::Wait => LockPolicy::Wait {
                timeout: Duration::from_millis(self.lock_timeout_ms),
            },
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct CardPartnerArgs {
    #[arg(long, env = "CARD_PARTNER_BASE_URL", default_value = "http://localhost:8081")]
    pub card_partner_url: String,

    #[arg(long, env = "CARD_PARTNER_API_KEY", default_value = "", hide_env_values = true)]
    pub card_partner_api_key: String,

    /// Funding source every issued card draws from.
    #[arg(long, env = "CARD_PARTNER_FUNDING_SOURCE", default_value = "")]
    pub funding_source: String,

    #[arg(long, env = "CARD_PARTNER_CURRENCY", default_value = "NGN")]
    pub currency: String,

    #[arg(long, env = "PARTNER_TIMEOUT_SECS", default_value_t = 10)]
    pub card_partner_timeout_secs: u64,
}

impl From<CardPartnerArgs> for PartnerConfig {
    fn from(args: CardPartnerArgs) -> Self {
        Self {
            base_url: args.card_partner_url,
            api_key: args.card_partner_api_key,
            funding_source: args.funding_source,
            currency: args.currency,
            timeout: Duration::from_secs(args.card_partner_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct FinancialDataArgs {
    #[arg(long, env = "FINANCIAL_DATA_BASE_URL", default_value = "http://localhost:8082")]
    pub financial_data_url: String,

    #[arg(long, env = "FINANCIAL_DATA_SECRET_KEY", default_value = "", hide_env_values = true)]
    pub financial_data_secret: String,

    #[arg(long, env = "PARTNER_TIMEOUT_SECS", default_value_t = 10)]
    pub financial_data_timeout_secs: u64,
}

impl From<FinancialDataArgs> for FinancialDataConfig {
    fn from(args: FinancialDataArgs) -> Self {
        Self {
            base_url: args.financial_data_url,
            secret_key: args.financial_data_secret,
            timeout: Duration::from_secs(args.financial_data_timeout_secs),
        }
    }
}
