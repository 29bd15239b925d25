use crate::domain::money::MinorUnits;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SpendError {
    #[error("Insufficient credit: available {available}, requested {requested}")]
    InsufficientCredit {
        available: MinorUnits,
        requested: MinorUnits,
    },
    #[error("Wallet {0} is being mutated by another request")]
    LockContention(Uuid),
    #[error("Prerequisite missing: {0}")]
    PrerequisiteMissing(String),
    #[error("Partner error: {0}")]
    PartnerError(String),
    #[error("No PAN available in the pool")]
    PanExhausted,
    #[error("KYC mismatch: registry returned {returned:?}, expected {expected:?}")]
    KycMismatch { expected: String, returned: String },
    #[error("Invalid financials: {0}")]
    InvalidFinancials(String),
    #[error("Invalid years of operation: {0}")]
    InvalidOperationYears(i32),
    #[error("Invalid webhook: {0}")]
    InvalidWebhook(String),
    #[error("Card {0} is locked or not active")]
    CardUnavailable(Uuid),
    #[error("Wallet {0} is inactive")]
    WalletInactive(Uuid),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Issuance {issuance} requires manual reconciliation: {reason}")]
    ReconciliationRequired { issuance: Uuid, reason: String },
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl SpendError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Business declines. Callers answer these with a "declined" response and never retry.
    pub fn is_decline(&self) -> bool {
        matches!(
            self,
            Self::InsufficientCredit { .. } | Self::CardUnavailable(_) | Self::WalletInactive(_)
        )
    }

    /// Transient failures a caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockContention(_))
    }

    /// Conditions that need an operator.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ReconciliationRequired { .. })
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for SpendError {
    fn from(err: rocksdb::Error) -> Self {
        SpendError::InternalError(Box::new(err))
    }
}

impl From<reqwest::Error> for SpendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SpendError::PartnerError(format!("request timed out: {err}"))
        } else {
            SpendError::PartnerError(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, SpendError>;
