use crate::domain::money::MinorUnits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CreditIncreaseStatus {
    Pending,
    Approved,
    Declined,
}

/// A request to raise a wallet's credit limit.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct CreditIncrease {
    pub id: Uuid,
    pub company_id: Uuid,
    pub wallet_id: Uuid,
    pub owner: String,
    /// Limit in force when the request was made.
    pub credit_limit: MinorUnits,
    pub desired_credit_limit: MinorUnits,
    pub reason: String,
    pub status: CreditIncreaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditIncrease {
    pub fn is_outstanding(&self) -> bool {
        self.status == CreditIncreaseStatus::Pending
    }

    pub fn is_approved(&self) -> bool {
        self.status == CreditIncreaseStatus::Approved
    }
}

/// Reviewer edits. `approved` settles the request one way or the other.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct CreditIncreaseReview {
    pub desired_credit_limit: Option<MinorUnits>,
    pub reason: Option<String>,
    pub approved: Option<bool>,
}
