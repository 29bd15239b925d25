use crate::domain::money::MinorUnits;
use crate::error::{Result, SpendError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Active,
    Inactive,
}

/// Which side of the wallet a balance mutation lands on.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Entry {
    Debit,
    Credit,
}

/// The revolving credit wallet of one company.
///
/// `total_balance` and `available_credit` are derived fields. They are recomputed by every
/// mutation so that
///
/// ```text
/// total_balance    = current_spending - cash_back_payment + previous_balance
/// available_credit = credit_limit - total_balance
/// ```
///
/// holds for every persisted row.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Wallet {
    pub id: Uuid,
    pub company_id: Uuid,
    /// Ceiling set by underwriting.
    pub credit_limit: MinorUnits,
    /// Balance carried over from the prior billing cycle.
    pub previous_balance: MinorUnits,
    /// Debits accumulated this cycle.
    pub current_spending: MinorUnits,
    /// Credits and refunds accumulated this cycle.
    pub cash_back_payment: MinorUnits,
    pub total_balance: MinorUnits,
    pub available_credit: MinorUnits,
    /// Settlement account reference at the financial-data partner.
    pub account_id: String,
    /// Customer reference at the financial-data partner.
    pub customer_id: String,
    pub status: WalletStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(
        company_id: Uuid,
        account_id: impl Into<String>,
        customer_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            company_id,
            credit_limit: MinorUnits::ZERO,
            previous_balance: MinorUnits::ZERO,
            current_spending: MinorUnits::ZERO,
            cash_back_payment: MinorUnits::ZERO,
            total_balance: MinorUnits::ZERO,
            available_credit: MinorUnits::ZERO,
            account_id: account_id.into(),
            customer_id: customer_id.into(),
            status: WalletStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == WalletStatus::Active
    }

    /// Recomputes the derived balance fields.
    pub fn recompute(&mut self) {
        self.total_balance = self.current_spending - self.cash_back_payment + self.previous_balance;
        self.available_credit = self.credit_limit - self.total_balance;
    }

    /// Whether the derived fields agree with the stored components.
    pub fn is_consistent(&self) -> bool {
        self.total_balance == self.current_spending - self.cash_back_payment + self.previous_balance
            && self.available_credit == self.credit_limit - self.total_balance
    }

    /// Spends against the wallet. Leaves the wallet untouched on failure.
    pub fn debit(&mut self, amount: MinorUnits) -> Result<()> {
        if !self.is_active() {
            return Err(SpendError::WalletInactive(self.id));
        }
        if self.available_credit <= amount {
            return Err(SpendError::InsufficientCredit {
                available: self.available_credit,
                requested: amount,
            });
        }
        self.current_spending += amount;
        self.touch();
        Ok(())
    }

    /// Credits (cashback, refunds) always apply.
    pub fn credit(&mut self, amount: MinorUnits) {
        self.cash_back_payment += amount;
        self.touch();
    }

    pub fn apply(&mut self, entry: Entry, amount: MinorUnits) -> Result<()> {
        match entry {
            Entry::Debit => self.debit(amount),
            Entry::Credit => {
                self.credit(amount);
                Ok(())
            }
        }
    }

    pub fn set_credit_limit(&mut self, limit: MinorUnits) {
        self.credit_limit = limit;
        self.touch();
    }

    pub fn deactivate(&mut self) {
        self.status = WalletStatus::Inactive;
        self.updated_at = Utc::now();
    }

    fn touch(&mut self) {
        self.recompute();
        self.updated_at = Utc::now();
    }
}
