//! Inputs pulled from the financial-data partner for underwriting.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// From seven months before `today` to one month before it.
    pub fn trailing_window(today: NaiveDate) -> Self {
        Self {
            from: today
                .checked_sub_months(Months::new(7))
                .unwrap_or(NaiveDate::MIN),
            to: today
                .checked_sub_months(Months::new(1))
                .unwrap_or(NaiveDate::MIN),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct BalanceSnapshot {
    pub bank_balance: Decimal,
}

/// One side may be missing from the partner's row; it reads as zero.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(default)]
pub struct BankTransaction {
    pub credit: Decimal,
    pub debit: Decimal,
}

/// Result handed back to the caller; the per-signal scores are not persisted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct UnderwritingResult {
    /// Major units.
    pub credit_limit: Decimal,
    pub total_point: u32,
}
