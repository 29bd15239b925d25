//! Credit scoring from external financial signals.
//!
//! Five signals are scored independently and summed. Every input is validated before the
//! wallet is touched, so a rejected run never leaves a partial limit behind.

use crate::application::ledger::WalletLedger;
use crate::domain::financials::{BalanceSnapshot, BankTransaction, DateRange, UnderwritingResult};
use crate::domain::ports::{DirectoryRef, FinancialDataPartnerRef};
use crate::error::{Result, SpendError};
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, instrument};
use uuid::Uuid;

/// Minimum score that earns a credit limit.
pub const QUALIFYING_POINTS: u32 = 10;
/// Share of the average cash balance granted as credit.
pub const LIMIT_RATIO: Decimal = dec!(0.70);

const CASH_BALANCE_THRESHOLD: Decimal = dec!(1_000_000);

pub fn cash_balance_points(average_balance: Decimal) -> u32 {
    match average_balance.cmp(&CASH_BALANCE_THRESHOLD) {
        std::cmp::Ordering::Less => 1,
        std::cmp::Ordering::Equal => 3,
        std::cmp::Ordering::Greater => 5,
    }
}

/// Scores the earnings-to-spend ratio. A debit-heavy account scores higher.
pub fn ei_points(total_credit: Decimal, total_debit: Decimal) -> Result<u32> {
    if total_credit < Decimal::ONE || total_debit < Decimal::ONE {
        return Err(SpendError::InvalidFinancials(format!(
            "credit {total_credit} and debit {total_debit} must both be at least 1"
        )));
    }
    let ratio = total_credit / total_debit * Decimal::ONE_HUNDRED;
    Ok(if ratio >= dec!(60) {
        0
    } else if ratio >= dec!(50) {
        3
    } else {
        5
    })
}

/// Scores the operational cash-flow ratio `(credit + average balance) / debit`.
pub fn wellness_points(
    total_credit: Decimal,
    average_balance: Decimal,
    total_debit: Decimal,
) -> u32 {
    let ratio = (total_credit + average_balance) / total_debit;
    if ratio < Decimal::ONE {
        0
    } else if ratio <= dec!(1.5) {
        3
    } else {
        5
    }
}

pub fn years_points(years: i32) -> Result<u32> {
    match years {
        i32::MIN..=0 => Err(SpendError::InvalidOperationYears(years)),
        1..=2 => Ok(1),
        3..=5 => Ok(3),
        _ => Ok(5),
    }
}

pub fn credit_limit_for(total_point: u32, average_balance: Decimal) -> Decimal {
    if total_point >= QUALIFYING_POINTS {
        average_balance * LIMIT_RATIO
    } else {
        Decimal::ZERO
    }
}

fn average_balance(snapshots: &[BalanceSnapshot]) -> Result<Decimal> {
    if snapshots.is_empty() {
        return Err(SpendError::InvalidFinancials(
            "no cash balance history in the scoring window".to_string(),
        ));
    }
    let total: Decimal = snapshots.iter().map(|s| s.bank_balance).sum();
    Ok(total / Decimal::from(snapshots.len()))
}

fn totals(history: &[BankTransaction]) -> (Decimal, Decimal) {
    history.iter().fold((Decimal::ZERO, Decimal::ZERO), |(credit, debit), t| {
        (credit + t.credit, debit + t.debit)
    })
}

#[derive(Clone)]
pub struct UnderwritingEngine {
    directory: DirectoryRef,
    partner: FinancialDataPartnerRef,
    ledger: WalletLedger,
}

impl UnderwritingEngine {
    pub fn new(
        directory: DirectoryRef,
        partner: FinancialDataPartnerRef,
        ledger: WalletLedger,
    ) -> Self {
        Self {
            directory,
            partner,
            ledger,
        }
    }

    pub async fn run_underwriting(&self, company_id: Uuid) -> Result<UnderwritingResult> {
        self.run_underwriting_on(company_id, Utc::now().date_naive())
            .await
    }

    /// Scores the company as of `today` and, when it qualifies, writes the new limit.
    ///
    /// Below [`QUALIFYING_POINTS`] the wallet keeps its current limit and a zero limit is
    /// reported.
    #[instrument(skip(self))]
    pub async fn run_underwriting_on(
        &self,
        company_id: Uuid,
        today: NaiveDate,
    ) -> Result<UnderwritingResult> {
        let company = self
            .directory
            .company(company_id)
            .await?
            .ok_or_else(|| SpendError::PrerequisiteMissing("company".to_string()))?;
        let profile = self
            .directory
            .company_profile(company_id)
            .await?
            .ok_or_else(|| SpendError::PrerequisiteMissing("company profile".to_string()))?;
        let wallet = self
            .ledger
            .wallet_for_company(company_id)
            .await?
            .ok_or_else(|| SpendError::PrerequisiteMissing("wallet".to_string()))?;

        let registered = self
            .partner
            .rc_verify(&company.name, &profile.rc_number)
            .await?;
        if !registered.trim().eq_ignore_ascii_case(company.name.trim()) {
            return Err(SpendError::KycMismatch {
                expected: company.name,
                returned: registered,
            });
        }

        let window = DateRange::trailing_window(today);
        let balances = self
            .partner
            .cash_balance_history(&wallet.account_id, window)
            .await?;
        let average = average_balance(&balances)?;
        let history = self
            .partner
            .transaction_history(&wallet.customer_id, window)
            .await?;
        let (total_credit, total_debit) = totals(&history);

        let cash = cash_balance_points(average);
        let ei = ei_points(total_credit, total_debit)?;
        let wellness = wellness_points(total_credit, average, total_debit);
        let years = years_points(today.year() - profile.incorporation_year)?;
        let total_point = cash + ei + wellness + years;

        let credit_limit = credit_limit_for(total_point, average);
        if total_point >= QUALIFYING_POINTS {
            self.ledger.set_credit_limit(wallet.id, credit_limit).await?;
        }

        info!(cash, ei, wellness, years, total_point, %credit_limit, "underwriting scored");
        Ok(UnderwritingResult {
            credit_limit,
            total_point,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_balance_bands() {
        assert_eq!(cash_balance_points(dec!(999_999.99)), 1);
        assert_eq!(cash_balance_points(dec!(1_000_000)), 3);
        assert_eq!(cash_balance_points(dec!(1_000_000.01)), 5);
    }

    #[test]
    fn test_ei_bands() {
        assert_eq!(ei_points(dec!(60), dec!(100)).unwrap(), 0);
        assert_eq!(ei_points(dec!(59.5), dec!(100)).unwrap(), 3);
        assert_eq!(ei_points(dec!(50), dec!(100)).unwrap(), 3);
        assert_eq!(ei_points(dec!(49), dec!(100)).unwrap(), 5);
        assert!(matches!(
            ei_points(dec!(0.5), dec!(100)),
            Err(SpendError::InvalidFinancials(_))
        ));
        assert!(matches!(
            ei_points(dec!(100), dec!(0)),
            Err(SpendError::InvalidFinancials(_))
        ));
    }

    #[test]
    fn test_wellness_bands() {
        assert_eq!(wellness_points(dec!(50), dec!(40), dec!(100)), 0);
        assert_eq!(wellness_points(dec!(50), dec!(50), dec!(100)), 3);
        assert_eq!(wellness_points(dec!(100), dec!(50), dec!(100)), 3);
        assert_eq!(wellness_points(dec!(100), dec!(51), dec!(100)), 5);
    }

    #[test]
    fn test_years_bands() {
        assert!(matches!(
            years_points(0),
            Err(SpendError::InvalidOperationYears(0))
        ));
        assert!(years_points(-3).is_err());
        assert_eq!(years_points(1).unwrap(), 1);
        assert_eq!(years_points(2).unwrap(), 1);
        assert_eq!(years_points(3).unwrap(), 3);
        assert_eq!(years_points(5).unwrap(), 3);
        assert_eq!(years_points(6).unwrap(), 5);
    }

    #[test]
    fn test_credit_limit_threshold() {
        assert_eq!(credit_limit_for(9, dec!(2_000_000)), Decimal::ZERO);
        assert_eq!(credit_limit_for(10, dec!(2_000_000)), dec!(1_400_000));
    }

    #[test]
    fn test_average_requires_history() {
        assert!(average_balance(&[]).is_err());
        let snapshots = [
            BalanceSnapshot {
                bank_balance: dec!(100),
            },
            BalanceSnapshot {
                bank_balance: dec!(300),
            },
        ];
        assert_eq!(average_balance(&snapshots).unwrap(), dec!(200));
    }
}
