use crate::domain::wallet::{Wallet, WalletStatus};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;
use uuid::Uuid;

/// Output row of a wallet, amounts in major units.
#[derive(Debug, Serialize)]
struct WalletRow {
    company_id: Uuid,
    credit_limit: Decimal,
    current_spending: Decimal,
    cash_back_payment: Decimal,
    total_balance: Decimal,
    available_credit: Decimal,
    status: WalletStatus,
}

impl From<&Wallet> for WalletRow {
    fn from(wallet: &Wallet) -> Self {
        Self {
            company_id: wallet.company_id,
            credit_limit: wallet.credit_limit.to_major(),
            current_spending: wallet.current_spending.to_major(),
            cash_back_payment: wallet.cash_back_payment.to_major(),
            total_balance: wallet.total_balance.to_major(),
            available_credit: wallet.available_credit.to_major(),
            status: wallet.status,
        }
    }
}

/// Writes final wallet state as CSV.
pub struct WalletWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> WalletWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes one row per wallet, ordered by company id so output is stable.
    pub fn write_wallets(&mut self, mut wallets: Vec<Wallet>) -> Result<()> {
        wallets.sort_by_key(|w| w.company_id);
        for wallet in &wallets {
            self.writer.serialize(WalletRow::from(wallet))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
