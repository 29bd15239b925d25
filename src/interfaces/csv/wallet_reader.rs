use crate::error::{Result, SpendError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use uuid::Uuid;

/// A wallet to seed: the company, its partner references and an opening limit in major units.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct WalletRecord {
    pub company_id: Uuid,
    pub account_id: String,
    pub customer_id: String,
    #[serde(default)]
    pub credit_limit: Decimal,
}

pub struct WalletReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> WalletReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn wallets(self) -> impl Iterator<Item = Result<WalletRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(SpendError::from))
    }
}
