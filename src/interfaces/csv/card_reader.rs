use crate::domain::card::{Card, CardStatus, CardType, SpendingControls};
use crate::domain::wallet::Wallet;
use crate::error::{Result, SpendError};
use chrono::Utc;
use serde::Deserialize;
use std::io::Read;
use uuid::Uuid;

/// An already-issued card to seed, keyed by its partner id.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct CardRecord {
    pub partner_card_id: String,
    pub company_id: Uuid,
    pub card_type: CardType,
    #[serde(default)]
    pub status: CardStatus,
    #[serde(default)]
    pub lock: bool,
}

impl CardRecord {
    /// Builds the local card attached to `wallet`.
    pub fn into_card(self, wallet: &Wallet) -> Card {
        let now = Utc::now();
        Card {
            id: Uuid::new_v4(),
            company_id: self.company_id,
            wallet_id: wallet.id,
            customer_id: Uuid::new_v4(),
            partner_customer_id: String::new(),
            partner_card_id: self.partner_card_id,
            r#type: self.card_type,
            brand: String::new(),
            currency: String::new(),
            masked_pan: String::new(),
            expiry_month: String::new(),
            expiry_year: String::new(),
            status: self.status,
            lock: self.lock,
            summary: String::new(),
            spending_controls: SpendingControls::default(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

pub struct CardReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CardReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn cards(self) -> impl Iterator<Item = Result<CardRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(SpendError::from))
    }
}
