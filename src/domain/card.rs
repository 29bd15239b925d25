use crate::domain::company::Address;
use crate::error::{Result, SpendError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Physical,
    Virtual,
}

impl FromStr for CardType {
    type Err = SpendError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "physical" => Ok(CardType::Physical),
            "virtual" => Ok(CardType::Virtual),
            other => Err(SpendError::ValidationError(format!(
                "invalid card type {other:?}"
            ))),
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardType::Physical => write!(f, "physical"),
            CardType::Virtual => write!(f, "virtual"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    #[default]
    Active,
    Inactive,
    Cancelled,
}

impl FromStr for CardStatus {
    type Err = SpendError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(CardStatus::Active),
            "inactive" => Ok(CardStatus::Inactive),
            "cancelled" | "canceled" => Ok(CardStatus::Cancelled),
            other => Err(SpendError::ValidationError(format!(
                "invalid status {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
pub struct Channels {
    pub atm: bool,
    pub pos: bool,
    pub web: bool,
    pub mobile: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpendingInterval {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
    PerAuthorization,
    AllTime,
}

/// Spend cap per interval, in major units as the partner expresses it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
pub struct SpendingLimit {
    pub amount: i64,
    pub interval: SpendingInterval,
}

/// Spending controls mirrored from the card partner.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
pub struct SpendingControls {
    pub channels: Channels,
    pub spending_limit: SpendingLimit,
}

/// Partial update of a card's status and spending controls.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct CardUpdate {
    pub status: Option<CardStatus>,
    pub limit_amount: Option<i64>,
    pub limit_interval: Option<SpendingInterval>,
    pub atm: Option<bool>,
    pub pos: Option<bool>,
    pub web: Option<bool>,
}

impl CardUpdate {
    pub fn is_empty(&self) -> bool {
        self == &CardUpdate::default()
    }
}

/// One issued payment instrument.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Card {
    pub id: Uuid,
    pub company_id: Uuid,
    pub wallet_id: Uuid,
    pub customer_id: Uuid,
    pub partner_customer_id: String,
    /// External id at the card partner, unique.
    pub partner_card_id: String,
    pub r#type: CardType,
    pub brand: String,
    pub currency: String,
    pub masked_pan: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub status: CardStatus,
    /// Manual hold, independent of `status`.
    pub lock: bool,
    pub summary: String,
    pub spending_controls: SpendingControls,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Card {
    /// Whether the card may be used for a new authorization.
    pub fn can_spend(&self) -> bool {
        !self.lock && self.status == CardStatus::Active && self.deleted_at.is_none()
    }

    /// Merges a patch into the card. Returns the merged controls.
    pub fn apply_update(&mut self, update: &CardUpdate) -> SpendingControls {
        if let Some(status) = update.status {
            self.status = status;
        }
        let controls = &mut self.spending_controls;
        if let Some(amount) = update.limit_amount {
            controls.spending_limit.amount = amount;
        }
        if let Some(interval) = update.limit_interval {
            controls.spending_limit.interval = interval;
        }
        if let Some(atm) = update.atm {
            controls.channels.atm = atm;
        }
        if let Some(pos) = update.pos {
            controls.channels.pos = pos;
        }
        if let Some(web) = update.web {
            controls.channels.web = web;
        }
        self.updated_at = Utc::now();
        self.spending_controls
    }
}

/// Local mirror of the cardholder profile created at the partner.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Customer {
    pub id: Uuid,
    pub company_id: Uuid,
    pub wallet_id: Uuid,
    pub partner_customer_id: String,
    pub billing_address: Address,
    pub created_at: DateTime<Utc>,
}

/// Pre-provisioned physical card number.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Pan {
    pub id: Uuid,
    pub number: String,
    pub available: bool,
}

impl Pan {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: number.into(),
            available: true,
        }
    }
}
