//! Values exchanged with the card-issuing partner.

use crate::domain::card::{CardStatus, CardType, SpendingControls};
use crate::domain::company::Address;
use serde::{Deserialize, Serialize};

/// Cardholder details submitted for the partner's KYC.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct CustomerProfile {
    pub company_name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub status: CardStatus,
    pub billing_address: Address,
}

impl CustomerProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Customer as the card partner returns it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PartnerCustomer {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub billing_address: Address,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct PartnerCardRequest {
    pub customer_id: String,
    pub r#type: CardType,
    pub brand: String,
    pub status: CardStatus,
    /// Pool-drawn PAN, physical cards only.
    pub number: Option<String>,
    pub spending_controls: SpendingControls,
}

/// Card as the card partner returns it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PartnerCard {
    #[serde(rename = "_id")]
    pub id: String,
    pub brand: String,
    pub currency: String,
    pub masked_pan: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub status: CardStatus,
    #[serde(default)]
    pub spending_controls: SpendingControls,
}

/// Normalizes a brand name the way the partner expects it ("verve" -> "Verve").
pub fn capitalize_brand(brand: &str) -> String {
    let lower = brand.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
