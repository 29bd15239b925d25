use crate::domain::card::CardType;
use crate::domain::transaction::{Channel, TransactionType};
use crate::error::{Result, SpendError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pricing identifiers known to the core.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
pub enum FeeIdentifier {
    #[serde(rename = "ngn-card-both")]
    CardTransaction,
    #[serde(rename = "ngn-card-atm")]
    CardTransactionAtm,
    #[serde(rename = "ngn-card-create")]
    CardCreation,
    #[serde(rename = "ngn-card-shipping")]
    CardShipping,
}

impl FeeIdentifier {
    pub fn as_str(self) -> &'static str {
        match self {
            FeeIdentifier::CardTransaction => "ngn-card-both",
            FeeIdentifier::CardTransactionAtm => "ngn-card-atm",
            FeeIdentifier::CardCreation => "ngn-card-create",
            FeeIdentifier::CardShipping => "ngn-card-shipping",
        }
    }

    /// Fee charged on top of a card authorization.
    pub fn for_channel(channel: Channel) -> Self {
        match channel {
            Channel::Web | Channel::Pos => FeeIdentifier::CardTransaction,
            Channel::Atm => FeeIdentifier::CardTransactionAtm,
        }
    }

    /// Fees charged when issuing a card of the given type.
    pub fn for_issuance(card_type: CardType) -> &'static [FeeIdentifier] {
        match card_type {
            CardType::Virtual => &[FeeIdentifier::CardCreation],
            CardType::Physical => &[FeeIdentifier::CardShipping, FeeIdentifier::CardCreation],
        }
    }

    /// Audit record type written for an issuance fee.
    pub fn issuance_transaction_type(self) -> TransactionType {
        match self {
            FeeIdentifier::CardShipping => TransactionType::Shipping,
            _ => TransactionType::Card,
        }
    }
}

impl fmt::Display for FeeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeeIdentifier {
    type Err = SpendError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ngn-card-both" => Ok(FeeIdentifier::CardTransaction),
            "ngn-card-atm" => Ok(FeeIdentifier::CardTransactionAtm),
            "ngn-card-create" => Ok(FeeIdentifier::CardCreation),
            "ngn-card-shipping" => Ok(FeeIdentifier::CardShipping),
            other => Err(SpendError::ValidationError(format!(
                "unknown fee identifier {other:?}"
            ))),
        }
    }
}

/// Static catalog row. `fee` is a major-unit amount, or a rate when `is_percent` is set.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Fee {
    pub identifier: FeeIdentifier,
    pub channel: String,
    pub fee: Decimal,
    pub is_percent: bool,
    pub is_dollar: bool,
}

impl Fee {
    /// Evaluates the fee against `base`, in major units.
    pub fn charge_on(&self, base: Decimal) -> Decimal {
        if self.is_percent {
            self.percent_of(base)
        } else {
            self.fee
        }
    }

    /// Reads `fee` as a rate regardless of the flags.
    pub fn percent_of(&self, base: Decimal) -> Decimal {
        self.fee / Decimal::ONE_HUNDRED * base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_identifier_selection() {
        assert_eq!(
            FeeIdentifier::for_channel(Channel::Web),
            FeeIdentifier::CardTransaction
        );
        assert_eq!(
            FeeIdentifier::for_channel(Channel::Pos),
            FeeIdentifier::CardTransaction
        );
        assert_eq!(
            FeeIdentifier::for_channel(Channel::Atm),
            FeeIdentifier::CardTransactionAtm
        );
        assert_eq!(
            FeeIdentifier::for_issuance(CardType::Virtual),
            &[FeeIdentifier::CardCreation]
        );
        assert_eq!(FeeIdentifier::for_issuance(CardType::Physical).len(), 2);
    }

    #[test]
    fn test_charge_on() {
        let flat = Fee {
            identifier: FeeIdentifier::CardCreation,
            channel: "web".to_string(),
            fee: dec!(500),
            is_percent: false,
            is_dollar: false,
        };
        assert_eq!(flat.charge_on(dec!(10_000)), dec!(500));

        let percent = Fee {
            identifier: FeeIdentifier::CardTransaction,
            fee: dec!(1.5),
            is_percent: true,
            ..flat
        };
        assert_eq!(percent.charge_on(dec!(2_000)), dec!(30));
    }

    #[test]
    fn test_identifier_round_trip_through_str() {
        for id in [
            FeeIdentifier::CardTransaction,
            FeeIdentifier::CardTransactionAtm,
            FeeIdentifier::CardCreation,
            FeeIdentifier::CardShipping,
        ] {
            assert_eq!(id.as_str().parse::<FeeIdentifier>().unwrap(), id);
        }
        assert!("ngn-card-gold".parse::<FeeIdentifier>().is_err());
    }
}
