use crate::domain::card::CardType;
use crate::domain::fee::{Fee, FeeIdentifier};
use crate::domain::money::MinorUnits;
use crate::domain::ports::FeeCatalogRef;
use crate::domain::transaction::Channel;
use crate::error::{Result, SpendError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Base percentage issuance fees are evaluated against.
///
/// Issuance fees do not depend on what the card later spends, so a percentage row charges
/// its rate of this fixed amount, which equals the raw fee value.
pub const NOMINAL_ISSUANCE_BASE: Decimal = dec!(100);

/// One fee line of a card issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuanceCharge {
    pub identifier: FeeIdentifier,
    pub amount: MinorUnits,
}

/// Read-only view over the fee catalog.
#[derive(Clone)]
pub struct FeeSchedule {
    catalog: FeeCatalogRef,
}

impl FeeSchedule {
    pub fn new(catalog: FeeCatalogRef) -> Self {
        Self { catalog }
    }

    pub async fn resolve(&self, identifier: FeeIdentifier) -> Result<Fee> {
        self.catalog.get(identifier).await?.ok_or_else(|| {
            SpendError::PrerequisiteMissing(format!("fee {identifier} is not configured"))
        })
    }

    pub async fn issuance_charges(&self, card_type: CardType) -> Result<Vec<IssuanceCharge>> {
        let mut charges = Vec::new();
        for &identifier in FeeIdentifier::for_issuance(card_type) {
            let fee = self.resolve(identifier).await?;
            charges.push(IssuanceCharge {
                identifier,
                amount: MinorUnits::from_major(fee.charge_on(NOMINAL_ISSUANCE_BASE))?,
            });
        }
        Ok(charges)
    }

    /// Fee on a card authorization, in major units.
    ///
    /// The catalog value is always read as a rate of the requested amount.
    pub async fn authorization_fee(&self, channel: Channel, amount: Decimal) -> Result<Decimal> {
        let fee = self.resolve(FeeIdentifier::for_channel(channel)).await?;
        Ok(fee.percent_of(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryFeeCatalog;
    use std::sync::Arc;

    fn fee(identifier: FeeIdentifier, value: Decimal, is_percent: bool) -> Fee {
        Fee {
            identifier,
            channel: "web".to_string(),
            fee: value,
            is_percent,
            is_dollar: false,
        }
    }

    fn schedule() -> FeeSchedule {
        FeeSchedule::new(Arc::new(InMemoryFeeCatalog::from_fees([
            fee(FeeIdentifier::CardCreation, dec!(1000), false),
            fee(FeeIdentifier::CardShipping, dec!(2.5), true),
            fee(FeeIdentifier::CardTransaction, dec!(10), true),
            fee(FeeIdentifier::CardTransactionAtm, dec!(1.5), false),
        ])))
    }

    #[tokio::test]
    async fn test_issuance_charges() {
        let schedule = schedule();

        let virtual_charges = schedule.issuance_charges(CardType::Virtual).await.unwrap();
        assert_eq!(
            virtual_charges,
            vec![IssuanceCharge {
                identifier: FeeIdentifier::CardCreation,
                amount: MinorUnits(100_000),
            }]
        );

        let physical = schedule.issuance_charges(CardType::Physical).await.unwrap();
        assert_eq!(physical.len(), 2);
        assert_eq!(physical[0].identifier, FeeIdentifier::CardShipping);
        // percentage rows charge their raw value on the nominal base
        assert_eq!(physical[0].amount, MinorUnits(250));
    }

    #[tokio::test]
    async fn test_authorization_fee_is_a_rate() {
        let schedule = schedule();
        assert_eq!(
            schedule
                .authorization_fee(Channel::Pos, dec!(100))
                .await
                .unwrap(),
            dec!(10)
        );
        assert_eq!(
            schedule
                .authorization_fee(Channel::Atm, dec!(200))
                .await
                .unwrap(),
            dec!(3)
        );
    }

    #[tokio::test]
    async fn test_missing_fee_is_a_prerequisite() {
        let schedule = FeeSchedule::new(Arc::new(InMemoryFeeCatalog::new()));
        assert!(matches!(
            schedule.issuance_charges(CardType::Virtual).await,
            Err(SpendError::PrerequisiteMissing(_))
        ));
    }
}
