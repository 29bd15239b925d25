use crate::domain::card::Card;
use crate::domain::money::MinorUnits;
use crate::domain::wallet::{Entry, Wallet};
use crate::error::{Result, SpendError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
    Abandoned,
}

impl TransactionStatus {
    /// Only pending records move, and only once.
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        self == TransactionStatus::Pending && next != TransactionStatus::Pending
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Channel {
    Web,
    Pos,
    Atm,
}

impl FromStr for Channel {
    type Err = SpendError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "web" => Ok(Channel::Web),
            "pos" => Ok(Channel::Pos),
            "atm" => Ok(Channel::Atm),
            "" => Err(SpendError::InvalidWebhook("invalid channel".to_string())),
            other => Err(SpendError::InvalidWebhook(format!(
                "unsupported channel {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Web => write!(f, "WEB"),
            Channel::Pos => write!(f, "POS"),
            Channel::Atm => write!(f, "ATM"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Withdrawal,
    Fee,
    Card,
    Shipping,
    Refund,
    Cashback,
    Interest,
}

/// Immutable-ish audit record of one balance movement.
///
/// Exactly one of `debit` and `credit` is non-zero, matching `entry`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub company_id: Uuid,
    pub wallet_id: Uuid,
    pub card_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub partner_card_id: Option<String>,
    pub debit: MinorUnits,
    pub credit: MinorUnits,
    pub entry: Entry,
    pub status: TransactionStatus,
    pub channel: Channel,
    pub r#type: TransactionType,
    /// Partner event id correlating confirmations and failures to the original.
    pub reference_id: Option<String>,
    /// Set on refunds, pointing at the reversed transaction.
    pub parent_id: Option<Uuid>,
    /// Manual hold, independent of `status`.
    pub lock: bool,
    pub note: String,
    pub receipt: Option<String>,
    pub expense_category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Transaction {
    fn new(
        wallet: &Wallet,
        entry: Entry,
        amount: MinorUnits,
        r#type: TransactionType,
        channel: Channel,
        status: TransactionStatus,
    ) -> Self {
        let now = Utc::now();
        let (debit, credit) = match entry {
            Entry::Debit => (amount, MinorUnits::ZERO),
            Entry::Credit => (MinorUnits::ZERO, amount),
        };
        Self {
            id: Uuid::new_v4(),
            company_id: wallet.company_id,
            wallet_id: wallet.id,
            card_id: None,
            customer_id: None,
            partner_card_id: None,
            debit,
            credit,
            entry,
            status,
            channel,
            r#type,
            reference_id: None,
            parent_id: None,
            lock: false,
            note: String::new(),
            receipt: None,
            expense_category: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn debit(
        wallet: &Wallet,
        amount: MinorUnits,
        r#type: TransactionType,
        channel: Channel,
        status: TransactionStatus,
    ) -> Self {
        Self::new(wallet, Entry::Debit, amount, r#type, channel, status)
    }

    pub fn credit(
        wallet: &Wallet,
        amount: MinorUnits,
        r#type: TransactionType,
        channel: Channel,
        status: TransactionStatus,
    ) -> Self {
        Self::new(wallet, Entry::Credit, amount, r#type, channel, status)
    }

    /// Builds the compensating refund for this debit.
    pub fn refund(&self) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            debit: MinorUnits::ZERO,
            credit: self.debit,
            entry: Entry::Credit,
            status: TransactionStatus::Success,
            r#type: TransactionType::Refund,
            parent_id: Some(self.id),
            lock: false,
            note: format!("{} was refunded for failed transaction", self.debit),
            receipt: None,
            expense_category: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            ..self.clone()
        }
    }

    pub fn with_card(mut self, card: &Card) -> Self {
        self.card_id = Some(card.id);
        self.customer_id = Some(card.customer_id);
        self.partner_card_id = Some(card.partner_card_id.clone());
        self
    }

    pub fn with_reference(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// The amount moved, regardless of side.
    pub fn amount(&self) -> MinorUnits {
        match self.entry {
            Entry::Debit => self.debit,
            Entry::Credit => self.credit,
        }
    }

    pub fn transition(&mut self, next: TransactionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(SpendError::ValidationError(format!(
                "transaction {} cannot move from {:?} to {:?}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> Wallet {
        Wallet::new(Uuid::new_v4(), "acct", "cust")
    }

    #[test]
    fn test_debit_and_credit_are_mutually_exclusive() {
        let wallet = wallet();
        let debit = Transaction::debit(
            &wallet,
            MinorUnits(500),
            TransactionType::Fee,
            Channel::Pos,
            TransactionStatus::Pending,
        );
        assert_eq!(debit.debit, MinorUnits(500));
        assert_eq!(debit.credit, MinorUnits::ZERO);
        assert_eq!(debit.entry, Entry::Debit);

        let credit = Transaction::credit(
            &wallet,
            MinorUnits(500),
            TransactionType::Cashback,
            Channel::Web,
            TransactionStatus::Success,
        );
        assert_eq!(credit.debit, MinorUnits::ZERO);
        assert_eq!(credit.credit, MinorUnits(500));
        assert_eq!(credit.amount(), MinorUnits(500));
    }

    #[test]
    fn test_refund_points_at_parent() {
        let wallet = wallet();
        let original = Transaction::debit(
            &wallet,
            MinorUnits(10_000),
            TransactionType::Withdrawal,
            Channel::Atm,
            TransactionStatus::Pending,
        )
        .with_reference("evt_1");

        let refund = original.refund();
        assert_ne!(refund.id, original.id);
        assert_eq!(refund.parent_id, Some(original.id));
        assert_eq!(refund.r#type, TransactionType::Refund);
        assert_eq!(refund.entry, Entry::Credit);
        assert_eq!(refund.status, TransactionStatus::Success);
        assert_eq!(refund.credit, MinorUnits(10_000));
        assert_eq!(refund.debit, MinorUnits::ZERO);
        assert_eq!(refund.reference_id.as_deref(), Some("evt_1"));
        assert_eq!(refund.channel, Channel::Atm);
    }

    #[test]
    fn test_status_transitions() {
        let wallet = wallet();
        let mut tx = Transaction::debit(
            &wallet,
            MinorUnits(1),
            TransactionType::Withdrawal,
            Channel::Web,
            TransactionStatus::Pending,
        );
        assert!(tx.transition(TransactionStatus::Pending).is_err());
        tx.transition(TransactionStatus::Success).unwrap();
        assert!(tx.transition(TransactionStatus::Failed).is_err());
        assert_eq!(tx.status, TransactionStatus::Success);
    }

    #[test]
    fn test_channel_parsing() {
        assert_eq!(" pos ".parse::<Channel>().unwrap(), Channel::Pos);
        assert_eq!("WEB".parse::<Channel>().unwrap(), Channel::Web);
        assert_eq!("atm".parse::<Channel>().unwrap(), Channel::Atm);
        assert!(matches!(
            "".parse::<Channel>(),
            Err(SpendError::InvalidWebhook(_))
        ));
        assert!(matches!(
            "mobile".parse::<Channel>(),
            Err(SpendError::InvalidWebhook(_))
        ));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TransactionStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
        let json = serde_json::to_string(&TransactionType::Withdrawal).unwrap();
        assert_eq!(json, "\"WITHDRAWAL\"");
    }
}
