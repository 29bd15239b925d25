use crate::domain::card::CardType;
use crate::domain::money::MinorUnits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Progress of a card issuance through its external and local steps.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum IssuanceState {
    /// Validated and priced, nothing created at the partner yet.
    Started,
    /// The partner issued the card; the wallet has not been charged.
    PartnerCreated,
    /// The wallet was charged; the local card row may be missing.
    Debited,
    Completed,
    /// Aborted before anything irreversible happened.
    Failed,
    /// Rolled back: partner card cancelled and any charge refunded.
    Compensated,
    /// Rollback failed, needs an operator or the reconciliation job.
    CompensationFailed,
}

impl IssuanceState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            IssuanceState::Completed | IssuanceState::Failed | IssuanceState::Compensated
        )
    }
}

/// Durable saga record written before the first partner call.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct PendingIssuance {
    pub id: Uuid,
    pub company_id: Uuid,
    pub wallet_id: Uuid,
    pub card_type: CardType,
    pub total_charge: MinorUnits,
    pub state: IssuanceState,
    pub partner_customer_id: Option<String>,
    pub partner_card_id: Option<String>,
    pub pan_number: Option<String>,
    pub card_id: Option<Uuid>,
    /// Whether `total_charge` is currently debited from the wallet.
    pub charged: bool,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PendingIssuance {
    pub fn start(
        company_id: Uuid,
        wallet_id: Uuid,
        card_type: CardType,
        total_charge: MinorUnits,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            company_id,
            wallet_id,
            card_type,
            total_charge,
            state: IssuanceState::Started,
            partner_customer_id: None,
            partner_card_id: None,
            pan_number: None,
            card_id: None,
            charged: false,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn advance(&mut self, state: IssuanceState) {
        self.state = state;
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, state: IssuanceState, error: impl ToString) {
        self.last_error = Some(error.to_string());
        self.advance(state);
    }

    pub fn mark_debited(&mut self) {
        self.charged = true;
        self.advance(IssuanceState::Debited);
    }

    pub fn mark_refunded(&mut self) {
        self.charged = false;
        self.updated_at = Utc::now();
    }

    /// Whether the wallet was charged and not yet refunded.
    pub fn is_charged(&self) -> bool {
        self.charged
    }
}
