//! Card partner webhook events.
//!
//! Raw deliveries are decoded into [`WebhookEnvelope`] and then validated into the closed
//! [`WebhookEvent`] set. Anything else is rejected before business logic runs.

use crate::domain::card::CardType;
use crate::domain::transaction::Channel;
use crate::error::{Result, SpendError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const AUTHORIZATION_REQUEST: &str = "authorization.request";
pub const TRANSACTION_CREATED: &str = "transaction.created";

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WebhookEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookData,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WebhookData {
    pub object: WebhookObject,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebhookObject {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub card: Option<PartnerRef>,
    #[serde(default)]
    pub customer: Option<PartnerRef>,
    #[serde(default)]
    pub transaction_metadata: Option<TransactionMetadata>,
    #[serde(default)]
    pub pending_request: Option<PendingRequest>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PartnerRef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransactionMetadata {
    #[serde(default)]
    pub channel: String,
}

/// Requested amount, in major units.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PendingRequest {
    pub amount: Decimal,
}

#[derive(Debug, PartialEq, Clone)]
pub struct AuthorizationRequest {
    /// Partner event id, stored on the resulting transactions as `reference_id`.
    pub reference_id: String,
    pub partner_card_id: String,
    pub card_type: Option<CardType>,
    pub channel: Channel,
    pub amount: Decimal,
}

#[derive(Debug, PartialEq, Clone)]
pub enum WebhookEvent {
    AuthorizationRequest(AuthorizationRequest),
    TransactionApproved { reference_id: String },
    TransactionFailed { reference_id: String },
}

impl WebhookEvent {
    pub fn reference_id(&self) -> &str {
        match self {
            WebhookEvent::AuthorizationRequest(request) => &request.reference_id,
            WebhookEvent::TransactionApproved { reference_id }
            | WebhookEvent::TransactionFailed { reference_id } => reference_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WebhookEvent::AuthorizationRequest(_) => "authorization.request",
            WebhookEvent::TransactionApproved { .. } => "transaction.approved",
            WebhookEvent::TransactionFailed { .. } => "transaction.failed",
        }
    }

    /// Key under which a delivery is de-duplicated.
    pub fn dedupe_key(&self) -> String {
        format!("{}:{}", self.kind(), self.reference_id())
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let envelope: WebhookEnvelope = serde_json::from_str(raw)
            .map_err(|e| SpendError::InvalidWebhook(format!("malformed payload: {e}")))?;
        Self::try_from(envelope)
    }
}

impl TryFrom<WebhookEnvelope> for WebhookEvent {
    type Error = SpendError;

    fn try_from(envelope: WebhookEnvelope) -> Result<Self> {
        let reference_id = envelope.id.trim().to_string();
        if reference_id.is_empty() {
            return Err(SpendError::InvalidWebhook("missing event id".to_string()));
        }
        let object = envelope.data.object;

        match envelope.kind.trim().to_lowercase().as_str() {
            AUTHORIZATION_REQUEST => {
                let card = object
                    .card
                    .ok_or_else(|| SpendError::InvalidWebhook("missing card".to_string()))?;
                let channel: Channel = object
                    .transaction_metadata
                    .map(|meta| meta.channel)
                    .unwrap_or_default()
                    .parse()?;
                let amount = object
                    .pending_request
                    .map(|pending| pending.amount)
                    .ok_or_else(|| {
                        SpendError::InvalidWebhook("missing pending request".to_string())
                    })?;
                if amount <= Decimal::ZERO {
                    return Err(SpendError::InvalidWebhook(format!(
                        "non-positive amount {amount}"
                    )));
                }
                Ok(WebhookEvent::AuthorizationRequest(AuthorizationRequest {
                    reference_id,
                    partner_card_id: card.id,
                    card_type: card.kind.and_then(|kind| kind.parse().ok()),
                    channel,
                    amount,
                }))
            }
            TRANSACTION_CREATED => {
                let status = object.status.unwrap_or_default();
                match status.trim().to_lowercase().as_str() {
                    "approved" => Ok(WebhookEvent::TransactionApproved { reference_id }),
                    "failed" => Ok(WebhookEvent::TransactionFailed { reference_id }),
                    other => Err(SpendError::InvalidWebhook(format!(
                        "unsupported transaction status {other:?}"
                    ))),
                }
            }
            other => Err(SpendError::InvalidWebhook(format!(
                "unsupported event type {other:?}"
            ))),
        }
    }
}
