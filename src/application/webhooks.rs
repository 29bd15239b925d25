use crate::application::fees::FeeSchedule;
use crate::application::ledger::WalletLedger;
use crate::application::transactions::TransactionLog;
use crate::domain::money::MinorUnits;
use crate::domain::ports::{CardStoreRef, WebhookInboxRef};
use crate::domain::transaction::{Transaction, TransactionStatus, TransactionType};
use crate::domain::wallet::Entry;
use crate::domain::webhook::{AuthorizationRequest, WebhookEvent};
use crate::error::{Result, SpendError};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// What processing a delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The wallet was debited for `amount + fee` and two pending records were written.
    Authorized {
        wallet_id: Uuid,
        amount: MinorUnits,
        fee: MinorUnits,
    },
    /// Pending records under the reference moved to `Success`.
    Settled { transactions: usize },
    /// Pending records moved to `Failed` and were refunded.
    Reversed {
        transactions: usize,
        refunded: MinorUnits,
    },
    /// The delivery was already processed or is being processed.
    Duplicate,
}

/// Drives wallet movements and transaction status from card partner events.
///
/// Each delivery is claimed in the [`WebhookInbox`](crate::domain::ports::WebhookInbox)
/// under its de-duplication key before any effect. A failed delivery releases its claim so
/// the partner's retry is processed again.
#[derive(Clone)]
pub struct WebhookProcessor {
    ledger: WalletLedger,
    fees: FeeSchedule,
    log: TransactionLog,
    cards: CardStoreRef,
    inbox: WebhookInboxRef,
}

impl WebhookProcessor {
    pub fn new(
        ledger: WalletLedger,
        fees: FeeSchedule,
        log: TransactionLog,
        cards: CardStoreRef,
        inbox: WebhookInboxRef,
    ) -> Self {
        Self {
            ledger,
            fees,
            log,
            cards,
            inbox,
        }
    }

    /// Validates a raw JSON delivery and processes it.
    pub async fn process_raw(&self, raw: &str) -> Result<WebhookOutcome> {
        let event = WebhookEvent::from_json(raw)?;
        self.process(event).await
    }

    #[instrument(
        skip(self, event),
        fields(kind = event.kind(), reference_id = event.reference_id())
    )]
    pub async fn process(&self, event: WebhookEvent) -> Result<WebhookOutcome> {
        let key = event.dedupe_key();
        if !self.inbox.begin(&key).await? {
            info!("duplicate delivery ignored");
            return Ok(WebhookOutcome::Duplicate);
        }

        let result = match event {
            WebhookEvent::AuthorizationRequest(request) => self.authorize(request).await,
            WebhookEvent::TransactionApproved { reference_id } => self.settle(&reference_id).await,
            WebhookEvent::TransactionFailed { reference_id } => self.reverse(&reference_id).await,
        };

        match &result {
            Ok(outcome) => {
                self.inbox.complete(&key).await?;
                debug!(?outcome, "delivery processed");
            }
            Err(err) => {
                self.inbox.release(&key).await?;
                if err.is_decline() {
                    info!(%err, "authorization declined");
                } else {
                    warn!(%err, "delivery failed");
                }
            }
        }
        result
    }

    async fn authorize(&self, request: AuthorizationRequest) -> Result<WebhookOutcome> {
        let card = self
            .cards
            .get_by_partner_id(&request.partner_card_id)
            .await?
            .ok_or_else(|| SpendError::not_found("card", &request.partner_card_id))?;
        if !card.can_spend() {
            return Err(SpendError::CardUnavailable(card.id));
        }

        let fee = self
            .fees
            .authorization_fee(request.channel, request.amount)
            .await?;
        let fee = MinorUnits::from_major(fee)?;
        let amount = MinorUnits::positive_from_major(request.amount)?;

        // the hold and its pending records land in one commit, so a retried delivery
        // after a failed write starts from an untouched wallet
        let (wallet, _) = self
            .ledger
            .post(card.wallet_id, Entry::Debit, amount + fee, |wallet| {
                let pending = |value, r#type| {
                    Transaction::debit(
                        wallet,
                        value,
                        r#type,
                        request.channel,
                        TransactionStatus::Pending,
                    )
                    .with_card(&card)
                    .with_reference(request.reference_id.clone())
                };
                Ok(vec![
                    pending(fee, TransactionType::Fee),
                    pending(amount, TransactionType::Withdrawal),
                ])
            })
            .await?;

        Ok(WebhookOutcome::Authorized {
            wallet_id: wallet.id,
            amount,
            fee,
        })
    }

    async fn settle(&self, reference_id: &str) -> Result<WebhookOutcome> {
        let moved = self
            .log
            .transition_reference(reference_id, TransactionStatus::Success)
            .await?;
        Ok(WebhookOutcome::Settled {
            transactions: moved.len(),
        })
    }

    /// Reverses wallet by wallet. Each wallet's credit, its originals moving to `Failed`
    /// and their refunds are one commit, so a retried delivery only sees the wallets that
    /// were not yet reversed.
    async fn reverse(&self, reference_id: &str) -> Result<WebhookOutcome> {
        let mut per_wallet: BTreeMap<Uuid, Vec<Transaction>> = BTreeMap::new();
        for tx in self.log.pending(reference_id).await? {
            per_wallet.entry(tx.wallet_id).or_default().push(tx);
        }

        let mut transactions = 0;
        let mut refunded = MinorUnits::ZERO;
        for (wallet_id, originals) in per_wallet {
            let held: MinorUnits = originals.iter().map(|tx| tx.debit).sum();
            transactions += originals.len();
            let records = reversal_records(originals)?;
            if held.is_positive() {
                self.ledger
                    .post(wallet_id, Entry::Credit, held, |_| Ok(records))
                    .await?;
            } else {
                self.log.record_all(records).await?;
            }
            refunded += held;
        }

        Ok(WebhookOutcome::Reversed {
            transactions,
            refunded,
        })
    }
}

/// The originals moved to `Failed`, each followed by its refund.
fn reversal_records(originals: Vec<Transaction>) -> Result<Vec<Transaction>> {
    let mut records = Vec::with_capacity(originals.len() * 2);
    for mut tx in originals {
        tx.transition(TransactionStatus::Failed)?;
        records.push(tx.refund());
        records.push(tx);
    }
    Ok(records)
}
