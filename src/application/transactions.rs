use crate::domain::ports::TransactionStoreRef;
use crate::domain::transaction::{Transaction, TransactionStatus};
use crate::error::{Result, SpendError};
use chrono::Utc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Append and query access to the audit trail of balance movements.
///
/// Listings skip soft-deleted records and return newest first.
#[derive(Clone)]
pub struct TransactionLog {
    store: TransactionStoreRef,
}

impl TransactionLog {
    pub fn new(store: TransactionStoreRef) -> Self {
        Self { store }
    }

    pub async fn record(&self, tx: Transaction) -> Result<Transaction> {
        self.store.store(tx.clone()).await?;
        Ok(tx)
    }

    /// Writes every record or none of them.
    pub async fn record_all(&self, txs: Vec<Transaction>) -> Result<Vec<Transaction>> {
        self.store.store_all(txs.clone()).await?;
        Ok(txs)
    }

    pub async fn get(&self, tx_id: Uuid) -> Result<Transaction> {
        self.store
            .get(tx_id)
            .await?
            .filter(|tx| !tx.is_deleted())
            .ok_or_else(|| SpendError::not_found("transaction", tx_id))
    }

    pub async fn by_reference(&self, reference_id: &str) -> Result<Vec<Transaction>> {
        Ok(live(self.store.find_by_reference(reference_id).await?))
    }

    pub async fn by_company(&self, company_id: Uuid) -> Result<Vec<Transaction>> {
        Ok(live(self.store.find_by_company(company_id).await?))
    }

    pub async fn by_card(&self, card_id: Uuid) -> Result<Vec<Transaction>> {
        Ok(live(self.store.find_by_card(card_id).await?))
    }

    pub async fn by_wallet(&self, wallet_id: Uuid) -> Result<Vec<Transaction>> {
        Ok(live(self.store.find_by_wallet(wallet_id).await?))
    }

    /// Moves every pending record under `reference_id` to `next`.
    ///
    /// Records already out of `Pending` are left alone, so a late or repeated event is a
    /// no-op. Returns the records that moved.
    #[instrument(skip(self))]
    pub async fn transition_reference(
        &self,
        reference_id: &str,
        next: TransactionStatus,
    ) -> Result<Vec<Transaction>> {
        let mut moved = self.pending(reference_id).await?;
        for tx in &mut moved {
            tx.transition(next)?;
        }
        self.store.store_all(moved.clone()).await?;
        debug!(count = moved.len(), "transactions transitioned");
        Ok(moved)
    }

    pub async fn pending(&self, reference_id: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .by_reference(reference_id)
            .await?
            .into_iter()
            .filter(|tx| tx.status == TransactionStatus::Pending)
            .collect())
    }

    pub async fn attach_receipt(
        &self,
        tx_id: Uuid,
        receipt: &str,
        expense_category: Option<&str>,
    ) -> Result<Transaction> {
        let mut tx = self.get(tx_id).await?;
        tx.receipt = Some(receipt.to_string());
        if let Some(category) = expense_category {
            tx.expense_category = Some(category.to_string());
        }
        tx.updated_at = Utc::now();
        self.record(tx).await
    }

    /// Flips the manual hold flag.
    pub async fn toggle_lock(&self, tx_id: Uuid) -> Result<Transaction> {
        let mut tx = self.get(tx_id).await?;
        tx.lock = !tx.lock;
        tx.updated_at = Utc::now();
        self.record(tx).await
    }

    #[instrument(skip(self))]
    pub async fn soft_delete(&self, tx_id: Uuid) -> Result<()> {
        let mut tx = self.get(tx_id).await?;
        let now = Utc::now();
        tx.deleted_at = Some(now);
        tx.updated_at = now;
        self.store.store(tx).await
    }
}

fn live(txs: Vec<Transaction>) -> Vec<Transaction> {
    txs.into_iter().filter(|tx| !tx.is_deleted()).collect()
}
