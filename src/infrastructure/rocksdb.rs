use crate::domain::ports::{LockPolicy, TransactionStore, WalletGuard, WalletStore, WebhookInbox};
use crate::domain::transaction::Transaction;
use crate::domain::wallet::Wallet;
use crate::error::{Result, SpendError};
use crate::infrastructure::row_lock::RowLocks;
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Column Family for wallet rows, keyed by wallet id.
pub const CF_WALLETS: &str = "wallets";
/// Column Family for the transaction log, keyed by transaction id.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family for webhook de-duplication keys.
pub const CF_INBOX: &str = "webhook_inbox";

const INBOX_IN_FLIGHT: &[u8] = b"in_flight";
const INBOX_DONE: &[u8] = b"done";

/// A persistent store backed by RocksDB.
///
/// Wallets, transactions and webhook claims live in separate Column Families. RocksDB is an
/// embedded single-process database, so the per-wallet row lock is held in process by
/// [`RowLocks`] and a wallet commit is written as one [`WriteBatch`].
///
/// `Clone` shares the underlying `Arc<DB>` and lock table.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    locks: RowLocks,
    openings: Arc<Mutex<()>>,
    inbox: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a database at `path`, creating missing Column Families.
    pub fn open<P: AsRef<Path>>(path: P, policy: LockPolicy) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_WALLETS, CF_TRANSACTIONS, CF_INBOX]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            locks: RowLocks::new(policy),
            openings: Arc::default(),
            inbox: Arc::default(),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            SpendError::InternalError(Box::new(std::io::Error::other(format!(
                "column family {name} not found"
            ))))
        })
    }

    fn read<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str, keep: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        let handle = self.cf(cf)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(handle, IteratorMode::Start) {
            let (_key, value) = item?;
            let row: T = serde_json::from_slice(&value)?;
            if keep(&row) {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn transactions_where(&self, keep: impl Fn(&Transaction) -> bool) -> Result<Vec<Transaction>> {
        let mut txs = self.scan(CF_TRANSACTIONS, keep)?;
        txs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(txs)
    }
}

struct RocksDBWalletGuard {
    snapshot: Wallet,
    store: RocksDBStore,
    _row: OwnedMutexGuard<()>,
}

#[async_trait]
impl WalletGuard for RocksDBWalletGuard {
    fn wallet(&self) -> &Wallet {
        &self.snapshot
    }

    async fn commit_with(
        self: Box<Self>,
        wallet: Wallet,
        journal: Vec<Transaction>,
    ) -> Result<()> {
        if wallet.id != self.snapshot.id {
            return Err(SpendError::ValidationError(format!(
                "guard for wallet {} cannot commit wallet {}",
                self.snapshot.id, wallet.id
            )));
        }
        let mut batch = WriteBatch::default();
        let transactions = self.store.cf(CF_TRANSACTIONS)?;
        for tx in &journal {
            batch.put_cf(transactions, tx.id.as_bytes(), serde_json::to_vec(tx)?);
        }
        let wallets = self.store.cf(CF_WALLETS)?;
        batch.put_cf(wallets, wallet.id.as_bytes(), serde_json::to_vec(&wallet)?);
        self.store.db.write(batch)?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl WalletStore for RocksDBStore {
    /// Opening is serialized so two inserts for one company cannot both pass the check.
    async fn insert(&self, wallet: Wallet) -> Result<()> {
        let _opening = self.openings.lock().await;
        if self.read::<Wallet>(CF_WALLETS, wallet.id.as_bytes())?.is_some() {
            return Err(SpendError::Conflict(format!("wallet {}", wallet.id)));
        }
        if WalletStore::get_by_company(self, wallet.company_id).await?.is_some() {
            return Err(SpendError::Conflict(format!(
                "company {} already has a wallet",
                wallet.company_id
            )));
        }
        self.write(CF_WALLETS, wallet.id.as_bytes(), &wallet)
    }

    async fn get(&self, wallet_id: Uuid) -> Result<Option<Wallet>> {
        self.read(CF_WALLETS, wallet_id.as_bytes())
    }

    async fn get_by_company(&self, company_id: Uuid) -> Result<Option<Wallet>> {
        Ok(self
            .scan::<Wallet>(CF_WALLETS, |w| w.company_id == company_id)?
            .into_iter()
            .next())
    }

    async fn get_all(&self) -> Result<Vec<Wallet>> {
        self.scan(CF_WALLETS, |_: &Wallet| true)
    }

    async fn lock_for_update(&self, wallet_id: Uuid) -> Result<Box<dyn WalletGuard>> {
        let row = self.locks.acquire(wallet_id).await?;
        let snapshot = WalletStore::get(self, wallet_id)
            .await?
            .ok_or_else(|| SpendError::not_found("wallet", wallet_id))?;
        Ok(Box::new(RocksDBWalletGuard {
            snapshot,
            store: self.clone(),
            _row: row,
        }))
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn store(&self, tx: Transaction) -> Result<()> {
        self.write(CF_TRANSACTIONS, tx.id.as_bytes(), &tx)
    }

    async fn store_all(&self, txs: Vec<Transaction>) -> Result<()> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        let mut batch = WriteBatch::default();
        for tx in &txs {
            batch.put_cf(cf, tx.id.as_bytes(), serde_json::to_vec(tx)?);
        }
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, tx_id: Uuid) -> Result<Option<Transaction>> {
        self.read(CF_TRANSACTIONS, tx_id.as_bytes())
    }

    async fn find_by_reference(&self, reference_id: &str) -> Result<Vec<Transaction>> {
        self.transactions_where(|tx| tx.reference_id.as_deref() == Some(reference_id))
    }

    async fn find_by_company(&self, company_id: Uuid) -> Result<Vec<Transaction>> {
        self.transactions_where(|tx| tx.company_id == company_id)
    }

    async fn find_by_card(&self, card_id: Uuid) -> Result<Vec<Transaction>> {
        self.transactions_where(|tx| tx.card_id == Some(card_id))
    }

    async fn find_by_wallet(&self, wallet_id: Uuid) -> Result<Vec<Transaction>> {
        self.transactions_where(|tx| tx.wallet_id == wallet_id)
    }
}

#[async_trait]
impl WebhookInbox for RocksDBStore {
    async fn begin(&self, key: &str) -> Result<bool> {
        let _claim = self.inbox.lock().await;
        let cf = self.cf(CF_INBOX)?;
        if self.db.get_pinned_cf(cf, key.as_bytes())?.is_some() {
            return Ok(false);
        }
        self.db.put_cf(cf, key.as_bytes(), INBOX_IN_FLIGHT)?;
        Ok(true)
    }

    async fn complete(&self, key: &str) -> Result<()> {
        let _claim = self.inbox.lock().await;
        let cf = self.cf(CF_INBOX)?;
        self.db.put_cf(cf, key.as_bytes(), INBOX_DONE)?;
        Ok(())
    }

    async fn release(&self, key: &str) -> Result<()> {
        let _claim = self.inbox.lock().await;
        let cf = self.cf(CF_INBOX)?;
        let in_flight = self
            .db
            .get_pinned_cf(cf, key.as_bytes())?
            .is_some_and(|state| state.as_ref() == INBOX_IN_FLIGHT);
        if in_flight {
            self.db.delete_cf(cf, key.as_bytes())?;
        }
        Ok(())
    }
}
