use crate::domain::card::{Card, Customer, Pan};
use crate::domain::company::{Address, Company, CompanyProfile};
use crate::domain::credit::CreditIncrease;
use crate::domain::fee::{Fee, FeeIdentifier};
use crate::domain::issuance::PendingIssuance;
use crate::domain::ports::{
    CardStore, CreditIncreaseStore, CustomerStore, Directory, FeeCatalog, IssuanceStore,
    LockPolicy, PanPool, TransactionStore, TransactionStoreRef, WalletGuard, WalletStore,
    WebhookInbox,
};
use crate::domain::transaction::Transaction;
use crate::domain::wallet::Wallet;
use crate::error::{Result, SpendError};
use crate::infrastructure::row_lock::RowLocks;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedMutexGuard, RwLock};
use uuid::Uuid;

/// Newest first, the order every listing query returns.
fn newest_first(mut txs: Vec<Transaction>) -> Vec<Transaction> {
    txs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    txs
}

/// A thread-safe in-memory wallet store.
///
/// Committed rows live in `Arc<RwLock<HashMap<Uuid, Wallet>>>`; mutations go through
/// [`RowLocks`] so two writers never interleave on one wallet. A store built with
/// [`InMemoryWalletStore::with_journal`] writes the records handed to
/// [`WalletGuard::commit_with`] into that transaction store before the wallet row, so a
/// failed journal write leaves the balance untouched.
#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    wallets: Arc<RwLock<HashMap<Uuid, Wallet>>>,
    locks: RowLocks,
    journal: Option<TransactionStoreRef>,
}

impl InMemoryWalletStore {
    /// Creates an empty store using the fail-fast lock policy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: LockPolicy) -> Self {
        Self {
            wallets: Arc::default(),
            locks: RowLocks::new(policy),
            journal: None,
        }
    }

    pub fn with_journal(policy: LockPolicy, journal: TransactionStoreRef) -> Self {
        Self {
            journal: Some(journal),
            ..Self::with_policy(policy)
        }
    }
}

struct InMemoryWalletGuard {
    snapshot: Wallet,
    wallets: Arc<RwLock<HashMap<Uuid, Wallet>>>,
    journal: Option<TransactionStoreRef>,
    _row: OwnedMutexGuard<()>,
}

#[async_trait]
impl WalletGuard for InMemoryWalletGuard {
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
        if !journal.is_empty() {
            let store = self.journal.as_ref().ok_or_else(|| {
                SpendError::InternalError(
                    "wallet store has no transaction journal attached".into(),
                )
            })?;
            store.store_all(journal).await?;
        }
        self.wallets.write().await.insert(wallet.id, wallet);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    /// Refuses a second wallet for the same company. The check and the insert happen under
    /// one write lock.
    async fn insert(&self, wallet: Wallet) -> Result<()> {
        let mut wallets = self.wallets.write().await;
        if wallets.contains_key(&wallet.id) {
            return Err(SpendError::Conflict(format!("wallet {}", wallet.id)));
        }
        if wallets.values().any(|w| w.company_id == wallet.company_id) {
            return Err(SpendError::Conflict(format!(
                "company {} already has a wallet",
                wallet.company_id
            )));
        }
        wallets.insert(wallet.id, wallet);
        Ok(())
    }

    async fn get(&self, wallet_id: Uuid) -> Result<Option<Wallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.get(&wallet_id).cloned())
    }

    async fn get_by_company(&self, company_id: Uuid) -> Result<Option<Wallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets
            .values()
            .find(|w| w.company_id == company_id)
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<Wallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.values().cloned().collect())
    }

    async fn lock_for_update(&self, wallet_id: Uuid) -> Result<Box<dyn WalletGuard>> {
        let row = self.locks.acquire(wallet_id).await?;
        let snapshot = self
            .get(wallet_id)
            .await?
            .ok_or_else(|| SpendError::not_found("wallet", wallet_id))?;
        Ok(Box::new(InMemoryWalletGuard {
            snapshot,
            wallets: self.wallets.clone(),
            journal: self.journal.clone(),
            _row: row,
        }))
    }
}

/// A thread-safe in-memory store for the transaction log.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<Uuid, Transaction>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn filtered(&self, keep: impl Fn(&Transaction) -> bool) -> Vec<Transaction> {
        let transactions = self.transactions.read().await;
        newest_first(transactions.values().filter(|tx| keep(tx)).cloned().collect())
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn store(&self, tx: Transaction) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        transactions.insert(tx.id, tx);
        Ok(())
    }

    async fn store_all(&self, txs: Vec<Transaction>) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        transactions.extend(txs.into_iter().map(|tx| (tx.id, tx)));
        Ok(())
    }

    async fn get(&self, tx_id: Uuid) -> Result<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(&tx_id).cloned())
    }

    async fn find_by_reference(&self, reference_id: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .filtered(|tx| tx.reference_id.as_deref() == Some(reference_id))
            .await)
    }

    async fn find_by_company(&self, company_id: Uuid) -> Result<Vec<Transaction>> {
        Ok(self.filtered(|tx| tx.company_id == company_id).await)
    }

    async fn find_by_card(&self, card_id: Uuid) -> Result<Vec<Transaction>> {
        Ok(self.filtered(|tx| tx.card_id == Some(card_id)).await)
    }

    async fn find_by_wallet(&self, wallet_id: Uuid) -> Result<Vec<Transaction>> {
        Ok(self.filtered(|tx| tx.wallet_id == wallet_id).await)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCardStore {
    cards: Arc<RwLock<HashMap<Uuid, Card>>>,
}

impl InMemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardStore for InMemoryCardStore {
    async fn store(&self, card: Card) -> Result<()> {
        let mut cards = self.cards.write().await;
        if cards
            .values()
            .any(|c| c.partner_card_id == card.partner_card_id && c.id != card.id)
        {
            return Err(SpendError::Conflict(format!(
                "partner card {}",
                card.partner_card_id
            )));
        }
        cards.insert(card.id, card);
        Ok(())
    }

    async fn get(&self, card_id: Uuid) -> Result<Option<Card>> {
        let cards = self.cards.read().await;
        Ok(cards.get(&card_id).cloned())
    }

    async fn get_by_partner_id(&self, partner_card_id: &str) -> Result<Option<Card>> {
        let cards = self.cards.read().await;
        Ok(cards
            .values()
            .find(|c| c.partner_card_id == partner_card_id)
            .cloned())
    }

    async fn find_by_company(&self, company_id: Uuid) -> Result<Vec<Card>> {
        let cards = self.cards.read().await;
        let mut found: Vec<Card> = cards
            .values()
            .filter(|c| c.company_id == company_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCustomerStore {
    customers: Arc<RwLock<HashMap<Uuid, Customer>>>,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn store(&self, customer: Customer) -> Result<()> {
        self.customers.write().await.insert(customer.id, customer);
        Ok(())
    }

    async fn get(&self, customer_id: Uuid) -> Result<Option<Customer>> {
        Ok(self.customers.read().await.get(&customer_id).cloned())
    }
}

/// PANs kept in insertion order so `take_first` is deterministic.
#[derive(Default, Clone)]
pub struct InMemoryPanPool {
    pans: Arc<RwLock<Vec<Pan>>>,
}

impl InMemoryPanPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn available(&self) -> usize {
        self.pans.read().await.iter().filter(|p| p.available).count()
    }
}

#[async_trait]
impl PanPool for InMemoryPanPool {
    async fn add(&self, pans: Vec<Pan>) -> Result<()> {
        self.pans.write().await.extend(pans);
        Ok(())
    }

    async fn take_first(&self) -> Result<Option<Pan>> {
        let mut pans = self.pans.write().await;
        Ok(pans.iter_mut().find(|p| p.available).map(|pan| {
            pan.available = false;
            pan.clone()
        }))
    }

    async fn release(&self, number: &str) -> Result<()> {
        let mut pans = self.pans.write().await;
        if let Some(pan) = pans.iter_mut().find(|p| p.number == number) {
            pan.available = true;
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryFeeCatalog {
    fees: Arc<RwLock<HashMap<FeeIdentifier, Fee>>>,
}

impl InMemoryFeeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fees(fees: impl IntoIterator<Item = Fee>) -> Self {
        let fees = fees.into_iter().map(|fee| (fee.identifier, fee)).collect();
        Self {
            fees: Arc::new(RwLock::new(fees)),
        }
    }

    pub async fn insert(&self, fee: Fee) {
        self.fees.write().await.insert(fee.identifier, fee);
    }
}

#[async_trait]
impl FeeCatalog for InMemoryFeeCatalog {
    async fn get(&self, identifier: FeeIdentifier) -> Result<Option<Fee>> {
        Ok(self.fees.read().await.get(&identifier).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCreditIncreaseStore {
    requests: Arc<RwLock<HashMap<Uuid, CreditIncrease>>>,
}

impl InMemoryCreditIncreaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CreditIncreaseStore for InMemoryCreditIncreaseStore {
    async fn store(&self, request: CreditIncrease) -> Result<()> {
        self.requests.write().await.insert(request.id, request);
        Ok(())
    }

    async fn get(&self, request_id: Uuid) -> Result<Option<CreditIncrease>> {
        Ok(self.requests.read().await.get(&request_id).cloned())
    }

    async fn find_by_wallet(&self, wallet_id: Uuid) -> Result<Vec<CreditIncrease>> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .filter(|r| r.wallet_id == wallet_id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryIssuanceStore {
    issuances: Arc<RwLock<HashMap<Uuid, PendingIssuance>>>,
}

impl InMemoryIssuanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IssuanceStore for InMemoryIssuanceStore {
    async fn store(&self, issuance: PendingIssuance) -> Result<()> {
        self.issuances.write().await.insert(issuance.id, issuance);
        Ok(())
    }

    async fn get(&self, issuance_id: Uuid) -> Result<Option<PendingIssuance>> {
        Ok(self.issuances.read().await.get(&issuance_id).cloned())
    }

    async fn find_unresolved(&self) -> Result<Vec<PendingIssuance>> {
        let issuances = self.issuances.read().await;
        let mut open: Vec<PendingIssuance> = issuances
            .values()
            .filter(|i| !i.state.is_terminal())
            .cloned()
            .collect();
        open.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(open)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    InFlight,
    Done,
}

#[derive(Default, Clone)]
pub struct InMemoryWebhookInbox {
    deliveries: Arc<RwLock<HashMap<String, Delivery>>>,
}

impl InMemoryWebhookInbox {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookInbox for InMemoryWebhookInbox {
    async fn begin(&self, key: &str) -> Result<bool> {
        let mut deliveries = self.deliveries.write().await;
        if deliveries.contains_key(key) {
            return Ok(false);
        }
        deliveries.insert(key.to_string(), Delivery::InFlight);
        Ok(true)
    }

    async fn complete(&self, key: &str) -> Result<()> {
        self.deliveries
            .write()
            .await
            .insert(key.to_string(), Delivery::Done);
        Ok(())
    }

    async fn release(&self, key: &str) -> Result<()> {
        let mut deliveries = self.deliveries.write().await;
        if deliveries.get(key) == Some(&Delivery::InFlight) {
            deliveries.remove(key);
        }
        Ok(())
    }
}

/// Seedable stand-in for the company CRUD layer.
#[derive(Default, Clone)]
pub struct InMemoryDirectory {
    companies: Arc<RwLock<HashMap<Uuid, Company>>>,
    profiles: Arc<RwLock<HashMap<Uuid, CompanyProfile>>>,
    addresses: Arc<RwLock<HashMap<Uuid, Address>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_company(&self, company: Company) {
        self.companies.write().await.insert(company.id, company);
    }

    pub async fn insert_profile(&self, profile: CompanyProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.company_id, profile);
    }

    pub async fn insert_address(&self, company_id: Uuid, address: Address) {
        self.addresses.write().await.insert(company_id, address);
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn company(&self, company_id: Uuid) -> Result<Option<Company>> {
        Ok(self.companies.read().await.get(&company_id).cloned())
    }

    async fn company_profile(&self, company_id: Uuid) -> Result<Option<CompanyProfile>> {
        Ok(self.profiles.read().await.get(&company_id).cloned())
    }

    async fn billing_address(&self, company_id: Uuid) -> Result<Option<Address>> {
        Ok(self.addresses.read().await.get(&company_id).cloned())
    }
}
