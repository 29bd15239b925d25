use super::card::{Card, CardStatus, Customer, Pan, SpendingControls};
use super::company::{Address, Company, CompanyProfile};
use super::credit::CreditIncrease;
use super::fee::{Fee, FeeIdentifier};
use super::financials::{BalanceSnapshot, BankTransaction, DateRange};
use super::issuance::PendingIssuance;
use super::partner::{CustomerProfile, PartnerCard, PartnerCardRequest, PartnerCustomer};
use super::transaction::Transaction;
use super::wallet::Wallet;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// How a wallet row lock is acquired when another mutation holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockPolicy {
    /// Fail immediately with `LockContention`.
    #[default]
    NoWait,
    /// Queue behind the holder for at most `timeout`.
    Wait { timeout: Duration },
}

/// Exclusive hold on one wallet row.
///
/// The snapshot returned by [`WalletGuard::wallet`] is the committed state at lock time.
/// Dropping the guard without committing discards every change.
#[async_trait]
pub trait WalletGuard: Send {
    fn wallet(&self) -> &Wallet;

    /// Writes `wallet` and the `journal` records as one unit. Either both land or neither.
    async fn commit_with(
        self: Box<Self>,
        wallet: Wallet,
        journal: Vec<Transaction>,
    ) -> Result<()>;

    async fn commit(self: Box<Self>, wallet: Wallet) -> Result<()> {
        self.commit_with(wallet, Vec::new()).await
    }

    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn insert(&self, wallet: Wallet) -> Result<()>;
    async fn get(&self, wallet_id: Uuid) -> Result<Option<Wallet>>;
    async fn get_by_company(&self, company_id: Uuid) -> Result<Option<Wallet>>;
    async fn get_all(&self) -> Result<Vec<Wallet>>;
    async fn lock_for_update(&self, wallet_id: Uuid) -> Result<Box<dyn WalletGuard>>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Inserts or replaces by id.
    async fn store(&self, tx: Transaction) -> Result<()>;
    /// Inserts or replaces every record, or none of them.
    async fn store_all(&self, txs: Vec<Transaction>) -> Result<()>;
    async fn get(&self, tx_id: Uuid) -> Result<Option<Transaction>>;
    async fn find_by_reference(&self, reference_id: &str) -> Result<Vec<Transaction>>;
    async fn find_by_company(&self, company_id: Uuid) -> Result<Vec<Transaction>>;
    async fn find_by_card(&self, card_id: Uuid) -> Result<Vec<Transaction>>;
    async fn find_by_wallet(&self, wallet_id: Uuid) -> Result<Vec<Transaction>>;
}

#[async_trait]
pub trait CardStore: Send + Sync {
    async fn store(&self, card: Card) -> Result<()>;
    async fn get(&self, card_id: Uuid) -> Result<Option<Card>>;
    async fn get_by_partner_id(&self, partner_card_id: &str) -> Result<Option<Card>>;
    async fn find_by_company(&self, company_id: Uuid) -> Result<Vec<Card>>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn store(&self, customer: Customer) -> Result<()>;
    async fn get(&self, customer_id: Uuid) -> Result<Option<Customer>>;
}

#[async_trait]
pub trait PanPool: Send + Sync {
    async fn add(&self, pans: Vec<Pan>) -> Result<()>;
    /// Draws the first available PAN and marks it unavailable.
    async fn take_first(&self) -> Result<Option<Pan>>;
    /// Makes a previously drawn PAN available again.
    async fn release(&self, number: &str) -> Result<()>;
}

#[async_trait]
pub trait FeeCatalog: Send + Sync {
    async fn get(&self, identifier: FeeIdentifier) -> Result<Option<Fee>>;
}

#[async_trait]
pub trait CreditIncreaseStore: Send + Sync {
    async fn store(&self, request: CreditIncrease) -> Result<()>;
    async fn get(&self, request_id: Uuid) -> Result<Option<CreditIncrease>>;
    async fn find_by_wallet(&self, wallet_id: Uuid) -> Result<Vec<CreditIncrease>>;
}

#[async_trait]
pub trait IssuanceStore: Send + Sync {
    async fn store(&self, issuance: PendingIssuance) -> Result<()>;
    async fn get(&self, issuance_id: Uuid) -> Result<Option<PendingIssuance>>;
    /// Records not yet in a terminal state.
    async fn find_unresolved(&self) -> Result<Vec<PendingIssuance>>;
}

/// De-duplication log for webhook deliveries.
#[async_trait]
pub trait WebhookInbox: Send + Sync {
    /// Claims `key`. Returns `false` when it is already claimed or completed.
    async fn begin(&self, key: &str) -> Result<bool>;
    async fn complete(&self, key: &str) -> Result<()>;
    /// Drops a claim so a redelivery is processed again.
    async fn release(&self, key: &str) -> Result<()>;
}

/// Read-only lookups served by the company CRUD layer.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn company(&self, company_id: Uuid) -> Result<Option<Company>>;
    async fn company_profile(&self, company_id: Uuid) -> Result<Option<CompanyProfile>>;
    async fn billing_address(&self, company_id: Uuid) -> Result<Option<Address>>;
}

#[async_trait]
pub trait CardPartner: Send + Sync {
    async fn create_customer(&self, profile: &CustomerProfile) -> Result<PartnerCustomer>;
    async fn create_card(&self, request: &PartnerCardRequest) -> Result<PartnerCard>;
    async fn update_card(
        &self,
        partner_card_id: &str,
        status: CardStatus,
        controls: &SpendingControls,
    ) -> Result<()>;
    async fn cancel_card(
        &self,
        partner_card_id: &str,
        status: CardStatus,
        controls: &SpendingControls,
    ) -> Result<()>;
    async fn change_pin(&self, partner_card_id: &str, old_pin: &str, new_pin: &str) -> Result<()>;
}

#[async_trait]
pub trait FinancialDataPartner: Send + Sync {
    /// Returns the legal name the registry holds for `rc_number`.
    async fn rc_verify(&self, company_name: &str, rc_number: &str) -> Result<String>;
    async fn cash_balance_history(
        &self,
        account_id: &str,
        range: DateRange,
    ) -> Result<Vec<BalanceSnapshot>>;
    async fn transaction_history(
        &self,
        customer_id: &str,
        range: DateRange,
    ) -> Result<Vec<BankTransaction>>;
}

pub type WalletStoreRef = Arc<dyn WalletStore>;
pub type TransactionStoreRef = Arc<dyn TransactionStore>;
pub type CardStoreRef = Arc<dyn CardStore>;
pub type CustomerStoreRef = Arc<dyn CustomerStore>;
pub type PanPoolRef = Arc<dyn PanPool>;
pub type FeeCatalogRef = Arc<dyn FeeCatalog>;
pub type CreditIncreaseStoreRef = Arc<dyn CreditIncreaseStore>;
pub type IssuanceStoreRef = Arc<dyn IssuanceStore>;
pub type WebhookInboxRef = Arc<dyn WebhookInbox>;
pub type DirectoryRef = Arc<dyn Directory>;
pub type CardPartnerRef = Arc<dyn CardPartner>;
pub type FinancialDataPartnerRef = Arc<dyn FinancialDataPartner>;
