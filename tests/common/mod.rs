#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use creditline::application::cards::{CardIssuer, CardRepositories, CreateCardRequest};
use creditline::application::fees::FeeSchedule;
use creditline::application::ledger::WalletLedger;
use creditline::application::transactions::TransactionLog;
use creditline::application::webhooks::WebhookProcessor;
use creditline::domain::card::{
    Card, CardStatus, CardType, SpendingControls,
};
use creditline::domain::company::{Address, Company, CompanyProfile};
use creditline::domain::fee::{Fee, FeeIdentifier};
use creditline::domain::financials::{BalanceSnapshot, BankTransaction, DateRange};
use creditline::domain::partner::{
    CustomerProfile, PartnerCard, PartnerCardRequest, PartnerCustomer,
};
use creditline::domain::issuance::{IssuanceState, PendingIssuance};
use creditline::domain::ports::{
    CardPartner, CardStore, FinancialDataPartner, IssuanceStore, LockPolicy, TransactionStore,
};
use creditline::domain::transaction::Transaction;
use creditline::domain::wallet::Wallet;
use creditline::error::{Result, SpendError};
use creditline::infrastructure::in_memory::{
    InMemoryCardStore, InMemoryCustomerStore, InMemoryDirectory, InMemoryFeeCatalog,
    InMemoryIssuanceStore, InMemoryPanPool, InMemoryTransactionStore, InMemoryWalletStore,
    InMemoryWebhookInbox,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub fn fee(identifier: FeeIdentifier, amount: Decimal, is_percent: bool) -> Fee {
    Fee {
        identifier,
        channel: "all".to_string(),
        fee: amount,
        is_percent,
        is_dollar: false,
    }
}

/// 10% on web/POS, 1.5% at ATMs, 1000 to create and 500 to ship a card.
pub fn default_fees() -> Vec<Fee> {
    vec![
        fee(FeeIdentifier::CardTransaction, dec!(10), true),
        fee(FeeIdentifier::CardTransactionAtm, dec!(1.5), true),
        fee(FeeIdentifier::CardCreation, dec!(1000), false),
        fee(FeeIdentifier::CardShipping, dec!(500), false),
    ]
}

/// Card partner double that counts calls and fails on demand.
#[derive(Default)]
pub struct FakeCardPartner {
    pub customers_created: AtomicUsize,
    pub cards_created: AtomicUsize,
    pub cards_cancelled: AtomicUsize,
    pub cards_updated: AtomicUsize,
    pub pins_changed: AtomicUsize,
    pub fail_create_customer: AtomicBool,
    pub fail_create_card: AtomicBool,
    pub fail_cancel: AtomicBool,
}

impl FakeCardPartner {
    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn refuse(flag: &AtomicBool, what: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(SpendError::PartnerError(format!("{what} refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl CardPartner for FakeCardPartner {
    async fn create_customer(&self, profile: &CustomerProfile) -> Result<PartnerCustomer> {
        Self::refuse(&self.fail_create_customer, "create customer")?;
        let n = self.customers_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PartnerCustomer {
            id: format!("cus_{n}"),
            billing_address: profile.billing_address.clone(),
        })
    }

    async fn create_card(&self, request: &PartnerCardRequest) -> Result<PartnerCard> {
        Self::refuse(&self.fail_create_card, "create card")?;
        let n = self.cards_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PartnerCard {
            id: format!("card_{n}"),
            brand: request.brand.clone(),
            currency: "NGN".to_string(),
            masked_pan: format!("506321******{n:04}"),
            expiry_month: "09".to_string(),
            expiry_year: "2029".to_string(),
            status: request.status,
            spending_controls: request.spending_controls,
        })
    }

    async fn update_card(
        &self,
        _partner_card_id: &str,
        _status: CardStatus,
        _controls: &SpendingControls,
    ) -> Result<()> {
        self.cards_updated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn cancel_card(
        &self,
        _partner_card_id: &str,
        _status: CardStatus,
        _controls: &SpendingControls,
    ) -> Result<()> {
        Self::refuse(&self.fail_cancel, "cancel card")?;
        self.cards_cancelled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn change_pin(
        &self,
        _partner_card_id: &str,
        _old_pin: &str,
        _new_pin: &str,
    ) -> Result<()> {
        self.pins_changed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Financial-data partner double returning fixed figures.
pub struct FakeFinancialData {
    pub registered_name: String,
    pub balances: Vec<Decimal>,
    pub history: Vec<(Decimal, Decimal)>,
}

#[async_trait]
impl FinancialDataPartner for FakeFinancialData {
    async fn rc_verify(&self, _company_name: &str, _rc_number: &str) -> Result<String> {
        Ok(self.registered_name.clone())
    }

    async fn cash_balance_history(
        &self,
        _account_id: &str,
        _range: DateRange,
    ) -> Result<Vec<BalanceSnapshot>> {
        Ok(self
            .balances
            .iter()
            .map(|&bank_balance| BalanceSnapshot { bank_balance })
            .collect())
    }

    async fn transaction_history(
        &self,
        _customer_id: &str,
        _range: DateRange,
    ) -> Result<Vec<BankTransaction>> {
        Ok(self
            .history
            .iter()
            .map(|&(credit, debit)| BankTransaction { credit, debit })
            .collect())
    }
}

/// Transaction store whose next write fails when `fail_next` is set.
#[derive(Default)]
pub struct FlakyTransactionStore {
    inner: InMemoryTransactionStore,
    pub fail_next: AtomicBool,
}

impl FlakyTransactionStore {
    fn refuse(&self) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SpendError::InternalError("transaction write refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for FlakyTransactionStore {
    async fn store(&self, tx: Transaction) -> Result<()> {
        self.refuse()?;
        self.inner.store(tx).await
    }

    async fn store_all(&self, txs: Vec<Transaction>) -> Result<()> {
        self.refuse()?;
        self.inner.store_all(txs).await
    }

    async fn get(&self, tx_id: Uuid) -> Result<Option<Transaction>> {
        self.inner.get(tx_id).await
    }

    async fn find_by_reference(&self, reference_id: &str) -> Result<Vec<Transaction>> {
        self.inner.find_by_reference(reference_id).await
    }

    async fn find_by_company(&self, company_id: Uuid) -> Result<Vec<Transaction>> {
        self.inner.find_by_company(company_id).await
    }

    async fn find_by_card(&self, card_id: Uuid) -> Result<Vec<Transaction>> {
        self.inner.find_by_card(card_id).await
    }

    async fn find_by_wallet(&self, wallet_id: Uuid) -> Result<Vec<Transaction>> {
        self.inner.find_by_wallet(wallet_id).await
    }
}

/// Issuance store that keeps every written snapshot and can refuse one state.
#[derive(Default)]
pub struct RecordingIssuanceStore {
    inner: InMemoryIssuanceStore,
    pub history: Mutex<Vec<PendingIssuance>>,
    pub fail_on: Mutex<Option<IssuanceState>>,
}

impl RecordingIssuanceStore {
    /// The first stored snapshot in `state`.
    pub fn snapshot(&self, state: IssuanceState) -> Option<PendingIssuance> {
        let history = self.history.lock().unwrap();
        history.iter().find(|i| i.state == state).cloned()
    }
}

#[async_trait]
impl IssuanceStore for RecordingIssuanceStore {
    async fn store(&self, issuance: PendingIssuance) -> Result<()> {
        {
            let mut fail_on = self.fail_on.lock().unwrap();
            if *fail_on == Some(issuance.state) {
                *fail_on = None;
                return Err(SpendError::InternalError("issuance write refused".into()));
            }
        }
        self.history.lock().unwrap().push(issuance.clone());
        self.inner.store(issuance).await
    }

    async fn get(&self, issuance_id: Uuid) -> Result<Option<PendingIssuance>> {
        self.inner.get(issuance_id).await
    }

    async fn find_unresolved(&self) -> Result<Vec<PendingIssuance>> {
        self.inner.find_unresolved().await
    }
}

/// Every service wired to in-memory stores and a fake card partner.
pub struct World {
    pub wallets: Arc<InMemoryWalletStore>,
    pub transactions: Arc<FlakyTransactionStore>,
    pub cards: Arc<InMemoryCardStore>,
    pub pans: Arc<InMemoryPanPool>,
    pub issuances: Arc<RecordingIssuanceStore>,
    pub directory: Arc<InMemoryDirectory>,
    pub partner: Arc<FakeCardPartner>,
    pub ledger: WalletLedger,
    pub log: TransactionLog,
    pub issuer: CardIssuer,
    pub webhooks: WebhookProcessor,
}

impl World {
    pub fn new() -> Self {
        Self::with_policy(LockPolicy::NoWait)
    }

    pub fn with_policy(policy: LockPolicy) -> Self {
        let cards = Arc::new(InMemoryCardStore::new());
        let pans = Arc::new(InMemoryPanPool::new());
        let issuances = Arc::new(RecordingIssuanceStore::default());
        let directory = Arc::new(InMemoryDirectory::new());
        let partner = Arc::new(FakeCardPartner::default());

        let transactions = Arc::new(FlakyTransactionStore::default());
        let wallets = Arc::new(InMemoryWalletStore::with_journal(
            policy,
            transactions.clone(),
        ));
        let ledger = WalletLedger::new(wallets.clone());
        let log = TransactionLog::new(transactions.clone());
        let fees = FeeSchedule::new(Arc::new(InMemoryFeeCatalog::from_fees(default_fees())));

        let issuer = CardIssuer::new(
            ledger.clone(),
            fees.clone(),
            partner.clone(),
            CardRepositories {
                cards: cards.clone(),
                customers: Arc::new(InMemoryCustomerStore::new()),
                pans: pans.clone(),
                issuances: issuances.clone(),
                directory: directory.clone(),
            },
        );
        let webhooks = WebhookProcessor::new(
            ledger.clone(),
            fees,
            log.clone(),
            cards.clone(),
            Arc::new(InMemoryWebhookInbox::new()),
        );

        Self {
            wallets,
            transactions,
            cards,
            pans,
            issuances,
            directory,
            partner,
            ledger,
            log,
            issuer,
            webhooks,
        }
    }

    /// Registers a company with a billing address and a wallet holding `limit`.
    pub async fn company_with_wallet(&self, limit: Decimal) -> (Uuid, Wallet) {
        let company_id = Uuid::new_v4();
        self.directory
            .insert_company(Company {
                id: company_id,
                name: "Acme Logistics Ltd".to_string(),
                owner: "owner@acme.test".to_string(),
            })
            .await;
        self.directory
            .insert_profile(CompanyProfile {
                company_id,
                rc_number: "RC123456".to_string(),
                incorporation_year: 2018,
            })
            .await;
        self.directory
            .insert_address(
                company_id,
                Address {
                    line1: "12 Marina Road".to_string(),
                    city: "Lagos".to_string(),
                    state: "Lagos".to_string(),
                    postal_code: "101001".to_string(),
                    country: "NG".to_string(),
                },
            )
            .await;

        let wallet = self
            .ledger
            .open_wallet(company_id, "acct_1", "cust_1")
            .await
            .unwrap();
        let wallet = if limit > Decimal::ZERO {
            self.ledger.set_credit_limit(wallet.id, limit).await.unwrap()
        } else {
            wallet
        };
        (company_id, wallet)
    }

    /// Stores an active virtual card without going through the partner.
    pub async fn seed_card(&self, wallet: &Wallet, partner_card_id: &str) -> Card {
        let now = Utc::now();
        let card = Card {
            id: Uuid::new_v4(),
            company_id: wallet.company_id,
            wallet_id: wallet.id,
            customer_id: Uuid::new_v4(),
            partner_customer_id: "cus_seed".to_string(),
            partner_card_id: partner_card_id.to_string(),
            r#type: CardType::Virtual,
            brand: "Verve".to_string(),
            currency: "NGN".to_string(),
            masked_pan: "506321******0000".to_string(),
            expiry_month: "01".to_string(),
            expiry_year: "2030".to_string(),
            status: CardStatus::Active,
            lock: false,
            summary: String::new(),
            spending_controls: SpendingControls::default(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.cards.store(card.clone()).await.unwrap();
        card
    }
}

pub fn card_request(company_id: Uuid, card_type: CardType) -> CreateCardRequest {
    CreateCardRequest {
        company_id,
        card_type,
        brand: "verve".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Obi".to_string(),
        email: "ada@acme.test".to_string(),
        phone: "+2348000000000".to_string(),
        spending_controls: SpendingControls::default(),
    }
}

pub fn authorization(
    event_id: &str,
    partner_card_id: &str,
    channel: &str,
    amount: Decimal,
) -> String {
    serde_json::json!({
        "id": event_id,
        "type": "authorization.request",
        "data": {"object": {
            "card": {"_id": partner_card_id, "type": "virtual"},
            "customer": {"_id": "cus_seed"},
            "transactionMetadata": {"channel": channel},
            "pendingRequest": {"amount": amount}
        }}
    })
    .to_string()
}

pub fn transaction_created(event_id: &str, status: &str) -> String {
    serde_json::json!({
        "id": event_id,
        "type": "transaction.created",
        "data": {"object": {"status": status}}
    })
    .to_string()
}
