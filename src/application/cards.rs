//! Card issuance and lifecycle.
//!
//! `create_card` is a saga. The partner card is irreversible from our side, so a
//! [`PendingIssuance`] row is written before the first partner call and advanced after
//! every step. Any failure after the partner confirmed the card triggers compensation:
//! the partner card is cancelled and a wallet charge, if one was taken, is credited back.
//! Records that a crash left unresolved are picked up by
//! [`CardIssuer::reconcile_pending_issuances`].

use crate::application::fees::{FeeSchedule, IssuanceCharge};
use crate::application::ledger::WalletLedger;
use crate::domain::card::{
    Card, CardStatus, CardType, CardUpdate, Customer, Pan, SpendingControls,
};
use crate::domain::issuance::{IssuanceState, PendingIssuance};
use crate::domain::money::MinorUnits;
use crate::domain::partner::{CustomerProfile, PartnerCard, PartnerCardRequest, capitalize_brand};
use crate::domain::ports::{
    CardPartnerRef, CardStoreRef, CustomerStoreRef, DirectoryRef, IssuanceStoreRef, PanPoolRef,
};
use crate::domain::transaction::{Channel, Transaction, TransactionStatus, TransactionType};
use crate::domain::wallet::{Entry, Wallet};
use crate::error::{Result, SpendError};
use chrono::{Duration, Utc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Stores the issuer reads and writes besides the ledger and its journal.
#[derive(Clone)]
pub struct CardRepositories {
    pub cards: CardStoreRef,
    pub customers: CustomerStoreRef,
    pub pans: PanPoolRef,
    pub issuances: IssuanceStoreRef,
    pub directory: DirectoryRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCardRequest {
    pub company_id: Uuid,
    pub card_type: CardType,
    pub brand: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub spending_controls: SpendingControls,
}

/// Outcome of one reconciliation sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub compensated: Vec<Uuid>,
    pub failed: Vec<Uuid>,
    pub still_failing: Vec<Uuid>,
}

#[derive(Clone)]
pub struct CardIssuer {
    ledger: WalletLedger,
    fees: FeeSchedule,
    partner: CardPartnerRef,
    repos: CardRepositories,
}

impl CardIssuer {
    pub fn new(
        ledger: WalletLedger,
        fees: FeeSchedule,
        partner: CardPartnerRef,
        repos: CardRepositories,
    ) -> Self {
        Self {
            ledger,
            fees,
            partner,
            repos,
        }
    }

    #[instrument(
        skip(self, request),
        fields(company_id = %request.company_id, card_type = %request.card_type)
    )]
    pub async fn create_card(&self, request: CreateCardRequest) -> Result<Card> {
        let directory = &self.repos.directory;
        let address = directory
            .billing_address(request.company_id)
            .await?
            .ok_or_else(|| SpendError::PrerequisiteMissing("billing address".to_string()))?;
        let company = directory
            .company(request.company_id)
            .await?
            .ok_or_else(|| SpendError::PrerequisiteMissing("company".to_string()))?;
        let wallet = self
            .ledger
            .wallet_for_company(request.company_id)
            .await?
            .ok_or_else(|| SpendError::PrerequisiteMissing("wallet".to_string()))?;
        if !wallet.is_active() {
            return Err(SpendError::WalletInactive(wallet.id));
        }

        let charges = self.fees.issuance_charges(request.card_type).await?;
        let total: MinorUnits = charges.iter().map(|c| c.amount).sum();
        if wallet.available_credit <= total {
            return Err(SpendError::InsufficientCredit {
                available: wallet.available_credit,
                requested: total,
            });
        }

        let mut issuance =
            PendingIssuance::start(request.company_id, wallet.id, request.card_type, total);
        self.repos.issuances.store(issuance.clone()).await?;

        let profile = CustomerProfile {
            company_name: company.name,
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            email: request.email.clone(),
            phone: request.phone.clone(),
            status: CardStatus::Active,
            billing_address: address,
        };
        let partner_customer = match self.partner.create_customer(&profile).await {
            Ok(customer) => customer,
            Err(err) => return self.abandon(issuance, err).await,
        };
        issuance.partner_customer_id = Some(partner_customer.id.clone());

        let pan = match request.card_type {
            CardType::Physical => match self.repos.pans.take_first().await {
                Ok(Some(pan)) => Some(pan),
                Ok(None) => return self.abandon(issuance, SpendError::PanExhausted).await,
                Err(err) => return self.abandon(issuance, err).await,
            },
            CardType::Virtual => None,
        };
        issuance.pan_number = pan.as_ref().map(|p| p.number.clone());

        let card_request = PartnerCardRequest {
            customer_id: partner_customer.id.clone(),
            r#type: request.card_type,
            brand: request.brand.clone(),
            status: CardStatus::Active,
            number: pan.as_ref().map(|p| p.number.clone()),
            spending_controls: request.spending_controls,
        };
        let partner_card = match self.partner.create_card(&card_request).await {
            Ok(card) => card,
            Err(err) => {
                if let Some(pan) = &pan
                    && let Err(release_err) = self.repos.pans.release(&pan.number).await
                {
                    warn!(pan = %pan.number, %release_err, "could not return PAN to the pool");
                }
                return self.abandon(issuance, err).await;
            }
        };
        issuance.partner_card_id = Some(partner_card.id.clone());
        issuance.advance(IssuanceState::PartnerCreated);
        if let Err(err) = self.repos.issuances.store(issuance.clone()).await {
            return Err(self.compensate(&mut issuance, err).await);
        }

        let customer = Customer {
            id: Uuid::new_v4(),
            company_id: request.company_id,
            wallet_id: wallet.id,
            partner_customer_id: partner_customer.id,
            billing_address: partner_customer.billing_address,
            created_at: Utc::now(),
        };
        let card = card_from_partner(&request, &wallet, &customer, partner_card);

        match self
            .complete_issuance(&mut issuance, &wallet, customer, card, &charges)
            .await
        {
            Ok(card) => {
                info!(card_id = %card.id, total = %total, "card issued");
                Ok(card)
            }
            Err(err) => Err(self.compensate(&mut issuance, err).await),
        }
    }

    /// Local steps that run after the partner confirmed the card.
    async fn complete_issuance(
        &self,
        issuance: &mut PendingIssuance,
        wallet: &Wallet,
        customer: Customer,
        card: Card,
        charges: &[IssuanceCharge],
    ) -> Result<Card> {
        self.repos.customers.store(customer).await?;
        issuance.card_id = Some(card.id);

        let fees: Vec<Transaction> = charges
            .iter()
            .map(|charge| {
                Transaction::debit(
                    wallet,
                    charge.amount,
                    charge.identifier.issuance_transaction_type(),
                    Channel::Web,
                    TransactionStatus::Success,
                )
                .with_card(&card)
                .with_note(format!("{} {} card fee", card.r#type, charge.identifier))
            })
            .collect();
        self.ledger
            .post(wallet.id, Entry::Debit, issuance.total_charge, |_| Ok(fees))
            .await?;
        issuance.mark_debited();
        self.repos.issuances.store(issuance.clone()).await?;

        self.repos.cards.store(card.clone()).await?;

        issuance.advance(IssuanceState::Completed);
        self.repos.issuances.store(issuance.clone()).await?;
        Ok(card)
    }

    /// Closes an issuance that failed before the partner created a card.
    async fn abandon<T>(&self, mut issuance: PendingIssuance, err: SpendError) -> Result<T> {
        warn!(issuance_id = %issuance.id, %err, "card issuance aborted");
        issuance.fail(IssuanceState::Failed, &err);
        self.repos.issuances.store(issuance).await?;
        Err(err)
    }

    /// Undoes the partner card and any wallet charge. Returns the error to surface.
    async fn compensate(&self, issuance: &mut PendingIssuance, cause: SpendError) -> SpendError {
        match self.run_compensation(issuance).await {
            Ok(()) => {
                warn!(issuance_id = %issuance.id, %cause, "card issuance compensated");
                issuance.fail(IssuanceState::Compensated, &cause);
                if let Err(err) = self.repos.issuances.store(issuance.clone()).await {
                    warn!(
                        issuance_id = %issuance.id,
                        %err,
                        "could not persist compensated issuance"
                    );
                }
                cause
            }
            Err(comp_err) => {
                let reason = format!("{cause}; compensation failed: {comp_err}");
                error!(
                    issuance_id = %issuance.id,
                    %reason,
                    "card issuance needs manual reconciliation"
                );
                issuance.fail(IssuanceState::CompensationFailed, &reason);
                if let Err(err) = self.repos.issuances.store(issuance.clone()).await {
                    error!(
                        issuance_id = %issuance.id,
                        %err,
                        "could not persist failed compensation"
                    );
                }
                SpendError::ReconciliationRequired {
                    issuance: issuance.id,
                    reason,
                }
            }
        }
    }

    async fn run_compensation(&self, issuance: &mut PendingIssuance) -> Result<()> {
        let mut controls = SpendingControls::default();
        if let Some(card_id) = issuance.card_id
            && let Some(mut card) = self.repos.cards.get(card_id).await?
        {
            controls = card.spending_controls;
            card.status = CardStatus::Cancelled;
            card.deleted_at = Some(Utc::now());
            self.repos.cards.store(card).await?;
        }

        if let Some(partner_card_id) = &issuance.partner_card_id {
            self.partner
                .cancel_card(partner_card_id, CardStatus::Cancelled, &controls)
                .await?;
        }

        if issuance.is_charged() {
            let total = issuance.total_charge;
            let note = format!("card issuance {} reversed", issuance.id);
            let card_id = issuance.card_id;
            self.ledger
                .post(issuance.wallet_id, Entry::Credit, total, |wallet| {
                    let refund = Transaction::credit(
                        wallet,
                        total,
                        TransactionType::Refund,
                        Channel::Web,
                        TransactionStatus::Success,
                    )
                    .with_note(note);
                    Ok(vec![Transaction { card_id, ..refund }])
                })
                .await?;
            issuance.mark_refunded();
        }
        Ok(())
    }

    /// Compensates issuances left unresolved for longer than `older_than`.
    ///
    /// Records that never reached the partner are marked failed.
    #[instrument(skip(self))]
    pub async fn reconcile_pending_issuances(
        &self,
        older_than: Duration,
    ) -> Result<ReconciliationReport> {
        let cutoff = Utc::now() - older_than;
        let mut report = ReconciliationReport::default();

        for mut issuance in self.repos.issuances.find_unresolved().await? {
            if issuance.updated_at > cutoff {
                continue;
            }
            if issuance.state == IssuanceState::Started {
                issuance.fail(IssuanceState::Failed, "abandoned before partner card creation");
                self.repos.issuances.store(issuance.clone()).await?;
                report.failed.push(issuance.id);
                continue;
            }

            match self.run_compensation(&mut issuance).await {
                Ok(()) => {
                    issuance.advance(IssuanceState::Compensated);
                    self.repos.issuances.store(issuance.clone()).await?;
                    report.compensated.push(issuance.id);
                }
                Err(err) => {
                    error!(issuance_id = %issuance.id, %err, "reconciliation attempt failed");
                    issuance.fail(IssuanceState::CompensationFailed, &err);
                    self.repos.issuances.store(issuance.clone()).await?;
                    report.still_failing.push(issuance.id);
                }
            }
        }

        info!(
            compensated = report.compensated.len(),
            failed = report.failed.len(),
            still_failing = report.still_failing.len(),
            "reconciliation sweep finished"
        );
        Ok(report)
    }

    pub async fn card(&self, card_id: Uuid) -> Result<Card> {
        self.repos
            .cards
            .get(card_id)
            .await?
            .filter(|card| card.deleted_at.is_none())
            .ok_or_else(|| SpendError::not_found("card", card_id))
    }

    pub async fn cards_for_company(&self, company_id: Uuid) -> Result<Vec<Card>> {
        Ok(self
            .repos
            .cards
            .find_by_company(company_id)
            .await?
            .into_iter()
            .filter(|card| card.deleted_at.is_none())
            .collect())
    }

    /// Pushes a status/spending-control patch to the partner, then persists it.
    #[instrument(skip(self, update))]
    pub async fn update_card(&self, card_id: Uuid, update: CardUpdate) -> Result<Card> {
        if update.is_empty() {
            return Err(SpendError::ValidationError("empty card update".to_string()));
        }
        if update.status == Some(CardStatus::Cancelled) {
            return Err(SpendError::ValidationError(
                "use cancel_card to cancel a card".to_string(),
            ));
        }
        let mut card = self.card(card_id).await?;
        let controls = card.apply_update(&update);
        self.partner
            .update_card(&card.partner_card_id, card.status, &controls)
            .await?;
        self.repos.cards.store(card.clone()).await?;
        Ok(card)
    }

    pub async fn lock_card(&self, card_id: Uuid) -> Result<Card> {
        self.set_lock(card_id, true).await
    }

    pub async fn unlock_card(&self, card_id: Uuid) -> Result<Card> {
        self.set_lock(card_id, false).await
    }

    async fn set_lock(&self, card_id: Uuid, lock: bool) -> Result<Card> {
        let mut card = self.card(card_id).await?;
        card.lock = lock;
        card.updated_at = Utc::now();
        self.repos.cards.store(card.clone()).await?;
        info!(%card_id, lock, "card lock changed");
        Ok(card)
    }

    /// Cancels at the partner, then soft-deletes the local card.
    #[instrument(skip(self))]
    pub async fn cancel_card(&self, card_id: Uuid, status: &str) -> Result<Card> {
        let status: CardStatus = status.parse()?;
        let mut card = self.card(card_id).await?;
        self.partner
            .cancel_card(&card.partner_card_id, status, &card.spending_controls)
            .await?;

        let now = Utc::now();
        card.status = status;
        card.deleted_at = Some(now);
        card.updated_at = now;
        self.repos.cards.store(card.clone()).await?;
        Ok(card)
    }

    pub async fn change_card_pin(&self, card_id: Uuid, old_pin: &str, new_pin: &str) -> Result<()> {
        let card = self.card(card_id).await?;
        self.partner
            .change_pin(&card.partner_card_id, old_pin, new_pin)
            .await
    }

    /// Adds card numbers to the physical PAN pool.
    pub async fn add_pans(&self, numbers: Vec<String>) -> Result<usize> {
        let pans: Vec<Pan> = numbers
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .map(Pan::new)
            .collect();
        let count = pans.len();
        self.repos.pans.add(pans).await?;
        Ok(count)
    }
}

fn card_from_partner(
    request: &CreateCardRequest,
    wallet: &Wallet,
    customer: &Customer,
    partner: PartnerCard,
) -> Card {
    let now = Utc::now();
    let brand = capitalize_brand(&partner.brand);
    Card {
        id: Uuid::new_v4(),
        company_id: request.company_id,
        wallet_id: wallet.id,
        customer_id: customer.id,
        partner_customer_id: customer.partner_customer_id.clone(),
        partner_card_id: partner.id,
        r#type: request.card_type,
        summary: format!("{} {} card {}", brand, request.card_type, partner.masked_pan),
        brand,
        currency: partner.currency,
        masked_pan: partner.masked_pan,
        expiry_month: partner.expiry_month,
        expiry_year: partner.expiry_year,
        status: partner.status,
        lock: false,
        spending_controls: partner.spending_controls,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}
