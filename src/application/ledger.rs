use crate::domain::money::MinorUnits;
use crate::domain::ports::WalletStoreRef;
use crate::domain::transaction::Transaction;
use crate::domain::wallet::{Entry, Wallet};
use crate::error::{Result, SpendError};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// The only component allowed to mutate wallet balances.
///
/// Every mutation runs under the store's exclusive row lock: the snapshot is read, checked
/// and written back while the lock is held, and any failure rolls the guard back so no
/// caller observes a half-applied balance. Whether a contended lock fails fast or waits is
/// decided by the store's [`LockPolicy`](crate::domain::ports::LockPolicy).
#[derive(Clone)]
pub struct WalletLedger {
    wallets: WalletStoreRef,
}

impl WalletLedger {
    pub fn new(wallets: WalletStoreRef) -> Self {
        Self { wallets }
    }

    /// Creates the single wallet of a company. The store refuses a second one atomically
    /// with `Conflict`.
    #[instrument(skip(self, account_id, customer_id))]
    pub async fn open_wallet(
        &self,
        company_id: Uuid,
        account_id: &str,
        customer_id: &str,
    ) -> Result<Wallet> {
        let wallet = Wallet::new(company_id, account_id, customer_id);
        self.wallets.insert(wallet.clone()).await?;
        info!(wallet_id = %wallet.id, "wallet opened");
        Ok(wallet)
    }

    pub async fn wallet(&self, wallet_id: Uuid) -> Result<Wallet> {
        self.wallets
            .get(wallet_id)
            .await?
            .ok_or_else(|| SpendError::not_found("wallet", wallet_id))
    }

    pub async fn wallet_for_company(&self, company_id: Uuid) -> Result<Option<Wallet>> {
        self.wallets.get_by_company(company_id).await
    }

    pub async fn wallets(&self) -> Result<Vec<Wallet>> {
        self.wallets.get_all().await
    }

    /// Applies a balance mutation expressed in major units.
    pub async fn update_balance(
        &self,
        wallet_id: Uuid,
        entry: Entry,
        amount: Decimal,
    ) -> Result<Wallet> {
        let amount = MinorUnits::positive_from_major(amount)?;
        self.update_balance_minor(wallet_id, entry, amount).await
    }

    pub async fn update_balance_minor(
        &self,
        wallet_id: Uuid,
        entry: Entry,
        amount: MinorUnits,
    ) -> Result<Wallet> {
        let (wallet, _) = self
            .post(wallet_id, entry, amount, |_| Ok(Vec::new()))
            .await?;
        Ok(wallet)
    }

    /// Applies a balance mutation and writes the records `journal` builds in the same
    /// commit, so a retried caller never finds the balance moved without its records.
    ///
    /// `journal` sees the mutated wallet. An error from it rolls the mutation back.
    #[instrument(skip(self, journal), fields(amount = %amount))]
    pub async fn post<F>(
        &self,
        wallet_id: Uuid,
        entry: Entry,
        amount: MinorUnits,
        journal: F,
    ) -> Result<(Wallet, Vec<Transaction>)>
    where
        F: FnOnce(&Wallet) -> Result<Vec<Transaction>> + Send,
    {
        if !amount.is_positive() {
            return Err(SpendError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }

        let guard = self.wallets.lock_for_update(wallet_id).await?;
        let mut wallet = guard.wallet().clone();
        if let Err(err) = wallet.apply(entry, amount) {
            guard.rollback().await?;
            debug!(%err, "balance update rejected");
            return Err(err);
        }
        let records = match journal(&wallet) {
            Ok(records) => records,
            Err(err) => {
                guard.rollback().await?;
                return Err(err);
            }
        };
        guard.commit_with(wallet.clone(), records.clone()).await?;

        debug!(available = %wallet.available_credit, records = records.len(), "balance updated");
        Ok((wallet, records))
    }

    pub async fn debit(&self, wallet_id: Uuid, amount: Decimal) -> Result<Wallet> {
        self.update_balance(wallet_id, Entry::Debit, amount).await
    }

    pub async fn credit(&self, wallet_id: Uuid, amount: Decimal) -> Result<Wallet> {
        self.update_balance(wallet_id, Entry::Credit, amount).await
    }

    /// Sets the credit ceiling, in major units.
    pub async fn set_credit_limit(&self, wallet_id: Uuid, limit: Decimal) -> Result<Wallet> {
        let limit = MinorUnits::from_major(limit)?;
        self.set_credit_limit_minor(wallet_id, limit).await
    }

    /// Goes through the row lock so a concurrent balance update is never lost.
    #[instrument(skip(self), fields(limit = %limit))]
    pub async fn set_credit_limit_minor(
        &self,
        wallet_id: Uuid,
        limit: MinorUnits,
    ) -> Result<Wallet> {
        if limit < MinorUnits::ZERO {
            return Err(SpendError::ValidationError(
                "Credit limit cannot be negative".to_string(),
            ));
        }

        let guard = self.wallets.lock_for_update(wallet_id).await?;
        let mut wallet = guard.wallet().clone();
        wallet.set_credit_limit(limit);
        guard.commit(wallet.clone()).await?;

        info!(available = %wallet.available_credit, "credit limit set");
        Ok(wallet)
    }

    /// Soft-deletes a wallet. Further debits are refused, credits still land.
    #[instrument(skip(self))]
    pub async fn deactivate_wallet(&self, wallet_id: Uuid) -> Result<Wallet> {
        let guard = self.wallets.lock_for_update(wallet_id).await?;
        let mut wallet = guard.wallet().clone();
        if !wallet.is_active() {
            guard.rollback().await?;
            warn!("wallet already inactive");
            return Ok(wallet);
        }
        wallet.deactivate();
        guard.commit(wallet.clone()).await?;
        Ok(wallet)
    }
}
