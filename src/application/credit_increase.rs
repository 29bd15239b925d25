use crate::application::ledger::WalletLedger;
use crate::domain::credit::{CreditIncrease, CreditIncreaseReview, CreditIncreaseStatus};
use crate::domain::money::MinorUnits;
use crate::domain::ports::CreditIncreaseStoreRef;
use crate::error::{Result, SpendError};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

/// Requests to raise a wallet's credit limit and their review.
///
/// A wallet has at most one outstanding request.
#[derive(Clone)]
pub struct CreditIncreaseService {
    requests: CreditIncreaseStoreRef,
    ledger: WalletLedger,
}

impl CreditIncreaseService {
    pub fn new(requests: CreditIncreaseStoreRef, ledger: WalletLedger) -> Self {
        Self { requests, ledger }
    }

    #[instrument(skip(self, owner, reason))]
    pub async fn request_credit_increase(
        &self,
        company_id: Uuid,
        owner: &str,
        desired_limit: Decimal,
        reason: &str,
    ) -> Result<CreditIncrease> {
        let wallet = self
            .ledger
            .wallet_for_company(company_id)
            .await?
            .ok_or_else(|| SpendError::PrerequisiteMissing("wallet".to_string()))?;
        let desired_credit_limit = MinorUnits::positive_from_major(desired_limit)?;

        let outstanding = self
            .requests
            .find_by_wallet(wallet.id)
            .await?
            .into_iter()
            .any(|r| r.is_outstanding());
        if outstanding {
            return Err(SpendError::Conflict(format!(
                "wallet {} already has a pending credit increase",
                wallet.id
            )));
        }

        let now = Utc::now();
        let request = CreditIncrease {
            id: Uuid::new_v4(),
            company_id,
            wallet_id: wallet.id,
            owner: owner.to_string(),
            credit_limit: wallet.credit_limit,
            desired_credit_limit,
            reason: reason.to_string(),
            status: CreditIncreaseStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.requests.store(request.clone()).await?;
        info!(request_id = %request.id, "credit increase requested");
        Ok(request)
    }

    pub async fn requests_for_wallet(&self, wallet_id: Uuid) -> Result<Vec<CreditIncrease>> {
        self.requests.find_by_wallet(wallet_id).await
    }

    /// Edits a pending request and optionally decides it. Approval applies the desired limit.
    #[instrument(skip(self, review))]
    pub async fn review_credit_increase(
        &self,
        request_id: Uuid,
        review: CreditIncreaseReview,
    ) -> Result<CreditIncrease> {
        let mut request = self
            .requests
            .get(request_id)
            .await?
            .ok_or_else(|| SpendError::not_found("credit increase", request_id))?;
        if !request.is_outstanding() {
            return Err(SpendError::Conflict(format!(
                "credit increase {request_id} was already reviewed"
            )));
        }

        if let Some(desired) = review.desired_credit_limit {
            if !desired.is_positive() {
                return Err(SpendError::ValidationError(
                    "desired credit limit must be positive".to_string(),
                ));
            }
            request.desired_credit_limit = desired;
        }
        if let Some(reason) = review.reason {
            request.reason = reason;
        }
        match review.approved {
            Some(true) => {
                let wallet = self
                    .ledger
                    .set_credit_limit_minor(request.wallet_id, request.desired_credit_limit)
                    .await?;
                request.credit_limit = wallet.credit_limit;
                request.status = CreditIncreaseStatus::Approved;
            }
            Some(false) => request.status = CreditIncreaseStatus::Declined,
            None => {}
        }
        request.updated_at = Utc::now();

        self.requests.store(request.clone()).await?;
        info!(status = ?request.status, "credit increase reviewed");
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::{InMemoryCreditIncreaseStore, InMemoryWalletStore};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    async fn service() -> (CreditIncreaseService, WalletLedger, Uuid) {
        let ledger = WalletLedger::new(Arc::new(InMemoryWalletStore::new()));
        let company_id = Uuid::new_v4();
        ledger.open_wallet(company_id, "acct", "cust").await.unwrap();
        let requests = Arc::new(InMemoryCreditIncreaseStore::new());
        let service = CreditIncreaseService::new(requests, ledger.clone());
        (service, ledger, company_id)
    }

    #[tokio::test]
    async fn test_approval_applies_desired_limit() {
        let (service, ledger, company_id) = service().await;
        let request = service
            .request_credit_increase(company_id, "owner@acme.test", dec!(5_000), "expansion")
            .await
            .unwrap();
        assert_eq!(request.status, CreditIncreaseStatus::Pending);
        assert_eq!(request.desired_credit_limit, MinorUnits(500_000));

        let reviewed = service
            .review_credit_increase(
                request.id,
                CreditIncreaseReview {
                    approved: Some(true),
                    ..CreditIncreaseReview::default()
                },
            )
            .await
            .unwrap();
        assert!(reviewed.is_approved());

        let wallet = ledger.wallet(request.wallet_id).await.unwrap();
        assert_eq!(wallet.credit_limit, MinorUnits(500_000));
        assert_eq!(wallet.available_credit, MinorUnits(500_000));
    }

    #[tokio::test]
    async fn test_one_outstanding_request_per_wallet() {
        let (service, _, company_id) = service().await;
        let first = service
            .request_credit_increase(company_id, "owner", dec!(1_000), "")
            .await
            .unwrap();
        assert!(matches!(
            service
                .request_credit_increase(company_id, "owner", dec!(2_000), "")
                .await,
            Err(SpendError::Conflict(_))
        ));

        service
            .review_credit_increase(
                first.id,
                CreditIncreaseReview {
                    approved: Some(false),
                    ..CreditIncreaseReview::default()
                },
            )
            .await
            .unwrap();
        assert!(service
            .request_credit_increase(company_id, "owner", dec!(2_000), "")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_reviewed_request_is_final() {
        let (service, _, company_id) = service().await;
        let request = service
            .request_credit_increase(company_id, "owner", dec!(1_000), "")
            .await
            .unwrap();
        let decline = CreditIncreaseReview {
            approved: Some(false),
            ..CreditIncreaseReview::default()
        };
        service
            .review_credit_increase(request.id, decline.clone())
            .await
            .unwrap();
        assert!(matches!(
            service.review_credit_increase(request.id, decline).await,
            Err(SpendError::Conflict(_))
        ));
    }
}
