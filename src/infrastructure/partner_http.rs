//! HTTP clients for the card-issuing and financial-data partners.
//!
//! Each client is built once at startup from immutable configuration and shared behind the
//! port traits. Transport failures, timeouts and non-success envelopes all surface as
//! [`SpendError::PartnerError`].

use crate::domain::card::{CardStatus, CardType, SpendingControls};
use crate::domain::company::Address;
use crate::domain::financials::{BalanceSnapshot, BankTransaction, DateRange};
use crate::domain::partner::{CustomerProfile, PartnerCard, PartnerCardRequest, PartnerCustomer};
use crate::domain::ports::{CardPartner, FinancialDataPartner};
use crate::error::{Result, SpendError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Connection settings for the card-issuing partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerConfig {
    pub base_url: String,
    pub api_key: String,
    /// Funding source every issued card draws from.
    pub funding_source: String,
    pub currency: String,
    pub timeout: Duration,
}

/// Connection settings for the financial-data partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinancialDataConfig {
    pub base_url: String,
    pub secret_key: String,
    pub timeout: Duration,
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(SpendError::from)
}

fn join(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// `{ statusCode, message, data }` wrapper the card partner puts around every response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    status_code: u16,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_ack(self) -> Result<Option<T>> {
        if !(200..300).contains(&self.status_code) {
            return Err(SpendError::PartnerError(format!(
                "partner returned {}: {}",
                self.status_code, self.message
            )));
        }
        Ok(self.data)
    }

    fn into_data(self) -> Result<T> {
        self.into_ack()?
            .ok_or_else(|| SpendError::PartnerError("partner response carried no data".to_string()))
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<Envelope<T>> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| {
        SpendError::PartnerError(format!("HTTP {status}: unreadable partner response: {e}"))
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireIndividual {
    first_name: String,
    last_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireCustomerRequest<'a> {
    r#type: &'static str,
    name: String,
    phone_number: String,
    email_address: String,
    status: CardStatus,
    individual: WireIndividual,
    billing_address: &'a Address,
}

impl<'a> From<&'a CustomerProfile> for WireCustomerRequest<'a> {
    fn from(profile: &'a CustomerProfile) -> Self {
        Self {
            r#type: "individual",
            name: profile.display_name(),
            phone_number: profile.phone.clone(),
            email_address: profile.email.clone(),
            status: profile.status,
            individual: WireIndividual {
                first_name: profile.first_name.clone(),
                last_name: profile.last_name.clone(),
            },
            billing_address: &profile.billing_address,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireCardRequest {
    customer_id: String,
    funding_source_id: String,
    r#type: CardType,
    brand: String,
    currency: String,
    status: CardStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    number: Option<String>,
    spending_controls: SpendingControls,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireCardUpdate<'a> {
    status: CardStatus,
    spending_controls: &'a SpendingControls,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePinChange<'a> {
    old_pin: &'a str,
    new_pin: &'a str,
}

/// Card partner client speaking the partner's JSON envelope protocol.
#[derive(Clone)]
pub struct HttpCardPartner {
    client: Client,
    config: PartnerConfig,
}

impl HttpCardPartner {
    pub fn new(config: PartnerConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout)?,
            config,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, join(&self.config.base_url, path))
            .bearer_auth(&self.config.api_key)
    }
}

#[async_trait]
impl CardPartner for HttpCardPartner {
    async fn create_customer(&self, profile: &CustomerProfile) -> Result<PartnerCustomer> {
        debug!(company = %profile.company_name, "creating partner customer");
        let envelope: Envelope<PartnerCustomer> = send(
            self.request(reqwest::Method::POST, "customers")
                .json(&WireCustomerRequest::from(profile)),
        )
        .await?;
        envelope.into_data()
    }

    async fn create_card(&self, request: &PartnerCardRequest) -> Result<PartnerCard> {
        debug!(
            customer = %request.customer_id,
            card_type = %request.r#type,
            "creating partner card"
        );
        let body = WireCardRequest {
            customer_id: request.customer_id.clone(),
            funding_source_id: self.config.funding_source.clone(),
            r#type: request.r#type,
            brand: request.brand.clone(),
            currency: self.config.currency.clone(),
            status: request.status,
            number: request.number.clone(),
            spending_controls: request.spending_controls,
        };
        let envelope: Envelope<PartnerCard> =
            send(self.request(reqwest::Method::POST, "cards").json(&body)).await?;
        envelope.into_data()
    }

    async fn update_card(
        &self,
        partner_card_id: &str,
        status: CardStatus,
        controls: &SpendingControls,
    ) -> Result<()> {
        let body = WireCardUpdate {
            status,
            spending_controls: controls,
        };
        let envelope: Envelope<serde_json::Value> = send(
            self.request(reqwest::Method::PUT, &format!("cards/{partner_card_id}"))
                .json(&body),
        )
        .await?;
        envelope.into_ack().map(drop)
    }

    async fn cancel_card(
        &self,
        partner_card_id: &str,
        status: CardStatus,
        controls: &SpendingControls,
    ) -> Result<()> {
        debug!(card = partner_card_id, ?status, "cancelling partner card");
        self.update_card(partner_card_id, status, controls).await
    }

    async fn change_pin(&self, partner_card_id: &str, old_pin: &str, new_pin: &str) -> Result<()> {
        let envelope: Envelope<serde_json::Value> = send(
            self.request(reqwest::Method::PUT, &format!("cards/{partner_card_id}/pin"))
                .json(&WirePinChange { old_pin, new_pin }),
        )
        .await?;
        envelope.into_ack().map(drop)
    }
}

/// `{ data: [...] }` list wrapper of the financial-data partner.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct WireList<T> {
    #[serde(default)]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRegisteredCompany {
    approved_name: String,
}

/// Financial-data partner client used by underwriting.
#[derive(Clone)]
pub struct HttpFinancialDataClient {
    client: Client,
    config: FinancialDataConfig,
}

impl HttpFinancialDataClient {
    pub fn new(config: FinancialDataConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout)?,
            config,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .client
            .get(join(&self.config.base_url, path))
            .header("mono-sec-key", &self.config.secret_key)
            .query(query)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SpendError::PartnerError(format!(
                "financial data partner returned HTTP {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

fn window_query(range: DateRange) -> Vec<(&'static str, String)> {
    vec![
        ("start", range.from.format("%d-%m-%Y").to_string()),
        ("end", range.to.format("%d-%m-%Y").to_string()),
    ]
}

#[async_trait]
impl FinancialDataPartner for HttpFinancialDataClient {
    async fn rc_verify(&self, company_name: &str, rc_number: &str) -> Result<String> {
        let lookup: WireList<WireRegisteredCompany> = self
            .get(
                "v1/lookup/cac",
                &[("search", company_name.to_string()), ("rc", rc_number.to_string())],
            )
            .await?;
        lookup
            .data
            .into_iter()
            .next()
            .map(|company| company.approved_name)
            .ok_or_else(|| SpendError::PartnerError(format!("no registry entry for {rc_number}")))
    }

    async fn cash_balance_history(
        &self,
        account_id: &str,
        range: DateRange,
    ) -> Result<Vec<BalanceSnapshot>> {
        let balances: WireList<BalanceSnapshot> = self
            .get(&format!("v1/accounts/{account_id}/balances"), &window_query(range))
            .await?;
        Ok(balances.data)
    }

    async fn transaction_history(
        &self,
        customer_id: &str,
        range: DateRange,
    ) -> Result<Vec<BankTransaction>> {
        let history: WireList<BankTransaction> = self
            .get(
                &format!("v1/customers/{customer_id}/transactions"),
                &window_query(range),
            )
            .await?;
        Ok(history.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_envelope_status_handling() {
        let ok: Envelope<PartnerCustomer> = serde_json::from_str(
            r#"{"statusCode": 200, "message": "ok", "data": {"_id": "cus_1"}}"#,
        )
        .unwrap();
        let customer = ok.into_data().unwrap();
        assert_eq!(customer.id, "cus_1");
        assert_eq!(customer.billing_address, Address::default());

        let refused: Envelope<PartnerCustomer> = serde_json::from_str(
            r#"{"statusCode": 400, "message": "invalid phone", "data": null}"#,
        )
        .unwrap();
        assert!(matches!(
            refused.into_data(),
            Err(SpendError::PartnerError(msg)) if msg.contains("invalid phone")
        ));
    }

    #[test]
    fn test_partner_card_wire_format() {
        let raw = r#"{
            "_id": "card_1",
            "brand": "Verve",
            "currency": "NGN",
            "maskedPan": "506321******1234",
            "expiryMonth": "09",
            "expiryYear": "2029",
            "status": "active"
        }"#;
        let card: PartnerCard = serde_json::from_str(raw).unwrap();
        assert_eq!(card.id, "card_1");
        assert_eq!(card.masked_pan, "506321******1234");
        assert_eq!(card.spending_controls, SpendingControls::default());

        let body = WireCardRequest {
            customer_id: "cus_1".to_string(),
            funding_source_id: "fund_1".to_string(),
            r#type: CardType::Virtual,
            brand: "Verve".to_string(),
            currency: "NGN".to_string(),
            status: CardStatus::Active,
            number: None,
            spending_controls: SpendingControls::default(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["customerId"], "cus_1");
        assert!(json.get("number").is_none());
    }

    #[test]
    fn test_financial_wire_format() {
        let balances: WireList<BalanceSnapshot> =
            serde_json::from_str(r#"{"data": [{"bank_balance": 1500000.50}]}"#).unwrap();
        assert_eq!(balances.data[0].bank_balance, dec!(1500000.50));

        let history: WireList<BankTransaction> =
            serde_json::from_str(r#"{"data": [{"credit": 10}, {"debit": 4}]}"#).unwrap();
        assert_eq!(history.data[0].debit, Decimal::ZERO);
        assert_eq!(history.data[1].debit, dec!(4));

        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2026, 3, 19).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 9, 19).unwrap(),
        };
        assert_eq!(window_query(range)[0].1, "19-03-2026");
        assert_eq!(join("https://api.test/", "/cards"), "https://api.test/cards");
    }
}
