use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::payment::{Deposit, DepositStatus, PaymentGateway};

/// Client for the QRIS aggregator. Both calls are GETs against a single
/// endpoint dispatched by an `action` query parameter.
#[derive(Clone)]
pub struct QrisGateway {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    merchant_code: String,
}

#[derive(Debug, Deserialize)]
struct DepositResponse {
    status: bool,
    #[serde(default)]
    data: Option<DepositData>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DepositData {
    kode_deposit: String,
    link_qr: String,
    #[serde(default)]
    expired: String,
}

#[derive(Debug, Deserialize)]
struct MutationResponse {
    status: bool,
    #[serde(default)]
    data: Option<MutationData>,
}

#[derive(Debug, Deserialize)]
struct MutationData {
    #[serde(default)]
    status: String,
}

impl QrisGateway {
    pub fn new(api_url: String, api_key: String, merchant_code: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            merchant_code,
        }
    }
}

#[async_trait]
impl PaymentGateway for QrisGateway {
    async fn create_deposit(&self, order_id: &str, amount: i64) -> Result<Deposit> {
        let resp: DepositResponse = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "get-deposit"),
                ("kode", order_id),
                ("nominal", &amount.to_string()),
                ("merchant", &self.merchant_code),
                ("apikey", &self.api_key),
            ])
            .send()
            .await
            .context("QRIS deposit request failed")?
            .json()
            .await
            .context("QRIS deposit response was not valid JSON")?;

        if !resp.status {
            return Err(anyhow!(
                "QRIS refused deposit creation: {}",
                resp.message.unwrap_or_else(|| "no message".to_string())
            ));
        }
        let data = resp
            .data
            .ok_or_else(|| anyhow!("QRIS deposit response missing data"))?;

        info!(order_id, amount, deposit_code = %data.kode_deposit, "Created QRIS deposit");
        Ok(Deposit {
            deposit_code: data.kode_deposit,
            qr_url: data.link_qr,
            expires_at: data.expired,
        })
    }

    async fn deposit_status(&self, deposit_code: &str) -> Result<DepositStatus> {
        let resp: MutationResponse = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "get-mutasi"),
                ("kode", deposit_code),
                ("merchant", &self.merchant_code),
                ("apikey", &self.api_key),
            ])
            .send()
            .await
            .context("QRIS mutation request failed")?
            .json()
            .await
            .context("QRIS mutation response was not valid JSON")?;

        // The aggregator reports paid deposits with the exact marker "Success".
        let paid = resp.status
            && resp
                .data
                .map(|d| d.status == "Success")
                .unwrap_or(false);
        Ok(if paid {
            DepositStatus::Paid
        } else {
            DepositStatus::Unpaid
        })
    }

    fn name(&self) -> &str {
        "qris"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_response_decodes() {
        let body = r#"{
            "status": true,
            "data": {
                "kode_deposit": "DPX123",
                "link_qr": "https://qr.example/DPX123.png",
                "expired": "2025-06-01 12:10:00"
            }
        }"#;
        let resp: DepositResponse = serde_json::from_str(body).unwrap();
        assert!(resp.status);
        let data = resp.data.unwrap();
        assert_eq!(data.kode_deposit, "DPX123");
        assert_eq!(data.link_qr, "https://qr.example/DPX123.png");
    }

    #[test]
    fn refused_deposit_decodes_without_data() {
        let body = r#"{"status": false, "message": "invalid api key"}"#;
        let resp: DepositResponse = serde_json::from_str(body).unwrap();
        assert!(!resp.status);
        assert!(resp.data.is_none());
        assert_eq!(resp.message.as_deref(), Some("invalid api key"));
    }

    #[test]
    fn mutation_success_requires_exact_marker() {
        let paid: MutationResponse =
            serde_json::from_str(r#"{"status": true, "data": {"status": "Success"}}"#).unwrap();
        assert_eq!(paid.data.unwrap().status, "Success");

        let pending: MutationResponse =
            serde_json::from_str(r#"{"status": true, "data": {"status": "success"}}"#).unwrap();
        assert_ne!(pending.data.unwrap().status, "Success");
    }
}
