//! Minimal client for the account routes.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use thiserror::Error;

/// Errors raised while talking to the server.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with an unexpected status.
    #[error("Unexpected status {status}: {body}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Response body.
        body: Value,
    },
}

/// Outcome of one withdrawal: the status and the decoded body.
pub type Outcome = Result<(StatusCode, Value), ProbeError>;

/// Client for `/accounts`.
pub struct LedgerClient {
    client: Client,
    base_url: String,
}

impl LedgerClient {
    /// Creates a client for `base_url` (e.g. `http://localhost:3000/api`).
    pub fn new(base_url: &str) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(2))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST `/accounts`.
    pub async fn create_account(&self, initial_balance: Decimal) -> Result<Value, ProbeError> {
        let response = self
            .client
            .post(format!("{}/accounts", self.base_url))
            .json(&json!({ "initialBalance": initial_balance }))
            .send()
            .await?;

        Self::expect_success(response).await
    }

    /// GET `/accounts/{id}`.
    pub async fn get_account(&self, id: &str) -> Result<Value, ProbeError> {
        let response = self
            .client
            .get(format!("{}/accounts/{id}", self.base_url))
            .send()
            .await?;

        Self::expect_success(response).await
    }

    /// PATCH `/accounts/{id}` with a withdrawal. Non-2xx statuses are
    /// outcomes, not errors.
    pub async fn withdraw(&self, id: &str, amount: Decimal) -> Outcome {
        let response = self
            .client
            .patch(format!("{}/accounts/{id}", self.base_url))
            .json(&json!({ "amount": amount, "type": "withdraw" }))
            .send()
            .await?;

        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    async fn expect_success(response: reqwest::Response) -> Result<Value, ProbeError> {
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            Ok(body)
        } else {
            Err(ProbeError::Status { status, body })
        }
    }
}
