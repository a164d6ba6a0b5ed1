//! HTTP concurrency probe.
//!
//! Opens an account on a running server, fires a burst of concurrent
//! withdrawals at it, then prints the status histogram and the final
//! account state. With the defaults (1000 opening balance, 50 withdrawals
//! of 10) a correct server ends at balance 500 and version 50.
//!
//! Settings come from `TALLY_PROBE__*` environment variables:
//! `BASE_URL`, `INITIAL_BALANCE`, `OPERATIONS`, `AMOUNT`.

mod client;
mod report;

use anyhow::Context;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::client::LedgerClient;
use crate::report::Histogram;

/// Probe settings.
#[derive(Debug, Clone, Deserialize)]
struct ProbeConfig {
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default = "default_initial_balance")]
    initial_balance: Decimal,
    #[serde(default = "default_operations")]
    operations: usize,
    #[serde(default = "default_amount")]
    amount: Decimal,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_initial_balance() -> Decimal {
    Decimal::from(1000)
}

fn default_operations() -> usize {
    50
}

fn default_amount() -> Decimal {
    Decimal::from(10)
}

impl ProbeConfig {
    fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("TALLY_PROBE").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "probe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ProbeConfig::load().context("Failed to load probe configuration")?;
    let client = LedgerClient::new(&config.base_url)?;

    let account = client
        .create_account(config.initial_balance)
        .await
        .context("Failed to open probe account")?;
    info!(account = %account, "Created account");

    let id = account["id"]
        .as_str()
        .context("Account response has no id")?
        .to_string();

    let results = join_all(
        (0..config.operations).map(|_| client.withdraw(&id, config.amount)),
    )
    .await;

    let histogram = Histogram::from_results(&results);
    println!("{histogram}");

    let final_state = client.get_account(&id).await?;
    println!("Final account state: {final_state}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_scenario() {
        temp_env::with_vars_unset(
            [
                "TALLY_PROBE__BASE_URL",
                "TALLY_PROBE__INITIAL_BALANCE",
                "TALLY_PROBE__OPERATIONS",
                "TALLY_PROBE__AMOUNT",
            ],
            || {
                let config = ProbeConfig::load().unwrap();
                assert_eq!(config.base_url, "http://localhost:3000/api");
                assert_eq!(config.initial_balance, Decimal::from(1000));
                assert_eq!(config.operations, 50);
                assert_eq!(config.amount, Decimal::from(10));
            },
        );
    }

    #[test]
    fn test_environment_overrides() {
        temp_env::with_vars(
            [
                ("TALLY_PROBE__OPERATIONS", Some("200")),
                ("TALLY_PROBE__BASE_URL", Some("http://ledger:8080/api")),
            ],
            || {
                let config = ProbeConfig::load().unwrap();
                assert_eq!(config.operations, 200);
                assert_eq!(config.base_url, "http://ledger:8080/api");
            },
        );
    }
}
