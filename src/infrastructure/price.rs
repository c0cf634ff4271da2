//! USD price lookups via the Jupiter price API

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::shared::errors::AppError;

#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Current USD price of a mint. Unknown mints are an error, not 0.
    async fn price_usd(&self, mint: &str) -> Result<f64, AppError>;
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    data: HashMap<String, PriceEntry>,
}

#[derive(Debug, Deserialize)]
struct PriceEntry {
    price: f64,
}

pub struct JupiterPriceOracle {
    client: reqwest::Client,
    base_url: String,
}

impl JupiterPriceOracle {
    pub fn new(base_url: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Config(format!("http client: {e}")))?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl PriceOracle for JupiterPriceOracle {
    async fn price_usd(&self, mint: &str) -> Result<f64, AppError> {
        let url = format!("{}/price?ids={}", self.base_url, mint);
        debug!(mint, "fetching usd price");
        let response: PriceResponse = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Rpc(format!("price api: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Rpc(format!("price api: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::Rpc(format!("price api body: {e}")))?;

        response
            .data
            .get(mint)
            .map(|entry| entry.price)
            .ok_or_else(|| AppError::NotFound(format!("price for {mint}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_response_shape() {
        let body = r#"{"data":{"So11111111111111111111111111111111111111112":{"id":"So11111111111111111111111111111111111111112","price":142.5}},"timeTaken":0.001}"#;
        let parsed: PriceResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.data["So11111111111111111111111111111111111111112"].price,
            142.5
        );
    }
}
