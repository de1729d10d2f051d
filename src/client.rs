use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::{DashboardError, Result};
use crate::models::{PriceObservation, RawOpportunity, Token};

/// Source of the three collections the dashboard renders.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn tokens(&self) -> Result<Vec<Token>>;
    async fn price_records(&self) -> Result<Vec<PriceObservation>>;
    async fn opportunities(&self) -> Result<Vec<RawOpportunity>>;
}

pub struct HttpDashboardApi {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpDashboardApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join replaces the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { base_url, client })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let url = self.endpoint(path)?;
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::Status {
                endpoint: url.to_string(),
                status,
            });
        }

        let body = response.text().await?;
        let items: Vec<T> = decode_records(&body, path)?;

        log::debug!("Fetched {} records from {}", items.len(), url);
        Ok(items)
    }
}

/// Decode a JSON array record by record. The body must be an array; elements
/// that do not fit `T` are logged and skipped so one bad row cannot fail the
/// whole collection.
pub fn decode_records<T: DeserializeOwned>(body: &str, collection: &str) -> Result<Vec<T>> {
    let elements: Vec<Value> = serde_json::from_str(body)?;
    let total = elements.len();

    let records: Vec<T> = elements
        .into_iter()
        .enumerate()
        .filter_map(|(index, element)| match serde_json::from_value(element) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping malformed {} record #{}: {}", collection, index, e);
                None
            }
        })
        .collect();

    if records.len() < total {
        log::warn!("Kept {} of {} {} records", records.len(), total, collection);
    }

    Ok(records)
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn tokens(&self) -> Result<Vec<Token>> {
        self.get_list("tokens").await
    }

    async fn price_records(&self) -> Result<Vec<PriceObservation>> {
        self.get_list("price_records").await
    }

    async fn opportunities(&self) -> Result<Vec<RawOpportunity>> {
        self.get_list("arbitrage_opportunities").await
    }
}
