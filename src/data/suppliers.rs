//! Supplier catalog client
//!
//! Every supplier exposes its own catalog endpoint, authenticated with a
//! bearer token, returning `{"items": [...]}`. All configured suppliers are
//! queried concurrently; one failing supplier fails the whole feed.

use std::collections::BTreeMap;

use chrono::Utc;
use futures::future::try_join_all;
use reqwest::Client;
use serde::Deserialize;

use super::{SupplierCatalog, SupplierDigest, SupplyItem};
use crate::config::SupplierCredential;
use crate::error::FetchError;

/// Client for fetching supplier catalogs
#[derive(Debug, Clone)]
pub struct SupplierClient {
    client: Client,
}

impl SupplierClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches every supplier's catalog into one digest
    pub async fn fetch_digest(
        &self,
        suppliers: &BTreeMap<String, SupplierCredential>,
    ) -> Result<SupplierDigest, FetchError> {
        let fetches = suppliers
            .iter()
            .map(|(name, credential)| self.fetch_catalog(name, credential));
        let catalogs = try_join_all(fetches).await?;

        Ok(SupplierDigest {
            suppliers: suppliers.keys().cloned().zip(catalogs).collect(),
            generated_at: Utc::now(),
            synthetic: false,
        })
    }

    /// Fetches a single supplier's catalog
    async fn fetch_catalog(
        &self,
        name: &str,
        credential: &SupplierCredential,
    ) -> Result<SupplierCatalog, FetchError> {
        let endpoint = credential
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| FetchError::MissingEndpoint(name.to_string()))?;

        let response = self
            .client
            .get(endpoint)
            .bearer_auth(&credential.api_key)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Provider {
                status: status.as_u16(),
                message: format!("{}: {}", name, text.chars().take(200).collect::<String>()),
            });
        }

        parse_catalog(&text)
    }
}

/// Parse a supplier catalog response
fn parse_catalog(body: &str) -> Result<SupplierCatalog, FetchError> {
    let response: CatalogResponse = serde_json::from_str(body)?;
    let items = response
        .items
        .into_iter()
        .map(|raw| SupplyItem {
            name: raw.name.unwrap_or_else(|| raw.sku.clone()),
            sku: raw.sku,
            unit_price: raw.unit_price,
            in_stock: raw.in_stock.unwrap_or(raw.quantity_available.is_some_and(|q| q > 0)),
            lead_time_days: raw.lead_time_days.unwrap_or(0),
        })
        .collect();
    Ok(SupplierCatalog { items })
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    items: Vec<CatalogItem>,
}

#[derive(Debug, Deserialize)]
struct CatalogItem {
    sku: String,
    name: Option<String>,
    unit_price: f64,
    in_stock: Option<bool>,
    quantity_available: Option<u32>,
    lead_time_days: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog() {
        let body = r#"{
            "items": [
                {"sku": "COF-1KG", "name": "Espresso beans 1kg", "unit_price": 24.5, "in_stock": true, "lead_time_days": 2},
                {"sku": "CUP-12", "unit_price": 0.12, "quantity_available": 0},
                {"sku": "LID-12", "unit_price": 0.05, "quantity_available": 4000, "lead_time_days": 5}
            ]
        }"#;

        let catalog = parse_catalog(body).expect("Failed to parse catalog");

        assert_eq!(catalog.items.len(), 3);
        assert_eq!(catalog.items[0].name, "Espresso beans 1kg");
        assert!(catalog.items[0].in_stock);
        assert_eq!(catalog.items[0].lead_time_days, 2);

        // Name falls back to SKU, stock derived from quantity
        assert_eq!(catalog.items[1].name, "CUP-12");
        assert!(!catalog.items[1].in_stock);
        assert_eq!(catalog.items[1].lead_time_days, 0);
        assert!(catalog.items[2].in_stock);
    }

    #[test]
    fn test_parse_catalog_missing_items() {
        assert!(matches!(parse_catalog(r#"{"products": []}"#), Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_missing_endpoint_fails_before_any_request() {
        let client = SupplierClient::new(Client::new());
        let mut suppliers = BTreeMap::new();
        suppliers.insert(
            "acme".to_string(),
            SupplierCredential {
                api_key: "k".to_string(),
                endpoint: None,
            },
        );

        match client.fetch_digest(&suppliers).await {
            Err(FetchError::MissingEndpoint(name)) => assert_eq!(name, "acme"),
            other => panic!("Expected MissingEndpoint, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_suppliers_is_empty_digest() {
        let client = SupplierClient::new(Client::new());
        let digest = client.fetch_digest(&BTreeMap::new()).await.unwrap();
        assert!(digest.suppliers.is_empty());
    }
}
