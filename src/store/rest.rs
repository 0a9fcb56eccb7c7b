//! REST Store - hosted table API client
//!
//! Talks to a PostgREST-style endpoint (`{url}/rest/v1/{table}`) with
//! equality filters (`column=eq.value`), ordering (`order=column.asc`),
//! `PATCH` by id and `POST` inserts. Writes ask for the stored row back with
//! `Prefer: return=representation`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

use super::error::{StoreError, StoreResult};
use super::types::{Document, InvestmentBatch, InvestmentDetails, NewDocument, Table};
use super::{single_row, Store};

/// Configuration for the hosted store client
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Project URL, e.g. "https://project.example.co"
    pub url: String,
    /// Anonymous/public API key
    pub api_key: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for RestStoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            request_timeout_ms: 5000,
        }
    }
}

/// Hosted table store client
pub struct RestStore {
    client: Client,
    config: RestStoreConfig,
}

impl RestStore {
    pub fn new(config: RestStoreConfig) -> StoreResult<Self> {
        if config.url.trim().is_empty() {
            return Err(StoreError::Config("store URL is not set".to_string()));
        }
        if config.api_key.trim().is_empty() {
            return Err(StoreError::Config("store API key is not set".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| StoreError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RestStoreConfig {
        &self.config
    }

    /// `{url}/rest/v1/{table}?{query}`
    fn table_url(&self, table: Table, query: &[String]) -> String {
        let base = self.config.url.trim_end_matches('/');
        if query.is_empty() {
            format!("{}/rest/v1/{}", base, table)
        } else {
            format!("{}/rest/v1/{}?{}", base, table, query.join("&"))
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    async fn select<T: DeserializeOwned>(&self, table: Table, query: &[String]) -> StoreResult<Vec<T>> {
        let url = self.table_url(table, query);
        let response = self.authorize(self.client.get(&url)).send().await?;
        decode(response).await
    }

    async fn patch<T: DeserializeOwned>(
        &self,
        table: Table,
        id: i64,
        body: &impl Serialize,
    ) -> StoreResult<T> {
        let url = self.table_url(table, &[eq("id", &id.to_string())]);
        let response = self
            .authorize(self.client.patch(&url))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let rows: Vec<T> = decode(response).await?;
        single_row(rows, &format!("{} row {}", table, id))
    }
}

/// Equality filter `column=eq.value`
pub fn eq(column: &str, value: &str) -> String {
    format!("{}=eq.{}", column, urlencoding::encode(value))
}

/// Ascending order clause
pub fn order_asc(column: &str) -> String {
    format!("order={}.asc", column)
}

fn active_filter() -> Vec<String> {
    vec!["select=*".to_string(), eq("is_active", "true")]
}

async fn decode<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
    let status = response.status();
    if status.is_success() {
        response.json::<T>().await.map_err(StoreError::from)
    } else {
        let message = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), message = %message, "Store request rejected");
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Store for RestStore {
    fn name(&self) -> &str {
        "rest"
    }

    async fn ping(&self) -> StoreResult<()> {
        let query = vec!["select=id".to_string(), "limit=1".to_string()];
        let _: Vec<serde_json::Value> = self.select(Table::InvestmentBatches, &query).await?;
        Ok(())
    }

    async fn active_batch(&self) -> StoreResult<InvestmentBatch> {
        let rows = self
            .select(Table::InvestmentBatches, &active_filter())
            .await?;
        single_row(rows, "active investment batch")
    }

    async fn active_details(&self) -> StoreResult<InvestmentDetails> {
        let rows = self
            .select(Table::InvestmentDetails, &active_filter())
            .await?;
        single_row(rows, "active investment details")
    }

    async fn active_documents(&self) -> StoreResult<Vec<Document>> {
        let mut query = active_filter();
        query.push(order_asc("display_order"));
        self.select(Table::Documents, &query).await
    }

    async fn document(&self, id: i64) -> StoreResult<Document> {
        let query = vec!["select=*".to_string(), eq("id", &id.to_string())];
        let rows = self.select(Table::Documents, &query).await?;
        single_row(rows, &format!("document {}", id))
    }

    async fn update_secured_applicants(
        &self,
        batch_id: i64,
        count: i64,
    ) -> StoreResult<InvestmentBatch> {
        self.patch(
            Table::InvestmentBatches,
            batch_id,
            &json!({ "secured_applicants": count }),
        )
        .await
    }

    async fn insert_document(&self, document: &NewDocument) -> StoreResult<Document> {
        let url = self.table_url(Table::Documents, &[]);
        let response = self
            .authorize(self.client.post(&url))
            .header("Prefer", "return=representation")
            .json(document)
            .send()
            .await?;
        let rows: Vec<Document> = decode(response).await?;
        single_row(rows, "inserted document")
    }

    async fn set_document_active(&self, id: i64, active: bool) -> StoreResult<Document> {
        self.patch(Table::Documents, id, &json!({ "is_active": active }))
            .await
    }

    async fn set_display_order(&self, id: i64, display_order: i64) -> StoreResult<Document> {
        self.patch(Table::Documents, id, &json!({ "display_order": display_order }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RestStore {
        RestStore::new(RestStoreConfig {
            url: "https://project.example.co/".to_string(),
            api_key: "anon-key".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_missing_url_or_key_is_config_error() {
        let err = RestStore::new(RestStoreConfig::default()).err().unwrap();
        assert!(matches!(err, StoreError::Config(_)));
        assert!(err.is_unavailable());

        let err = RestStore::new(RestStoreConfig {
            url: "https://project.example.co".to_string(),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn test_table_url() {
        let store = store();
        assert_eq!(
            store.table_url(Table::Documents, &[]),
            "https://project.example.co/rest/v1/documents"
        );

        let mut query = active_filter();
        query.push(order_asc("display_order"));
        assert_eq!(
            store.table_url(Table::Documents, &query),
            "https://project.example.co/rest/v1/documents?select=*&is_active=eq.true&order=display_order.asc"
        );
    }

    #[test]
    fn test_eq_encodes_value() {
        assert_eq!(eq("title", "a b&c"), "title=eq.a%20b%26c");
        assert_eq!(eq("id", "12"), "id=eq.12");
    }

    #[tokio::test]
    async fn test_unreachable_store() {
        let store = RestStore::new(RestStoreConfig {
            url: "http://127.0.0.1:9".to_string(),
            api_key: "k".to_string(),
            request_timeout_ms: 500,
        })
        .unwrap();

        let err = store.active_batch().await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
