//! Document store REST client, speaking the same protocol as Firestore's
//! `get` / `create` / `update-with-precondition` trio.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gcp_auth::TokenProvider;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::types::{Document, Value};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub project_id: String,
    pub database_id: String,
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn from_env() -> StoreResult<Self> {
        Ok(Self {
            project_id: std::env::var("GCP_PROJECT_ID")
                .map_err(|_| StoreError::auth("GCP_PROJECT_ID not set"))?,
            database_id: std::env::var("STORE_DATABASE_ID").unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
        })
    }
}

/// Thin REST client over the document store's Firestore-shaped HTTP API.
pub struct DocStoreClient {
    http: Client,
    auth: Arc<dyn TokenProvider>,
    base_url: String,
}

impl Clone for DocStoreClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            auth: Arc::clone(&self.auth),
            base_url: self.base_url.clone(),
        }
    }
}

impl DocStoreClient {
    pub async fn new(config: StoreConfig) -> StoreResult<Self> {
        let auth = gcp_auth::provider()
            .await
            .map_err(|e| StoreError::auth(e.to_string()))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(StoreError::Network)?;

        let base_url = format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/{}/documents",
            config.project_id, config.database_id
        );

        Ok(Self { http, auth, base_url })
    }

    pub async fn from_env() -> StoreResult<Self> {
        Self::new(StoreConfig::from_env()?).await
    }

    async fn token(&self) -> StoreResult<String> {
        let token = self
            .auth
            .token(&["https://www.googleapis.com/auth/datastore"])
            .await
            .map_err(|e| StoreError::auth(e.to_string()))?;
        Ok(token.as_str().to_string())
    }

    fn doc_path(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, doc_id)
    }

    pub async fn get_document(&self, collection: &str, doc_id: &str) -> StoreResult<Option<Document>> {
        let url = self.doc_path(collection, doc_id);
        let token = self.token().await?;

        let resp = self.http.get(&url).bearer_auth(&token).send().await?;
        match resp.status() {
            StatusCode::OK => Ok(Some(resp.json().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(StoreError::request_failed(format!("GET {url} failed with {status}: {body}")))
            }
        }
    }

    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> StoreResult<Document> {
        let url = format!("{}/{}?documentId={}", self.base_url, collection, doc_id);
        let token = self.token().await?;

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&Document::new(fields))
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(resp.json().await?),
            StatusCode::CONFLICT => Err(StoreError::request_failed(format!("{collection}/{doc_id} already exists"))),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(StoreError::request_failed(format!("POST {url} failed with {status}: {body}")))
            }
        }
    }

    /// Update a document, requiring it to currently have `update_time` (optimistic
    /// concurrency). A racing writer that wins leaves this call with
    /// `StoreError::PreconditionFailed`, so the caller can re-read and retry.
    pub async fn update_document_with_precondition(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_time: &str,
    ) -> StoreResult<Document> {
        let url = format!(
            "{}?currentDocument.updateTime={}",
            self.doc_path(collection, doc_id),
            urlencoding::encode(update_time)
        );
        let token = self.token().await?;

        let resp = self
            .http
            .patch(&url)
            .bearer_auth(&token)
            .json(&Document::new(fields))
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => Ok(resp.json().await?),
            StatusCode::NOT_FOUND => Err(StoreError::not_found(format!("{collection}/{doc_id}"))),
            StatusCode::FAILED_DEPENDENCY | StatusCode::PRECONDITION_FAILED => {
                Err(StoreError::PreconditionFailed(format!("{collection}/{doc_id}")))
            }
            status => {
                let body = resp.text().await.unwrap_or_default();
                if body.contains("FAILED_PRECONDITION") {
                    Err(StoreError::PreconditionFailed(format!("{collection}/{doc_id}")))
                } else {
                    Err(StoreError::request_failed(format!("PATCH {url} failed with {status}: {body}")))
                }
            }
        }
    }

    /// List every document in a collection (used by `scan_recent_dead`, which
    /// filters client-side — per-video track counts are small).
    pub async fn list_documents(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let url = format!("{}/{}", self.base_url, collection);
        let token = self.token().await?;

        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ListResponse {
            documents: Option<Vec<Document>>,
            next_page_token: Option<String>,
        }

        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut req = self.http.get(&url).bearer_auth(&token);
            if let Some(ref t) = page_token {
                req = req.query(&[("pageToken", t.as_str())]);
            }
            let resp = req.send().await?;
            match resp.status() {
                StatusCode::OK => {
                    let parsed: ListResponse = resp.json().await?;
                    out.extend(parsed.documents.unwrap_or_default());
                    page_token = parsed.next_page_token;
                    if page_token.is_none() {
                        break;
                    }
                }
                status => {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(StoreError::request_failed(format!(
                        "GET {url} failed with {status}: {body}"
                    )));
                }
            }
        }
        debug!(collection, count = out.len(), "listed documents");
        Ok(out)
    }
}
