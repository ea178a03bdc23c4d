// Library Guide - Personal Library Catalog Client
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! HTTP client for the catalog backend
//!
//! This module provides a thin HTTP client wrapper for the catalog REST API:
//! - Bearer token attached to every request
//! - Status mapping (403 → `Forbidden`, 404 → `RecordNotFound`)
//! - JSON decoding with a parse-error context window
//!
//! Requests are never retried. A failed call surfaces once and the screen
//! that issued it decides how to degrade.
//!
//! # Architecture
//!
//! The `LibraryClient` wraps `reqwest::Client` and provides:
//! - Base URL management (`http://host:port/api`)
//! - Custom headers (User-Agent, Accept, Authorization)
//! - Timeout and connection pooling configuration
//! - The [`Catalog`] implementation mapping each operation onto its path

use crate::api::{Catalog, Join, ListQuery};
use crate::config::ClientConfig;
use crate::error::{LibraryError, Result};
use crate::models::{Child, EntityKind, EntityRef, Library};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Main HTTP client for the catalog backend
///
/// # Example
/// ```rust,no_run
/// use library_guide::api::{Catalog, LibraryClient, ListQuery};
/// use library_guide::config::ClientConfig;
/// use library_guide::models::EntityKind;
///
/// # async fn example() -> library_guide::error::Result<()> {
/// let config = ClientConfig::builder()
///     .base_url("http://localhost:8080/api")
///     .access_token("token")
///     .build();
/// let client = LibraryClient::new(config)?;
///
/// let authors = client.list(1, EntityKind::Author, &ListQuery::page(25, 0)).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LibraryClient {
    /// Underlying HTTP client
    client: Client,
    /// API base URL without trailing slash (e.g., http://localhost:8080/api)
    base_url: String,
    /// Bearer token, replaced on login/logout
    access_token: Arc<RwLock<Option<String>>>,
}

impl LibraryClient {
    /// Create a new LibraryClient
    ///
    /// # Errors
    /// Returns error if the base URL does not parse or the HTTP client
    /// cannot be built
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| LibraryError::invalid_input(format!("Invalid user agent: {}", e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: Arc::new(RwLock::new(config.access_token)),
        })
    }

    /// Get the API base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the bearer token (login) or drop it (`None`, logout)
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    /// Perform a GET request
    pub async fn get<T>(&self, endpoint: &str, query: &[(String, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(Method::GET, endpoint, query, None).await?;
        self.handle_success_response(response).await
    }

    /// Perform a POST request with JSON body
    pub async fn post<T>(&self, endpoint: &str, query: &[(String, String)], body: Option<&Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(Method::POST, endpoint, query, body).await?;
        self.handle_success_response(response).await
    }

    /// Perform a PUT request with JSON body
    pub async fn put<T>(&self, endpoint: &str, body: &Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(Method::PUT, endpoint, &[], Some(body)).await?;
        self.handle_success_response(response).await
    }

    /// Perform a request whose response body is irrelevant
    pub async fn execute_no_content(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<()> {
        self.send(method, endpoint, query, None).await?;
        Ok(())
    }

    /// Send one request and map non-success statuses onto errors
    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(method = %method, url = %url, "catalog request");

        let mut builder = self
            .client
            .request(method, &url)
            .headers(self.build_auth_headers().await?);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            LibraryError::network_error(format!("Network request failed: {}", e))
        })?;

        match response.status() {
            s if s.is_success() => Ok(response),
            StatusCode::FORBIDDEN => {
                debug!(endpoint = %endpoint, "catalog request forbidden");
                Err(LibraryError::Forbidden {
                    endpoint: endpoint.to_string(),
                })
            }
            StatusCode::NOT_FOUND => Err(LibraryError::not_found(endpoint.to_string())),
            _ => self.handle_error_response(response).await,
        }
    }

    /// Build authentication headers from the current token
    async fn build_auth_headers(&self) -> Result<HeaderMap> {
        let token = self.access_token.read().await;
        let mut headers = HeaderMap::new();

        if let Some(ref token) = *token {
            let auth_value = format!("Bearer {}", token);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| LibraryError::invalid_input(format!("Invalid auth token: {}", e)))?,
            );
        }

        Ok(headers)
    }

    /// Handle successful HTTP response
    async fn handle_success_response<T>(&self, response: Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let url = response.url().clone();

        // Get response text first so we can report it on parse error
        let response_text = response.text().await.map_err(|e| LibraryError::ApiRequestFailed {
            message: format!("Failed to read response body: {}", e),
            status_code: Some(status.as_u16()),
            endpoint: Some(url.path().to_string()),
        })?;

        match serde_json::from_str::<T>(&response_text) {
            Ok(data) => Ok(data),
            Err(e) => {
                // Context around the error column, clamped to char boundaries
                let error_col = e.column();
                let mut start = error_col.saturating_sub(200).min(response_text.len());
                let mut end = (error_col + 200).min(response_text.len());
                while !response_text.is_char_boundary(start) {
                    start -= 1;
                }
                while !response_text.is_char_boundary(end) {
                    end += 1;
                }
                let context = &response_text[start..end];

                Err(LibraryError::InvalidApiResponse {
                    message: format!("Parse error: {} at col {}. Context: ...{}...", e, error_col, context),
                    response_body: Some(response_text),
                })
            }
        }
    }

    /// Handle error HTTP response
    async fn handle_error_response<T>(&self, response: Response) -> Result<T> {
        let status = response.status();
        let url = response.url().clone();
        let error_body = response.text().await.unwrap_or_default();
        let message = extract_message(&error_body)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

        Err(LibraryError::api_failed(
            message,
            Some(status.as_u16()),
            Some(self.extract_endpoint_from_url(url.as_str())),
        ))
    }

    /// Extract endpoint path from full URL
    fn extract_endpoint_from_url(&self, url: &str) -> String {
        url.strip_prefix(&self.base_url).unwrap_or(url).to_string()
    }

    async fn get_children(&self, kind: EntityKind, endpoint: &str, query: &[(String, String)]) -> Result<Vec<Child>> {
        let rows: Vec<Value> = self.get(endpoint, query).await?;
        rows.into_iter().map(|row| Child::from_json(kind, row)).collect()
    }
}

/// Pull the `message` field out of a backend error body
fn extract_message(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(json) => json
            .get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string()),
        Err(_) => Some(body.trim().to_string()),
    }
}

// ============================================================================
// PATHS
// ============================================================================

/// `/{segment}/{libraryId}`
pub fn collection_path(kind: EntityKind, library_id: i64) -> String {
    format!("/{}/{}", kind.segment(), library_id)
}

/// `/{segment}/{libraryId}/{id}`
pub fn entity_path(target: EntityRef, library_id: i64) -> String {
    format!("/{}/{}/{}", target.kind.segment(), library_id, target.id)
}

/// List endpoint for a query: `/name/{name}`, `/active`, or the collection
pub fn list_path(kind: EntityKind, library_id: i64, query: &ListQuery) -> String {
    let base = collection_path(kind, library_id);
    match query.name.as_deref() {
        Some(name) => format!("{}/name/{}", base, urlencoding::encode(name)),
        None if query.active_only => format!("{}/active", base),
        None => base,
    }
}

/// `/{parent}/{libraryId}/{parentId}/{children}`
pub fn related_path(parent: EntityRef, kind: EntityKind, library_id: i64) -> String {
    format!("{}/{}", entity_path(parent, library_id), kind.segment())
}

/// `/{segment}/{libraryId}/exact/{name}`
pub fn exact_path(kind: EntityKind, library_id: i64, name: &str) -> String {
    format!(
        "{}/exact/{}",
        collection_path(kind, library_id),
        urlencoding::encode(name)
    )
}

/// `withX=true` for every relationship of `kind`
fn with_all_children(kind: EntityKind) -> Vec<(String, String)> {
    let children: &[EntityKind] = match kind {
        EntityKind::Author => &[EntityKind::Series, EntityKind::Story, EntityKind::Volume],
        EntityKind::Series => &[EntityKind::Author, EntityKind::Story],
        EntityKind::Story => &[EntityKind::Author, EntityKind::Series, EntityKind::Volume],
        EntityKind::Volume => &[EntityKind::Author, EntityKind::Story],
        EntityKind::Library => &[],
    };
    children
        .iter()
        .map(|k| (k.with_flag().to_string(), "true".to_string()))
        .collect()
}

// ============================================================================
// CATALOG IMPLEMENTATION
// ============================================================================

#[async_trait]
impl Catalog for LibraryClient {
    async fn libraries(&self) -> Result<Vec<Library>> {
        self.get("/libraries", &[]).await
    }

    async fn library(&self, id: i64) -> Result<Library> {
        self.get(&format!("/libraries/{}", id), &[]).await
    }

    async fn list(&self, library_id: i64, kind: EntityKind, query: &ListQuery) -> Result<Vec<Child>> {
        let path = list_path(kind, library_id, query);
        self.get_children(kind, &path, &query.to_pairs()).await
    }

    async fn list_related(
        &self,
        library_id: i64,
        parent: EntityRef,
        kind: EntityKind,
        query: &ListQuery,
    ) -> Result<Vec<Child>> {
        let path = related_path(parent, kind, library_id);
        let mut pairs = query.to_pairs();
        if let Some(ref name) = query.name {
            pairs.push(("name".to_string(), name.clone()));
        }
        self.get_children(kind, &path, &pairs).await
    }

    async fn find(&self, library_id: i64, target: EntityRef, with_children: bool) -> Result<Child> {
        let query = if with_children {
            with_all_children(target.kind)
        } else {
            Vec::new()
        };
        let row: Value = self.get(&entity_path(target, library_id), &query).await?;
        Child::from_json(target.kind, row)
    }

    async fn find_exact(&self, library_id: i64, kind: EntityKind, name: &str) -> Result<Option<Child>> {
        match self.get::<Value>(&exact_path(kind, library_id, name), &[]).await {
            Ok(row) => Ok(Some(Child::from_json(kind, row)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn insert(&self, library_id: i64, child: &Child) -> Result<Child> {
        let mut body = child.without_relations();
        body.set_library_id(library_id);
        let body = serde_json::to_value(&body)?;
        let row: Value = self
            .post(&collection_path(child.kind(), library_id), &[], Some(&body))
            .await?;
        Child::from_json(child.kind(), row)
    }

    async fn update(&self, library_id: i64, child: &Child) -> Result<Child> {
        let body = serde_json::to_value(child.without_relations())?;
        let row: Value = self.put(&entity_path(child.entity_ref(), library_id), &body).await?;
        Child::from_json(child.kind(), row)
    }

    async fn remove(&self, library_id: i64, target: EntityRef) -> Result<Child> {
        let response = self
            .send(Method::DELETE, &entity_path(target, library_id), &[], None)
            .await?;
        let row: Value = self.handle_success_response(response).await?;
        Child::from_json(target.kind, row)
    }

    async fn include(&self, library_id: i64, join: &Join) -> Result<()> {
        self.execute_no_content(Method::POST, &join.path(library_id), &join.query_pairs())
            .await
    }

    async fn exclude(&self, library_id: i64, join: &Join) -> Result<()> {
        self.execute_no_content(Method::DELETE, &join.path(library_id), &[])
            .await
    }
}

// ===== TESTS =====

#[cfg(test)]
mod tests {
    use super::*;

    fn r(kind: EntityKind, id: i64) -> EntityRef {
        EntityRef::new(kind, id)
    }

    #[test]
    fn test_list_path_prefers_name_search() {
        let query = ListQuery::page(25, 0).named("Le Guin").active();
        assert_eq!(list_path(EntityKind::Author, 3, &query), "/authors/3/name/Le%20Guin");

        let query = ListQuery::page(25, 0).active();
        assert_eq!(list_path(EntityKind::Volume, 3, &query), "/volumes/3/active");

        let query = ListQuery::page(25, 0);
        assert_eq!(list_path(EntityKind::Story, 3, &query), "/stories/3");
    }

    #[test]
    fn test_entity_and_related_paths() {
        assert_eq!(entity_path(r(EntityKind::Series, 9), 1), "/series/1/9");
        assert_eq!(
            related_path(r(EntityKind::Series, 9), EntityKind::Story, 1),
            "/series/1/9/stories"
        );
        assert_eq!(exact_path(EntityKind::Series, 1, "A/B"), "/series/1/exact/A%2FB");
    }

    #[test]
    fn test_with_all_children_flags() {
        let flags: Vec<String> = with_all_children(EntityKind::Series)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(flags, vec!["withAuthors", "withStories"]);
        assert!(with_all_children(EntityKind::Library).is_empty());
    }

    #[test]
    fn test_extract_message() {
        assert_eq!(
            extract_message(r#"{"message":"name: must be unique"}"#).as_deref(),
            Some("name: must be unique")
        );
        assert_eq!(extract_message("plain text").as_deref(), Some("plain text"));
        assert_eq!(extract_message("  "), None);
    }

    #[test]
    fn test_client_creation_rejects_bad_base_url() {
        let config = ClientConfig::builder().base_url("not a url").build();
        let result = LibraryClient::new(config);
        assert!(matches!(result, Err(LibraryError::ConfigurationError(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = ClientConfig::builder().base_url("http://localhost:8080/api/").build();
        let client = LibraryClient::new(config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/api");
    }
}
