//! HTTP client for the remote record store.
//!
//! The store speaks a Supabase-style API: collections under `/rest/v1`,
//! blob storage under `/storage/v1`, password auth under `/auth/v1`. Every
//! operation is exactly one outbound call; there are no retries.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::config::{Config, ConfigError};
use crate::error::{StoreError, StoreResult};

use super::types::{decode_rows, EntityType, Fields, Record, RecordId, Session};
use super::RemoteStore;

/// Remote record store client.
///
/// Cheap to clone; clones share the HTTP connection pool and the signed-in
/// session.
#[derive(Debug, Clone)]
pub struct StoreClient {
  http: reqwest::Client,
  base_url: String,
  access_token: Arc<RwLock<Option<String>>>,
}

impl StoreClient {
  /// Create a client from configuration.
  ///
  /// The anon API key is read from the environment (see
  /// [`Config::get_anon_key`]) and sent as the `apikey` header on every
  /// request.
  pub fn new(config: &Config) -> Result<Self, ConfigError> {
    let anon_key = Config::get_anon_key()?;
    Self::with_anon_key(config, &anon_key)
  }

  /// Create a client with an explicit anon key.
  pub fn with_anon_key(config: &Config, anon_key: &str) -> Result<Self, ConfigError> {
    let parsed = Url::parse(&config.store.url)
      .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.store.url, e)))?;

    let key_value = HeaderValue::from_str(anon_key)
      .map_err(|_| ConfigError::Client("anon key contains invalid characters".into()))?;

    let mut default_headers = HeaderMap::new();
    default_headers.insert("apikey", key_value);

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.store.timeout_secs))
      .default_headers(default_headers)
      .build()
      .map_err(|e| ConfigError::Client(e.to_string()))?;

    Ok(Self {
      http,
      base_url: parsed.as_str().trim_end_matches('/').to_string(),
      access_token: Arc::new(RwLock::new(None)),
    })
  }

  /// Sign in with email and password.
  ///
  /// Thin pass-through to the auth provider: on success the session's
  /// bearer token is attached to all subsequent requests.
  pub async fn sign_in(&self, email: &str, password: &str) -> StoreResult<Session> {
    let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
    debug!(url = %url, "signing in");

    let response = self
      .http
      .post(&url)
      .json(&serde_json::json!({ "email": email, "password": password }))
      .send()
      .await?;

    let status = response.status();
    if status.is_client_error() {
      return Err(StoreError::validation(auth_error_message(response).await));
    }
    if !status.is_success() {
      return Err(StoreError::transport(format!(
        "sign-in failed with status {}",
        status
      )));
    }

    let session: Session = response
      .json()
      .await
      .map_err(|e| StoreError::schema(format!("failed to parse session: {}", e)))?;

    *self.access_token.write().expect("token lock poisoned") =
      Some(session.access_token.clone());

    Ok(session)
  }

  /// Forget the signed-in session, reverting to anon access.
  pub fn sign_out(&self) {
    *self.access_token.write().expect("token lock poisoned") = None;
  }

  fn collection_url(&self, entity: &EntityType) -> String {
    format!("{}/rest/v1/{}", self.base_url, entity.as_str())
  }

  fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
    let token = self.access_token.read().expect("token lock poisoned");
    match token.as_deref() {
      Some(t) => request.bearer_auth(t),
      None => request,
    }
  }

  /// Parse a representation response into rows.
  async fn representation(response: Response) -> StoreResult<Vec<Record>> {
    let rows: Vec<Map<String, Value>> = response
      .json()
      .await
      .map_err(|e| StoreError::schema(format!("failed to parse response body: {}", e)))?;
    decode_rows(rows)
  }
}

#[async_trait]
impl RemoteStore for StoreClient {
  async fn list(&self, entity: &EntityType) -> StoreResult<Vec<Record>> {
    let url = format!("{}?select=*", self.collection_url(entity));
    debug!(url = %url, entity = %entity, "listing records");

    let response = self.authorize(self.http.get(&url)).send().await?;

    let status = response.status();
    if !status.is_success() {
      return Err(StoreError::transport(format!(
        "list {} failed with status {}: {}",
        entity,
        status,
        error_body(response).await
      )));
    }

    Self::representation(response).await
  }

  async fn create(&self, entity: &EntityType, fields: Fields) -> StoreResult<Record> {
    let url = self.collection_url(entity);
    debug!(url = %url, entity = %entity, "creating record");

    let response = self
      .authorize(self.http.post(&url))
      .header("Prefer", "return=representation")
      .json(&Value::Object(fields))
      .send()
      .await?;

    let status = response.status();
    if is_rejected_payload(status) {
      return Err(StoreError::validation(error_body(response).await));
    }
    if !status.is_success() {
      return Err(StoreError::transport(format!(
        "create {} failed with status {}: {}",
        entity,
        status,
        error_body(response).await
      )));
    }

    let mut records = Self::representation(response).await?;
    records
      .pop()
      .ok_or_else(|| StoreError::schema("store returned no representation for created record"))
  }

  async fn update(
    &self,
    entity: &EntityType,
    id: &RecordId,
    fields: Fields,
  ) -> StoreResult<Record> {
    let url = format!(
      "{}?id=eq.{}",
      self.collection_url(entity),
      id.as_filter_value()
    );
    debug!(url = %url, entity = %entity, "updating record");

    let response = self
      .authorize(self.http.patch(&url))
      .header("Prefer", "return=representation")
      .json(&Value::Object(fields))
      .send()
      .await?;

    let status = response.status();
    if is_rejected_payload(status) {
      return Err(StoreError::validation(error_body(response).await));
    }
    if status == StatusCode::NOT_FOUND {
      return Err(StoreError::not_found(entity, id));
    }
    if !status.is_success() {
      return Err(StoreError::transport(format!(
        "update {}/{} failed with status {}: {}",
        entity,
        id,
        status,
        error_body(response).await
      )));
    }

    // The store filters by id; an empty representation means no row matched.
    let mut records = Self::representation(response).await?;
    records.pop().ok_or_else(|| StoreError::not_found(entity, id))
  }

  async fn delete(&self, entity: &EntityType, id: &RecordId) -> StoreResult<()> {
    let url = format!(
      "{}?id=eq.{}",
      self.collection_url(entity),
      id.as_filter_value()
    );
    debug!(url = %url, entity = %entity, "deleting record");

    let response = self
      .authorize(self.http.delete(&url))
      .header("Prefer", "return=representation")
      .send()
      .await?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
      return Err(StoreError::not_found(entity, id));
    }
    if !status.is_success() {
      return Err(StoreError::transport(format!(
        "delete {}/{} failed with status {}: {}",
        entity,
        id,
        status,
        error_body(response).await
      )));
    }

    let records = Self::representation(response).await?;
    if records.is_empty() {
      return Err(StoreError::not_found(entity, id));
    }

    Ok(())
  }

  async fn upload_asset(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> StoreResult<String> {
    let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, key);
    debug!(url = %url, size = bytes.len(), "uploading asset");

    let response = self
      .authorize(self.http.post(&url))
      .header("Content-Type", "application/octet-stream")
      .body(bytes)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      return Err(StoreError::transport(format!(
        "upload to {}/{} failed with status {}: {}",
        bucket,
        key,
        status,
        error_body(response).await
      )));
    }

    Ok(format!(
      "{}/storage/v1/object/public/{}/{}",
      self.base_url, bucket, key
    ))
  }
}

/// Statuses meaning the store rejected the payload rather than the transport.
fn is_rejected_payload(status: StatusCode) -> bool {
  status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY
}

/// Drain a response body for inclusion in an error message.
async fn error_body(response: Response) -> String {
  response.text().await.unwrap_or_default()
}

/// Extract the human-readable message from an auth error body.
async fn auth_error_message(response: Response) -> String {
  let body = error_body(response).await;
  serde_json::from_str::<Value>(&body)
    .ok()
    .and_then(|v| {
      v.get("error_description")
        .or_else(|| v.get("msg"))
        .or_else(|| v.get("message"))
        .and_then(Value::as_str)
        .map(String::from)
    })
    .unwrap_or(body)
}
