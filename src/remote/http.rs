//! HTTP adapter for the remote order service.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::time::Duration;

use crate::config::Config;
use crate::error::RemoteError;
use crate::types::{Order, OrderDraft};

use super::OrderApi;

/// Reqwest-backed implementation of [`OrderApi`].
///
/// Carries a client-side timeout so a hung request cannot stall a
/// reconciliation pass indefinitely.
pub struct HttpOrderApi {
  client: reqwest::Client,
  base_url: String,
  token: Option<String>,
}

impl HttpOrderApi {
  pub fn new(config: &Config) -> Result<Self> {
    let base_url = config
      .remote
      .url
      .clone()
      .ok_or_else(|| eyre!("No remote URL configured. Set remote.url in the config file."))?;

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.remote.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      token: Config::get_api_token().ok(),
    })
  }

  fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.token {
      Some(token) => builder.bearer_auth(token),
      None => builder,
    }
  }

  /// Probe the service health endpoint. The embedding application calls
  /// this to derive connectivity transition signals; the core itself never
  /// polls the network.
  pub async fn check_connectivity(&self) -> bool {
    let url = format!("{}/health", self.base_url);
    match self.request(self.client.get(&url)).send().await {
      Ok(resp) => resp.status().is_success(),
      Err(_) => false,
    }
  }
}

#[async_trait]
impl OrderApi for HttpOrderApi {
  async fn create_order(&self, draft: &OrderDraft) -> Result<Order, RemoteError> {
    let url = format!("{}/orders", self.base_url);

    let resp = self
      .request(self.client.post(&url).json(draft))
      .send()
      .await
      .map_err(|e| RemoteError::Transport {
        reason: e.to_string(),
      })?;

    let status = resp.status();
    if !status.is_success() {
      let message = resp.text().await.unwrap_or_default();
      return Err(RemoteError::Api {
        status: status.as_u16(),
        message,
      });
    }

    resp.json::<Order>().await.map_err(|e| RemoteError::Api {
      status: status.as_u16(),
      message: format!("invalid order payload: {}", e),
    })
  }

  async fn fetch(&self, path: &str) -> Result<serde_json::Value, RemoteError> {
    let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

    let resp = self
      .request(self.client.get(&url))
      .send()
      .await
      .map_err(|e| RemoteError::Transport {
        reason: e.to_string(),
      })?;

    let status = resp.status();
    if !status.is_success() {
      let message = resp.text().await.unwrap_or_default();
      return Err(RemoteError::Api {
        status: status.as_u16(),
        message,
      });
    }

    resp
      .json::<serde_json::Value>()
      .await
      .map_err(|e| RemoteError::Api {
        status: status.as_u16(),
        message: format!("invalid response payload: {}", e),
      })
  }
}
