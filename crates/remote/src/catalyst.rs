//! Catalyst content client.

use std::time::Duration;

use async_trait::async_trait;
use builder_core::fragments::CatalystEntity;
use serde_json::json;

use crate::error::RemoteError;

const SERVICE: &str = "catalyst";

/// Read access to the entities deployed on a catalyst peer.
#[async_trait]
pub trait CatalystReader: Send + Sync {
    /// Active entities for any of the given pointers (URNs).
    async fn entities_by_pointers(
        &self,
        pointers: &[String],
    ) -> Result<Vec<CatalystEntity>, RemoteError>;

    async fn entity_by_urn(&self, urn: &str) -> Result<Option<CatalystEntity>, RemoteError> {
        let entities = self.entities_by_pointers(&[urn.to_string()]).await?;
        Ok(entities.into_iter().next())
    }
}

#[derive(Clone)]
pub struct HttpCatalyst {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalyst {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport {
                service: SERVICE,
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn active_entities_url(&self) -> String {
        format!(
            "{}/content/entities/active",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl CatalystReader for HttpCatalyst {
    async fn entities_by_pointers(
        &self,
        pointers: &[String],
    ) -> Result<Vec<CatalystEntity>, RemoteError> {
        if pointers.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(self.active_entities_url())
            .json(&json!({ "pointers": pointers }))
            .send()
            .await
            .map_err(|e| RemoteError::Transport {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let entities = response
            .json::<Vec<CatalystEntity>>()
            .await
            .map_err(|e| RemoteError::Decode {
                service: SERVICE,
                message: e.to_string(),
            })?;
        tracing::debug!(
            requested = pointers.len(),
            found = entities.len(),
            "Fetched catalyst entities",
        );
        Ok(entities)
    }
}
