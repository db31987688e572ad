//! HTTP client for the trigger service API.
//!
//! # Responsibilities
//! - Register a trigger for a party (`POST /v1/triggers`)
//! - List, inspect and stop running triggers for the management CLI
//! - Map network errors and non-success statuses to `LauncherError`

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::TriggerConfig;
use crate::error::{LauncherError, LauncherResult};
use crate::net::Endpoint;
use crate::package::PackageId;

/// One trigger to start on behalf of a party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub party: String,
    pub package_id: PackageId,
    /// `Module.Path:entity` within the package.
    pub trigger: String,
}

impl Registration {
    pub fn new(party: impl Into<String>, package_id: PackageId, trigger: impl Into<String>) -> Self {
        Self {
            party: party.into(),
            package_id,
            trigger: trigger.into(),
        }
    }

    /// Build the registration list for `triggers`, preserving order.
    pub fn from_config(triggers: &[TriggerConfig], package_id: &PackageId) -> Vec<Self> {
        triggers
            .iter()
            .map(|t| Self::new(t.party.clone(), package_id.clone(), t.name.clone()))
            .collect()
    }

    /// Fully qualified trigger name, `package:Module:entity`.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.package_id, self.trigger)
    }
}

/// A trigger the service accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredTrigger {
    pub party: String,
    pub trigger: String,
    pub trigger_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartTriggerRequest<'a> {
    trigger_name: String,
    party: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TriggerIdResult {
    trigger_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TriggerIdsResult {
    #[serde(default)]
    trigger_ids: Vec<String>,
}

/// Client bound to one trigger service endpoint.
#[derive(Debug, Clone)]
pub struct RegistrationClient {
    client: Client,
    base_url: Url,
}

impl RegistrationClient {
    /// Create a client for the service at `endpoint`.
    pub fn new(endpoint: &Endpoint, request_timeout: Duration) -> LauncherResult<Self> {
        Self::with_base_url(endpoint.base_url()?, request_timeout)
    }

    /// Create a client for an explicit base URL.
    pub fn with_base_url(base_url: Url, request_timeout: Duration) -> LauncherResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .no_proxy()
            .build()
            .map_err(|e| LauncherError::Service(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> LauncherResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| LauncherError::Usage(format!("invalid request path '{}': {}", path, e)))
    }

    /// Register a single trigger.
    pub async fn register(&self, registration: &Registration) -> LauncherResult<RegisteredTrigger> {
        let failed = |reason: String| LauncherError::Registration {
            party: registration.party.clone(),
            trigger: registration.trigger.clone(),
            reason,
        };

        let body = StartTriggerRequest {
            trigger_name: registration.qualified_name(),
            party: &registration.party,
        };

        let response = self
            .client
            .post(self.url("v1/triggers")?)
            .json(&body)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| failed(e.to_string()))?;

        if !status.is_success() {
            return Err(failed(format!("service returned {}: {}", status, text.trim())));
        }

        let trigger_id = serde_json::from_str::<Envelope<TriggerIdResult>>(&text)
            .ok()
            .and_then(|envelope| envelope.result.trigger_id);

        tracing::info!(
            party = %registration.party,
            trigger = %registration.trigger,
            trigger_id = trigger_id.as_deref().unwrap_or("-"),
            "Trigger registered"
        );

        Ok(RegisteredTrigger {
            party: registration.party.clone(),
            trigger: registration.trigger.clone(),
            trigger_id,
        })
    }

    /// Register every trigger in order, stopping at the first failure.
    pub async fn register_all(&self, registrations: &[Registration]) -> LauncherResult<Vec<RegisteredTrigger>> {
        let mut registered = Vec::with_capacity(registrations.len());
        for (i, registration) in registrations.iter().enumerate() {
            tracing::debug!(
                index = i + 1,
                total = registrations.len(),
                party = %registration.party,
                trigger = %registration.qualified_name(),
                "Registering trigger"
            );
            registered.push(self.register(registration).await?);
        }
        Ok(registered)
    }

    /// Ids of the triggers running for `party`.
    pub async fn list(&self, party: &str) -> LauncherResult<Vec<String>> {
        let mut url = self.url("v1/triggers")?;
        url.query_pairs_mut().append_pair("party", party);

        let value = self.send(self.client.get(url)).await?;
        let envelope: Envelope<TriggerIdsResult> = serde_json::from_value(value)
            .map_err(|e| LauncherError::Service(format!("unexpected list response: {}", e)))?;
        Ok(envelope.result.trigger_ids)
    }

    /// Raw status document of one trigger.
    pub async fn status(&self, trigger_id: &str) -> LauncherResult<Value> {
        let url = self.url(&format!("v1/triggers/{}", trigger_id))?;
        self.send(self.client.get(url)).await
    }

    /// Stop a running trigger.
    pub async fn stop(&self, trigger_id: &str) -> LauncherResult<Value> {
        let url = self.url(&format!("v1/triggers/{}", trigger_id))?;
        self.send(self.client.delete(url)).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> LauncherResult<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| LauncherError::Service(format!("trigger service unreachable: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LauncherError::Service(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(LauncherError::Service(format!(
                "trigger service returned {}: {}",
                status,
                text.trim()
            )));
        }

        serde_json::from_str(&text)
            .map_err(|e| LauncherError::Service(format!("invalid JSON response: {}", e)))
    }
}
