//! HTTP clients for the sibling microservices.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use rig_hardware::PartCategory;
use rig_id::{DeviceId, UserId};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{
    Device, DeviceDirectory, InventoryClient, Notification, Notifier, ScalePush, ScalingClient,
};

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")
}

async fn ensure_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    error!(status = %status, body = %body, "Failed to {what}");
    anyhow::bail!("Failed to {}: {} - {}", what, status, body);
}

/// Service microservice client.
pub struct HttpScalingClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpScalingClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Serialize)]
struct StopServicesRequest {
    delete: bool,
}

#[async_trait]
impl ScalingClient for HttpScalingClient {
    async fn push_scale(&self, push: &ScalePush) -> Result<()> {
        let url = format!("{}/v1/services/{}/scale", self.base_url, push.service_id);
        debug!(service_id = %push.service_id, "Pushing scaled allocation");

        let response = self.client.post(&url).json(push).send().await?;
        ensure_success(response, "push scale").await?;
        Ok(())
    }

    async fn stop_device_services(&self, device_id: &DeviceId, delete: bool) -> Result<()> {
        let url = format!("{}/v1/devices/{}/services/stop", self.base_url, device_id);
        debug!(device_id = %device_id, delete, "Stopping device services");

        let response = self
            .client
            .post(&url)
            .json(&StopServicesRequest { delete })
            .send()
            .await?;
        ensure_success(response, "stop device services").await?;
        Ok(())
    }
}

/// Notification sink client.
pub struct HttpNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Serialize)]
struct NotifyRequest<'a> {
    user_id: &'a UserId,
    #[serde(flatten)]
    notification: &'a Notification,
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, owner: &UserId, notification: &Notification) -> Result<()> {
        let url = format!("{}/v1/notifications", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&NotifyRequest {
                user_id: owner,
                notification,
            })
            .send()
            .await?;
        ensure_success(response, "send notification").await?;
        Ok(())
    }
}

/// Device microservice client.
pub struct HttpDeviceDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDeviceDirectory {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DeviceDirectory for HttpDeviceDirectory {
    async fn get_device(&self, device_id: &DeviceId) -> Result<Option<Device>> {
        let url = format!("{}/v1/devices/{}", self.base_url, device_id);
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let device: Device = ensure_success(response, "fetch device")
            .await?
            .json()
            .await
            .context("invalid device payload")?;
        Ok(Some(device))
    }
}

/// Inventory microservice client.
pub struct HttpInventoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInventoryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Serialize)]
struct HoldsPartsRequest<'a> {
    owner: &'a UserId,
    category: PartCategory,
    keys: &'a [String],
}

#[derive(Deserialize)]
struct HoldsPartsResponse {
    ok: bool,
}

#[derive(Serialize)]
struct ConsumeRequest<'a> {
    owner: &'a UserId,
    parts: Vec<ConsumedPart<'a>>,
}

#[derive(Serialize)]
struct ConsumedPart<'a> {
    category: PartCategory,
    key: &'a str,
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    async fn holds_parts(
        &self,
        owner: &UserId,
        category: PartCategory,
        keys: &[String],
    ) -> Result<bool> {
        let url = format!("{}/v1/inventory/check", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&HoldsPartsRequest {
                owner,
                category,
                keys,
            })
            .send()
            .await?;

        let body: HoldsPartsResponse = ensure_success(response, "check inventory")
            .await?
            .json()
            .await
            .context("invalid inventory payload")?;
        Ok(body.ok)
    }

    async fn consume_parts(&self, owner: &UserId, parts: &[(PartCategory, String)]) -> Result<()> {
        let url = format!("{}/v1/inventory/consume", self.base_url);
        let request = ConsumeRequest {
            owner,
            parts: parts
                .iter()
                .map(|(category, key)| ConsumedPart {
                    category: *category,
                    key,
                })
                .collect(),
        };

        let response = self.client.post(&url).json(&request).send().await?;
        ensure_success(response, "consume inventory").await?;
        Ok(())
    }
}
