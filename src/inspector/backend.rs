//! Device backend client
//!
//! The backend owns the device: it dumps the hierarchy, reports the screen size,
//! executes single steps and streams whole-script runs. This module only speaks
//! its HTTP API.

use crate::error::{InspectorError, Result};
use crate::hierarchy::{DeviceFrame, UiNode};
use crate::utils::Config;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use serde::Deserialize;
use std::time::Duration;

/// Raw execution-stream chunks
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>>>;

#[async_trait]
pub trait DeviceBackend: Send + Sync {
    /// Screen size and model of the connected device
    async fn device_frame(&self) -> Result<DeviceFrame>;

    /// Current UI hierarchy snapshot
    async fn fetch_hierarchy(&self) -> Result<UiNode>;

    /// Execute one `{action: params}` step object; returns the executor's log line
    async fn run_step(&self, step: &serde_json::Value) -> Result<String>;

    /// Start a script run; the returned stream carries `data: ` records
    async fn run_script(&self, yaml: &str, name: &str) -> Result<ChunkStream>;
}

#[derive(Debug, Deserialize)]
struct DeviceInfoResponse {
    size: String,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunStepResponse {
    status: String,
    log: Option<String>,
    error: Option<String>,
}

/// HTTP client for the device backend
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    /// Runs can stream for minutes; this client has no overall timeout
    stream_client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let stream_client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            stream_client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.base_url(),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Turn a non-success response into `InspectorError::Backend`
    async fn check(endpoint: &str, resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(InspectorError::Backend {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            detail: error_detail(&body),
        })
    }
}

#[async_trait]
impl DeviceBackend for HttpBackend {
    async fn device_frame(&self) -> Result<DeviceFrame> {
        let resp = self.client.get(self.url("/device_info")).send().await?;
        let body = Self::check("/device_info", resp).await?.text().await?;
        decode_device_info(&body)
    }

    async fn fetch_hierarchy(&self) -> Result<UiNode> {
        let resp = self.client.get(self.url("/hierarchy")).send().await?;
        let body = Self::check("/hierarchy", resp).await?.text().await?;
        decode_hierarchy(&body)
    }

    async fn run_step(&self, step: &serde_json::Value) -> Result<String> {
        log::debug!("Executing step: {}", step);
        let resp = self
            .client
            .post(self.url("/run-step"))
            .json(&serde_json::json!({ "step": step }))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(InspectorError::StepFailed(error_detail(&body)));
        }

        let parsed: RunStepResponse = serde_json::from_str(&body)?;
        if parsed.status == "success" {
            Ok(parsed.log.unwrap_or_default())
        } else {
            Err(InspectorError::StepFailed(
                parsed.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }

    async fn run_script(&self, yaml: &str, name: &str) -> Result<ChunkStream> {
        let resp = self
            .stream_client
            .post(self.url("/run"))
            .json(&serde_json::json!({
                "yaml_content": yaml,
                "filename": name,
            }))
            .send()
            .await?;
        let resp = Self::check("/run", resp).await?;

        Ok(resp
            .bytes_stream()
            .map_ok(|bytes| bytes.to_vec())
            .map_err(InspectorError::from)
            .boxed())
    }
}

/// `/hierarchy` wraps the tree as a JSON string in `output`; a bare tree is accepted too
pub fn decode_hierarchy(body: &str) -> Result<UiNode> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if let Some(err) = value.get("error").and_then(|e| e.as_str()) {
        log::warn!("Backend reported a hierarchy error: {}", err);
    }
    match value.get("output") {
        Some(serde_json::Value::String(output)) => Ok(serde_json::from_str(output)?),
        Some(output) => Ok(serde_json::from_value(output.clone())?),
        None => Ok(serde_json::from_value(value)?),
    }
}

/// `/device_info` body: `{"size": "1080x2400", "model": "..."}`
pub fn decode_device_info(body: &str) -> Result<DeviceFrame> {
    let info: DeviceInfoResponse = serde_json::from_str(body)?;
    DeviceFrame::from_size_string(&info.size, info.model.as_deref())
        .ok_or_else(|| InspectorError::InvalidDeviceInfo(format!("bad screen size {:?}", info.size)))
}

/// FastAPI-style `{"detail": ...}` bodies, or the raw text
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("detail").map(|d| match d {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        })
        .unwrap_or_else(|| body.trim().to_string())
}
