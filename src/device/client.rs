use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::error::{DeviceError, DeviceResult};
use super::model::{DeviceStatus, ImageUpload, LeafAnalysisResponse, RoofUpdate};
use super::DeviceApi;

const STATUS_PATH: &str = "/status";
const UPLOAD_ANALYZE_PATH: &str = "/upload-analyze";
const CAPTURE_ANALYZE_PATH: &str = "/capture-analyze";
const RAIN_MANUAL_PATH: &str = "/rain/manual";
const RAIN_AUTO_PATH: &str = "/rain/auto";
const WATER_START_PATH: &str = "/water/manual/start";
const WATER_STOP_PATH: &str = "/water/manual/stop";
const WATER_AUTO_PATH: &str = "/water/auto";
const LATEST_LEAF_PATH: &str = "/farm-images/latest_leaf.jpg";

/// reqwest-backed client for the device API.
#[derive(Debug, Clone)]
pub struct HttpDeviceClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDeviceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> DeviceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DeviceError::ClientInit)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> DeviceResult<String> {
        let response = request.send().await.map_err(|source| DeviceError::Transport {
            endpoint: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(endpoint = url, status = status.as_u16(), "device rejected request");
            return Err(DeviceError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| DeviceError::Transport {
            endpoint: url.to_string(),
            source,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> DeviceResult<T> {
        let url = self.endpoint(path);
        let body = self.send(self.client.get(&url), &url).await?;
        decode_body(&url, &body)
    }

    async fn post_empty(&self, path: &str) -> DeviceResult<String> {
        let url = self.endpoint(path);
        self.send(self.client.post(&url), &url).await
    }
}

#[async_trait]
impl DeviceApi for HttpDeviceClient {
    async fn status(&self) -> DeviceResult<DeviceStatus> {
        self.get_json(STATUS_PATH).await
    }

    async fn upload_analyze(&self, image: &ImageUpload) -> DeviceResult<LeafAnalysisResponse> {
        let url = self.endpoint(UPLOAD_ANALYZE_PATH);
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|source| DeviceError::Transport {
                endpoint: url.clone(),
                source,
            })?;
        let form = Form::new().part("file", part);

        tracing::info!(endpoint = %url, bytes = image.bytes.len(), "submitting leaf image");
        let body = self
            .send(self.client.post(&url).multipart(form), &url)
            .await?;
        decode_body(&url, &body)
    }

    async fn capture_analyze(&self) -> DeviceResult<LeafAnalysisResponse> {
        self.get_json(CAPTURE_ANALYZE_PATH).await
    }

    async fn set_rain_manual(&self, raining: bool) -> DeviceResult<RoofUpdate> {
        let url = self.endpoint(RAIN_MANUAL_PATH);
        let payload = rain_override_payload(raining);
        let body = self
            .send(self.client.post(&url).json(&payload), &url)
            .await?;
        decode_body(&url, &body)
    }

    async fn set_rain_auto(&self) -> DeviceResult<RoofUpdate> {
        let url = self.endpoint(RAIN_AUTO_PATH);
        let body = self.post_empty(RAIN_AUTO_PATH).await?;
        decode_body(&url, &body)
    }

    async fn start_watering(&self) -> DeviceResult<()> {
        self.post_empty(WATER_START_PATH).await.map(|_| ())
    }

    async fn stop_watering(&self) -> DeviceResult<()> {
        self.post_empty(WATER_STOP_PATH).await.map(|_| ())
    }

    async fn set_water_auto(&self) -> DeviceResult<()> {
        self.post_empty(WATER_AUTO_PATH).await.map(|_| ())
    }

    fn latest_leaf_image_url(&self, cache_buster: u64) -> String {
        latest_leaf_image_url(&self.base_url, cache_buster)
    }
}

pub fn latest_leaf_image_url(base_url: &str, cache_buster: u64) -> String {
    format!(
        "{}{LATEST_LEAF_PATH}?v={cache_buster}",
        base_url.trim_end_matches('/')
    )
}

fn rain_override_payload(raining: bool) -> serde_json::Value {
    json!({ "value": u8::from(raining) })
}

fn decode_body<T: DeserializeOwned>(endpoint: &str, body: &str) -> DeviceResult<T> {
    serde_json::from_str(body).map_err(|err| DeviceError::malformed(endpoint, err.to_string()))
}
