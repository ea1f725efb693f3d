// HTTP client for the grow box data and control services
use crate::application::grow_box_api::{ControlSource, FetchError, FetchResult, TelemetrySource};
use crate::domain::controls::{Actuator, ActuatorState};
use crate::domain::settings::{GrowSettings, decode_flag, encode_flag};
use crate::domain::telemetry::{AggregatedDay, SensorReading, TimeWindow};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GrowBoxHttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl GrowBoxHttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            anyhow::bail!("service URL must start with http:// or https://, got: {}", base_url);
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> FetchResult<T> {
        let request = self
            .client
            .get(self.url(path))
            .header("Accept", "application/json");
        self.execute(path, request).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> FetchResult<T> {
        let request = self.client.post(self.url(path)).json(body);
        self.execute(path, request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> FetchResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::network(path, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::network(
                path,
                format!("status {}: {}", status, body.trim()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(path, e))?;
        serde_json::from_slice(&bytes).map_err(|source| FetchError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

fn hourly_path(window: TimeWindow) -> String {
    format!("/api/sensors/hourly?hours={}", window.hours())
}

fn daily_path(days: u32) -> String {
    format!("/api/sensors/daily?days={}", days)
}

fn history_path(window: TimeWindow) -> String {
    format!("/api/sensors/history?hours={}", window.hours())
}

fn setting_path(name: &str) -> String {
    format!("/api/settings/{}", urlencoding::encode(name))
}

fn missing_key(path: &str, key: &'static str) -> FetchError {
    FetchError::Decode {
        path: path.to_string(),
        source: <serde_json::Error as serde::de::Error>::missing_field(key),
    }
}

/// Pulls the confirmed actuator value out of a write response.
fn confirmed_actuator(
    path: &str,
    response: &Map<String, Value>,
    actuator: Actuator,
) -> FetchResult<bool> {
    response
        .get(actuator.state_key())
        .and_then(Value::as_bool)
        .ok_or_else(|| missing_key(path, actuator.state_key()))
}

/// Pulls the confirmed auto-mode flag out of a settings write response.
fn confirmed_flag(
    path: &str,
    response: &Map<String, Value>,
    device: Actuator,
) -> FetchResult<bool> {
    let name = device.auto_setting();
    match response.get(name) {
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(Value::String(raw)) => Ok(decode_flag(name, raw)?),
        _ => Err(missing_key(path, name)),
    }
}

#[async_trait]
impl TelemetrySource for GrowBoxHttpClient {
    async fn fetch_current(&self) -> FetchResult<SensorReading> {
        self.get_json("/api/sensors/current").await
    }

    async fn fetch_hourly(&self, window: TimeWindow) -> FetchResult<Vec<SensorReading>> {
        self.get_json(&hourly_path(window)).await
    }

    async fn fetch_daily(&self, days: u32) -> FetchResult<Vec<AggregatedDay>> {
        self.get_json(&daily_path(days)).await
    }

    async fn fetch_raw_history(&self, window: TimeWindow) -> FetchResult<Vec<SensorReading>> {
        self.get_json(&history_path(window)).await
    }
}

#[async_trait]
impl ControlSource for GrowBoxHttpClient {
    async fn read_control_status(&self) -> FetchResult<ActuatorState> {
        self.get_json("/api/controls/status").await
    }

    async fn read_settings(&self) -> FetchResult<GrowSettings> {
        let raw: HashMap<String, String> = self.get_json("/api/settings").await?;
        Ok(GrowSettings::from_map(raw))
    }

    async fn set_actuator(&self, actuator: Actuator, desired: bool) -> FetchResult<bool> {
        let path = format!("/api/controls/{}", actuator.endpoint());
        let response: Map<String, Value> = self
            .post_json(&path, &json!({ "state": desired }))
            .await?;
        confirmed_actuator(&path, &response, actuator)
    }

    async fn set_auto_mode(&self, device: Actuator, desired: bool) -> FetchResult<bool> {
        let path = setting_path(device.auto_setting());
        let response: Map<String, Value> = self
            .post_json(&path, &json!({ "value": encode_flag(desired) }))
            .await?;
        confirmed_flag(&path, &response, device)
    }
}
