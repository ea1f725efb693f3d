// Source traits for the remote grow box data and control services
use crate::domain::controls::{Actuator, ActuatorState};
use crate::domain::settings::{GrowSettings, SettingsError};
use crate::domain::telemetry::{AggregatedDay, SensorReading, TimeWindow};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport failure or non-success HTTP status.
    #[error("request to {path} failed: {reason}")]
    Network { path: String, reason: String },

    /// The payload arrived but could not be parsed.
    #[error("could not decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl FetchError {
    pub fn network(path: impl Into<String>, reason: impl ToString) -> Self {
        FetchError::Network {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Windowed reads of sensor telemetry. One network read per call, no retries.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch_current(&self) -> FetchResult<SensorReading>;

    async fn fetch_hourly(&self, window: TimeWindow) -> FetchResult<Vec<SensorReading>>;

    async fn fetch_daily(&self, days: u32) -> FetchResult<Vec<AggregatedDay>>;

    /// Unaggregated readings, used for export.
    async fn fetch_raw_history(&self, window: TimeWindow) -> FetchResult<Vec<SensorReading>>;
}

/// Reads and writes of actuator and auto-mode state.
///
/// Writes return the value the service confirmed, which may differ from
/// the one requested.
#[async_trait]
pub trait ControlSource: Send + Sync {
    async fn read_control_status(&self) -> FetchResult<ActuatorState>;

    async fn read_settings(&self) -> FetchResult<GrowSettings>;

    async fn set_actuator(&self, actuator: Actuator, desired: bool) -> FetchResult<bool>;

    async fn set_auto_mode(&self, device: Actuator, desired: bool) -> FetchResult<bool>;
}
