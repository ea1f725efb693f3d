use crate::application::poll_scheduler::PollIntervals;
use crate::domain::telemetry::TimeWindow;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ConsoleConfig {
    pub service: ServiceSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub charts: ChartSettings,
    #[serde(default)]
    pub export: ExportSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingSettings {
    #[serde(default = "default_telemetry_secs")]
    pub telemetry_secs: u64,
    #[serde(default = "default_control_secs")]
    pub control_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartSettings {
    #[serde(default)]
    pub default_window: TimeWindow,
    #[serde(default = "default_daily_days")]
    pub daily_days: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportSettings {
    #[serde(default = "default_export_directory")]
    pub directory: PathBuf,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_telemetry_secs() -> u64 {
    30
}

fn default_control_secs() -> u64 {
    5
}

fn default_daily_days() -> u32 {
    7
}

fn default_export_directory() -> PathBuf {
    PathBuf::from(".")
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            telemetry_secs: default_telemetry_secs(),
            control_secs: default_control_secs(),
        }
    }
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            default_window: TimeWindow::default(),
            daily_days: default_daily_days(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            directory: default_export_directory(),
        }
    }
}

impl ConsoleConfig {
    pub fn intervals(&self) -> PollIntervals {
        PollIntervals {
            telemetry: Duration::from_secs(self.polling.telemetry_secs),
            control: Duration::from_secs(self.polling.control_secs),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    fn validate(self) -> anyhow::Result<Self> {
        if self.polling.telemetry_secs == 0 || self.polling.control_secs == 0 {
            anyhow::bail!("polling intervals must be at least one second");
        }
        if self.charts.daily_days == 0 {
            anyhow::bail!("charts.daily_days must be at least 1");
        }
        Ok(self)
    }
}

/// Loads `config/growbox` overlaid with `GROWBOX__SECTION__KEY` variables.
pub fn load_console_config() -> anyhow::Result<ConsoleConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/growbox").required(false))
        .add_source(config::Environment::with_prefix("GROWBOX").separator("__"))
        .build()?;

    settings.try_deserialize::<ConsoleConfig>()?.validate()
}
