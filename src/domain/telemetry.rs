// Telemetry data domain models
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One row of sensor telemetry as served by the grow box.
///
/// Field order matters: it is the column order of the exported history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(
        serialize_with = "serialize_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub light_level: Option<f64>,
    #[serde(default)]
    pub soil_moisture: Option<f64>,
}

impl SensorReading {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::LightLevel => self.light_level,
            Metric::SoilMoisture => self.soil_moisture,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct MetricStats {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub avg: Option<f64>,
}

/// Per-day min/max/avg of every tracked metric.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AggregatedDay {
    pub date: NaiveDate,
    #[serde(default)]
    pub temperature: MetricStats,
    #[serde(default)]
    pub humidity: MetricStats,
    #[serde(default)]
    pub light_level: MetricStats,
    #[serde(default)]
    pub soil_moisture: MetricStats,
}

impl AggregatedDay {
    pub fn stats(&self, metric: Metric) -> MetricStats {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::LightLevel => self.light_level,
            Metric::SoilMoisture => self.soil_moisture,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Temperature,
    Humidity,
    LightLevel,
    SoilMoisture,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Temperature,
        Metric::Humidity,
        Metric::LightLevel,
        Metric::SoilMoisture,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::LightLevel => "light_level",
            Metric::SoilMoisture => "soil_moisture",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Humidity | Metric::SoilMoisture => "%",
            Metric::LightLevel => " lux",
        }
    }

    /// Operator-facing readout, e.g. `23.4°C` or `310.0 lux`.
    pub fn format_readout(self, value: f64) -> String {
        format!("{:.1}{}", value, self.unit())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Chart/history window selectable by the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "12h")]
    TwelveHours,
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHours,
    #[serde(rename = "48h")]
    FortyEightHours,
    #[serde(rename = "7d")]
    SevenDays,
}

impl TimeWindow {
    pub fn hours(self) -> u32 {
        match self {
            TimeWindow::TwelveHours => 12,
            TimeWindow::TwentyFourHours => 24,
            TimeWindow::FortyEightHours => 48,
            TimeWindow::SevenDays => 168,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeWindow::TwelveHours => "12h",
            TimeWindow::TwentyFourHours => "24h",
            TimeWindow::FortyEightHours => "48h",
            TimeWindow::SevenDays => "7d",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "12h" => Ok(TimeWindow::TwelveHours),
            "24h" => Ok(TimeWindow::TwentyFourHours),
            "48h" => Ok(TimeWindow::FortyEightHours),
            "7d" => Ok(TimeWindow::SevenDays),
            other => Err(format!("unknown time window '{}' (expected 12h, 24h, 48h or 7d)", other)),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts RFC 3339 timestamps as well as the naive ISO-8601 form the
/// device emits (`2024-05-01T12:00:00.123456`), which is UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

/// Writes timestamps the way the device serves them: naive UTC, with
/// microseconds only when there is a fractional part.
fn serialize_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&device_timestamp(*ts))
}

pub fn device_timestamp(ts: DateTime<Utc>) -> String {
    if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}

pub fn format_local_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}
