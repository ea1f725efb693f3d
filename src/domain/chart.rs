// Chart domain models - what the chart surface is asked to draw
use super::telemetry::{AggregatedDay, Metric, SensorReading, TimeWindow};
use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChartKind {
    /// Hourly averages over the selected window.
    Hourly,
    /// Daily min/avg/max triple.
    DailyRange,
}

/// Identifies one chart container. Each container holds at most one live chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChartKey {
    pub metric: Metric,
    pub kind: ChartKind,
}

impl ChartKey {
    pub fn hourly(metric: Metric) -> Self {
        Self {
            metric,
            kind: ChartKind::Hourly,
        }
    }

    pub fn daily_range(metric: Metric) -> Self {
        Self {
            metric,
            kind: ChartKind::DailyRange,
        }
    }

    /// Container element name, e.g. `temperature-chart`.
    pub fn container(&self) -> String {
        let base = match self.metric {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::LightLevel => "light",
            Metric::SoilMoisture => "soil-moisture",
        };
        match self.kind {
            ChartKind::Hourly => format!("{}-chart", base),
            ChartKind::DailyRange => format!("{}-minmax-chart", base),
        }
    }
}

impl fmt::Display for ChartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.container())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalePolicy {
    /// Plot values on their natural range.
    Natural,
    /// Force the y-axis to start at zero.
    ZeroBased,
}

impl ScalePolicy {
    pub fn for_metric(metric: Metric) -> Self {
        match metric {
            Metric::Temperature | Metric::Humidity => ScalePolicy::Natural,
            Metric::LightLevel | Metric::SoilMoisture => ScalePolicy::ZeroBased,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStyle {
    pub border_color: String,
    pub fill: Option<String>,
    pub border_dash: Option<[u8; 2]>,
    pub border_width: u8,
    pub tension: f64,
    pub point_radius: Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesDefinition {
    pub label: String,
    pub values: Vec<Option<f64>>,
    pub style: SeriesStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartDefinition {
    pub key: ChartKey,
    pub title: String,
    pub x_title: &'static str,
    pub y_title: String,
    pub x_labels: Vec<String>,
    pub series: Vec<SeriesDefinition>,
    pub scale: ScalePolicy,
}

const DASH: [u8; 2] = [5, 5];

struct Palette {
    rgb: (u8, u8, u8),
}

impl Palette {
    fn for_metric(metric: Metric) -> Self {
        let rgb = match metric {
            Metric::Temperature => (255, 99, 132),
            Metric::Humidity => (54, 162, 235),
            Metric::LightLevel => (255, 206, 86),
            Metric::SoilMoisture => (75, 192, 192),
        };
        Self { rgb }
    }

    fn rgba(&self, alpha: f64) -> String {
        let (r, g, b) = self.rgb;
        format!("rgba({}, {}, {}, {})", r, g, b, alpha)
    }
}

fn axis_label(metric: Metric) -> &'static str {
    match metric {
        Metric::Temperature => "Temperature (°C)",
        Metric::Humidity => "Humidity (%)",
        Metric::LightLevel => "Light Level (lux)",
        Metric::SoilMoisture => "Soil Moisture (%)",
    }
}

fn display_name(metric: Metric) -> &'static str {
    match metric {
        Metric::Temperature => "Temperature",
        Metric::Humidity => "Humidity",
        Metric::LightLevel => "Light Level",
        Metric::SoilMoisture => "Soil Moisture",
    }
}

/// `H:00` label of a timestamp's hour in the given timezone.
pub fn hour_label<Tz: TimeZone>(ts: DateTime<Utc>, tz: &Tz) -> String {
    format!("{}:00", ts.with_timezone(tz).hour())
}

/// Abbreviated month and day, e.g. `May 1`.
pub fn date_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

pub fn hourly_chart<Tz: TimeZone>(
    metric: Metric,
    readings: &[SensorReading],
    window: TimeWindow,
    tz: &Tz,
) -> ChartDefinition {
    let palette = Palette::for_metric(metric);

    ChartDefinition {
        key: ChartKey::hourly(metric),
        title: format!("{} (last {})", display_name(metric), window),
        x_title: "Time",
        y_title: axis_label(metric).to_string(),
        x_labels: readings.iter().map(|r| hour_label(r.timestamp, tz)).collect(),
        series: vec![SeriesDefinition {
            label: axis_label(metric).to_string(),
            values: readings.iter().map(|r| r.value(metric)).collect(),
            style: SeriesStyle {
                border_color: palette.rgba(1.0),
                fill: Some(palette.rgba(0.2)),
                border_dash: None,
                border_width: 2,
                tension: 0.3,
                point_radius: None,
            },
        }],
        scale: ScalePolicy::for_metric(metric),
    }
}

/// Min/avg/max chart: the average is filled, min and max are dashed outlines.
pub fn daily_range_chart(metric: Metric, days: &[AggregatedDay]) -> ChartDefinition {
    let palette = Palette::for_metric(metric);
    let label = axis_label(metric);
    let outline = || SeriesStyle {
        border_color: palette.rgba(0.7),
        fill: None,
        border_dash: Some(DASH),
        border_width: 2,
        tension: 0.0,
        point_radius: Some(3),
    };

    let min = SeriesDefinition {
        label: format!("Min {}", label),
        values: days.iter().map(|d| d.stats(metric).min).collect(),
        style: outline(),
    };
    let avg = SeriesDefinition {
        label: format!("Avg {}", label),
        values: days.iter().map(|d| d.stats(metric).avg).collect(),
        style: SeriesStyle {
            border_color: palette.rgba(1.0),
            fill: Some(palette.rgba(0.2)),
            border_dash: None,
            border_width: 2,
            tension: 0.0,
            point_radius: None,
        },
    };
    let max = SeriesDefinition {
        label: format!("Max {}", label),
        values: days.iter().map(|d| d.stats(metric).max).collect(),
        style: outline(),
    };

    ChartDefinition {
        key: ChartKey::daily_range(metric),
        title: format!("Daily {} (Min/Avg/Max)", label),
        x_title: "Date",
        y_title: label.to_string(),
        x_labels: days.iter().map(|d| date_label(d.date)).collect(),
        series: vec![min, avg, max],
        scale: ScalePolicy::for_metric(metric),
    }
}

/// Metrics that get a daily min/avg/max chart.
pub const DAILY_RANGE_METRICS: [Metric; 2] = [Metric::Temperature, Metric::Humidity];

/// Every chart on the history page, hourly charts first.
pub fn history_charts<Tz: TimeZone>(
    hourly: &[SensorReading],
    daily: &[AggregatedDay],
    window: TimeWindow,
    tz: &Tz,
) -> Vec<ChartDefinition> {
    let mut charts: Vec<ChartDefinition> = Metric::ALL
        .iter()
        .map(|&metric| hourly_chart(metric, hourly, window, tz))
        .collect();
    charts.extend(
        DAILY_RANGE_METRICS
            .iter()
            .map(|&metric| daily_range_chart(metric, daily)),
    );
    charts
}
