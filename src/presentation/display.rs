// Operator-visible state: readouts, indicators, switches, badges, notices
use crate::domain::controls::{Control, ControlCell};
use crate::domain::settings::{GrowSettings, ReadingStatus};
use crate::domain::telemetry::{Metric, SensorReading, TimeWindow, format_local_timestamp};
use std::collections::BTreeMap;
use std::fmt;

/// A blocking, operator-visible failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice(pub String);

#[derive(Debug, Default)]
pub struct OperatorDisplay {
    readouts: BTreeMap<Metric, String>,
    reading_time: Option<String>,
    indicators: BTreeMap<Metric, ReadingStatus>,
    switches: BTreeMap<Control, bool>,
    badges: BTreeMap<Control, &'static str>,
    window: TimeWindow,
    charts_loading: bool,
    notices: Vec<Notice>,
}

impl OperatorDisplay {
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            ..Self::default()
        }
    }

    /// Updates readouts present in `reading`; absent metrics keep their text.
    pub fn show_reading(&mut self, reading: &SensorReading) {
        for metric in Metric::ALL {
            if let Some(value) = reading.value(metric) {
                self.readouts.insert(metric, metric.format_readout(value));
            }
        }
        self.reading_time = Some(format_local_timestamp(reading.timestamp));
    }

    /// Re-evaluates threshold indicators for the metrics that have a band.
    pub fn show_indicators(&mut self, reading: &SensorReading, settings: &GrowSettings) {
        for metric in Metric::ALL {
            if let (Some(value), Some(band)) = (reading.value(metric), settings.threshold(metric)) {
                self.indicators.insert(metric, band.classify(value));
            }
        }
    }

    /// Switch follows the displayed value; the badge follows the last
    /// confirmed one.
    pub fn show_control(&mut self, control: Control, cell: ControlCell) {
        let confirmed = match cell {
            ControlCell::Confirmed(value) => value,
            ControlCell::Pending { previous, .. } => previous,
        };
        self.switches.insert(control, cell.displayed());
        self.badges.insert(control, control.badge(confirmed));
    }

    pub fn set_window(&mut self, window: TimeWindow) {
        self.window = window;
    }

    pub fn set_charts_loading(&mut self, loading: bool) {
        self.charts_loading = loading;
    }

    pub fn raise_notice(&mut self, message: impl Into<String>) {
        let notice = Notice(message.into());
        tracing::warn!(notice = %notice.0, "operator notice");
        self.notices.push(notice);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn readout(&self, metric: Metric) -> Option<&str> {
        self.readouts.get(&metric).map(String::as_str)
    }

    pub fn indicator(&self, metric: Metric) -> Option<ReadingStatus> {
        self.indicators.get(&metric).copied()
    }

    pub fn switch(&self, control: Control) -> Option<bool> {
        self.switches.get(&control).copied()
    }

    pub fn badge(&self, control: Control) -> Option<&'static str> {
        self.badges.get(&control).copied()
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn charts_loading(&self) -> bool {
        self.charts_loading
    }

    pub fn pending_notices(&self) -> &[Notice] {
        &self.notices
    }
}

impl fmt::Display for OperatorDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Reading at {}",
            self.reading_time.as_deref().unwrap_or("(no data yet)")
        )?;
        for metric in Metric::ALL {
            let readout = self.readout(metric).unwrap_or("--");
            match self.indicator(metric) {
                Some(status) => writeln!(f, "  {:<14} {:>12}  [{}]", metric.id(), readout, status)?,
                None => writeln!(f, "  {:<14} {:>12}", metric.id(), readout)?,
            }
        }
        for control in Control::ALL {
            let switch = match self.switch(control) {
                Some(true) => "on",
                Some(false) => "off",
                None => "?",
            };
            writeln!(
                f,
                "  {:<24} switch {:<3}  [{}]",
                control.to_string(),
                switch,
                self.badge(control).unwrap_or("--")
            )?;
        }
        write!(
            f,
            "  window {}{}",
            self.window,
            if self.charts_loading { " (loading charts)" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::controls::Actuator;
    use chrono::{TimeZone, Utc};

    fn reading(temperature: Option<f64>, humidity: Option<f64>) -> SensorReading {
        SensorReading {
            id: None,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            temperature,
            humidity,
            light_level: None,
            soil_moisture: None,
        }
    }

    #[test]
    fn test_absent_metric_keeps_previous_readout() {
        let mut display = OperatorDisplay::default();
        display.show_reading(&reading(Some(21.04), Some(50.0)));
        display.show_reading(&reading(None, Some(52.5)));

        assert_eq!(display.readout(Metric::Temperature), Some("21.0°C"));
        assert_eq!(display.readout(Metric::Humidity), Some("52.5%"));
        assert_eq!(display.readout(Metric::LightLevel), None);
    }

    #[test]
    fn test_indicators_use_thresholds() {
        let mut display = OperatorDisplay::default();
        display.show_indicators(&reading(Some(31.0), Some(20.0)), &GrowSettings::default());

        assert_eq!(display.indicator(Metric::Temperature), Some(ReadingStatus::TooHigh));
        assert_eq!(display.indicator(Metric::Humidity), Some(ReadingStatus::TooLow));
    }

    #[test]
    fn test_each_control_updates_its_own_badge() {
        let mut display = OperatorDisplay::default();
        let pump = Control::Actuator(Actuator::WaterPump);
        let light = Control::Actuator(Actuator::Light);

        display.show_control(light, ControlCell::Confirmed(false));
        display.show_control(pump, ControlCell::Confirmed(true));

        assert_eq!(display.badge(pump), Some("ON"));
        assert_eq!(display.badge(light), Some("OFF"));
    }

    #[test]
    fn test_pending_control_shows_request_on_switch_only() {
        let mut display = OperatorDisplay::default();
        let fan_auto = Control::AutoMode(Actuator::Fan);

        display.show_control(
            fan_auto,
            ControlCell::Pending {
                requested: false,
                previous: true,
            },
        );

        assert_eq!(display.switch(fan_auto), Some(false));
        assert_eq!(display.badge(fan_auto), Some("AUTO"));
    }

    #[test]
    fn test_notices_drain() {
        let mut display = OperatorDisplay::default();
        display.raise_notice("Failed to control fan. Please try again.");
        assert_eq!(display.take_notices().len(), 1);
        assert!(display.take_notices().is_empty());
    }
}
