// Typed grow box settings, decoded once from the service's string map
use super::controls::AutoModeState;
use super::telemetry::Metric;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SettingsError {
    #[error("setting {name} = '{value}' is not a number")]
    InvalidNumber { name: String, value: String },

    #[error("setting {name} = '{value}' is not 'true' or 'false'")]
    InvalidFlag { name: String, value: String },

    #[error("setting {name} = '{value}' is not a known watering schedule")]
    InvalidSchedule { name: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingStatus {
    TooLow,
    Good,
    TooHigh,
}

impl SettingsError {
    pub fn name(&self) -> &str {
        match self {
            SettingsError::InvalidNumber { name, .. }
            | SettingsError::InvalidFlag { name, .. }
            | SettingsError::InvalidSchedule { name, .. } => name,
        }
    }
}

impl Threshold {
    pub fn classify(&self, value: f64) -> ReadingStatus {
        if value < self.min {
            ReadingStatus::TooLow
        } else if value > self.max {
            ReadingStatus::TooHigh
        } else {
            ReadingStatus::Good
        }
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReadingStatus::TooLow => "TOO LOW",
            ReadingStatus::Good => "GOOD",
            ReadingStatus::TooHigh => "TOO HIGH",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaterSchedule {
    Off,
    Daily,
    Custom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrowSettings {
    pub temperature: Threshold,
    pub humidity: Threshold,
    pub light_hours_start: u32,
    pub light_hours_end: u32,
    pub water_schedule: WaterSchedule,
    pub water_time: u32,
    pub water_duration_secs: u32,
    pub auto_modes: AutoModeState,
    /// Settings this client has no typed slot for, kept verbatim. Values
    /// that failed to decode are kept here too.
    pub extra: HashMap<String, String>,
    /// Keys whose values could not be decoded; their typed slots hold defaults.
    pub invalid: Vec<SettingsError>,
}

impl Default for GrowSettings {
    fn default() -> Self {
        Self {
            temperature: Threshold {
                min: 18.0,
                max: 30.0,
            },
            humidity: Threshold {
                min: 40.0,
                max: 80.0,
            },
            light_hours_start: 6,
            light_hours_end: 18,
            water_schedule: WaterSchedule::Off,
            water_time: 8,
            water_duration_secs: 30,
            auto_modes: AutoModeState {
                fan_auto: true,
                light_auto: true,
                water_auto: true,
            },
            extra: HashMap::new(),
            invalid: Vec::new(),
        }
    }
}

impl GrowSettings {
    /// Decodes the raw `/api/settings` map one key at a time. Missing keys
    /// keep their defaults; a malformed value keeps the default, is logged,
    /// and is listed in `invalid`.
    pub fn from_map(raw: HashMap<String, String>) -> Self {
        let mut decoder = MapDecoder {
            raw,
            invalid: Vec::new(),
        };
        let mut settings = GrowSettings::default();

        decoder.field("temperature_min", parse_number, &mut settings.temperature.min);
        decoder.field("temperature_max", parse_number, &mut settings.temperature.max);
        decoder.field("humidity_min", parse_number, &mut settings.humidity.min);
        decoder.field("humidity_max", parse_number, &mut settings.humidity.max);
        decoder.field("light_hours_start", parse_number, &mut settings.light_hours_start);
        decoder.field("light_hours_end", parse_number, &mut settings.light_hours_end);
        decoder.field("water_schedule", parse_schedule, &mut settings.water_schedule);
        decoder.field("water_time", parse_number, &mut settings.water_time);
        decoder.field("water_duration", parse_number, &mut settings.water_duration_secs);
        decoder.field("fan_auto", decode_flag, &mut settings.auto_modes.fan_auto);
        decoder.field("light_auto", decode_flag, &mut settings.auto_modes.light_auto);
        decoder.field("water_auto", decode_flag, &mut settings.auto_modes.water_auto);

        settings.extra = decoder.raw;
        settings.invalid = decoder.invalid;
        settings
    }

    pub fn is_invalid(&self, name: &str) -> bool {
        self.invalid.iter().any(|e| e.name() == name)
    }

    /// Takes threshold bounds that failed to decode from `previous`, so a
    /// bad value leaves the last known band in place.
    pub fn carry_thresholds(&mut self, previous: &GrowSettings) {
        let slots = [
            ("temperature_min", &mut self.temperature.min, previous.temperature.min),
            ("temperature_max", &mut self.temperature.max, previous.temperature.max),
            ("humidity_min", &mut self.humidity.min, previous.humidity.min),
            ("humidity_max", &mut self.humidity.max, previous.humidity.max),
        ];
        for (name, slot, last) in slots {
            if self.invalid.iter().any(|e| e.name() == name) {
                *slot = last;
            }
        }
    }

    /// Threshold band for metrics that have one configured.
    pub fn threshold(&self, metric: Metric) -> Option<Threshold> {
        match metric {
            Metric::Temperature => Some(self.temperature),
            Metric::Humidity => Some(self.humidity),
            Metric::LightLevel | Metric::SoilMoisture => None,
        }
    }
}

/// Wire form of an auto-mode flag.
pub fn encode_flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

struct MapDecoder {
    raw: HashMap<String, String>,
    invalid: Vec<SettingsError>,
}

impl MapDecoder {
    fn field<T>(
        &mut self,
        name: &str,
        parse: fn(&str, &str) -> Result<T, SettingsError>,
        slot: &mut T,
    ) {
        let Some(value) = self.raw.remove(name) else {
            return;
        };
        match parse(name, &value) {
            Ok(decoded) => *slot = decoded,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed setting");
                self.invalid.push(e);
                self.raw.insert(name.to_string(), value);
            }
        }
    }
}

fn parse_schedule(name: &str, value: &str) -> Result<WaterSchedule, SettingsError> {
    match value.trim() {
        "off" => Ok(WaterSchedule::Off),
        "daily" => Ok(WaterSchedule::Daily),
        "custom" => Ok(WaterSchedule::Custom),
        _ => Err(SettingsError::InvalidSchedule {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Decodes a `"true"`/`"false"` setting value.
pub fn decode_flag(name: &str, value: &str) -> Result<bool, SettingsError> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(SettingsError::InvalidFlag {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidNumber {
            name: name.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_decode_settings() {
        let settings = GrowSettings::from_map(raw(&[
            ("temperature_min", "20.5"),
            ("temperature_max", "28"),
            ("humidity_min", "45.0"),
            ("humidity_max", "75.0"),
            ("water_schedule", "daily"),
            ("fan_auto", "false"),
            ("light_auto", "true"),
            ("co2_target", "800"),
        ]));

        assert_eq!(settings.temperature.min, 20.5);
        assert_eq!(settings.temperature.max, 28.0);
        assert_eq!(settings.humidity.min, 45.0);
        assert_eq!(settings.water_schedule, WaterSchedule::Daily);
        assert!(!settings.auto_modes.fan_auto);
        assert!(settings.auto_modes.light_auto);
        // Absent flag keeps the device default.
        assert!(settings.auto_modes.water_auto);
        assert_eq!(settings.extra.get("co2_target").map(String::as_str), Some("800"));
    }

    #[test]
    fn test_bad_value_does_not_block_other_keys() {
        let settings = GrowSettings::from_map(raw(&[
            ("fan_auto", "false"),
            ("light_hours_start", "6.5"),
            ("temperature_max", "27"),
        ]));

        assert!(!settings.auto_modes.fan_auto);
        assert_eq!(settings.temperature.max, 27.0);
        assert_eq!(settings.light_hours_start, 6);
        assert_eq!(
            settings.invalid,
            vec![SettingsError::InvalidNumber {
                name: "light_hours_start".to_string(),
                value: "6.5".to_string()
            }]
        );
        assert_eq!(
            settings.extra.get("light_hours_start").map(String::as_str),
            Some("6.5")
        );
    }

    #[test]
    fn test_malformed_values_are_listed() {
        let settings = GrowSettings::from_map(raw(&[
            ("fan_auto", "yes"),
            ("humidity_max", "lots"),
            ("water_schedule", "hourly"),
        ]));

        assert!(settings.is_invalid("fan_auto"));
        assert!(settings.is_invalid("humidity_max"));
        assert!(settings.is_invalid("water_schedule"));
        assert!(!settings.is_invalid("light_auto"));
        assert!(settings.auto_modes.fan_auto);
        assert_eq!(settings.water_schedule, WaterSchedule::Off);
    }

    #[test]
    fn test_bad_threshold_keeps_previous_band() {
        let previous = GrowSettings::from_map(raw(&[("humidity_max", "70")]));
        let mut next = GrowSettings::from_map(raw(&[
            ("humidity_min", "35"),
            ("humidity_max", "seventy"),
        ]));

        next.carry_thresholds(&previous);
        assert_eq!(next.humidity.min, 35.0);
        assert_eq!(next.humidity.max, 70.0);
    }

    #[test]
    fn test_classify_reading() {
        let band = Threshold {
            min: 18.0,
            max: 30.0,
        };
        assert_eq!(band.classify(17.9), ReadingStatus::TooLow);
        assert_eq!(band.classify(18.0), ReadingStatus::Good);
        assert_eq!(band.classify(30.1), ReadingStatus::TooHigh);
        assert_eq!(ReadingStatus::TooHigh.to_string(), "TOO HIGH");
    }

    #[test]
    fn test_threshold_only_for_banded_metrics() {
        let settings = GrowSettings::default();
        assert!(settings.threshold(Metric::Humidity).is_some());
        assert!(settings.threshold(Metric::LightLevel).is_none());
    }
}
