// History export - delimited text artifact of raw readings
use crate::application::grow_box_api::FetchError;
use crate::domain::telemetry::SensorReading;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to read history: {0}")]
    Fetch(#[from] FetchError),

    #[error("failed to encode history: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write export file: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoded history is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Encodes rows as CSV. The header is the field names of the record type in
/// declaration order; fields containing the delimiter are quoted. No rows
/// yields an empty string.
pub fn encode_rows<T: Serialize>(rows: &[T]) -> Result<String, ExportError> {
    if rows.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

pub fn encode_history(readings: &[SensorReading]) -> Result<String, ExportError> {
    encode_rows(readings)
}

pub fn export_filename(today: NaiveDate) -> String {
    format!("grow_box_data_{}.csv", today.format("%Y-%m-%d"))
}

/// Writes the export artifact into `directory` and returns its path.
pub async fn write_history(
    directory: &Path,
    readings: &[SensorReading],
    today: NaiveDate,
) -> Result<PathBuf, ExportError> {
    let encoded = encode_history(readings)?;
    let path = directory.join(export_filename(today));
    tokio::fs::write(&path, encoded).await?;
    tracing::info!(path = %path.display(), rows = readings.len(), "history exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn reading(minute: u32, soil: Option<f64>) -> SensorReading {
        SensorReading {
            id: Some(minute as i64),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
            temperature: Some(22.5),
            humidity: Some(60.0),
            light_level: Some(450.0),
            soil_moisture: soil,
        }
    }

    #[test]
    fn test_history_has_header_plus_one_line_per_reading() {
        let readings = vec![reading(0, Some(40.0)), reading(5, None), reading(10, Some(39.5))];
        let csv = encode_history(&readings).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), readings.len() + 1);
        assert_eq!(lines[0], "id,timestamp,temperature,humidity,light_level,soil_moisture");

        let header_fields = lines[0].split(',').count();
        for row in &lines[1..] {
            assert_eq!(row.split(',').count(), header_fields);
        }
        assert!(lines[2].ends_with(",450.0,"));
    }

    #[test]
    fn test_timestamps_exported_as_served() {
        let json = r#"[{"id": 7, "timestamp": "2024-05-01T12:30:00.250000", "temperature": 23.5},
            {"id": 8, "timestamp": "2024-05-01T12:35:00", "temperature": 23.6}]"#;
        let readings: Vec<SensorReading> = serde_json::from_str(json).unwrap();

        let csv = encode_history(&readings).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "7,2024-05-01T12:30:00.250000,23.5,,,");
        assert_eq!(lines[2], "8,2024-05-01T12:35:00,23.6,,,");
    }

    #[test]
    fn test_empty_history_is_empty() {
        assert_eq!(encode_history(&[]).unwrap(), "");
    }

    #[test]
    fn test_fields_with_delimiter_are_quoted() {
        #[derive(Serialize)]
        struct Row {
            note: &'static str,
            value: f64,
        }

        let csv = encode_rows(&[Row { note: "dry, refill", value: 1.0 }]).unwrap();
        assert_eq!(csv, "note,value\n\"dry, refill\",1.0\n");
    }

    #[test]
    fn test_export_filename() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(export_filename(today), "grow_box_data_2024-05-01.csv");
    }

    #[tokio::test]
    async fn test_write_history_to_directory() {
        let dir = std::env::temp_dir().join(format!("growbox-export-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();

        let path = write_history(&dir, &[reading(1, None)], today).await.unwrap();
        let written = tokio::fs::read_to_string(&path).await.unwrap();

        assert!(path.ends_with("grow_box_data_2024-05-02.csv"));
        assert_eq!(written.lines().count(), 2);
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
