//! Outgoing prediction requests and the values they are built from.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{ForecastError, Result};

pub const UPLOAD_ENDPOINT: &str = "/predict-tuning";
pub const RANGE_ENDPOINT: &str = "/predict-tuning-db";
pub const DATA_RANGE_ENDPOINT: &str = "/data-range";

/// Format of date-time picker values.
pub const PICKER_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Validated forecast window parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastParams {
    forecast_hours: u32,
    window_sizes: Vec<u32>,
}

impl Default for ForecastParams {
    fn default() -> Self {
        Self {
            forecast_hours: 36,
            window_sizes: vec![72],
        }
    }
}

impl ForecastParams {
    pub fn new(forecast_hours: u32, window_sizes: Vec<u32>) -> Result<Self> {
        if forecast_hours == 0 {
            return Err(ForecastError::validation(
                "Forecast hours must be a positive integer.",
            ));
        }
        if window_sizes.is_empty() || window_sizes.contains(&0) {
            return Err(ForecastError::validation(
                "Window sizes must be a comma-separated list of positive integers.",
            ));
        }
        Ok(Self {
            forecast_hours,
            window_sizes,
        })
    }

    /// Parse the raw form inputs, e.g. `"36"` and `"24, 72"`.
    pub fn parse(forecast_hours: &str, window_sizes: &str) -> Result<Self> {
        let hours = forecast_hours.trim().parse::<u32>().map_err(|_| {
            ForecastError::validation("Forecast hours must be a positive integer.")
        })?;

        let sizes = window_sizes
            .split(',')
            .map(|part| part.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| {
                ForecastError::validation(
                    "Window sizes must be a comma-separated list of positive integers.",
                )
            })?;

        Self::new(hours, sizes)
    }

    pub fn forecast_hours(&self) -> u32 {
        self.forecast_hours
    }

    pub fn window_sizes(&self) -> &[u32] {
        &self.window_sizes
    }

    pub fn window_sizes_param(&self) -> String {
        self.window_sizes
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A file picked for upload, read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| ForecastError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());
        Ok(Self { name, bytes })
    }

    pub fn mime_type(&self) -> &'static str {
        let lower = self.name.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            "text/csv"
        } else if lower.ends_with(".json") {
            "application/json"
        } else {
            "application/octet-stream"
        }
    }
}

/// A fully built prediction request, one variant per input mode.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionRequest {
    /// Multipart `file` body plus window parameters.
    Upload {
        file: UploadFile,
        params: ForecastParams,
    },
    /// No body; the backend reads its own stored data between start and stop.
    Range {
        params: ForecastParams,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    },
}

impl PredictionRequest {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Upload { .. } => UPLOAD_ENDPOINT,
            Self::Range { .. } => RANGE_ENDPOINT,
        }
    }

    pub fn params(&self) -> &ForecastParams {
        match self {
            Self::Upload { params, .. } | Self::Range { params, .. } => params,
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let params = self.params();
        let mut pairs = vec![
            ("forecast_hours", params.forecast_hours().to_string()),
            ("window_sizes", params.window_sizes_param()),
        ];
        if let Self::Range { start, stop, .. } = self {
            pairs.push(("start_time", format_utc(*start)));
            pairs.push(("stop_time", format_utc(*stop)));
        }
        pairs
    }
}

/// Absolute UTC timestamp string, e.g. `2024-01-01T08:00:00.000Z`.
pub fn format_utc(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a picker value such as `2024-01-01T09:30`. Seconds are accepted.
pub fn parse_picker(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, PICKER_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M"))
        .map_err(|_| {
            ForecastError::validation(format!(
                "Invalid date/time '{}', expected YYYY-MM-DDTHH:MM",
                value
            ))
        })
}

pub fn format_picker(value: NaiveDateTime) -> String {
    value.format(PICKER_FORMAT).to_string()
}

/// Interpret a wall-clock picker value in `zone` and convert it to UTC.
///
/// The offset is resolved for the value's own date. An ambiguous time at the
/// end of daylight saving resolves to the earlier instant; a time skipped by
/// the start of daylight saving is rejected.
pub fn picker_to_utc<Tz: TimeZone>(value: NaiveDateTime, zone: &Tz) -> Result<DateTime<Utc>> {
    zone.from_local_datetime(&value)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
        .ok_or_else(|| ForecastError::validation(format!("Invalid local time {}", value)))
}

/// Wall-clock value of a UTC instant in `zone`, as a picker would show it.
pub fn utc_to_picker<Tz: TimeZone>(ts: DateTime<Utc>, zone: &Tz) -> NaiveDateTime {
    ts.with_timezone(zone).naive_local()
}
