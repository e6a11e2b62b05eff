//! Input modes and the form they drive.
//!
//! Exactly one mode is active. Which fields are required, and which panel is
//! shown, is a pure function of the mode; entering the database mode also
//! loads the queryable data range and pre-fills a default window.

use chrono::{Duration, Local, NaiveDateTime, TimeZone};

use crate::{
    api::{DataRange, ForecastApiClient},
    config::ForecastConfig,
    request::{UploadFile, utc_to_picker},
};

/// Length of the pre-filled database window.
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Display format for data range bounds.
const RANGE_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    FileUpload,
    DatabaseRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    File,
    StartTime,
    StopTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Upload,
    Database,
}

/// Which inputs a mode requires and which panel it shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRequirements {
    pub required: Vec<Field>,
    pub panel: Panel,
}

impl FieldRequirements {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::FileUpload => Self {
                required: vec![Field::File],
                panel: Panel::Upload,
            },
            Mode::DatabaseRange => Self {
                required: vec![Field::StartTime, Field::StopTime],
                panel: Panel::Database,
            },
        }
    }

    pub fn is_required(&self, field: Field) -> bool {
        self.required.contains(&field)
    }
}

/// Form inputs shared by both modes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForecastForm {
    pub file: Option<UploadFile>,
    pub forecast_hours: String,
    pub window_sizes: String,
    /// Wall-clock picker values in the controller's zone.
    pub start_time: Option<NaiveDateTime>,
    pub stop_time: Option<NaiveDateTime>,
}

impl ForecastForm {
    pub fn new(defaults: &ForecastConfig) -> Self {
        Self {
            forecast_hours: defaults.forecast_hours.clone(),
            window_sizes: defaults.window_sizes.clone(),
            ..Self::default()
        }
    }

    pub fn has(&self, field: Field) -> bool {
        match field {
            Field::File => self.file.is_some(),
            Field::StartTime => self.start_time.is_some(),
            Field::StopTime => self.stop_time.is_some(),
        }
    }
}

/// What the data range display currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RangeDisplay {
    #[default]
    Hidden,
    Available(String),
    /// Fetch failed; the message replaces the bounds.
    Failed(String),
}

/// Tracks the active mode and its auxiliary data.
///
/// `Tz` is the zone picker values are entered in; the binary uses [`Local`].
#[derive(Debug, Clone)]
pub struct ModeController<Tz: TimeZone = Local> {
    mode: Mode,
    zone: Tz,
    data_range: Option<DataRange>,
    display: RangeDisplay,
}

impl<Tz: TimeZone> ModeController<Tz> {
    /// Start in file-upload mode. `zone` is where picker values live.
    pub fn new(zone: Tz) -> Self {
        Self {
            mode: Mode::default(),
            zone,
            data_range: None,
            display: RangeDisplay::Hidden,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn zone(&self) -> &Tz {
        &self.zone
    }

    pub fn requirements(&self) -> FieldRequirements {
        FieldRequirements::for_mode(self.mode)
    }

    pub fn data_range(&self) -> Option<&DataRange> {
        self.data_range.as_ref()
    }

    pub fn range_display(&self) -> &RangeDisplay {
        &self.display
    }

    /// Handle an explicit mode selection.
    ///
    /// Selecting the database mode always fetches the data range once. A
    /// failed fetch is shown but does not revert the switch.
    pub async fn select(&mut self, mode: Mode, client: &ForecastApiClient, form: &mut ForecastForm) {
        self.mode = mode;
        tracing::debug!("Switched to {:?} mode", mode);

        match mode {
            Mode::FileUpload => {
                self.data_range = None;
                self.display = RangeDisplay::Hidden;
            }
            Mode::DatabaseRange => match client.fetch_data_range().await {
                Ok(range) => self.apply_range(range, form),
                Err(e) => {
                    tracing::error!("Failed to load data range: {}", e);
                    self.data_range = None;
                    self.display = RangeDisplay::Failed(format!("Failed to load data range: {}", e));
                }
            },
        }
    }

    /// Show the bounds and pre-fill the last 24 hours of available data.
    pub fn apply_range(&mut self, range: DataRange, form: &mut ForecastForm) {
        self.display = match (range.min_time, range.max_time) {
            (Some(min), Some(max)) => RangeDisplay::Available(format!(
                "Available data: {} to {}",
                utc_to_picker(min, &self.zone).format(RANGE_DISPLAY_FORMAT),
                utc_to_picker(max, &self.zone).format(RANGE_DISPLAY_FORMAT),
            )),
            _ => RangeDisplay::Available("No data available in the database".to_string()),
        };

        if let Some(max) = range.max_time {
            form.stop_time = Some(utc_to_picker(max, &self.zone));
            form.start_time = Some(utc_to_picker(
                max - Duration::hours(DEFAULT_WINDOW_HOURS),
                &self.zone,
            ));
        }

        self.data_range = Some(range);
    }
}
