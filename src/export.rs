//! CSV and chart-image downloads from the current render state.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    config::ExportConfig,
    error::{ForecastError, Result},
    render::RenderState,
    traits::Notifier,
};

pub const CSV_FILE_NAME: &str = "prediction.csv";
pub const CHART_FILE_NAME: &str = "forecast_chart.png";
pub const NO_DATA_MESSAGE: &str = "No data to download.";
pub const NO_CHART_MESSAGE: &str = "No chart to download.";

pub struct ExportController {
    state: Arc<Mutex<RenderState>>,
    notifier: Arc<dyn Notifier>,
    output_dir: PathBuf,
    chart_size: (u32, u32),
}

impl ExportController {
    pub fn new(
        state: Arc<Mutex<RenderState>>,
        notifier: Arc<dyn Notifier>,
        config: &ExportConfig,
    ) -> Self {
        Self {
            state,
            notifier,
            output_dir: config.resolve_output_dir(),
            chart_size: (config.chart_width, config.chart_height),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the current CSV text to `prediction.csv`.
    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.csv().to_string()
        };

        if csv.is_empty() {
            return Err(self.reject(NO_DATA_MESSAGE));
        }

        self.write(CSV_FILE_NAME, csv.as_bytes())
    }

    /// Write a PNG snapshot of the live chart to `forecast_chart.png`.
    pub fn export_chart(&self) -> Result<PathBuf> {
        let chart = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.chart().cloned()
        };

        let Some(chart) = chart else {
            return Err(self.reject(NO_CHART_MESSAGE));
        };

        let (width, height) = self.chart_size;
        let png = chart
            .snapshot_png(width, height)
            .map_err(|e| self.report("Chart snapshot failed", e))?;
        self.write(CHART_FILE_NAME, &png)
    }

    fn reject(&self, message: &str) -> ForecastError {
        tracing::warn!("Export rejected: {}", message);
        self.alert(message);
        ForecastError::Export(message.to_string())
    }

    /// Log and show a failed export, handing the error back to the caller.
    fn report(&self, context: &str, error: ForecastError) -> ForecastError {
        tracing::error!("{}: {}", context, error);
        self.alert(&error.to_string());
        error
    }

    fn alert(&self, message: &str) {
        if let Err(e) = self.notifier.notify("Export", message) {
            tracing::warn!("Failed to show alert: {}", e);
        }
    }

    fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            self.report(
                "Export failed",
                ForecastError::Io(format!(
                    "Failed to create {}: {}",
                    self.output_dir.display(),
                    e
                )),
            )
        })?;

        let path = self.output_dir.join(file_name);
        std::fs::write(&path, bytes).map_err(|e| {
            self.report(
                "Export failed",
                ForecastError::Io(format!("Failed to write {}: {}", path.display(), e)),
            )
        })?;

        tracing::info!("Saved {}", path.display());
        Ok(path)
    }
}
