//! Render state: the one table, chart and CSV text currently on display.

use crate::{
    chart::ForecastChart,
    csv_export::to_csv,
    error::Result,
    prediction::PredictionResult,
    table::TableView,
};

/// What a render call produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub rows: usize,
    pub columns: usize,
    pub chart_visible: bool,
}

/// Owner of everything derived from the last prediction.
///
/// Each successful render replaces the whole state; the previous chart handle
/// is dropped when the new one takes its place.
#[derive(Debug, Default)]
pub struct RenderState {
    result: Option<PredictionResult>,
    table: Option<TableView>,
    chart: Option<ForecastChart>,
    csv: String,
}

impl RenderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a prediction. An empty one shows the placeholder row.
    pub fn render(&mut self, result: PredictionResult) -> Result<RenderSummary> {
        let table = TableView::render(&result);
        let chart = ForecastChart::build(&result);
        let csv = to_csv(&result)?;

        let summary = RenderSummary {
            rows: result.len(),
            columns: result.columns().len(),
            chart_visible: chart.is_some(),
        };

        if self.chart.is_some() {
            tracing::debug!("Replacing previously rendered chart");
        }

        *self = Self {
            result: (!result.is_empty()).then_some(result),
            table: Some(table),
            chart,
            csv,
        };

        Ok(summary)
    }

    /// Hide table and chart and disable exports.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        self.result.as_ref()
    }

    /// `None` while the table is hidden.
    pub fn table(&self) -> Option<&TableView> {
        self.table.as_ref()
    }

    pub fn chart(&self) -> Option<&ForecastChart> {
        self.chart.as_ref()
    }

    pub fn csv(&self) -> &str {
        &self.csv
    }

    pub fn csv_export_enabled(&self) -> bool {
        !self.csv.is_empty()
    }

    pub fn chart_export_enabled(&self) -> bool {
        self.chart.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_none()
    }
}
