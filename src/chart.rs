//! Predicted-vs-actual chart model and PNG snapshots.

use std::{io::Cursor, sync::OnceLock};

use plotters::{coord::Shift, prelude::*, style::register_font};

use crate::{
    error::{ForecastError, Result},
    prediction::{ACTUAL_COLUMN, PREDICTED_COLUMN, PredictionResult},
};

pub const PREDICTED_LABEL: &str = "Predicted";
pub const ACTUAL_LABEL: &str = "Actual";
pub const X_AXIS_TITLE: &str = "Date Time";
pub const Y_AXIS_TITLE: &str = "Users";

/// Most x-axis labels drawn before ticks get thinned out.
const MAX_X_LABELS: usize = 12;

/// Family every chart text style resolves to.
const FONT_FAMILY: &str = "sans-serif";
static FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

/// Register the bundled font once per process.
fn ensure_font() -> Result<()> {
    let ok = *FONT_REGISTERED.get_or_init(|| {
        let ok = register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok();
        if ok {
            tracing::debug!("Registered bundled chart font");
        }
        ok
    });
    if ok {
        Ok(())
    } else {
        Err(ForecastError::Export("Bundled chart font is invalid".to_string()))
    }
}

/// One line of the chart. `values` has exactly one slot per label.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: &'static str,
    pub values: Vec<Option<f64>>,
    pub color: RGBColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartOptions {
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub show_grid: bool,
    pub show_legend: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            x_title: X_AXIS_TITLE,
            y_title: Y_AXIS_TITLE,
            show_grid: false,
            show_legend: true,
        }
    }
}

/// A rendered chart. The render state holds at most one of these.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastChart {
    labels: Vec<String>,
    predicted: Series,
    actual: Series,
    options: ChartOptions,
}

impl ForecastChart {
    /// Build the chart for a prediction, or `None` when it should be hidden.
    pub fn build(result: &PredictionResult) -> Option<Self> {
        if result.is_empty() {
            return None;
        }

        Some(Self {
            labels: result.timestamps().map(str::to_string).collect(),
            predicted: Series {
                label: PREDICTED_LABEL,
                values: result.series(PREDICTED_COLUMN),
                color: RED,
            },
            actual: Series {
                label: ACTUAL_LABEL,
                values: result.series(ACTUAL_COLUMN),
                color: BLUE,
            },
            options: ChartOptions::default(),
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn predicted(&self) -> &Series {
        &self.predicted
    }

    pub fn actual(&self) -> &Series {
        &self.actual
    }

    pub fn options(&self) -> &ChartOptions {
        &self.options
    }

    /// Y-axis bounds covering every non-null value with a small margin.
    pub fn value_range(&self) -> (f64, f64) {
        let values = self
            .predicted
            .values
            .iter()
            .chain(&self.actual.values)
            .filter_map(|v| *v)
            .filter(|v| v.is_finite());

        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

        if !min.is_finite() || !max.is_finite() {
            return (0.0, 1.0);
        }
        if min == max {
            return (min - 1.0, max + 1.0);
        }
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    }

    /// Draw the chart into an opaque RGB PNG.
    pub fn snapshot_png(&self, width: u32, height: u32) -> Result<Vec<u8>> {
        if width == 0 || height == 0 {
            return Err(ForecastError::Export(format!(
                "Invalid chart size {}x{}",
                width, height
            )));
        }

        ensure_font()?;

        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            self.draw(&root)
                .and_then(|()| root.present().map_err(anyhow::Error::from))
                .map_err(|e| ForecastError::Export(format!("Failed to draw chart: {}", e)))?;
        }

        let image = image::RgbImage::from_raw(width, height, buffer)
            .ok_or_else(|| ForecastError::Export("Chart buffer size mismatch".to_string()))?;

        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, image::ImageFormat::Png)
            .map_err(|e| ForecastError::Export(format!("Failed to encode chart: {}", e)))?;

        Ok(png.into_inner())
    }

    fn draw(&self, root: &DrawingArea<BitMapBackend<'_>, Shift>) -> anyhow::Result<()> {
        root.fill(&WHITE)?;

        let x_max = self.labels.len().saturating_sub(1).max(1) as f64;
        let (y_min, y_max) = self.value_range();

        let mut chart = ChartBuilder::on(root)
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..x_max, y_min..y_max)?;

        let labels = &self.labels;
        let label_at = |x: &f64| {
            let idx = x.round();
            if idx < 0.0 || (x - idx).abs() > 1e-6 {
                return String::new();
            }
            labels.get(idx as usize).cloned().unwrap_or_default()
        };

        let mut mesh = chart.configure_mesh();
        if !self.options.show_grid {
            mesh.disable_mesh();
        }
        mesh.x_desc(self.options.x_title)
            .y_desc(self.options.y_title)
            .x_labels(self.labels.len().min(MAX_X_LABELS))
            .x_label_formatter(&label_at)
            .draw()?;

        for series in [&self.predicted, &self.actual] {
            let color = series.color;

            // Empty anchor series so the legend lists every line, even an all-null one.
            chart
                .draw_series(std::iter::empty::<PathElement<(f64, f64)>>())?
                .label(series.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

            for segment in segments(&series.values) {
                chart.draw_series(
                    LineSeries::new(
                        segment.into_iter().map(|(idx, value)| (idx as f64, value)),
                        color.stroke_width(2),
                    )
                    .point_size(2),
                )?;
            }
        }

        if self.options.show_legend {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(&WHITE)
                .border_style(&BLACK)
                .draw()?;
        }

        Ok(())
    }
}

/// Split a series into runs of consecutive non-null points.
fn segments(values: &[Option<f64>]) -> Vec<Vec<(usize, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();

    for (idx, value) in values.iter().enumerate() {
        match value {
            Some(v) => current.push((idx, *v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::{MetricRow, RawPrediction};

    fn result_with(rows: &[(&str, Option<f64>, Option<f64>)]) -> PredictionResult {
        let raw = rows.iter().fold(RawPrediction::new(), |raw, (ts, pred, real)| {
            raw.with_row(
                *ts,
                MetricRow::new()
                    .with(PREDICTED_COLUMN, *pred)
                    .with(ACTUAL_COLUMN, *real),
            )
        });
        PredictionResult::from(raw)
    }

    #[test]
    fn test_empty_prediction_hides_chart() {
        assert!(ForecastChart::build(&PredictionResult::empty()).is_none());
    }

    #[test]
    fn test_series_follow_labels() {
        let chart = ForecastChart::build(&result_with(&[
            ("2024-01-01T00:00", Some(10.0), Some(8.0)),
            ("2024-01-01T01:00", Some(12.0), None),
        ]))
        .unwrap();

        assert_eq!(chart.labels(), &["2024-01-01T00:00", "2024-01-01T01:00"]);
        assert_eq!(chart.predicted().label, PREDICTED_LABEL);
        assert_eq!(chart.predicted().values, vec![Some(10.0), Some(12.0)]);
        assert_eq!(chart.actual().label, ACTUAL_LABEL);
        assert_eq!(chart.actual().values, vec![Some(8.0), None]);
    }

    #[test]
    fn test_missing_actual_column_is_null_not_omitted() {
        let raw = RawPrediction::new()
            .with_row("t0", MetricRow::new().with(PREDICTED_COLUMN, Some(1.0)))
            .with_row("t1", MetricRow::new().with(PREDICTED_COLUMN, Some(2.0)));
        let chart = ForecastChart::build(&PredictionResult::from(raw)).unwrap();

        assert_eq!(chart.actual().values, vec![None, None]);
        assert_eq!(chart.actual().values.len(), chart.labels().len());
    }

    #[test]
    fn test_visual_options() {
        let options = ChartOptions::default();
        assert_eq!(options.x_title, "Date Time");
        assert_eq!(options.y_title, "Users");
        assert!(!options.show_grid);
        assert!(options.show_legend);
    }

    #[test]
    fn test_value_range_pads_extremes() {
        let chart = ForecastChart::build(&result_with(&[
            ("t0", Some(0.0), Some(100.0)),
            ("t1", Some(50.0), None),
        ]))
        .unwrap();

        let (lo, hi) = chart.value_range();
        assert_eq!(lo, -5.0);
        assert_eq!(hi, 105.0);
    }

    #[test]
    fn test_value_range_degenerate_cases() {
        let flat = ForecastChart::build(&result_with(&[("t0", Some(7.0), None)])).unwrap();
        assert_eq!(flat.value_range(), (6.0, 8.0));

        let blank = ForecastChart::build(&result_with(&[("t0", None, None)])).unwrap();
        assert_eq!(blank.value_range(), (0.0, 1.0));
    }

    #[test]
    fn test_segments_break_on_null() {
        let runs = segments(&[Some(1.0), Some(2.0), None, None, Some(5.0), None]);
        assert_eq!(runs, vec![vec![(0, 1.0), (1, 2.0)], vec![(4, 5.0)]]);
        assert!(segments(&[None, None]).is_empty());
    }

    #[test]
    fn test_snapshot_is_png() {
        let chart = ForecastChart::build(&result_with(&[
            ("2024-01-01T00:00", Some(10.0), Some(8.0)),
            ("2024-01-01T01:00", Some(12.0), None),
            ("2024-01-01T02:00", Some(9.0), None),
        ]))
        .unwrap();

        let png = chart.snapshot_png(320, 200).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 320);
        assert_eq!(decoded.height(), 200);
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_snapshot_draws_axis_text() {
        let chart = ForecastChart::build(&result_with(&[
            ("2024-01-01T00:00", Some(10.0), Some(8.0)),
            ("2024-01-01T01:00", Some(40.0), None),
        ]))
        .unwrap();

        let png = chart.snapshot_png(400, 300).unwrap();
        let image = image::load_from_memory(&png).unwrap().to_rgb8();

        // Left of the y axis only tick labels and the "Users" title are drawn.
        let dark_label_pixels = (20..70)
            .flat_map(|x| (20..230).map(move |y| (x, y)))
            .filter(|&(x, y)| {
                let [r, g, b] = image.get_pixel(x, y).0;
                r < 128 && g < 128 && b < 128
            })
            .count();
        assert!(dark_label_pixels > 0, "Expected axis text to be drawn");
    }

    #[test]
    fn test_snapshot_rejects_zero_size() {
        let chart = ForecastChart::build(&result_with(&[("t0", Some(1.0), None)])).unwrap();
        assert!(matches!(
            chart.snapshot_png(0, 100),
            Err(ForecastError::Export(_))
        ));
    }
}
