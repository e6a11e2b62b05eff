//! CSV text for the prediction download.

use crate::{
    error::{ForecastError, Result},
    prediction::PredictionResult,
};

/// First header field of the CSV download.
pub const CSV_TIMESTAMP_HEADER: &str = "date_time";

/// Serialize a prediction to CSV text.
///
/// Rows follow the table order, lines are `\n`-separated with no trailing
/// newline, and nulls become empty fields. An empty prediction yields an
/// empty string.
pub fn to_csv(result: &PredictionResult) -> Result<String> {
    if result.is_empty() {
        return Ok(String::new());
    }

    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let header = std::iter::once(CSV_TIMESTAMP_HEADER).chain(result.columns().iter().map(String::as_str));
    wtr.write_record(header)
        .map_err(|e| ForecastError::Io(format!("Failed to write CSV header: {}", e)))?;

    for row in result.rows() {
        let record = std::iter::once(row.timestamp.clone())
            .chain(row.values.iter().map(|value| value.to_string()));
        wtr.write_record(record)
            .map_err(|e| ForecastError::Io(format!("Failed to write CSV row: {}", e)))?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ForecastError::Io(format!("Failed to flush CSV writer: {}", e)))?;
    let mut text =
        String::from_utf8(bytes).map_err(|e| ForecastError::Io(e.to_string()))?;

    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::{ACTUAL_COLUMN, MetricRow, PREDICTED_COLUMN, RawPrediction, Scalar};

    #[test]
    fn test_empty_prediction_serializes_to_empty_string() {
        assert_eq!(to_csv(&PredictionResult::empty()).unwrap(), "");
    }

    #[test]
    fn test_two_row_scenario() {
        let result = PredictionResult::from(
            RawPrediction::new()
                .with_row(
                    "2024-01-01T00:00",
                    MetricRow::new()
                        .with(PREDICTED_COLUMN, Some(10.0))
                        .with(ACTUAL_COLUMN, Some(8.0)),
                )
                .with_row(
                    "2024-01-01T01:00",
                    MetricRow::new()
                        .with(PREDICTED_COLUMN, Some(12.0))
                        .with(ACTUAL_COLUMN, Scalar::Null),
                ),
        );

        assert_eq!(
            to_csv(&result).unwrap(),
            "date_time,predicted_users,real_users\n2024-01-01T00:00,10,8\n2024-01-01T01:00,12,"
        );
    }

    #[test]
    fn test_fractional_values_keep_precision() {
        let result = PredictionResult::from(RawPrediction::new().with_row(
            "2024-03-05 10:00:00",
            MetricRow::new().with(PREDICTED_COLUMN, Some(41.75)),
        ));

        assert_eq!(
            to_csv(&result).unwrap(),
            "date_time,predicted_users\n2024-03-05 10:00:00,41.75"
        );
    }

    #[test]
    fn test_feature_columns_use_natural_string_form() {
        let result = PredictionResult::from(RawPrediction::new().with_row(
            "2012-09-01 00:00:00",
            MetricRow::new()
                .with(PREDICTED_COLUMN, Some(10.0))
                .with(ACTUAL_COLUMN, Some(8.0))
                .with("weather", "clear")
                .with("is_holiday", false)
                .with("note", "rain, light"),
        ));

        assert_eq!(
            to_csv(&result).unwrap(),
            "date_time,predicted_users,real_users,weather,is_holiday,note\n\
             2012-09-01 00:00:00,10,8,clear,false,\"rain, light\""
        );
    }

    // ==================== Property-Based Tests ====================

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;
        use crate::{chart::ForecastChart, table::TableView};

        fn prediction_strategy() -> impl Strategy<Value = PredictionResult> {
            prop::collection::vec(
                (
                    0u32..10_000,
                    prop::option::of(0u32..500),
                    prop::option::of(0u32..500),
                ),
                1..40,
            )
            .prop_map(|rows| {
                let raw = rows.into_iter().enumerate().fold(
                    RawPrediction::new(),
                    |raw, (idx, (pred, real, lower))| {
                        let mut row = MetricRow::new().with(PREDICTED_COLUMN, Some(pred as f64));
                        if let Some(real) = real {
                            row.insert(ACTUAL_COLUMN, Some(real as f64));
                        }
                        row.insert("lower_bound", lower.map(f64::from));
                        raw.with_row(format!("2024-01-01 {:05}", idx), row)
                    },
                );
                PredictionResult::from(raw)
            })
        }

        proptest! {
            #[test]
            fn csv_matches_table_rows_and_columns(result in prediction_strategy()) {
                let csv = to_csv(&result).unwrap();
                let table = TableView::render(&result);
                let lines: Vec<&str> = csv.split('\n').collect();

                prop_assert_eq!(lines.len(), table.body().len() + 1);

                let csv_header: Vec<&str> = lines[0].split(',').skip(1).collect();
                let table_header: Vec<&str> = table.header().iter().skip(1).map(String::as_str).collect();
                prop_assert_eq!(csv_header, table_header);

                for (line, row) in lines[1..].iter().zip(table.body()) {
                    prop_assert_eq!(line.split(',').next(), Some(row[0].as_str()));
                }
            }

            #[test]
            fn chart_labels_match_table_order(result in prediction_strategy()) {
                let chart = ForecastChart::build(&result).unwrap();
                let table = TableView::render(&result);

                let table_timestamps: Vec<&String> = table.body().iter().map(|row| &row[0]).collect();
                let chart_labels: Vec<&String> = chart.labels().iter().collect();
                prop_assert_eq!(chart_labels, table_timestamps);
                prop_assert_eq!(chart.actual().values.len(), chart.labels().len());
                prop_assert_eq!(chart.predicted().values.len(), chart.labels().len());
            }
        }
    }
}
