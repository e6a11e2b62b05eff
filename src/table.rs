//! Table projection of a prediction.

use crate::prediction::PredictionResult;

/// Header of the timestamp column.
pub const TIMESTAMP_HEADER: &str = "Date Time";
/// Text of the placeholder row shown for an empty prediction.
pub const NO_DATA_PLACEHOLDER: &str = "No data available";

/// Display model of the results table. Each render builds a fresh one.
#[derive(Debug, Clone, PartialEq)]
pub enum TableView {
    /// Single centered placeholder row; chart and exports are hidden.
    Placeholder,
    Rows {
        header: Vec<String>,
        body: Vec<Vec<String>>,
    },
}

impl TableView {
    pub fn render(result: &PredictionResult) -> Self {
        if result.is_empty() {
            return Self::Placeholder;
        }

        let header = std::iter::once(TIMESTAMP_HEADER.to_string())
            .chain(result.columns().iter().cloned())
            .collect();

        let body = result
            .rows()
            .iter()
            .map(|row| {
                std::iter::once(row.timestamp.clone())
                    .chain(row.values.iter().map(|value| value.to_string()))
                    .collect()
            })
            .collect();

        Self::Rows { header, body }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }

    /// Whether the rest of the page should hide the chart and exports.
    pub fn hides_chart_and_exports(&self) -> bool {
        self.is_placeholder()
    }

    pub fn header(&self) -> &[String] {
        match self {
            Self::Placeholder => &[],
            Self::Rows { header, .. } => header,
        }
    }

    pub fn body(&self) -> &[Vec<String>] {
        match self {
            Self::Placeholder => &[],
            Self::Rows { body, .. } => body,
        }
    }

    /// Plain-text rendering for terminals.
    pub fn to_text(&self) -> String {
        match self {
            Self::Placeholder => {
                let width = NO_DATA_PLACEHOLDER.len() + 4;
                format!("{:^width$}", NO_DATA_PLACEHOLDER, width = width)
            }
            Self::Rows { header, body } => {
                let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
                for row in body {
                    for (idx, cell) in row.iter().enumerate() {
                        if let Some(w) = widths.get_mut(idx) {
                            *w = (*w).max(cell.chars().count());
                        }
                    }
                }

                let format_line = |cells: &[String]| {
                    cells
                        .iter()
                        .zip(&widths)
                        .map(|(cell, w)| format!("{:<w$}", cell, w = *w))
                        .collect::<Vec<_>>()
                        .join(" | ")
                        .trim_end()
                        .to_string()
                };

                let rule = widths
                    .iter()
                    .map(|w| "-".repeat(*w))
                    .collect::<Vec<_>>()
                    .join("-+-");

                let mut lines = Vec::with_capacity(body.len() + 2);
                lines.push(format_line(header));
                lines.push(rule);
                lines.extend(body.iter().map(|row| format_line(row)));
                lines.join("\n")
            }
        }
    }
}
