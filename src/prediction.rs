//! Prediction payload types and shape analysis.
//!
//! The backend returns a schema-less mapping of timestamp to metric row. This
//! module turns it into a [`PredictionResult`] with an explicit ordered column
//! list, so renderers never have to guess the shape of a row.

use std::fmt;

use serde::{
    Deserialize, Deserializer,
    de::{
        self, MapAccess, SeqAccess, Visitor,
        value::{MapAccessDeserializer, SeqAccessDeserializer},
    },
};

/// Column carrying the forecast values.
pub const PREDICTED_COLUMN: &str = "predicted_users";
/// Column carrying observed values, absent or null past the known horizon.
pub const ACTUAL_COLUMN: &str = "real_users";

/// One cell of a metric row.
///
/// Besides the forecast columns the backend echoes its exogenous features,
/// some of which are categorical, so cells are not always numbers.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Scalar {
    #[default]
    Null,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric value, `None` for anything that is not a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }
}

/// Natural string form: numbers as Rust prints them, null as empty.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Number(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Option<f64>> for Scalar {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::Number)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One metric row as received, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricRow {
    entries: Vec<(String, Scalar)>,
}

impl MetricRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and fixtures.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(column, value);
        self
    }

    /// Insert or overwrite a column, keeping the first-seen position.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Scalar>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    /// Cell of a column, `None` when the column is missing.
    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Numeric value of a column. Missing, null and non-numeric cells read as `None`.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(Scalar::as_f64)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The prediction mapping exactly as the backend sent it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPrediction {
    entries: Vec<(String, MetricRow)>,
}

impl RawPrediction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row(mut self, timestamp: impl Into<String>, row: MetricRow) -> Self {
        self.insert(timestamp, row);
        self
    }

    /// Add a row. A repeated timestamp replaces the earlier row in place.
    pub fn insert(&mut self, timestamp: impl Into<String>, row: MetricRow) {
        let timestamp = timestamp.into();
        match self.entries.iter_mut().find(|(ts, _)| *ts == timestamp) {
            Some(entry) => entry.1 = row,
            None => self.entries.push((timestamp, row)),
        }
    }

    pub fn entries(&self) -> &[(String, MetricRow)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shape discovered from a raw prediction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    /// Canonical columns, taken from the first row.
    pub columns: Vec<String>,
    /// Whether each row carries a non-null actual value.
    pub actual_present: Vec<bool>,
}

impl Shape {
    pub fn row_count(&self) -> usize {
        self.actual_present.len()
    }
}

/// Discover the column list and per-row actual presence.
///
/// The first row defines the columns for the whole result. Later rows are not
/// checked against it.
pub fn analyze_shape(raw: &RawPrediction) -> Shape {
    let Some((_, first)) = raw.entries.first() else {
        return Shape::default();
    };

    Shape {
        columns: first.columns().map(str::to_string).collect(),
        actual_present: raw
            .entries
            .iter()
            .map(|(_, row)| row.get(ACTUAL_COLUMN).is_some_and(|value| !value.is_null()))
            .collect(),
    }
}

/// A single timestamped row projected onto the canonical columns.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow {
    pub timestamp: String,
    /// One slot per column of the owning [`PredictionResult`].
    pub values: Vec<Scalar>,
}

/// Typed prediction: ordered columns plus rows aligned to them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionResult {
    columns: Vec<String>,
    rows: Vec<PredictionRow>,
    actual_present: Vec<bool>,
}

impl PredictionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[PredictionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.timestamp.as_str())
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    /// Whether row `index` has an observed value.
    pub fn has_actual(&self, index: usize) -> bool {
        self.actual_present.get(index).copied().unwrap_or(false)
    }

    /// Numeric values of one column, one entry per row. Unknown columns and
    /// non-numeric cells yield nulls.
    pub fn series(&self, column: &str) -> Vec<Option<f64>> {
        match self.column_index(column) {
            Some(idx) => self.rows.iter().map(|row| row.values[idx].as_f64()).collect(),
            None => vec![None; self.rows.len()],
        }
    }
}

impl From<RawPrediction> for PredictionResult {
    fn from(raw: RawPrediction) -> Self {
        let shape = analyze_shape(&raw);
        let rows = raw
            .entries
            .into_iter()
            .map(|(timestamp, row)| PredictionRow {
                values: shape
                    .columns
                    .iter()
                    .map(|col| row.get(col).cloned().unwrap_or_default())
                    .collect(),
                timestamp,
            })
            .collect();

        Self {
            columns: shape.columns,
            rows,
            actual_present: shape.actual_present,
        }
    }
}

// ==================== Deserialization ====================

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = Scalar;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Scalar::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Scalar::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        Scalar::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Scalar::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Scalar::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Scalar::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Scalar::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Scalar::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(Scalar::Text(v))
    }

    // Nested values are kept as their compact JSON text.
    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
        let value = serde_json::Value::deserialize(SeqAccessDeserializer::new(seq))?;
        Ok(Scalar::Text(value.to_string()))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        let value = serde_json::Value::deserialize(MapAccessDeserializer::new(map))?;
        Ok(Scalar::Text(value.to_string()))
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

struct MetricRowVisitor;

impl<'de> Visitor<'de> for MetricRowVisitor {
    type Value = MetricRow;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of column name to value")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut row = MetricRow::new();
        while let Some((column, value)) = map.next_entry::<String, Scalar>()? {
            row.insert(column, value);
        }
        Ok(row)
    }
}

impl<'de> Deserialize<'de> for MetricRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MetricRowVisitor)
    }
}

struct RawPredictionVisitor;

impl<'de> Visitor<'de> for RawPredictionVisitor {
    type Value = RawPrediction;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of timestamp to metric row")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut raw = RawPrediction::new();
        while let Some((timestamp, row)) = map.next_entry::<String, MetricRow>()? {
            raw.insert(timestamp, row);
        }
        Ok(raw)
    }
}

impl<'de> Deserialize<'de> for RawPrediction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RawPredictionVisitor)
    }
}

impl<'de> Deserialize<'de> for PredictionResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawPrediction::deserialize(deserializer).map(PredictionResult::from)
    }
}
