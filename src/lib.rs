//! Forecast Console Library
//!
//! Client-side engine for a time-series forecasting backend: submits upload or
//! database-range forecast requests, renders the returned prediction as a
//! table and a predicted-vs-actual chart, and exports CSV and PNG artifacts.

pub mod api;
pub mod chart;
pub mod config;
pub mod csv_export;
pub mod error;
pub mod export;
pub mod mode;
pub mod orchestrator;
pub mod prediction;
pub mod render;
pub mod request;
pub mod table;
pub mod traits;

// Re-export commonly used types
pub use api::{DataRange, ForecastApiClient, PredictionResponse};
pub use chart::ForecastChart;
pub use config::AppConfig;
pub use csv_export::to_csv;
pub use error::ForecastError;
pub use export::ExportController;
pub use mode::{Field, FieldRequirements, ForecastForm, Mode, ModeController, Panel, RangeDisplay};
pub use orchestrator::{RequestOrchestrator, SubmitOutcome, build_request, format_mae, missing_input};
pub use prediction::{MetricRow, PredictionResult, RawPrediction, Scalar, Shape, analyze_shape};
pub use render::{RenderState, RenderSummary};
pub use request::{ForecastParams, PredictionRequest, UploadFile};
pub use table::TableView;
#[cfg(feature = "desktop")]
pub use traits::SystemNotifier;
pub use traits::{
    ConsoleLoadingIndicator, ConsoleNotifier, LoadingIndicator, MockLoadingIndicator, MockNotifier,
    Notifier,
};
