//! Submission flow: validate, build, send, render or report.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::TimeZone;

use crate::{
    api::ForecastApiClient,
    error::{ForecastError, Result},
    mode::{Field, FieldRequirements, ForecastForm, Mode},
    render::{RenderState, RenderSummary},
    request::{ForecastParams, PredictionRequest, picker_to_utc},
    traits::{LoadingGuard, LoadingIndicator, Notifier},
};

pub const MISSING_FILE_MESSAGE: &str = "Please select a file to upload.";
pub const MISSING_RANGE_MESSAGE: &str = "Please select both start and stop times.";

/// Result of one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Rendered {
        summary: RenderSummary,
        mae: Option<f64>,
    },
    /// The backend succeeded but returned no rows.
    Empty { mae: Option<f64> },
    Failed(ForecastError),
}

impl SubmitOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// MAE summary line, `N/A` when the backend had no ground truth.
pub fn format_mae(mae: Option<f64>) -> String {
    match mae {
        Some(value) if value.is_finite() => format!("MAE: {:.2}", value),
        _ => "MAE: N/A".to_string(),
    }
}

/// Message for the first required field of `mode` that the form lacks.
pub fn missing_input(mode: Mode, form: &ForecastForm) -> Option<&'static str> {
    FieldRequirements::for_mode(mode)
        .required
        .iter()
        .find(|field| !form.has(**field))
        .map(|missing| match missing {
            Field::File => MISSING_FILE_MESSAGE,
            Field::StartTime | Field::StopTime => MISSING_RANGE_MESSAGE,
        })
}

/// Validate the form for `mode` and build the matching request.
///
/// Picker values are read as wall-clock times in `zone`.
pub fn build_request<Tz: TimeZone>(
    mode: Mode,
    form: &ForecastForm,
    zone: &Tz,
) -> Result<PredictionRequest> {
    if let Some(message) = missing_input(mode, form) {
        return Err(ForecastError::validation(message));
    }

    let params = ForecastParams::parse(&form.forecast_hours, &form.window_sizes)?;

    match mode {
        Mode::FileUpload => {
            let file = form
                .file
                .clone()
                .ok_or_else(|| ForecastError::validation(MISSING_FILE_MESSAGE))?;
            Ok(PredictionRequest::Upload { file, params })
        }
        Mode::DatabaseRange => {
            let (Some(start), Some(stop)) = (form.start_time, form.stop_time) else {
                return Err(ForecastError::validation(MISSING_RANGE_MESSAGE));
            };
            Ok(PredictionRequest::Range {
                params,
                start: picker_to_utc(start, zone)?,
                stop: picker_to_utc(stop, zone)?,
            })
        }
    }
}

/// Runs submissions and owns the shared render state.
///
/// Overlapping submissions are allowed; whichever response resolves last
/// determines what is rendered.
pub struct RequestOrchestrator {
    client: ForecastApiClient,
    notifier: Arc<dyn Notifier>,
    loading: Arc<dyn LoadingIndicator>,
    state: Arc<Mutex<RenderState>>,
}

impl RequestOrchestrator {
    pub fn new(
        client: ForecastApiClient,
        notifier: Arc<dyn Notifier>,
        loading: Arc<dyn LoadingIndicator>,
    ) -> Self {
        Self {
            client,
            notifier,
            loading,
            state: Arc::new(Mutex::new(RenderState::new())),
        }
    }

    /// Handle to the render state, shared with the export controller.
    pub fn render_state(&self) -> Arc<Mutex<RenderState>> {
        Arc::clone(&self.state)
    }

    pub fn client(&self) -> &ForecastApiClient {
        &self.client
    }

    pub async fn submit<Tz: TimeZone>(
        &self,
        mode: Mode,
        form: &ForecastForm,
        zone: &Tz,
    ) -> SubmitOutcome {
        let request = match build_request(mode, form, zone) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Submission rejected: {}", e);
                let title = match missing_input(mode, form) {
                    Some(_) => "Missing input",
                    None => "Invalid input",
                };
                self.alert(title, &e);
                return SubmitOutcome::Failed(e);
            }
        };

        tracing::info!("Submitting {:?} forecast to {}", mode, request.endpoint());

        let response = {
            let _loading = LoadingGuard::show(self.loading.as_ref());
            self.client.predict(&request).await
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => return self.fail(e),
        };

        let mae = response.mae;
        let rendered = self.lock_state().render(response.into_prediction());
        match rendered {
            Ok(summary) if summary.rows == 0 => {
                tracing::info!("Backend returned an empty prediction, {}", format_mae(mae));
                SubmitOutcome::Empty { mae }
            }
            Ok(summary) => {
                tracing::info!(
                    "Rendered {} rows x {} columns, {}",
                    summary.rows,
                    summary.columns,
                    format_mae(mae)
                );
                SubmitOutcome::Rendered { summary, mae }
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&self, error: ForecastError) -> SubmitOutcome {
        tracing::error!("Prediction failed: {}", error);
        self.lock_state().clear();
        self.alert("Prediction failed", &error);
        SubmitOutcome::Failed(error)
    }

    fn alert(&self, title: &str, error: &ForecastError) {
        if let Err(e) = self.notifier.notify(title, &error.to_string()) {
            tracing::warn!("Failed to show alert: {}", e);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RenderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
