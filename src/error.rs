use thiserror::Error;

/// Typed errors surfaced by the forecasting front end.
///
/// An empty prediction is not an error; it is reported as
/// [`SubmitOutcome::Empty`](crate::orchestrator::SubmitOutcome::Empty).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    /// A required form field is missing or malformed. No request was sent.
    #[error("{0}")]
    Validation(String),
    /// The backend answered with a non-success status.
    #[error("{}", server_message(.status, .detail))]
    Server { status: u16, detail: Option<String> },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    /// An export was requested while nothing exportable is rendered.
    #[error("{0}")]
    Export(String),
    #[error("IO error: {0}")]
    Io(String),
}

fn server_message(status: &u16, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => detail.clone(),
        None => format!("Request failed with status {}", status),
    }
}

impl ForecastError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the request never reached the backend.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<reqwest::Error> for ForecastError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for ForecastError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type Result<T, E = ForecastError> = std::result::Result<T, E>;
