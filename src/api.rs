use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{
    Url,
    multipart::{Form, Part},
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    config::NetworkConfig,
    error::{ForecastError, Result},
    prediction::PredictionResult,
    request::{DATA_RANGE_ENDPOINT, PredictionRequest},
};

/// Successful prediction response.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionResponse {
    /// Missing or null predictions are treated as empty.
    #[serde(default)]
    pub prediction: Option<PredictionResult>,
    #[serde(default)]
    pub mae: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl PredictionResponse {
    pub fn into_prediction(self) -> PredictionResult {
        self.prediction.unwrap_or_default()
    }
}

/// Error body returned by the backend on failure.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

impl ErrorBody {
    fn detail_text(self) -> Option<String> {
        match self.detail? {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Queryable bounds of the data stored by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataRange {
    pub min_time: Option<DateTime<Utc>>,
    pub max_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct DataRangeBody {
    min_time: Option<String>,
    max_time: Option<String>,
}

impl TryFrom<DataRangeBody> for DataRange {
    type Error = ForecastError;

    fn try_from(body: DataRangeBody) -> Result<Self> {
        let parse = |value: Option<String>| -> Result<Option<DateTime<Utc>>> {
            value
                .map(|raw| {
                    parse_timestamp(&raw).ok_or_else(|| {
                        ForecastError::MalformedResponse(format!("Unrecognized timestamp '{}'", raw))
                    })
                })
                .transpose()
        };

        Ok(Self {
            min_time: parse(body.min_time)?,
            max_time: parse(body.max_time)?,
        })
    }
}

/// Parse a backend timestamp. Values without an offset are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// HTTP client for the forecasting backend.
#[derive(Clone, Debug)]
pub struct ForecastApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ForecastApiClient {
    /// Create a new API client with configurable timeouts.
    pub fn new(base_url: impl Into<String>, network_config: &NetworkConfig) -> anyhow::Result<Self> {
        let base_url = base_url.into();
        Url::parse(&base_url).with_context(|| format!("Invalid backend URL '{}'", base_url))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network_config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(network_config.connect_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of a prediction request, query string included.
    pub fn request_url(&self, request: &PredictionRequest) -> Result<Url> {
        Url::parse_with_params(
            &format!("{}{}", self.base_url, request.endpoint()),
            request.query_pairs(),
        )
        .map_err(|e| ForecastError::validation(format!("Invalid request URL: {}", e)))
    }

    /// Send a prediction request and decode the result.
    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let url = self.request_url(request)?;
        let builder = self.client.post(url);
        let builder = match request {
            PredictionRequest::Upload { file, .. } => {
                let part = Part::bytes(file.bytes.clone())
                    .file_name(file.name.clone())
                    .mime_str(file.mime_type())?;
                builder.multipart(Form::new().part("file", part))
            }
            PredictionRequest::Range { .. } => builder,
        };

        let started = Instant::now();
        let response = builder.send().await;
        log_completion("POST", request.endpoint(), &response, started);

        read_json(response?).await
    }

    /// Fetch the queryable bounds of the stored data.
    pub async fn fetch_data_range(&self) -> Result<DataRange> {
        let url = format!("{}{}", self.base_url, DATA_RANGE_ENDPOINT);

        let started = Instant::now();
        let response = self.client.get(&url).send().await;
        log_completion("GET", DATA_RANGE_ENDPOINT, &response, started);

        let body: DataRangeBody = read_json(response?).await?;
        DataRange::try_from(body)
    }
}

fn log_completion(
    method: &str,
    path: &str,
    response: &std::result::Result<reqwest::Response, reqwest::Error>,
    started: Instant,
) {
    let elapsed = started.elapsed().as_secs_f64();
    match response {
        Ok(res) => tracing::info!(
            "Request completed: {} {} - Status: {} - Time: {:.2}s",
            method,
            path,
            res.status().as_u16(),
            elapsed
        ),
        Err(e) => tracing::error!("Request failed: {} {} - Error: {}", method, path, e),
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::detail_text);
        return Err(ForecastError::Server {
            status: status.as_u16(),
            detail,
        });
    }

    serde_json::from_str(&body).map_err(|e| ForecastError::MalformedResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::request::{ForecastParams, UploadFile};

    fn client() -> ForecastApiClient {
        ForecastApiClient::new("http://localhost:8000/", &NetworkConfig::default()).unwrap()
    }

    // ==================== Response Parsing Tests ====================

    #[test]
    fn test_prediction_response_parses_prediction_and_mae() {
        let body = r#"{
            "message": "Prediction endpoint success",
            "prediction": {"2024-01-01T00:00": {"predicted_users": 10, "real_users": 8}},
            "mae": 1.5
        }"#;
        let response: PredictionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.mae, Some(1.5));
        assert_eq!(response.message.as_deref(), Some("Prediction endpoint success"));
        assert_eq!(response.into_prediction().len(), 1);
    }

    #[test]
    fn test_prediction_response_tolerates_missing_fields() {
        let response: PredictionResponse =
            serde_json::from_str(r#"{"prediction": null, "mae": null}"#).unwrap();
        assert!(response.mae.is_none());
        assert!(response.into_prediction().is_empty());

        let response: PredictionResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_prediction().is_empty());
    }

    #[test]
    fn test_error_detail_text() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail": "bad window"}"#).unwrap();
        assert_eq!(body.detail_text().as_deref(), Some("bad window"));

        let body: ErrorBody =
            serde_json::from_str(r#"{"detail": [{"loc": ["query"], "msg": "bad"}]}"#).unwrap();
        assert!(body.detail_text().unwrap().contains("\"msg\":\"bad\""));

        let body: ErrorBody = serde_json::from_str(r#"{"other": 1}"#).unwrap();
        assert!(body.detail_text().is_none());
    }

    // ==================== Timestamp Parsing Tests ====================

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T14:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 12:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:00"), Some(expected));
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn test_data_range_from_body() {
        let body: DataRangeBody = serde_json::from_str(
            r#"{"min_time": "2024-01-01T00:00:00", "max_time": null}"#,
        )
        .unwrap();
        let range = DataRange::try_from(body).unwrap();
        assert_eq!(
            range.min_time,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert!(range.max_time.is_none());
    }

    #[test]
    fn test_data_range_rejects_garbage() {
        let body: DataRangeBody =
            serde_json::from_str(r#"{"min_time": "soon", "max_time": null}"#).unwrap();
        assert!(matches!(
            DataRange::try_from(body),
            Err(ForecastError::MalformedResponse(_))
        ));
    }

    // ==================== Client Construction Tests ====================

    #[test]
    fn test_client_trims_trailing_slash() {
        assert_eq!(client().base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_client_rejects_invalid_url() {
        assert!(ForecastApiClient::new("not a url", &NetworkConfig::default()).is_err());
    }

    #[test]
    fn test_request_url_encodes_params() {
        let request = PredictionRequest::Upload {
            file: UploadFile::new("data.csv", vec![]),
            params: ForecastParams::new(24, vec![24, 72]).unwrap(),
        };
        let url = client().request_url(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/predict-tuning?forecast_hours=24&window_sizes=24%2C72"
        );
    }
}
