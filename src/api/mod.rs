//! HTTP collaborator for the remote scan service.
//!
//! The controller only talks to [`ScanApi`]; [`HttpScanApi`] is the production
//! implementation over a blocking reqwest client.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://api.crashtest.cloud/webhook";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Non-2xx response. `message` is the remote `message` field when present.
    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    MalformedResponse(String),
}

impl ApiError {
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        ApiError::Remote {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

pub trait ScanApi {
    /// `POST {endpoint}/{webhook}`. Returns the scan id if the response carried one.
    fn start_scan(&self, webhook: &str) -> Result<Option<String>, ApiError>;

    /// `GET {endpoint}/{webhook}/scans/{scan_id}/status`.
    fn scan_status(&self, webhook: &str, scan_id: &str) -> Result<i64, ApiError>;

    /// `GET {endpoint}/{webhook}/scans/{scan_id}/report/junit`, body unmodified.
    fn junit_report(&self, webhook: &str, scan_id: &str) -> Result<Vec<u8>, ApiError>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct StartData {
    #[serde(rename = "scanId")]
    scan_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    status: Option<StatusBody>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status_code: Option<serde_json::Number>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct HttpScanApi {
    client: reqwest::blocking::Client,
    endpoint: String,
    verbose: bool,
}

impl HttpScanApi {
    /// `request_timeout` of `None` lets a single call wait indefinitely.
    pub fn new(endpoint: &str, request_timeout: Option<Duration>) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("crashtest/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            verbose: false,
        })
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path)
    }

    fn send(&self, req: reqwest::blocking::RequestBuilder, url: &str) -> Result<Vec<u8>, ApiError> {
        if self.verbose {
            crate::ui::trace(&format!("request: {url}"));
        }
        let resp = req.send()?;
        let status = resp.status();
        let body = resp.bytes()?.to_vec();
        if self.verbose {
            crate::ui::trace(&format!("response: {} ({} bytes)", status.as_u16(), body.len()));
        }
        if !status.is_success() {
            return Err(ApiError::remote(
                status.as_u16(),
                remote_message(status.as_u16(), &body),
            ));
        }
        Ok(body)
    }
}

impl ScanApi for HttpScanApi {
    fn start_scan(&self, webhook: &str) -> Result<Option<String>, ApiError> {
        let url = self.url(webhook);
        let body = self.send(self.client.post(&url), &url)?;
        Ok(parse_start_response(&body))
    }

    fn scan_status(&self, webhook: &str, scan_id: &str) -> Result<i64, ApiError> {
        let url = self.url(&format!("{webhook}/scans/{scan_id}/status"));
        let body = self.send(self.client.get(&url), &url)?;
        parse_status_response(&body)
    }

    fn junit_report(&self, webhook: &str, scan_id: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.url(&format!("{webhook}/scans/{scan_id}/report/junit"));
        self.send(self.client.get(&url), &url)
    }
}

/// Missing, null and empty scan ids are all reported as absent.
pub fn parse_start_response(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<Envelope<StartData>>(body)
        .ok()
        .and_then(|env| env.data)
        .and_then(|data| data.scan_id)
        .filter(|id| !id.is_empty())
}

pub fn parse_status_response(body: &[u8]) -> Result<i64, ApiError> {
    serde_json::from_slice::<Envelope<StatusData>>(body)
        .ok()
        .and_then(|env| env.data)
        .and_then(|data| data.status)
        .and_then(|status| status.status_code)
        .ok_or_else(|| {
            ApiError::MalformedResponse(
                "status response did not contain data.status.status_code".to_string(),
            )
        })
        .and_then(|code| status_code_as_i64(&code))
}

/// Integral floats such as `200.0` are accepted; fractional codes are not.
fn status_code_as_i64(code: &serde_json::Number) -> Result<i64, ApiError> {
    if let Some(n) = code.as_i64() {
        return Ok(n);
    }
    match code.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Ok(f as i64)
        }
        _ => Err(ApiError::MalformedResponse(format!(
            "status code {code} is not an integer"
        ))),
    }
}

/// Error bodies are expected to carry `{ "message": "..." }`.
pub fn remote_message(status: u16, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {status}"))
}
