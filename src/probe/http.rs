//! HTTP probe implementation.

use std::time::Duration;

use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

use super::{params, report, timeout_from_secs, ProbeError};

pub const DEFAULT_HTTP_TIMEOUT_SECS: f64 = 10.0;
pub const DEFAULT_ALLOWED_STATUS: [u16; 2] = [200, 404];
pub const DEFAULT_SCHEME: &str = "http";
pub const DEFAULT_PATH: &str = "/";
pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_USER_AGENT: &str = concat!("ctlprobe/", env!("CARGO_PKG_VERSION"));

/// Keyword parameters accepted by the HTTP probe.
///
/// Every field is optional; defaults are applied when the options are
/// validated into an [`HttpProbeRequest`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HttpProbeOptions {
    pub url: Option<String>,
    pub host: Option<String>,
    #[serde(deserialize_with = "params::port")]
    pub port: Option<u16>,
    pub scheme: Option<String>,
    pub path: Option<String>,
    pub method: Option<String>,
    #[serde(deserialize_with = "params::seconds")]
    pub timeout: Option<f64>,
    #[serde(deserialize_with = "params::status_codes")]
    pub allowed_status: Option<Vec<u16>>,
    #[serde(deserialize_with = "params::flag")]
    pub validate_certs: Option<bool>,
}

/// A validated HTTP probe.
#[derive(Debug, Clone)]
pub struct HttpProbeRequest {
    pub url: String,
    pub method: String,
    pub timeout: Duration,
    pub allowed_status: Vec<u16>,
    pub validate_certs: bool,
    pub user_agent: String,
}

impl HttpProbeRequest {
    /// Probe `url` with every other setting at its default.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: DEFAULT_METHOD.to_string(),
            timeout: Duration::from_secs_f64(DEFAULT_HTTP_TIMEOUT_SECS),
            allowed_status: DEFAULT_ALLOWED_STATUS.to_vec(),
            validate_certs: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Whether certificate verification is skipped for this request.
    ///
    /// Only HTTPS targets are affected by `validate_certs = false`.
    pub fn skips_cert_verification(&self) -> bool {
        !self.validate_certs && is_https(&self.url)
    }
}

impl TryFrom<HttpProbeOptions> for HttpProbeRequest {
    type Error = ProbeError;

    fn try_from(opts: HttpProbeOptions) -> Result<Self, Self::Error> {
        let url = match opts.url.filter(|u| !u.is_empty()) {
            Some(url) => url,
            None => match (opts.host.filter(|h| !h.is_empty()), opts.port) {
                (Some(host), Some(port)) => format!(
                    "{}://{}:{}{}",
                    opts.scheme.as_deref().unwrap_or(DEFAULT_SCHEME),
                    host,
                    port,
                    opts.path.as_deref().unwrap_or(DEFAULT_PATH),
                ),
                _ => {
                    return Err(ProbeError::Config(
                        "HTTP probe requires 'url' or both 'host' and 'port'".to_string(),
                    ))
                }
            },
        };

        let timeout = timeout_from_secs(opts.timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))?;

        Ok(Self {
            url,
            method: opts.method.unwrap_or_else(|| DEFAULT_METHOD.to_string()),
            timeout,
            allowed_status: opts
                .allowed_status
                .unwrap_or_else(|| DEFAULT_ALLOWED_STATUS.to_vec()),
            validate_certs: opts.validate_certs.unwrap_or(true),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }
}

/// Outcome of one HTTP probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpProbeResult {
    pub url: String,
    pub status_code: Option<u16>,
    pub ok: bool,
    pub body: String,
    pub error: Option<String>,
}

/// What came back from the target, before it is flattened into a result.
///
/// A `Response` is any HTTP status at all, including 4xx/5xx. A `Transport`
/// failure means no status was ever obtained.
#[derive(Debug)]
enum HttpOutcome {
    Response { status: u16, body: String },
    Transport(ProbeError),
}

impl HttpProbeResult {
    fn from_outcome(request: &HttpProbeRequest, outcome: HttpOutcome) -> Self {
        match outcome {
            HttpOutcome::Response { status, body } => Self {
                url: request.url.clone(),
                status_code: Some(status),
                ok: request.allowed_status.contains(&status),
                body,
                error: None,
            },
            HttpOutcome::Transport(err) => Self {
                url: request.url.clone(),
                status_code: None,
                ok: false,
                body: String::new(),
                error: Some(err.to_string()),
            },
        }
    }
}

/// Run an HTTP probe.
///
/// Never fails: transport problems are recorded in [`HttpProbeResult::error`].
pub async fn run_http_probe(request: &HttpProbeRequest) -> HttpProbeResult {
    tracing::debug!(url = %request.url, method = %request.method, timeout = ?request.timeout, "starting HTTP probe");

    let outcome = match fetch(request).await {
        Ok((status, body)) => HttpOutcome::Response { status, body },
        Err(err) => HttpOutcome::Transport(err),
    };

    let result = HttpProbeResult::from_outcome(request, outcome);
    match &result.error {
        None => tracing::debug!(url = %result.url, status = ?result.status_code, ok = result.ok, "HTTP probe finished"),
        Some(err) => tracing::debug!(url = %result.url, error = %err, "HTTP probe failed"),
    }
    result
}

async fn fetch(request: &HttpProbeRequest) -> Result<(u16, String), ProbeError> {
    let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
        .map_err(|e| ProbeError::InvalidRequest(format!("method {:?}: {}", request.method, e)))?;

    let client = reqwest::Client::builder()
        .timeout(request.timeout)
        .user_agent(request.user_agent.as_str())
        .danger_accept_invalid_certs(request.skips_cert_verification())
        .build()
        .map_err(|e| ProbeError::Network(report(&e)))?;

    let response = client
        .request(method, request.url.as_str())
        .send()
        .await
        .map_err(|e| classify(e, request.timeout))?;

    let status = response.status().as_u16();

    // Read the full body so a truncated transfer counts as a transport failure
    let body = response
        .bytes()
        .await
        .map_err(|e| classify(e, request.timeout))?;

    Ok((status, String::from_utf8_lossy(&body).into_owned()))
}

fn classify(err: reqwest::Error, timeout: Duration) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout(timeout)
    } else if err.is_builder() {
        ProbeError::InvalidRequest(report(&err))
    } else {
        ProbeError::Network(report(&err))
    }
}

fn is_https(url: &str) -> bool {
    Url::parse(url)
        .map(|u| u.scheme().eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}
