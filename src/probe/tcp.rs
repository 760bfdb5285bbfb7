//! TCP connect probe implementation.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;

use super::{params, timeout_from_secs, ProbeError};

pub const DEFAULT_TCP_TIMEOUT_SECS: f64 = 5.0;

/// Keyword parameters accepted by the TCP probe.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TcpProbeOptions {
    pub host: Option<String>,
    #[serde(deserialize_with = "params::port")]
    pub port: Option<u16>,
    #[serde(deserialize_with = "params::seconds")]
    pub timeout: Option<f64>,
}

/// A validated TCP probe.
#[derive(Debug, Clone)]
pub struct TcpProbeRequest {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl TcpProbeRequest {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout,
        }
    }
}

impl TryFrom<TcpProbeOptions> for TcpProbeRequest {
    type Error = ProbeError;

    fn try_from(opts: TcpProbeOptions) -> Result<Self, Self::Error> {
        let host = opts
            .host
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ProbeError::Config("TCP probe requires 'host'".to_string()))?;
        let port = opts
            .port
            .ok_or_else(|| ProbeError::Config("TCP probe requires 'port'".to_string()))?;
        let timeout = timeout_from_secs(opts.timeout.unwrap_or(DEFAULT_TCP_TIMEOUT_SECS))?;

        Ok(Self { host, port, timeout })
    }
}

/// Outcome of one TCP probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcpProbeResult {
    pub host: String,
    pub port: u16,
    /// Timeout used, in seconds.
    pub timeout: f64,
    pub reachable: bool,
    pub error: Option<String>,
}

/// Run a TCP probe.
///
/// The connection is closed as soon as it is established. Never fails:
/// connection problems are recorded in [`TcpProbeResult::error`].
pub async fn run_tcp_probe(request: &TcpProbeRequest) -> TcpProbeResult {
    tracing::debug!(host = %request.host, port = request.port, timeout = ?request.timeout, "starting TCP probe");

    let outcome = connect(request).await;
    if let Err(e) = &outcome {
        tracing::debug!(host = %request.host, port = request.port, error = %e, "TCP probe failed");
    }

    TcpProbeResult {
        host: request.host.clone(),
        port: request.port,
        timeout: request.timeout.as_secs_f64(),
        reachable: outcome.is_ok(),
        error: outcome.err().map(|e| e.to_string()),
    }
}

/// Connect to every resolved address in turn, the whole attempt bounded by the timeout.
async fn connect(request: &TcpProbeRequest) -> Result<(), ProbeError> {
    let target = (request.host.as_str(), request.port);
    let stream = bounded(request, TcpStream::connect(target)).await?;
    drop(stream);
    Ok(())
}

async fn bounded<T>(
    request: &TcpProbeRequest,
    attempt: impl Future<Output = std::io::Result<T>>,
) -> Result<T, ProbeError> {
    match tokio::time::timeout(request.timeout, attempt).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ProbeError::Network(format!(
            "failed to connect to {}:{}: {}",
            request.host, request.port, e
        ))),
        Err(_) => Err(ProbeError::Timeout(request.timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::net::TcpListener;

    #[test]
    fn test_requires_host_and_port() {
        let missing_host = TcpProbeOptions {
            port: Some(22),
            ..Default::default()
        };
        assert!(TcpProbeRequest::try_from(missing_host).unwrap_err().is_config());

        let empty_host = TcpProbeOptions {
            host: Some(String::new()),
            port: Some(22),
            ..Default::default()
        };
        assert!(TcpProbeRequest::try_from(empty_host).unwrap_err().is_config());

        let missing_port = TcpProbeOptions {
            host: Some("localhost".into()),
            ..Default::default()
        };
        assert!(TcpProbeRequest::try_from(missing_port).unwrap_err().is_config());
    }

    #[test]
    fn test_default_timeout() {
        let opts = TcpProbeOptions {
            host: Some("localhost".into()),
            port: Some(22),
            ..Default::default()
        };
        let request = TcpProbeRequest::try_from(opts).unwrap();
        assert_eq!(request.timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_listening_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let request = TcpProbeRequest::new("127.0.0.1", port, Duration::from_secs(2));
        let result = run_tcp_probe(&request).await;
        assert!(result.reachable);
        assert!(result.error.is_none());
        assert_eq!(result.host, "127.0.0.1");
        assert_eq!(result.port, port);
        assert_eq!(result.timeout, 2.0);
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable_within_timeout() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let timeout = Duration::from_secs(1);
        let start = Instant::now();
        let result = run_tcp_probe(&TcpProbeRequest::new("127.0.0.1", port, timeout)).await;
        let elapsed = start.elapsed();

        assert!(!result.reachable);
        assert!(result.error.is_some());
        assert!(elapsed < timeout + Duration::from_millis(500), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_stalled_connect_times_out_within_bound() {
        let timeout = Duration::from_millis(200);
        let request = TcpProbeRequest::new("192.0.2.1", 9, timeout);

        let start = Instant::now();
        let err = bounded(&request, std::future::pending::<std::io::Result<()>>())
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, ProbeError::Timeout(t) if t == timeout));
        assert!(err.to_string().contains("timed out"));
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_millis(500), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_connect_error_is_network_error() {
        let request = TcpProbeRequest::new("db", 5432, Duration::from_secs(1));
        let refused = async { Err::<(), _>(std::io::Error::from(std::io::ErrorKind::ConnectionRefused)) };
        let err = bounded(&request, refused).await.unwrap_err();
        assert!(matches!(err, ProbeError::Network(_)));
        assert!(err.to_string().contains("db:5432"));
    }

    #[tokio::test]
    async fn test_zero_timeout_reports_timeout() {
        let opts = TcpProbeOptions {
            host: Some("192.0.2.1".into()),
            port: Some(9),
            timeout: Some(0.0),
        };
        let request = TcpProbeRequest::try_from(opts).unwrap();
        assert_eq!(request.timeout, Duration::ZERO);

        let err = bounded(&request, std::future::pending::<std::io::Result<()>>())
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Timeout(t) if t == Duration::ZERO));
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_unreachable() {
        let request = TcpProbeRequest::new("does-not-exist.invalid", 80, Duration::from_secs(3));
        let result = run_tcp_probe(&request).await;
        assert!(!result.reachable);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_result_serializes_nulls() {
        let result = TcpProbeResult {
            host: "db".into(),
            port: 5432,
            timeout: 5.0,
            reachable: true,
            error: None,
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({"host": "db", "port": 5432, "timeout": 5.0, "reachable": true, "error": null})
        );
    }
}
