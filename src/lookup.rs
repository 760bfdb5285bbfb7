//! Named lookups for automation engines.
//!
//! A lookup takes a JSON object of keyword parameters, runs one probe and
//! returns a one-element list holding the result mapping.

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::RuntimeConfig;
use crate::probe::{
    run_http_probe, run_tcp_probe, HttpProbeOptions, HttpProbeRequest, HttpProbeResult, ProbeError,
    TcpProbeOptions, TcpProbeRequest, TcpProbeResult,
};

pub const HTTP_LOOKUP: &str = "controller_http";
pub const PORT_LOOKUP: &str = "controller_port";

/// The lookups this crate provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Http,
    Port,
}

impl LookupKind {
    pub fn name(self) -> &'static str {
        match self {
            LookupKind::Http => HTTP_LOOKUP,
            LookupKind::Port => PORT_LOOKUP,
        }
    }
}

impl FromStr for LookupKind {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            HTTP_LOOKUP | "http" => Ok(LookupKind::Http),
            PORT_LOOKUP | "port" | "tcp" => Ok(LookupKind::Port),
            other => Err(ProbeError::Config(format!("unknown lookup: {}", other))),
        }
    }
}

/// A single lookup result mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LookupResult {
    Http(HttpProbeResult),
    Port(TcpProbeResult),
}

/// Run the lookup called `name` with the given keyword parameters.
///
/// `params` must be a JSON object or null. Configuration problems are
/// returned as errors; probe failures are part of the returned result.
pub async fn run_lookup(
    name: &str,
    params: Value,
    config: &RuntimeConfig,
) -> Result<Vec<LookupResult>, ProbeError> {
    let kind: LookupKind = name.parse()?;
    tracing::debug!(lookup = kind.name(), "running lookup");

    let result = match kind {
        LookupKind::Http => {
            let opts: HttpProbeOptions = parse_params(kind, params)?;
            let request = HttpProbeRequest::try_from(opts)?.with_user_agent(&config.user_agent);
            LookupResult::Http(run_http_probe(&request).await)
        }
        LookupKind::Port => {
            let opts: TcpProbeOptions = parse_params(kind, params)?;
            let request = TcpProbeRequest::try_from(opts)?;
            LookupResult::Port(run_tcp_probe(&request).await)
        }
    };

    Ok(vec![result])
}

fn parse_params<T: DeserializeOwned>(kind: LookupKind, params: Value) -> Result<T, ProbeError> {
    let params = match params {
        Value::Null => Value::Object(Default::default()),
        Value::Object(map) => Value::Object(map),
        other => {
            return Err(ProbeError::Config(format!(
                "{} lookup expects an object of parameters, got {}",
                kind.name(),
                other
            )))
        }
    };
    serde_json::from_value(params)
        .map_err(|e| ProbeError::Config(format!("{} lookup: {}", kind.name(), e)))
}
