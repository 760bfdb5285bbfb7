//! asciinema v3 to v2 recording conversion.
//!
//! Rewrites the header line and passes event lines through unchanged, so v3
//! recordings can be fed to tools that only understand v2.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const SOURCE_VERSION: u64 = 3;
pub const TARGET_VERSION: u64 = 2;
pub const DEFAULT_WIDTH: u64 = 80;
pub const DEFAULT_HEIGHT: u64 = 24;

/// Cast conversion error types.
#[derive(Error, Debug)]
pub enum CastError {
    #[error("empty file")]
    Empty,
    #[error("invalid header: {0}")]
    Header(String),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// v2 header. Optional fields are written only when the source header has them.
#[derive(Debug, Serialize)]
struct V2Header {
    version: u64,
    width: Value,
    height: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    idle_time_limit: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    env: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<Value>,
}

/// A converted recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// The v2 recording, newline terminated.
    pub content: String,
    /// `version` as found in the source header, if any.
    pub source_version: Option<Value>,
}

impl Conversion {
    pub fn is_expected_version(&self) -> bool {
        self.source_version.as_ref().and_then(Value::as_f64) == Some(SOURCE_VERSION as f64)
    }
}

/// Convert the text of a v3 recording.
pub fn convert(text: &str) -> Result<Conversion, CastError> {
    let mut lines = text.lines();
    let first = lines.next().ok_or(CastError::Empty)?;

    let header: Value = serde_json::from_str(first).map_err(|e| CastError::Header(e.to_string()))?;
    let header = header
        .as_object()
        .ok_or_else(|| CastError::Header("header is not a JSON object".to_string()))?;

    let term = header.get("term");
    let term_field = |key: &str, default: u64| {
        term.and_then(|t| t.get(key))
            .cloned()
            .unwrap_or_else(|| Value::from(default))
    };

    let v2 = V2Header {
        version: TARGET_VERSION,
        width: term_field("cols", DEFAULT_WIDTH),
        height: term_field("rows", DEFAULT_HEIGHT),
        timestamp: header.get("timestamp").cloned(),
        idle_time_limit: header.get("idle_time_limit").cloned(),
        env: header.get("env").cloned(),
        title: header.get("title").cloned(),
    };

    let mut output = vec![serde_json::to_string(&v2).map_err(|e| CastError::Header(e.to_string()))?];
    output.extend(
        lines
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string),
    );

    let mut content = output.join("\n");
    content.push('\n');

    Ok(Conversion {
        content,
        source_version: header.get("version").cloned(),
    })
}

/// Convert the recording at `input`, writing it to `output` when given.
///
/// Without an output path the caller is expected to emit
/// [`Conversion::content`] itself.
pub fn convert_file(input: &Path, output: Option<&Path>) -> Result<Conversion, CastError> {
    let text = fs::read_to_string(input).map_err(|source| CastError::Io {
        path: input.to_path_buf(),
        source,
    })?;

    let conversion = convert(&text)?;
    if !conversion.is_expected_version() {
        let found = conversion
            .source_version
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_else(|| "none".to_string());
        tracing::warn!("File is version {}, not v{}", found, SOURCE_VERSION);
    }

    if let Some(output) = output {
        fs::write(output, &conversion.content).map_err(|source| CastError::Io {
            path: output.to_path_buf(),
            source,
        })?;
        tracing::info!("Converted: {} -> {}", input.display(), output.display());
    }

    Ok(conversion)
}
