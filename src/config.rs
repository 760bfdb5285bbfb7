//! Runtime configuration for ctlprobe.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Probe parameters are never read from the environment; they come from the
//! lookup parameters or command-line flags.

use std::env;

use crate::probe::DEFAULT_USER_AGENT;

pub const DEFAULT_LOG_DIRECTIVE: &str = "ctlprobe=info";

/// Process-wide settings loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Extra tracing filter directive (default: "ctlprobe=info")
    pub log_directive: String,
    /// User-Agent sent by HTTP probes (default: "ctlprobe/<version>")
    pub user_agent: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_directive: DEFAULT_LOG_DIRECTIVE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CTLPROBE_LOG`: tracing directive (default: "ctlprobe=info")
    /// - `CTLPROBE_USER_AGENT`: HTTP User-Agent (default: "ctlprobe/<version>")
    pub fn load() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Blank values fall back to the defaults.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        let non_blank = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(directive) = non_blank("CTLPROBE_LOG") {
            cfg.log_directive = directive;
        }

        if let Some(user_agent) = non_blank("CTLPROBE_USER_AGENT") {
            cfg.user_agent = user_agent;
        }

        cfg
    }
}
