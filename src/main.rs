//! ctlprobe - controller-side network probes for automation playbooks.
//!
//! Probe results are printed to stdout as a one-element JSON list. Logs go to
//! stderr.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ctlprobe::cast::{convert_file, CastError};
use ctlprobe::config::RuntimeConfig;
use ctlprobe::lookup::{run_lookup, LookupResult};
use ctlprobe::probe::{
    run_http_probe, run_tcp_probe, HttpProbeOptions, HttpProbeRequest, ProbeError, TcpProbeOptions,
    TcpProbeRequest,
};

#[derive(Parser, Debug)]
#[command(name = "ctlprobe", version, about = "Controller-side HTTP/TCP probes and cast conversion")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Issue one HTTP request and classify the response
    Http(HttpArgs),
    /// Attempt one TCP connection
    Port(PortArgs),
    /// Run a named lookup with JSON keyword parameters
    Lookup(LookupArgs),
    /// Convert an asciinema v3 recording to v2
    Cast(CastArgs),
}

#[derive(Args, Debug)]
struct HttpArgs {
    /// Full target URL; takes precedence over host/port
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// Scheme used with host/port (default: http)
    #[arg(long)]
    scheme: Option<String>,
    /// Path used with host/port (default: /)
    #[arg(long)]
    path: Option<String>,
    /// HTTP method (default: GET)
    #[arg(long)]
    method: Option<String>,
    /// Timeout in seconds (default: 10)
    #[arg(long)]
    timeout: Option<f64>,
    /// Accepted status codes (default: 200,404)
    #[arg(long = "allowed-status", value_delimiter = ',')]
    allowed_status: Vec<u16>,
    /// Skip TLS certificate verification for https targets
    #[arg(long)]
    no_validate_certs: bool,
}

impl From<HttpArgs> for HttpProbeOptions {
    fn from(args: HttpArgs) -> Self {
        Self {
            url: args.url,
            host: args.host,
            port: args.port,
            scheme: args.scheme,
            path: args.path,
            method: args.method,
            timeout: args.timeout,
            allowed_status: Some(args.allowed_status).filter(|codes| !codes.is_empty()),
            validate_certs: args.no_validate_certs.then_some(false),
        }
    }
}

#[derive(Args, Debug)]
struct PortArgs {
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// Timeout in seconds (default: 5)
    #[arg(long)]
    timeout: Option<f64>,
}

impl From<PortArgs> for TcpProbeOptions {
    fn from(args: PortArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            timeout: args.timeout,
        }
    }
}

#[derive(Args, Debug)]
struct LookupArgs {
    /// Lookup name (controller_http or controller_port)
    name: String,
    /// JSON object of parameters, or "-" to read it from stdin
    params: Option<String>,
}

#[derive(Args, Debug)]
struct CastArgs {
    /// v3 recording to convert
    input: PathBuf,
    /// Destination file; the result goes to stdout when omitted
    output: Option<PathBuf>,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Cast(#[from] CastError),
    #[error("failed to write output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("failed to read parameters: {0}")]
    Input(#[from] std::io::Error),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Probe(e) if e.is_config() => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let cfg = RuntimeConfig::load();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_directive)))
        .init();

    match run(cli, &cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

async fn run(cli: Cli, cfg: &RuntimeConfig) -> Result<(), CliError> {
    let results = match cli.command {
        Commands::Http(args) => {
            let request = HttpProbeRequest::try_from(HttpProbeOptions::from(args))?
                .with_user_agent(&cfg.user_agent);
            vec![LookupResult::Http(run_http_probe(&request).await)]
        }
        Commands::Port(args) => {
            let request = TcpProbeRequest::try_from(TcpProbeOptions::from(args))?;
            vec![LookupResult::Port(run_tcp_probe(&request).await)]
        }
        Commands::Lookup(args) => {
            let params = read_params(args.params.as_deref())?;
            run_lookup(&args.name, params, cfg).await?
        }
        Commands::Cast(args) => {
            let conversion = convert_file(&args.input, args.output.as_deref())?;
            if args.output.is_none() {
                print!("{}", conversion.content);
            }
            return Ok(());
        }
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };
    println!("{}", json);
    Ok(())
}

fn read_params(raw: Option<&str>) -> Result<serde_json::Value, CliError> {
    let text = match raw {
        None => return Ok(serde_json::Value::Null),
        Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
        Some(text) => text.to_string(),
    };

    if text.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(&text)
        .map_err(|e| CliError::Probe(ProbeError::Config(format!("parameters are not valid JSON: {}", e))))
}
