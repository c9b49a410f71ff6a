//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::NonZeroUsize,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use time::Date;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::planning::PLAN_DATE_FORMAT;
use crate::gateway::config as gateway_defaults;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "smart-erp";
const ENV_PREFIX: &str = "SMART_ERP";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000/api/";
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;
const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:5173/";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Command-line arguments for the smart-erp binary.
#[derive(Debug, Parser)]
#[command(
    name = "smart-erp",
    version,
    about = "Foundry ERP offline gateway and production planning"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SMART_ERP_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the offline-first gateway in front of the ERP frontend.
    Serve(Box<ServeArgs>),
    /// Stage and submit planning entries described in a TOML plan file.
    Plan(PlanArgs),
    /// Print the planning records of one shift sheet.
    Report(ReportArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BackendOverrides {
    /// Override the ERP backend API root.
    #[arg(long = "backend-url", value_name = "URL")]
    pub backend_url: Option<String>,

    /// Override the backend request timeout.
    #[arg(long = "backend-timeout-seconds", value_name = "SECONDS")]
    pub backend_timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the origin the gateway forwards to.
    #[arg(long = "upstream-url", value_name = "URL")]
    pub upstream_url: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub backend: BackendOverrides,

    /// Validate and print the batch without submitting it.
    #[arg(long = "dry-run", action = clap::ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Plan file with one `[[entries]]` table per line item.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub backend: BackendOverrides,

    /// Plan date (YYYY-MM-DD).
    #[arg(long, value_name = "DATE", value_parser = parse_plan_date)]
    pub date: Date,

    /// Shift number (1-3).
    #[arg(long, value_name = "SHIFT", value_parser = clap::value_parser!(u8).range(1..=3))]
    pub shift: u8,

    /// Only include records for this mould box size.
    #[arg(long = "box-size", value_name = "SIZE")]
    pub box_size: Option<String>,
}

fn parse_plan_date(value: &str) -> Result<Date, String> {
    Date::parse(value.trim(), PLAN_DATE_FORMAT)
        .map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub backend: BackendSettings,
    pub gateway: GatewaySettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub upstream: Url,
    pub upstream_timeout: Duration,
    pub static_cache: String,
    pub api_cache: String,
    pub api_prefix: String,
    pub cacheable_api_prefixes: Vec<String>,
    pub static_extensions: Vec<String>,
    pub shell_assets: Vec<String>,
    pub offline_document: String,
    pub cache_entry_limit: Option<NonZeroUsize>,
    /// Largest request body the proxy buffers.
    pub max_body_bytes: usize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Plan(args)) => {
            raw.apply_logging_overrides(&args.logging);
            raw.apply_backend_overrides(&args.backend);
        }
        Some(Command::Report(args)) => {
            raw.apply_logging_overrides(&args.logging);
            raw.apply_backend_overrides(&args.backend);
        }
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    backend: RawBackendSettings,
    gateway: RawGatewaySettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(url) = overrides.upstream_url.as_ref() {
            self.gateway.upstream = Some(url.clone());
        }

        self.apply_logging_overrides(&overrides.logging);
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_backend_overrides(&mut self, overrides: &BackendOverrides) {
        if let Some(url) = overrides.backend_url.as_ref() {
            self.backend.base_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.backend_timeout_seconds {
            self.backend.timeout_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            backend,
            gateway,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let backend = build_backend_settings(backend)?;
        let gateway = build_gateway_settings(gateway)?;

        Ok(Self {
            server,
            logging,
            backend,
            gateway,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    let graceful_shutdown = positive_seconds(graceful_secs, "server.graceful_shutdown_seconds")?;

    Ok(ServerSettings {
        addr,
        graceful_shutdown,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_backend_settings(backend: RawBackendSettings) -> Result<BackendSettings, LoadError> {
    let raw_url = backend
        .base_url
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
    let base_url = parse_http_url(&raw_url, "backend.base_url")?;

    let timeout_secs = backend
        .timeout_seconds
        .unwrap_or(DEFAULT_BACKEND_TIMEOUT_SECS);
    let timeout = positive_seconds(timeout_secs, "backend.timeout_seconds")?;

    Ok(BackendSettings { base_url, timeout })
}

fn build_gateway_settings(gateway: RawGatewaySettings) -> Result<GatewaySettings, LoadError> {
    let raw_upstream = gateway
        .upstream
        .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
    let upstream = parse_http_url(&raw_upstream, "gateway.upstream")?;

    let timeout_secs = gateway
        .upstream_timeout_seconds
        .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);
    let upstream_timeout = positive_seconds(timeout_secs, "gateway.upstream_timeout_seconds")?;

    let static_cache = non_empty(
        gateway.static_cache,
        gateway_defaults::DEFAULT_STATIC_CACHE,
        "gateway.static_cache",
    )?;
    let api_cache = non_empty(
        gateway.api_cache,
        gateway_defaults::DEFAULT_API_CACHE,
        "gateway.api_cache",
    )?;
    if static_cache == api_cache {
        return Err(LoadError::invalid(
            "gateway.api_cache",
            "must differ from gateway.static_cache",
        ));
    }

    let api_prefix = absolute_path(
        gateway.api_prefix,
        gateway_defaults::DEFAULT_API_PREFIX,
        "gateway.api_prefix",
    )?;
    let offline_document = absolute_path(
        gateway.offline_document,
        gateway_defaults::DEFAULT_OFFLINE_DOCUMENT,
        "gateway.offline_document",
    )?;

    let cacheable_api_prefixes = gateway.cacheable_api_prefixes.unwrap_or_else(|| {
        to_strings(&gateway_defaults::DEFAULT_CACHEABLE_API_PREFIXES)
    });
    if let Some(prefix) = cacheable_api_prefixes
        .iter()
        .find(|prefix| !prefix.starts_with(api_prefix.as_str()))
    {
        return Err(LoadError::invalid(
            "gateway.cacheable_api_prefixes",
            format!("`{prefix}` is outside `{api_prefix}`"),
        ));
    }

    let static_extensions: Vec<String> = gateway
        .static_extensions
        .unwrap_or_else(|| to_strings(&gateway_defaults::DEFAULT_STATIC_EXTENSIONS))
        .into_iter()
        .map(|extension| extension.trim_start_matches('.').to_ascii_lowercase())
        .collect();
    if static_extensions.iter().any(String::is_empty) {
        return Err(LoadError::invalid(
            "gateway.static_extensions",
            "extensions must not be empty",
        ));
    }

    let shell_assets = gateway
        .shell_assets
        .unwrap_or_else(|| to_strings(&gateway_defaults::DEFAULT_SHELL_ASSETS));
    if let Some(asset) = shell_assets.iter().find(|asset| !asset.starts_with('/')) {
        return Err(LoadError::invalid(
            "gateway.shell_assets",
            format!("`{asset}` must start with `/`"),
        ));
    }

    let cache_entry_limit = match gateway.cache_entry_limit {
        Some(limit) => Some(NonZeroUsize::new(limit).ok_or_else(|| {
            LoadError::invalid("gateway.cache_entry_limit", "must be greater than zero")
        })?),
        None => None,
    };

    let max_body_bytes = gateway.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES);
    if max_body_bytes == 0 {
        return Err(LoadError::invalid(
            "gateway.max_body_bytes",
            "must be greater than zero",
        ));
    }

    Ok(GatewaySettings {
        upstream,
        upstream_timeout,
        static_cache,
        api_cache,
        api_prefix,
        cacheable_api_prefixes,
        static_extensions,
        shell_assets,
        offline_document,
        cache_entry_limit,
        max_body_bytes,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBackendSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawGatewaySettings {
    upstream: Option<String>,
    upstream_timeout_seconds: Option<u64>,
    static_cache: Option<String>,
    api_cache: Option<String>,
    api_prefix: Option<String>,
    cacheable_api_prefixes: Option<Vec<String>>,
    static_extensions: Option<Vec<String>>,
    shell_assets: Option<Vec<String>>,
    offline_document: Option<String>,
    cache_entry_limit: Option<usize>,
    max_body_bytes: Option<usize>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_http_url(raw: &str, key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| LoadError::invalid(key, format!("invalid url `{raw}`: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LoadError::invalid(
            key,
            format!("unsupported scheme `{other}`"),
        )),
    }
}

fn positive_seconds(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn non_empty(
    value: Option<String>,
    default: &str,
    key: &'static str,
) -> Result<String, LoadError> {
    let value = value.unwrap_or_else(|| default.to_string());
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LoadError::invalid(key, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn absolute_path(
    value: Option<String>,
    default: &str,
    key: &'static str,
) -> Result<String, LoadError> {
    let value = non_empty(value, default, key)?;
    if !value.starts_with('/') {
        return Err(LoadError::invalid(key, "path must start with `/`"));
    }
    Ok(value)
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
