//! Service configuration management
//!
//! Handles loading configuration from environment variables, TOML files, and CLI arguments.

use infra_master::{ResourceNames, SchemaLayout};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Prefix of every environment variable read by the service
pub const ENV_PREFIX: &str = "FI_TRANSFORMER_";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port number: {0}. Must be between 1 and 65535")]
    InvalidPort(u16),

    #[error("Metrics port {0} clashes with the service port")]
    PortConflict(u16),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: text, json")]
    InvalidLogFormat(String),

    #[error("Invalid loader: {0}. Must be one of: fs, http")]
    InvalidLoader(String),

    #[error("Invalid schema: {0}. Must be one of: current, legacy")]
    InvalidSchema(String),

    #[error("Invalid socket address: {0}")]
    InvalidAddress(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("Inconsistent layout: {0}")]
    InconsistentLayout(String),

    #[error("Configuration file error: {0}")]
    FileError(String),

    #[error("Environment variable error: {0}")]
    EnvError(String),
}

/// Log levels supported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::InvalidLogFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Where extracts are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoaderKind {
    /// Local directory acting as the bucket
    #[default]
    Fs,
    /// S3-compatible object store over HTTP
    Http,
}

impl FromStr for LoaderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fs" | "file" => Ok(LoaderKind::Fs),
            "http" | "s3" => Ok(LoaderKind::Http),
            _ => Err(ConfigError::InvalidLoader(s.to_string())),
        }
    }
}

impl std::fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderKind::Fs => write!(f, "fs"),
            LoaderKind::Http => write!(f, "http"),
        }
    }
}

/// Built-in extract layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaPreset {
    /// Coverage, sec-entity and FIGI listing files in dated folders
    #[default]
    Current,
    /// Security/entity map and FIGI ids at the bucket root
    Legacy,
}

impl FromStr for SchemaPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "current" => Ok(SchemaPreset::Current),
            "legacy" => Ok(SchemaPreset::Legacy),
            _ => Err(ConfigError::InvalidSchema(s.to_string())),
        }
    }
}

impl std::fmt::Display for SchemaPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaPreset::Current => write!(f, "current"),
            SchemaPreset::Legacy => write!(f, "legacy"),
        }
    }
}

/// Service configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Log level
    #[serde(deserialize_with = "deserialize_from_str")]
    pub log_level: LogLevel,
    /// Log output format
    #[serde(deserialize_with = "deserialize_from_str")]
    pub log_format: LogFormat,
    /// Prefix of the `apiUrl` values in instrument listings
    pub base_url: String,
    /// Shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,
    /// Port of the Prometheus exporter, disabled when unset
    pub metrics_port: Option<u16>,
    /// Resource loader implementation
    #[serde(deserialize_with = "deserialize_from_str")]
    pub loader: LoaderKind,
    /// Bucket name for the HTTP loader
    pub bucket_name: String,
    /// Object store endpoint for the HTTP loader
    pub bucket_endpoint: String,
    /// Bucket directory for the filesystem loader
    pub bucket_root: PathBuf,
    /// Read each folder's resources out of its `weekly.zip` archive
    pub bundle: bool,
    /// Extract layout preset
    #[serde(deserialize_with = "deserialize_from_str")]
    pub schema: SchemaPreset,
    /// Drop securities whose issuer is not a public entity
    pub public_entity_filter: bool,
    /// Start a load as soon as the server is up
    pub load_on_start: bool,
    /// Resource names replacing the preset ones
    pub resources: Option<ResourceNames>,
    /// Column layout replacing the preset one
    pub layout: Option<SchemaLayout>,
}

fn deserialize_from_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let s = String::deserialize(deserializer)?;
    T::from_str(&s).map_err(serde::de::Error::custom)
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: LogLevel::Info,
            log_format: LogFormat::Text,
            base_url: "http://localhost:8080/transformers/financial-instruments/".to_string(),
            shutdown_timeout_secs: 30,
            metrics_port: None,
            loader: LoaderKind::Fs,
            bucket_name: String::new(),
            bucket_endpoint: "https://s3-eu-west-1.amazonaws.com".to_string(),
            bucket_root: PathBuf::from("data"),
            bundle: false,
            schema: SchemaPreset::Current,
            public_entity_filter: false,
            load_on_start: true,
            resources: None,
            layout: None,
        }
    }
}

impl ServiceConfig {
    /// Create a new ServiceConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override the settings `lookup` finds under their `FI_TRANSFORMER_*` name
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key).map(|value| (key, value))
        };
        let invalid = |key: String, value: String| ConfigError::EnvError(format!("{key}={value}"));

        if let Some((_, host)) = var("HOST") {
            self.host = host;
        }
        if let Some((key, port)) = var("PORT") {
            self.port = port.parse().map_err(|_| invalid(key, port))?;
        }
        if let Some((_, level)) = var("LOG_LEVEL") {
            self.log_level = LogLevel::from_str(&level)?;
        }
        if let Some((_, format)) = var("LOG_FORMAT") {
            self.log_format = LogFormat::from_str(&format)?;
        }
        if let Some((_, base_url)) = var("BASE_URL") {
            self.base_url = base_url;
        }
        if let Some((key, timeout)) = var("SHUTDOWN_TIMEOUT_SECS") {
            self.shutdown_timeout_secs = timeout.parse().map_err(|_| invalid(key, timeout))?;
        }
        if let Some((key, port)) = var("METRICS_PORT") {
            self.metrics_port = Some(port.parse().map_err(|_| invalid(key, port))?);
        }
        if let Some((_, loader)) = var("LOADER") {
            self.loader = LoaderKind::from_str(&loader)?;
        }
        if let Some((_, bucket)) = var("BUCKET_NAME") {
            self.bucket_name = bucket;
        }
        if let Some((_, endpoint)) = var("BUCKET_ENDPOINT") {
            self.bucket_endpoint = endpoint;
        }
        if let Some((_, root)) = var("BUCKET_ROOT") {
            self.bucket_root = PathBuf::from(root);
        }
        if let Some((_, enabled)) = var("BUNDLE") {
            self.bundle = enabled.to_lowercase() == "true";
        }
        if let Some((_, schema)) = var("SCHEMA") {
            self.schema = SchemaPreset::from_str(&schema)?;
        }
        if let Some((_, enabled)) = var("PUBLIC_ENTITY_FILTER") {
            self.public_entity_filter = enabled.to_lowercase() == "true";
        }
        if let Some((_, enabled)) = var("LOAD_ON_START") {
            self.load_on_start = enabled.to_lowercase() == "true";
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    ///
    /// Validation happens once every source has been merged, see [`build_config`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        match self.metrics_port {
            Some(0) => return Err(ConfigError::InvalidPort(0)),
            Some(port) if port == self.port => return Err(ConfigError::PortConflict(port)),
            _ => {}
        }

        if self.base_url.is_empty() {
            return Err(ConfigError::MissingSetting("base_url"));
        }

        if self.loader == LoaderKind::Http {
            if self.bucket_name.is_empty() {
                return Err(ConfigError::MissingSetting("bucket_name"));
            }
            if self.bucket_endpoint.is_empty() {
                return Err(ConfigError::MissingSetting("bucket_endpoint"));
            }
        }

        if self.resource_names().listings.is_some() && self.schema_layout().listings.is_none() {
            return Err(ConfigError::InconsistentLayout(
                "a listings resource is configured but the layout has no listing columns"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resource names of the configured extract
    pub fn resource_names(&self) -> ResourceNames {
        let mut names = self.resources.clone().unwrap_or_else(|| match self.schema {
            SchemaPreset::Current => ResourceNames::default(),
            SchemaPreset::Legacy => ResourceNames::legacy(),
        });
        if self.public_entity_filter && names.entities.is_none() {
            names.entities = Some(ResourceNames::ENTITY_COVERAGE.to_string());
        }
        names
    }

    /// Column layout of the configured extract
    pub fn schema_layout(&self) -> SchemaLayout {
        self.layout.clone().unwrap_or_else(|| match self.schema {
            SchemaPreset::Current => SchemaLayout::default(),
            SchemaPreset::Legacy => SchemaLayout::legacy(),
        })
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &CliArgs) -> Result<(), ConfigError> {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(log_level) = &cli.log_level {
            self.log_level = LogLevel::from_str(log_level)?;
        }
        if let Some(log_format) = &cli.log_format {
            self.log_format = LogFormat::from_str(log_format)?;
        }
        if let Some(base_url) = &cli.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(port) = cli.metrics_port {
            self.metrics_port = Some(port);
        }
        if let Some(loader) = &cli.loader {
            self.loader = LoaderKind::from_str(loader)?;
        }
        if let Some(bucket) = &cli.bucket_name {
            self.bucket_name = bucket.clone();
        }
        if let Some(endpoint) = &cli.bucket_endpoint {
            self.bucket_endpoint = endpoint.clone();
        }
        if let Some(root) = &cli.bucket_root {
            self.bucket_root = root.clone();
        }
        if cli.bundle {
            self.bundle = true;
        }
        if let Some(schema) = &cli.schema {
            self.schema = SchemaPreset::from_str(schema)?;
        }
        Ok(())
    }
}

/// CLI arguments structure
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Config file path
    pub config_file: Option<PathBuf>,
    /// Host address override
    pub host: Option<String>,
    /// Port override
    pub port: Option<u16>,
    /// Log level override
    pub log_level: Option<String>,
    /// Log format override
    pub log_format: Option<String>,
    /// Base URL override
    pub base_url: Option<String>,
    /// Metrics exporter port
    pub metrics_port: Option<u16>,
    /// Loader override
    pub loader: Option<String>,
    /// Bucket name override
    pub bucket_name: Option<String>,
    /// Bucket endpoint override
    pub bucket_endpoint: Option<String>,
    /// Bucket directory override
    pub bucket_root: Option<PathBuf>,
    /// Read resources from zip bundles
    pub bundle: bool,
    /// Schema preset override
    pub schema: Option<String>,
}

/// Build configuration from all sources
///
/// Priority (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables
/// 3. Config file
/// 4. Default values
pub fn build_config(cli: &CliArgs) -> Result<ServiceConfig, ConfigError> {
    build_config_with_env(cli, |key| std::env::var(key).ok())
}

/// [`build_config`] reading environment variables through `lookup`
pub fn build_config_with_env<F>(cli: &CliArgs, lookup: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = if let Some(config_path) = &cli.config_file {
        ServiceConfig::from_file(config_path)?
    } else {
        ServiceConfig::default()
    };

    config.apply_env(lookup)?;
    config.merge_with_cli(cli)?;
    config.validate()?;

    Ok(config)
}
