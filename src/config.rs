//! Configuration module for echo-server.
//!
//! Supports command-line arguments (with environment variable fallbacks)
//! and a TOML configuration file. CLI arguments take precedence over
//! config file values, which take precedence over built-in defaults.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command-line arguments for the echo server
#[derive(Parser, Debug)]
#[command(name = "echo-server")]
#[command(author = "echo-server authors")]
#[command(version = "0.1.0")]
#[command(about = "A gRPC echo server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Deployment environment; picks configs/prod.toml for "production",
    /// configs/dev.toml otherwise, when no config file is given
    #[arg(long, env = "APP_ENV")]
    pub environment: Option<String>,

    /// Host to bind to (e.g., 0.0.0.0)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (e.g., 50051)
    #[arg(short, long, env = "GRPC_PORT")]
    pub port: Option<u16>,

    /// Register the gRPC reflection service (true or false)
    #[arg(long, env = "GRPC_ENABLE_REFLECTION")]
    pub enable_reflection: Option<bool>,

    /// Maximum size of a decoded request message in bytes
    #[arg(long)]
    pub max_recv_msg_size: Option<usize>,

    /// Maximum size of an encoded response message in bytes
    #[arg(long)]
    pub max_send_msg_size: Option<usize>,

    /// Server-side timeout for each request (e.g., 10s, 500ms; bare numbers are seconds)
    #[arg(long, env = "HANDLER_TIMEOUT", value_parser = parse_timeout)]
    pub handler_timeout: Option<Duration>,

    /// Client-side deadline for each call (e.g., 5s, 1m; bare numbers are seconds)
    #[arg(long, env = "DEFAULT_RPC_TIMEOUT", value_parser = parse_timeout)]
    pub rpc_timeout: Option<Duration>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// What the binary should do once configured
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the gRPC server (default)
    Serve,
    /// Send one Echo call to a running server and print the reply
    Echo {
        /// Text to send
        #[arg(short, long)]
        message: String,
    },
}

/// Log output format
#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub enable_reflection: bool,
    #[serde(default = "default_msg_size")]
    pub max_recv_msg_size: usize,
    #[serde(default = "default_msg_size")]
    pub max_send_msg_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_reflection: false,
            max_recv_msg_size: default_msg_size(),
            max_send_msg_size: default_msg_size(),
        }
    }
}

/// Timeouts, as whole seconds or humantime strings ("5s", "250ms")
#[derive(Debug, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(
        default = "default_rpc_timeout",
        deserialize_with = "deserialize_timeout"
    )]
    pub default_rpc_timeout: Duration,
    #[serde(
        default = "default_handler_timeout",
        deserialize_with = "deserialize_timeout"
    )]
    pub handler_timeout: Duration,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            default_rpc_timeout: default_rpc_timeout(),
            handler_timeout: default_handler_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    50051
}

fn default_msg_size() -> usize {
    4 * 1024 * 1024 // 4 MiB, the gRPC default
}

fn default_rpc_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_handler_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Parse a timeout: a bare integer is seconds, anything else goes through
/// humantime.
pub fn parse_timeout(s: &str) -> Result<Duration, humantime::DurationError> {
    match s.trim().parse::<u64>() {
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => humantime::parse_duration(s.trim()),
    }
}

fn deserialize_timeout<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_timeout(&text).map_err(serde::de::Error::custom),
    }
}

/// Config file used when none is named explicitly.
pub fn default_config_path(environment: Option<&str>) -> PathBuf {
    match environment {
        Some("production") => PathBuf::from("configs/prod.toml"),
        _ => PathBuf::from("configs/dev.toml"),
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub enable_reflection: bool,
    pub max_recv_msg_size: usize,
    pub max_send_msg_size: usize,
    pub rpc_timeout: Duration,
    pub handler_timeout: Duration,
    pub log_level: String,
    pub log_format: LogFormat,
    pub command: Command,
}

impl Default for Config {
    fn default() -> Self {
        Self::merge(CliArgs::default_args(), TomlConfig::default())
    }
}

impl Config {
    /// Load configuration from CLI args, environment and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Resolve already-parsed CLI args against their TOML file.
    ///
    /// An explicitly named file must exist. Otherwise the environment's
    /// default file is used if present, and built-in defaults if not.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = match cli.config {
            Some(ref config_path) => read_toml(config_path)?,
            None => read_toml_if_present(&default_config_path(cli.environment.as_deref()))?,
        };

        Ok(Self::merge(cli, toml_config))
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        let TomlConfig {
            server,
            timeouts,
            logging,
        } = toml_config;

        Config {
            host: cli.host.unwrap_or(server.host),
            port: cli.port.unwrap_or(server.port),
            enable_reflection: cli.enable_reflection.unwrap_or(server.enable_reflection),
            max_recv_msg_size: cli.max_recv_msg_size.unwrap_or(server.max_recv_msg_size),
            max_send_msg_size: cli.max_send_msg_size.unwrap_or(server.max_send_msg_size),
            rpc_timeout: cli.rpc_timeout.unwrap_or(timeouts.default_rpc_timeout),
            handler_timeout: cli.handler_timeout.unwrap_or(timeouts.handler_timeout),
            log_level: cli.log_level.unwrap_or(logging.level),
            log_format: cli.log_format.unwrap_or(logging.format),
            command: cli.command.unwrap_or(Command::Serve),
        }
    }

    /// Address the server binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Address a client should dial. A wildcard bind host is reached
    /// through loopback.
    pub fn connect_addr(&self) -> String {
        let host = match self.host.as_str() {
            "0.0.0.0" | "" => "127.0.0.1",
            "::" | "[::]" => "[::1]",
            other => other,
        };
        format!("{}:{}", host, self.port)
    }
}

fn read_toml_if_present(path: &Path) -> Result<TomlConfig, ConfigError> {
    if path.exists() {
        read_toml(path)
    } else {
        Ok(TomlConfig::default())
    }
}

fn read_toml(path: &Path) -> Result<TomlConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
    toml::from_str(&contents).map_err(|e| ConfigError::TomlParse(path.to_path_buf(), e))
}

impl CliArgs {
    fn default_args() -> Self {
        CliArgs {
            config: None,
            environment: None,
            host: None,
            port: None,
            enable_reflection: None,
            max_recv_msg_size: None,
            max_send_msg_size: None,
            handler_timeout: None,
            rpc_timeout: None,
            log_level: None,
            log_format: None,
            command: None,
        }
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
