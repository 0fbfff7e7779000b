//! On-disk configuration for plugwire tools.
//!
//! A TOML file in the platform config directory, overridden by
//! `PLUGWIRE_*` environment variables, translated into the runtime types
//! `plugwire-core` takes (`ClientConfig`, `DiscoveryOptions`,
//! `DeviceOptions`). The core itself never touches disk.

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use plugwire_core::{
    ClientConfig, DEFAULT_PORT, DeviceKind, DeviceOptions, DiscoveryOptions, SendOptions,
    TransportConfig, TransportKind,
};

/// Environment prefix; nested keys use a double underscore
/// (`PLUGWIRE_DEFAULTS__TIMEOUT_MS`).
pub const ENV_PREFIX: &str = "PLUGWIRE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no device named '{name}' in the config file")]
    UnknownDevice { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Client-wide defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Discovery tuning.
    #[serde(default)]
    pub discovery: DiscoverySettings,

    /// Named devices, addressable by name from the CLI.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// `"tcp"` or `"udp"`.
    #[serde(default = "default_transport")]
    pub transport: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_port")]
    pub port: u16,

    /// CLI output format when `--output` is not given.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            timeout_ms: default_timeout_ms(),
            port: default_port(),
            output: default_output(),
        }
    }
}

fn default_transport() -> String {
    "tcp".into()
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_output() -> String {
    "table".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DiscoverySettings {
    #[serde(default = "default_broadcast")]
    pub broadcast: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Auto-stop after this long; 0 runs until stopped.
    #[serde(default)]
    pub timeout_ms: u64,

    #[serde(default = "default_offline_tolerance")]
    pub offline_tolerance: u64,

    /// `plug`, `bulb`, or `device`. Empty = all kinds.
    #[serde(default)]
    pub device_types: Vec<String>,

    #[serde(default)]
    pub mac_addresses: Vec<String>,

    #[serde(default)]
    pub exclude_mac_addresses: Vec<String>,

    #[serde(default = "default_true")]
    pub break_out_children: bool,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            broadcast: default_broadcast(),
            port: default_port(),
            interval_ms: default_interval_ms(),
            timeout_ms: 0,
            offline_tolerance: default_offline_tolerance(),
            device_types: Vec::new(),
            mac_addresses: Vec::new(),
            exclude_mac_addresses: Vec::new(),
            break_out_children: true,
        }
    }
}

fn default_broadcast() -> String {
    Ipv4Addr::BROADCAST.to_string()
}
fn default_interval_ms() -> u64 {
    10_000
}
fn default_offline_tolerance() -> u64 {
    3
}
fn default_true() -> bool {
    true
}

/// A named device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceEntry {
    pub host: String,

    pub port: Option<u16>,

    /// Outlet of a multi-outlet unit, short or full form.
    pub child_id: Option<String>,

    /// Override the default transport for this device.
    pub transport: Option<String>,

    /// Override the default timeout for this device.
    pub timeout_ms: Option<u64>,
}

impl DeviceEntry {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            child_id: None,
            transport: None,
            timeout_ms: None,
        }
    }
}

// ── Translation to runtime config ───────────────────────────────────

impl Config {
    /// Check every section. Loading does not validate on its own so a
    /// broken `[devices.x]` entry does not block unrelated commands.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.client_config()?;
        self.discovery_options()?;
        for name in self.devices.keys() {
            self.device(name)?;
        }
        Ok(())
    }

    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let kind = parse_transport("defaults.transport", &self.defaults.transport)?;
        let timeout = parse_timeout("defaults.timeout_ms", self.defaults.timeout_ms)?;
        if self.defaults.port == 0 {
            return Err(invalid("defaults.port", "must be non-zero"));
        }

        Ok(ClientConfig {
            transport: TransportConfig::default()
                .with_kind(kind)
                .with_timeout(timeout),
            default_port: self.defaults.port,
        })
    }

    pub fn discovery_options(&self) -> Result<DiscoveryOptions, ConfigError> {
        let section = &self.discovery;

        let broadcast: Ipv4Addr = section
            .broadcast
            .parse()
            .map_err(|_| invalid("discovery.broadcast", format!("'{}' is not an IPv4 address", section.broadcast)))?;
        if section.offline_tolerance == 0 {
            return Err(invalid("discovery.offline_tolerance", "must be at least 1"));
        }
        let interval = parse_timeout("discovery.interval_ms", section.interval_ms)?;

        let device_types = if section.device_types.is_empty() {
            None
        } else {
            Some(
                section
                    .device_types
                    .iter()
                    .map(|raw| {
                        raw.parse::<DeviceKind>().map_err(|_| {
                            invalid(
                                "discovery.device_types",
                                format!("expected 'plug', 'bulb', or 'device', got '{raw}'"),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            )
        };

        Ok(DiscoveryOptions {
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            broadcast,
            broadcast_port: section.port,
            interval,
            timeout: Duration::from_millis(section.timeout_ms),
            offline_tolerance: section.offline_tolerance,
            device_types,
            mac_addresses: section.mac_addresses.clone(),
            exclude_mac_addresses: section.exclude_mac_addresses.clone(),
            targets: Vec::new(),
            break_out_children: section.break_out_children,
            device_options: SendOptions::default(),
        })
    }

    /// Options for the device named `name`.
    pub fn device(&self, name: &str) -> Result<DeviceOptions, ConfigError> {
        let entry = self
            .devices
            .get(name)
            .ok_or_else(|| ConfigError::UnknownDevice { name: name.into() })?;

        let field = |key: &str| format!("devices.{name}.{key}");
        if entry.host.trim().is_empty() {
            return Err(invalid(&field("host"), "must not be empty"));
        }

        let send = SendOptions {
            transport: entry
                .transport
                .as_deref()
                .map(|raw| parse_transport(&field("transport"), raw))
                .transpose()?,
            timeout: entry
                .timeout_ms
                .map(|ms| parse_timeout(&field("timeout_ms"), ms))
                .transpose()?,
        };

        Ok(DeviceOptions {
            host: entry.host.clone(),
            port: entry.port,
            child_id: entry.child_id.clone(),
            send,
        })
    }
}

fn parse_transport(field: &str, raw: &str) -> Result<TransportKind, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "tcp" => Ok(TransportKind::Tcp),
        "udp" => Ok(TransportKind::Udp),
        _ => Err(invalid(field, format!("expected 'tcp' or 'udp', got '{raw}'"))),
    }
}

fn parse_timeout(field: &str, ms: u64) -> Result<Duration, ConfigError> {
    if ms == 0 {
        return Err(invalid(field, "must be greater than zero"));
    }
    Ok(Duration::from_millis(ms))
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "plugwire", "plugwire").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("plugwire");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    Ok(figment.extract()?)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_translate_to_protocol_defaults() {
        let config = Config::default();

        let client = config.client_config().unwrap();
        assert_eq!(client, ClientConfig::default());

        let discovery = config.discovery_options().unwrap();
        assert_eq!(discovery, DiscoveryOptions::default());
    }

    #[test]
    fn zero_offline_tolerance_is_rejected() {
        let mut config = Config::default();
        config.discovery.offline_tolerance = 0;

        let err = config.discovery_options().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation { ref field, .. } if field == "discovery.offline_tolerance"
        ));
    }

    #[test]
    fn unknown_transport_is_rejected() {
        let mut config = Config::default();
        config.defaults.transport = "http".into();
        assert!(config.client_config().is_err());

        config.defaults.transport = "UDP".into();
        assert_eq!(config.client_config().unwrap().transport.kind, TransportKind::Udp);
    }

    #[test]
    fn device_types_parse_case_insensitively() {
        let mut config = Config::default();
        config.discovery.device_types = vec!["Plug".into(), "device".into()];

        let options = config.discovery_options().unwrap();
        assert_eq!(
            options.device_types,
            Some(vec![DeviceKind::Plug, DeviceKind::Generic])
        );

        config.discovery.device_types = vec!["toaster".into()];
        assert!(config.discovery_options().is_err());
    }

    #[test]
    fn device_entry_overrides() {
        let mut config = Config::default();
        config.devices.insert(
            "lamp".into(),
            DeviceEntry {
                port: Some(10_000),
                child_id: Some("1".into()),
                transport: Some("udp".into()),
                timeout_ms: Some(500),
                ..DeviceEntry::new("192.168.1.20")
            },
        );

        let options = config.device("lamp").unwrap();
        assert_eq!(options.host, "192.168.1.20");
        assert_eq!(options.port, Some(10_000));
        assert_eq!(options.child_id.as_deref(), Some("1"));
        assert_eq!(options.send.transport, Some(TransportKind::Udp));
        assert_eq!(options.send.timeout, Some(Duration::from_millis(500)));

        assert!(matches!(
            config.device("fan"),
            Err(ConfigError::UnknownDevice { .. })
        ));
    }
}
