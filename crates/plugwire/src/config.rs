//! CLI configuration: thin wrapper around `plugwire_config`.
//!
//! Loads the file (or the `--config` override) and layers `GlobalOpts`
//! flags on top when building the runtime configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use plugwire_core::{ClientConfig, DeviceOptions, SendOptions, TransportKind};

use crate::cli::{GlobalOpts, OutputFormat, TargetArgs};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use plugwire_config::{Config, DeviceEntry, load_config_from, save_config_to};

// ── Loading ─────────────────────────────────────────────────────────

/// The config file in effect: `--config`, then the platform default.
pub fn active_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(plugwire_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = active_path(global);
    load_config_from(&path).map_err(|e| CliError::config(e, &path))
}

// ── Flag overrides ──────────────────────────────────────────────────

/// Per-call overrides from `--udp` / `--timeout`.
pub fn send_options(global: &GlobalOpts) -> SendOptions {
    SendOptions {
        transport: global.udp.then_some(TransportKind::Udp),
        timeout: global.timeout.map(Duration::from_millis),
    }
}

/// Client defaults from the file, with global flags applied on top.
pub fn client_config(cfg: &Config, global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let base = cfg
        .client_config()
        .map_err(|e| CliError::config(e, &active_path(global)))?;
    if global.timeout == Some(0) {
        return Err(CliError::Validation {
            field: "timeout".into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(base.with_send_options(send_options(global)))
}

/// `--output`, then the file's `defaults.output`, then table.
pub fn output_format(cfg: &Config, global: &GlobalOpts) -> OutputFormat {
    global
        .output
        .or_else(|| OutputFormat::from_str(&cfg.defaults.output, true).ok())
        .unwrap_or(OutputFormat::Table)
}

// ── Device addressing ───────────────────────────────────────────────

/// Resolve a target: a configured device name wins, otherwise the
/// argument is a host or `host:port`. `--port` and `--child` override
/// either form.
pub fn resolve_target(
    cfg: &Config,
    target: &TargetArgs,
    global: &GlobalOpts,
) -> Result<DeviceOptions, CliError> {
    let mut options = if cfg.devices.contains_key(&target.target) {
        cfg.device(&target.target)
            .map_err(|e| CliError::config(e, &active_path(global)))?
    } else {
        let (host, port) = split_host_port(&target.target)?;
        DeviceOptions {
            host,
            port,
            child_id: None,
            send: SendOptions::default(),
        }
    };

    if let Some(port) = target.port {
        options.port = Some(port);
    }
    if let Some(child) = &target.child {
        options.child_id = Some(child.clone());
    }
    options.send = send_options(global).merge(options.send);
    if options.host.is_empty() {
        return Err(CliError::Validation {
            field: "target".into(),
            reason: "host must not be empty".into(),
        });
    }
    Ok(options)
}

/// `host`, `host:port`, or `[v6]:port`. A bare IPv6 address has no port.
pub fn split_host_port(raw: &str) -> Result<(String, Option<u16>), CliError> {
    let bad_port = |port: &str| CliError::Validation {
        field: "target".into(),
        reason: format!("'{port}' is not a valid port"),
    };

    if let Some(rest) = raw.strip_prefix('[') {
        return match rest.split_once("]:") {
            Some((host, port)) => Ok((host.to_owned(), Some(port.parse().map_err(|_| bad_port(port))?))),
            None => Ok((rest.trim_end_matches(']').to_owned(), None)),
        };
    }

    match raw.split_once(':') {
        Some((host, port)) if !port.contains(':') => {
            Ok((host.to_owned(), Some(port.parse().map_err(|_| bad_port(port))?)))
        }
        _ => Ok((raw.to_owned(), None)),
    }
}
