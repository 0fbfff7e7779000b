//! Shared helpers for command handlers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use plugwire_core::{Device, DeviceKind, DeviceOptions, DeviceStatus};

use crate::cli::TargetArgs;
use crate::config;
use crate::error::CliError;
use crate::output;

use super::Context;

/// Resolve the target and build a device handle without contacting it.
pub fn device_handle(ctx: &Context<'_>, target: &TargetArgs) -> Result<Device, CliError> {
    Ok(ctx.client.new_device(target_options(ctx, target)?))
}

/// Resolve the target and fetch its descriptor.
pub async fn fetch_device(ctx: &Context<'_>, target: &TargetArgs) -> Result<Device, CliError> {
    let options = target_options(ctx, target)?;
    tracing::debug!(host = %options.host, port = ?options.port, "fetching device");
    Ok(ctx.client.get_device(options).await?)
}

pub fn target_options(ctx: &Context<'_>, target: &TargetArgs) -> Result<DeviceOptions, CliError> {
    config::resolve_target(&ctx.config, target, ctx.global)
}

/// Refuse a destructive action unless `--yes` was passed.
pub fn confirm(action: &str, yes_flag: bool) -> Result<(), CliError> {
    if yes_flag {
        Ok(())
    } else {
        Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        })
    }
}

// ── Device summary ──────────────────────────────────────────────────

/// Flat, serializable view of a device for listings.
#[derive(Debug, Serialize)]
pub struct DeviceSummary {
    pub id: String,
    pub alias: String,
    pub kind: DeviceKind,
    pub model: String,
    pub host: String,
    pub port: u16,
    pub mac: String,
    pub status: DeviceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl From<&Device> for DeviceSummary {
    fn from(d: &Device) -> Self {
        let power = match d.kind() {
            DeviceKind::Plug => d.as_switch().ok().and_then(|s| s.relay_state()),
            DeviceKind::Bulb => d
                .as_light()
                .ok()
                .and_then(|l| l.light_state())
                .map(|s| s.is_on()),
            DeviceKind::Generic => None,
        };
        Self {
            id: d.id().unwrap_or_default(),
            alias: d.alias().unwrap_or_default(),
            kind: d.kind(),
            model: d.model().unwrap_or_default(),
            host: d.host(),
            port: d.port(),
            mac: d.mac().to_string(),
            status: d.status(),
            power,
            last_seen_at: d.last_seen_at(),
        }
    }
}

#[derive(Tabled)]
pub struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl DeviceRow {
    pub fn new(s: &DeviceSummary, color: bool) -> Self {
        Self {
            id: s.id.clone(),
            alias: s.alias.clone(),
            kind: s.kind.to_string(),
            model: s.model.clone(),
            address: format!("{}:{}", s.host, s.port),
            mac: s.mac.clone(),
            power: output::paint_power(s.power, color),
            status: output::paint_status(s.status, color),
        }
    }
}

/// Multi-line detail view for a single device.
pub fn detail(s: &DeviceSummary, color: bool) -> String {
    [
        format!("ID:       {}", s.id),
        format!("Alias:    {}", s.alias),
        format!("Type:     {}", s.kind),
        format!("Model:    {}", s.model),
        format!("Address:  {}:{}", s.host, s.port),
        format!("MAC:      {}", if s.mac.is_empty() { "-" } else { &s.mac }),
        format!("Power:    {}", output::paint_power(s.power, color)),
    ]
    .join("\n")
}
