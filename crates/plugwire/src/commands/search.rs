//! Discovery: one-shot listing or a live event stream.

use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use plugwire_core::{DeviceKind, DiscoveryEvent, DiscoveryOptions, DiscoveryTarget};

use crate::cli::{OutputFormat, SearchArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::Context;
use super::util::{DeviceRow, DeviceSummary};

pub async fn handle(ctx: &Context<'_>, args: SearchArgs) -> Result<(), CliError> {
    let options = discovery_options(ctx, &args)?;
    tracing::debug!(
        broadcast = %options.broadcast_target(),
        interval_ms = options.interval.as_millis(),
        "starting discovery"
    );

    if args.watch {
        watch(ctx, options).await
    } else {
        list(ctx, options, Duration::from_millis(args.duration)).await
    }
}

fn discovery_options(ctx: &Context<'_>, args: &SearchArgs) -> Result<DiscoveryOptions, CliError> {
    let mut options = ctx
        .config
        .discovery_options()
        .map_err(|e| CliError::config(e, &config::active_path(ctx.global)))?;

    if let Some(broadcast) = args.broadcast {
        options.broadcast = broadcast;
    }
    if let Some(port) = args.port {
        options.broadcast_port = port;
    }
    if let Some(interval) = args.interval {
        if interval == 0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be greater than zero".into(),
            });
        }
        options.interval = Duration::from_millis(interval);
    }
    if !args.types.is_empty() {
        let kinds = args
            .types
            .iter()
            .map(|t| {
                DeviceKind::from_str(t).map_err(|_| CliError::Validation {
                    field: "type".into(),
                    reason: format!("unknown device type '{t}' (expected plug, bulb or device)"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        options.device_types = Some(kinds);
    }
    if !args.macs.is_empty() {
        options.mac_addresses.clone_from(&args.macs);
    }
    if !args.exclude_macs.is_empty() {
        options.exclude_mac_addresses.clone_from(&args.exclude_macs);
    }
    for raw in &args.targets {
        let (host, port) = config::split_host_port(raw)?;
        options.targets.push(DiscoveryTarget { host, port });
    }
    if args.no_children {
        options.break_out_children = false;
    }
    options.device_options = ctx.send();
    Ok(options)
}

// ── One-shot listing ────────────────────────────────────────────────

async fn list(ctx: &Context<'_>, options: DiscoveryOptions, wait: Duration) -> Result<(), CliError> {
    ctx.client.start_discovery(options).await?;
    tokio::time::sleep(wait).await;
    ctx.client.stop_discovery().await;

    let mut devices: Vec<DeviceSummary> = ctx
        .client
        .devices()
        .iter()
        .map(DeviceSummary::from)
        .collect();
    devices.sort_by(|a, b| a.id.cmp(&b.id));

    if devices.is_empty() {
        ctx.note("No devices found");
        return Ok(());
    }

    let out = output::render_list(
        ctx.format,
        &devices,
        |d| DeviceRow::new(d, ctx.color),
        |d| d.id.clone(),
    );
    ctx.print(&out);
    Ok(())
}

// ── Watch ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EventLine<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<DeviceSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> From<&'a DiscoveryEvent> for EventLine<'a> {
    fn from(event: &'a DiscoveryEvent) -> Self {
        let name = match event {
            DiscoveryEvent::DeviceNew(_) => "new",
            DiscoveryEvent::DeviceOnline(_) => "online",
            DiscoveryEvent::DeviceOffline(_) => "offline",
            DiscoveryEvent::Error(_) => "error",
        };
        let error = match event {
            DiscoveryEvent::Error(e) => Some(e.to_string()),
            _ => None,
        };
        Self {
            event: name,
            device: event.device().map(DeviceSummary::from),
            error,
        }
    }
}

async fn watch(ctx: &Context<'_>, options: DiscoveryOptions) -> Result<(), CliError> {
    let mut rx = ctx.client.subscribe();
    ctx.client.start_discovery(options).await?;
    ctx.note("Watching for devices (Ctrl+C to stop)");

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            received = rx.recv() => match received {
                Ok(event) => {
                    ctx.print(&event_line(ctx, &EventLine::from(&event)));
                    if let DiscoveryEvent::Error(e) = event {
                        break Err(CliError::Discovery { message: e.to_string() });
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event stream lagged");
                }
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    ctx.client.stop_discovery().await;
    result
}

fn event_line(ctx: &Context<'_>, line: &EventLine<'_>) -> String {
    match ctx.format {
        // One event per line, whatever the structured format.
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            output::render_json(line, true)
        }
        OutputFormat::Table | OutputFormat::Plain => {
            let Some(device) = &line.device else {
                return format!("{:<8} {}", line.event, line.error.as_deref().unwrap_or_default());
            };
            let status = match line.event {
                "offline" => output::paint_status(device.status, ctx.color),
                other => other.to_owned(),
            };
            format!(
                "{:<8} {:<24} {:<20} {}:{}",
                status, device.id, device.alias, device.host, device.port
            )
        }
    }
}
