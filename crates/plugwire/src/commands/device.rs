//! Device command handlers: info, power, alias, reboot, reset.

use serde::Serialize;
use serde_json::Value;

use plugwire_core::{Device, DeviceInfo, DeviceKind};

use crate::cli::{AliasArgs, DelayArgs, PowerAction, PowerArgs, TargetArgs};
use crate::error::CliError;
use crate::output;

use super::util::{self, DeviceSummary};
use super::Context;

// ── Info ────────────────────────────────────────────────────────────

pub async fn info(ctx: &Context<'_>, target: &TargetArgs) -> Result<(), CliError> {
    let device = util::device_handle(ctx, target)?;
    let info = device.get_info(ctx.send()).await?;
    let summary = DeviceSummary::from(&device);

    let out = output::render_single(
        ctx.format,
        &info,
        |i| info_detail(&summary, i, ctx.color),
        |_| summary.id.clone(),
    );
    ctx.print(&out);
    Ok(())
}

fn info_detail(summary: &DeviceSummary, info: &DeviceInfo, color: bool) -> String {
    let mut lines = vec![
        util::detail(summary, color),
        format!("Firmware: {}", info.sys_info.sw_ver),
        format!("Hardware: {}", info.sys_info.hw_ver),
    ];
    if let Some(children) = info.sys_info.children.as_deref() {
        for child in children {
            lines.push(format!(
                "Outlet:   {} {} ({})",
                child.id,
                output::paint_power(Some(child.state == 1), color),
                child.alias
            ));
        }
    }
    if let Some(light) = &info.light_state {
        if let Some(brightness) = light.brightness {
            lines.push(format!("Bright:   {brightness}%"));
        }
        if let Some(temp) = light.color_temp.filter(|t| *t > 0) {
            lines.push(format!("ColorTmp: {temp}K"));
        } else if let (Some(hue), Some(sat)) = (light.hue, light.saturation) {
            lines.push(format!("Color:    hue {hue}, saturation {sat}%"));
        }
    }
    if let Some(rt) = &info.realtime {
        let fmt = |v: Option<f64>, unit: &str, precision: usize| {
            v.map_or_else(|| "-".into(), |v| format!("{v:.precision$} {unit}"))
        };
        lines.push(format!("Power:    {}", fmt(rt.power_w(), "W", 1)));
        lines.push(format!("Voltage:  {}", fmt(rt.voltage_v(), "V", 1)));
        lines.push(format!("Current:  {}", fmt(rt.current_a(), "A", 3)));
        lines.push(format!("Total:    {}", fmt(rt.total_kwh(), "kWh", 3)));
    }
    lines.join("\n")
}

// ── Power ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct PowerReport {
    id: String,
    alias: String,
    on: bool,
}

pub async fn power(ctx: &Context<'_>, args: PowerArgs) -> Result<(), CliError> {
    let device = util::fetch_device(ctx, &args.target).await?;
    let on = match args.state {
        None => read_power(&device, ctx).await?,
        Some(PowerAction::Toggle) => toggle_power(&device, ctx).await?,
        Some(action) => {
            let on = action == PowerAction::On;
            write_power(&device, ctx, on).await?;
            on
        }
    };

    let report = PowerReport {
        id: device.id().unwrap_or_default(),
        alias: device.alias().unwrap_or_default(),
        on,
    };
    let out = output::render_single(
        ctx.format,
        &report,
        |r| format!("{}: {}", r.alias, output::paint_power(Some(r.on), ctx.color)),
        |r| if r.on { "on".into() } else { "off".into() },
    );
    ctx.print(&out);
    Ok(())
}

fn power_unsupported(device: &Device) -> CliError {
    CliError::Unsupported {
        operation: "power".into(),
        required: format!("plug or bulb (found {})", device.kind()),
    }
}

async fn read_power(device: &Device, ctx: &Context<'_>) -> Result<bool, CliError> {
    match device.kind() {
        DeviceKind::Plug => Ok(device.as_switch()?.get_power_state(ctx.send()).await?),
        DeviceKind::Bulb => Ok(device.as_light()?.get_power_state(ctx.send()).await?),
        DeviceKind::Generic => Err(power_unsupported(device)),
    }
}

async fn write_power(device: &Device, ctx: &Context<'_>, on: bool) -> Result<(), CliError> {
    match device.kind() {
        DeviceKind::Plug => Ok(device.as_switch()?.set_power_state(on, ctx.send()).await?),
        DeviceKind::Bulb => Ok(device.as_light()?.set_power_state(on, ctx.send()).await?),
        DeviceKind::Generic => Err(power_unsupported(device)),
    }
}

async fn toggle_power(device: &Device, ctx: &Context<'_>) -> Result<bool, CliError> {
    match device.kind() {
        DeviceKind::Plug => Ok(device.as_switch()?.toggle_power_state(ctx.send()).await?),
        DeviceKind::Bulb => Ok(device.as_light()?.toggle_power_state(ctx.send()).await?),
        DeviceKind::Generic => Err(power_unsupported(device)),
    }
}

// ── Alias ───────────────────────────────────────────────────────────

pub async fn alias(ctx: &Context<'_>, args: AliasArgs) -> Result<(), CliError> {
    if args.alias.trim().is_empty() {
        return Err(CliError::Validation {
            field: "alias".into(),
            reason: "must not be empty".into(),
        });
    }
    let device = util::fetch_device(ctx, &args.target).await?;
    device.set_alias(&args.alias, ctx.send()).await?;
    ctx.note(&format!("Renamed {} to '{}'", device.id().unwrap_or_default(), args.alias));
    Ok(())
}

// ── Reboot / reset ──────────────────────────────────────────────────

pub async fn reboot(ctx: &Context<'_>, args: DelayArgs) -> Result<(), CliError> {
    let device = util::device_handle(ctx, &args.target)?;
    let result = device.reboot(args.delay, ctx.send()).await?;
    report_ack(ctx, &result, &format!("Reboot scheduled in {}s", args.delay));
    Ok(())
}

pub async fn reset(ctx: &Context<'_>, args: DelayArgs) -> Result<(), CliError> {
    util::confirm("reset", ctx.global.yes)?;
    let device = util::device_handle(ctx, &args.target)?;
    let result = device.reset(args.delay, ctx.send()).await?;
    report_ack(ctx, &result, &format!("Factory reset scheduled in {}s", args.delay));
    Ok(())
}

fn report_ack(ctx: &Context<'_>, result: &Value, message: &str) {
    match ctx.format {
        crate::cli::OutputFormat::Table | crate::cli::OutputFormat::Plain => ctx.note(message),
        format => ctx.print(&output::render_single(
            format,
            result,
            output::render_json_pretty,
            Value::to_string,
        )),
    }
}
