//! Protocol-level commands: raw send, command envelopes, descriptor dump.

use serde_json::Value;

use plugwire_core::protocol;

use crate::cli::{CommandArgs, OutputFormat, SendArgs, TargetArgs};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

/// Send text verbatim; print the reply (pretty-printed when it is JSON
/// and a structured format was asked for).
pub async fn send(ctx: &Context<'_>, args: SendArgs) -> Result<(), CliError> {
    let options = util::target_options(ctx, &args.target)?;
    let reply = ctx
        .client
        .send(&args.payload, &options.host, options.port, options.send)
        .await?;

    let out = match (ctx.format, serde_json::from_str::<Value>(&reply)) {
        (OutputFormat::Table | OutputFormat::Plain, _) | (_, Err(_)) => reply,
        (format, Ok(value)) => output::render_single(format, &value, output::render_json_pretty, Value::to_string),
    };
    ctx.print(&out);
    Ok(())
}

/// Send a command envelope with child scoping and response validation.
pub async fn command(ctx: &Context<'_>, args: CommandArgs) -> Result<(), CliError> {
    let command = protocol::parse_command(&args.command)?;

    // Short outlet ids need the parent id from the descriptor.
    let needs_descriptor = args.target.child.is_some() || !args.child_ids.is_empty();
    let device = if needs_descriptor {
        util::fetch_device(ctx, &args.target).await?
    } else {
        util::device_handle(ctx, &args.target)?
    };

    let result = if args.child_ids.is_empty() {
        device.send_command(command, ctx.send()).await?
    } else {
        device
            .send_command_to(command, &args.child_ids, ctx.send())
            .await?
    };

    let out = output::render_single(ctx.format, &result, output::render_json_pretty, Value::to_string);
    ctx.print(&out);
    Ok(())
}

/// Print the descriptor exactly as the device reports it.
pub async fn sysinfo(ctx: &Context<'_>, target: &TargetArgs) -> Result<(), CliError> {
    let device = util::device_handle(ctx, target)?;
    let info = device.get_sys_info(ctx.send()).await?;

    let out = output::render_single(
        ctx.format,
        info.as_ref(),
        output::render_json_pretty,
        |i| i.device_id.clone(),
    );
    ctx.print(&out);
    Ok(())
}
