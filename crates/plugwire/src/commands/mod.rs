//! Command dispatch: bridges CLI args -> core calls -> output formatting.

pub mod config_cmd;
pub mod device;
pub mod light;
pub mod raw;
pub mod search;
pub mod util;

use plugwire_core::{Client, SendOptions};

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Everything a handler needs besides its own arguments.
pub struct Context<'a> {
    pub client: Client,
    pub config: Config,
    pub global: &'a GlobalOpts,
    pub format: OutputFormat,
    pub color: bool,
}

impl<'a> Context<'a> {
    pub fn new(config: Config, global: &'a GlobalOpts) -> Result<Self, CliError> {
        let client = Client::new(config::client_config(&config, global)?);
        let format = config::output_format(&config, global);
        let color = format == OutputFormat::Table && output::should_color(global.color);
        Ok(Self {
            client,
            config,
            global,
            format,
            color,
        })
    }

    /// Call-level overrides; flags beat per-device config entries.
    pub fn send(&self) -> SendOptions {
        config::send_options(self.global)
    }

    pub fn print(&self, out: &str) {
        output::print_output(out, self.global.quiet);
    }

    /// Status line on stderr, silenced by `--quiet`.
    pub fn note(&self, message: &str) {
        if !self.global.quiet {
            eprintln!("{message}");
        }
    }
}

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context<'_>) -> Result<(), CliError> {
    match cmd {
        Command::Search(args) => search::handle(ctx, args).await,
        Command::Send(args) => raw::send(ctx, args).await,
        Command::Command(args) => raw::command(ctx, args).await,
        Command::Sysinfo(target) => raw::sysinfo(ctx, &target).await,
        Command::Info(target) => device::info(ctx, &target).await,
        Command::Power(args) => device::power(ctx, args).await,
        Command::Alias(args) => device::alias(ctx, args).await,
        Command::Reboot(args) => device::reboot(ctx, args).await,
        Command::Reset(args) => device::reset(ctx, args).await,
        Command::Light(args) => light::handle(ctx, args).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "handled before dispatch".into(),
        }),
    }
}

