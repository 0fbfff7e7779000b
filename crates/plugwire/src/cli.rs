//! Clap derive structures for the `plugwire` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// plugwire -- talk to smart plugs and bulbs on the local network
#[derive(Debug, Parser)]
#[command(
    name = "plugwire",
    version,
    about = "Discover and control smart plugs and bulbs on the local network",
    long_about = "Discover, inspect and control smart plugs, power strips and bulbs\n\
        that speak the encrypted JSON protocol on port 9999.\n\n\
        Devices are addressed by host (or host:port), or by a name from\n\
        the [devices] table of the config file.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Send commands over UDP instead of TCP
    #[arg(long, short = 'u', global = true)]
    pub udp: bool,

    /// Per-request timeout in milliseconds
    #[arg(long, short = 't', global = true)]
    pub timeout: Option<u64>,

    /// Output format (defaults to the config file's, then table)
    #[arg(long, short = 'o', global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Config file to read instead of the platform default
    #[arg(long, env = "PLUGWIRE_CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation for destructive commands
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover devices on the local network
    #[command(alias = "discover", alias = "s")]
    Search(SearchArgs),

    /// Send a raw JSON payload and print the decoded reply
    Send(SendArgs),

    /// Send a command envelope and print the validated result
    #[command(alias = "cmd")]
    Command(CommandArgs),

    /// Show descriptor, light state and metering for a device
    Info(TargetArgs),

    /// Print the raw descriptor (get_sysinfo)
    Sysinfo(TargetArgs),

    /// Read, set, or toggle power
    Power(PowerArgs),

    /// Rename a device or outlet
    Alias(AliasArgs),

    /// Reboot a device
    Reboot(DelayArgs),

    /// Factory-reset a device
    Reset(DelayArgs),

    /// Read or change a bulb's light state
    Light(LightArgs),

    /// Manage the config file and named devices
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared device addressing ─────────────────────────────────────────

/// Which device a command talks to.
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// Device name from the config file, host, or host:port
    pub target: String,

    /// Device port (overrides host:port and the config file)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Outlet of a multi-outlet device, short ("1") or full id
    #[arg(long, short = 'c')]
    pub child: Option<String>,
}

// ── Search ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// How long to listen for replies, in milliseconds
    #[arg(long, short = 'd', default_value = "3000")]
    pub duration: u64,

    /// Probe interval in milliseconds (defaults to the config file's)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Broadcast address to probe
    #[arg(long, short = 'b')]
    pub broadcast: Option<std::net::Ipv4Addr>,

    /// Device port to probe
    #[arg(long)]
    pub port: Option<u16>,

    /// Only show these kinds (plug, bulb, device)
    #[arg(long = "type", value_delimiter = ',')]
    pub types: Vec<String>,

    /// Only show devices whose MAC matches one of these globs
    #[arg(long = "mac", value_delimiter = ',')]
    pub macs: Vec<String>,

    /// Hide devices whose MAC matches one of these globs
    #[arg(long = "exclude-mac", value_delimiter = ',')]
    pub exclude_macs: Vec<String>,

    /// Also probe these hosts directly (host or host:port)
    #[arg(long = "target", value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Report multi-outlet devices as one entry instead of one per outlet
    #[arg(long)]
    pub no_children: bool,

    /// Stream discovery events until interrupted instead of printing a list
    #[arg(long, short = 'w')]
    pub watch: bool,
}

// ── Raw and structured sends ─────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SendArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Payload text, sent verbatim
    pub payload: String,
}

#[derive(Debug, Args)]
pub struct CommandArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Command envelope, e.g. '{"system":{"get_sysinfo":{}}}'
    pub command: String,

    /// Scope the command to these outlets (repeatable)
    #[arg(long = "child-id", value_delimiter = ',')]
    pub child_ids: Vec<String>,
}

// ── Power ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PowerArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Desired state; omit to print the current one
    pub state: Option<PowerAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerAction {
    On,
    Off,
    Toggle,
}

// ── Alias / reboot / reset ───────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AliasArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// New alias
    pub alias: String,
}

#[derive(Debug, Args)]
pub struct DelayArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Seconds before the device acts
    #[arg(long, default_value = "1")]
    pub delay: u32,
}

// ── Light ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LightArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Switch the light on
    #[arg(long, conflicts_with = "off")]
    pub on: bool,

    /// Switch the light off
    #[arg(long)]
    pub off: bool,

    /// Brightness, 0-100
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub brightness: Option<u8>,

    /// Hue, 0-360
    #[arg(long, value_parser = clap::value_parser!(u16).range(0..=360))]
    pub hue: Option<u16>,

    /// Saturation, 0-100
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub saturation: Option<u8>,

    /// Color temperature in kelvin (0 switches back to hue mode)
    #[arg(long)]
    pub color_temp: Option<u16>,

    /// Transition period in milliseconds
    #[arg(long)]
    pub transition: Option<u32>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Add or replace a named device
    AddDevice {
        /// Name to address the device by
        name: String,

        /// Host or IP address
        host: String,

        #[arg(long, short = 'p')]
        port: Option<u16>,

        /// Outlet of a multi-outlet device
        #[arg(long, short = 'c')]
        child: Option<String>,

        /// Transport for this device: tcp or udp
        #[arg(long)]
        transport: Option<String>,
    },

    /// Remove a named device
    RemoveDevice {
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }
}
