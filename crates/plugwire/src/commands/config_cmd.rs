//! Config command handlers. These never touch the network.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, DeviceEntry};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, mut cfg: Config, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::active_path(global);

    match args.command {
        ConfigCommand::Show => {
            let format = config::output_format(&cfg, global);
            let out = match format {
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)
                    .map_err(|e| CliError::config(e.into(), &path))?,
                format => output::render_single(format, &cfg, output::render_json_pretty, |_| {
                    path.display().to_string()
                }),
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::AddDevice {
            name,
            host,
            port,
            child,
            transport,
        } => {
            if name.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "name".into(),
                    reason: "must not be empty".into(),
                });
            }
            let entry = DeviceEntry {
                port,
                child_id: child,
                transport,
                ..DeviceEntry::new(host)
            };
            cfg.devices.insert(name.clone(), entry);
            cfg.device(&name).map_err(|e| CliError::config(e, &path))?;

            config::save_config_to(&cfg, &path).map_err(|e| CliError::config(e, &path))?;
            if !global.quiet {
                eprintln!("Saved device '{name}' to {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::RemoveDevice { name } => {
            if cfg.devices.remove(&name).is_none() {
                return Err(CliError::NotFound {
                    resource_type: "device".into(),
                    identifier: name,
                    list_command: "config show".into(),
                });
            }
            config::save_config_to(&cfg, &path).map_err(|e| CliError::config(e, &path))?;
            if !global.quiet {
                eprintln!("Removed device '{name}'");
            }
            Ok(())
        }
    }
}
