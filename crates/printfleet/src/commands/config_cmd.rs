//! Config subcommand handlers.

use printfleet_config::{config_path, load_config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let mut config = load_config(global.config.as_deref())?;
            if let Some(path) = &global.inventory {
                config.inventory = Some(path.clone());
            }
            let shown = config.redacted();
            let rendered = match global.output {
                OutputFormat::Table => shown.to_toml()?,
                _ => output::render_value(&global.output, &shown)?,
            };
            output::print_output(&rendered, global.quiet);
        }
        ConfigCommand::Path => {
            let path = global.config.clone().unwrap_or_else(config_path);
            output::print_output(&path.display().to_string(), global.quiet);
        }
    }
    Ok(())
}
