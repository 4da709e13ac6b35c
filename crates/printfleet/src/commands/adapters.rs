//! `printfleet adapters`: the registry and each adapter's target models.

use printfleet_config::load_config;
use printfleet_core::AdapterKind;
use serde::Serialize;
use strum::IntoEnumIterator;
use tabled::Tabled;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct AdapterInfo {
    name: String,
    attribute: String,
    transport: &'static str,
    model_level: bool,
    overridden: bool,
    models: Vec<String>,
}

#[derive(Tabled)]
struct AdapterRow {
    #[tabled(rename = "Adapter")]
    name: String,
    #[tabled(rename = "Attribute")]
    attribute: String,
    #[tabled(rename = "Transport")]
    transport: &'static str,
    #[tabled(rename = "Models")]
    models: String,
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let registry = load_config(global.config.as_deref())?.model_registry()?;

    let adapters: Vec<AdapterInfo> = AdapterKind::iter()
        .map(|kind| AdapterInfo {
            name: kind.to_string(),
            attribute: kind.attribute().to_string(),
            transport: kind.transport(),
            model_level: kind.attribute().is_model_level(),
            overridden: registry.is_overridden(kind),
            models: registry.targets(kind),
        })
        .collect();

    let rendered = match global.output {
        OutputFormat::Table => {
            let rows: Vec<AdapterRow> = adapters
                .iter()
                .map(|a| AdapterRow {
                    name: a.name.clone(),
                    attribute: if a.model_level {
                        format!("{} (per model)", a.attribute)
                    } else {
                        a.attribute.clone()
                    },
                    transport: a.transport,
                    models: a.models.join(", "),
                })
                .collect();
            output::render_table(&rows)
        }
        _ => output::render_value(&global.output, &adapters)?,
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}
