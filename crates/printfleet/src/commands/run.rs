//! `printfleet run <adapter>`: one enrichment pass over the inventory.

use printfleet_config::{Config, load_config};
use printfleet_core::{InventoryStore, Orchestrator, RunRequest, parse_adapter};
use tracing::debug;

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let adapter = parse_adapter(&args.adapter)?;

    let mut config = load_config(global.config.as_deref())?;
    apply_overrides(&mut config, &args, global);
    let engine = config.to_engine_config()?;
    debug!(
        %adapter,
        inventory = %engine.inventory.display(),
        timeout_secs = engine.timeout.as_secs(),
        concurrency = engine.concurrency,
        "starting run"
    );

    let mut request = RunRequest::new(adapter);
    if let Some(address) = args.only_ip {
        request = request.only_address(address);
    }

    let store = InventoryStore::new(&engine.inventory);
    let summary = Orchestrator::from_config(&engine)
        .run(&store, &request)
        .await?;

    let rendered = output::render_summary(
        &global.output,
        &summary,
        args.failures,
        output::should_color(&global.color),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

/// Flags win over the config file and environment.
fn apply_overrides(config: &mut Config, args: &RunArgs, global: &GlobalOpts) {
    if let Some(path) = &global.inventory {
        config.inventory = Some(path.clone());
    }
    if let Some(path) = &args.catalog {
        config.catalog = Some(path.clone());
    }
    if let Some(secs) = args.timeout {
        config.timeout_secs = secs;
    }
    if let Some(n) = args.concurrency {
        config.concurrency = n;
    }
    if let Some(community) = &args.community {
        config.snmp.community.clone_from(community);
        config.snmp.community_env = None;
    }
    if args.insecure {
        config.http.verify_tls = false;
    }
    if args.verify_tls {
        config.http.verify_tls = true;
    }
}
