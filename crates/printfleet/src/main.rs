mod cli;
mod commands;
mod error;
mod output;

use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Held until exit so the file writer flushes.
    let guard = init_tracing(&cli.global);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        drop(guard);
        std::process::exit(code);
    }
}

/// Console logging on stderr at a level picked by `-v`/`-q` (`RUST_LOG`
/// wins), plus a per-run file when `--log-dir` is given.
fn init_tracing(global: &GlobalOpts) -> Option<WorkerGuard> {
    let level = if global.quiet {
        "error"
    } else {
        match global.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let Some(dir) = global.log_dir.as_deref() else {
        tracing_subscriber::registry().with(filter).with(console).init();
        return None;
    };

    let (writer, guard) = tracing_appender::non_blocking(file_appender(dir));
    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .init();
    Some(guard)
}

fn file_appender(dir: &Path) -> tracing_appender::rolling::RollingFileAppender {
    let name = format!("printfleet-{}.log", chrono::Local::now().format("%Y%m%d-%H%M%S"));
    tracing_appender::rolling::never(dir, name)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Run(args) => commands::run::handle(args, &cli.global).await,
        Command::Adapters => commands::adapters::handle(&cli.global),
        Command::Config(args) => commands::config_cmd::handle(&args, &cli.global),
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "printfleet", &mut std::io::stdout());
            Ok(())
        }
    }
}
