use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use kiln::{Context, Sources, pipeline};

/// Front-end asset build orchestrator.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Build target to run, e.g. `build`, `run:dev` or `run:prod`.
    #[clap(default_value = "build")]
    target: String,

    /// List every registered target and exit.
    #[clap(long)]
    list: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let graph = pipeline::default_graph();

    if args.list {
        let mut names: Vec<_> = graph.names().collect();
        names.sort_unstable();
        for name in names {
            println!("{name}");
        }
        return ExitCode::SUCCESS;
    }

    let context = Context::new(Sources::default());
    if let Err(e) = graph.run(&args.target, &context) {
        eprintln!("{} {e}", console::style("error:").red().bold());
        return ExitCode::FAILURE;
    }

    // Server and watcher threads keep the process alive until interrupted.
    context.join_background();
    ExitCode::SUCCESS
}
