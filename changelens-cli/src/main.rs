use changelens_core::{ConfigError, LensError};
use clap::Parser;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "changelens",
    version,
    about = "Turn code changes into structured commit narratives"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Map an error onto a process exit code.
///
///   0: success
///   1: general/unknown error
///   2: configuration error
///   3: empty change set / input not found
///   4: I/O error
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(lens) = err.chain().find_map(|e| e.downcast_ref::<LensError>()) {
        return match lens {
            LensError::Config(_) => 2,
            LensError::EmptyChangeSet => 3,
            LensError::Io(_) => 4,
        };
    }
    if err.chain().any(|e| e.is::<ConfigError>()) {
        return 2;
    }
    if err.chain().any(|e| e.is::<std::io::Error>()) {
        return 4;
    }

    let lower = format!("{err:#}").to_lowercase();
    if lower.contains("input not found") {
        3
    } else if lower.contains("config") {
        2
    } else {
        1
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match commands::run(cli.command) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}
