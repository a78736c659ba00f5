use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quotamon_core::config::Settings;
use quotamon_core::monitor::{Event, Monitor};

mod presenter;
mod status;

/// Version stamped into release builds. Unreleased builds identify as
/// "dev" and never self-update.
const VERSION: &str = match option_env!("QUOTAMON_VERSION") {
    Some(version) => version,
    None => "dev",
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version = VERSION, about = "Claude Code usage monitor")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Command>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Show current usage (default)
    Status {
        /// Output JSON
        #[arg(long)]
        json: bool,

        /// Plain text, no color codes
        #[arg(long)]
        plain: bool,
    },
    /// Run the background monitor until interrupted
    Monitor,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.debug);

    let command = cli.command.clone().unwrap_or(Command::Status {
        json: false,
        plain: false,
    });

    let code = match command {
        Command::Status { json, plain } => status::run(json, plain),
        Command::Monitor => run_monitor(&cli).await,
    };
    std::process::exit(code);
}

async fn run_monitor(cli: &Cli) -> i32 {
    let mut settings = match Settings::load(cli.config.as_ref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("quotamon: {e:#}");
            return 1;
        }
    };
    settings.validate();

    let monitor = Monitor::new(
        settings,
        VERSION,
        Box::new(presenter::TerminalPresenter::new()),
    );
    let handle = monitor.handle();

    // Ctrl-C maps to the quit event; the loop finishes its current work
    // before exiting.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = handle.send(Event::Quit).await;
        }
    });

    monitor.run().await;
    0
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("quotamon=debug,quotamon_core=debug")
    } else {
        EnvFilter::new("quotamon=info,quotamon_core=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
