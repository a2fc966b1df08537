use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "focusroom-cli", version, about = "Focusroom CLI")]
struct Cli {
    /// Log timer transitions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive timer session
    Run(commands::run::RunArgs),
    /// List techniques and their durations
    Techniques {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Techniques { json } => commands::techniques::run(json),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
