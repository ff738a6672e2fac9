use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "laborcast", version, about = "Laborcast delivery-time predictor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the delivery time from recorded contractions
    Predict(commands::predict::PredictArgs),
    /// Print the funnel analysis (envelope, fits, projection) as JSON
    Funnel(commands::funnel::FunnelArgs),
    /// Generate a synthetic accelerating session
    Demo(commands::demo::DemoArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr, filtered by LABORCAST_LOG (default "warn").
fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("LABORCAST_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init()
        .ok();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Predict(args) => commands::predict::run(args),
        Commands::Funnel(args) => commands::funnel::run(args),
        Commands::Demo(args) => commands::demo::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
