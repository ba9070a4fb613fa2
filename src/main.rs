use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jokebox::config::Config;
use jokebox::engine::RotationEngine;
use jokebox::error::{Error, JokeboxErrorTrait, Result};
use jokebox::parser::{segment, Segment};
use jokebox::source::HttpJokeSource;
use jokebox::storage::FileStore;
use jokebox::Delivery;

#[derive(Parser)]
#[command(
    name = "jokebox",
    version,
    about = "Show a random joke you have not seen yet",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the next unseen joke
    Next {
        /// Print the delivery as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Show rotation progress
    Status,

    /// Forget which jokes have been seen
    Reset,

    /// Refetch the joke list, ignoring the cache
    Refresh,

    /// Show how a piece of text would be segmented
    Segment {
        /// Joke text
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return ExitCode::from(e.category().exit_code() as u8);
        }
    };

    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&format, &config.logging.level, cli.verbose);

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, category = e.category().as_str(), "Command failed");
            eprintln!("{}", e.user_message());
            if e.is_recoverable() {
                eprintln!("This may be temporary; try again in a moment.");
            }
            ExitCode::from(e.category().exit_code() as u8)
        }
    }
}

fn setup_tracing(format: &str, level: &str, verbose: bool) {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("jokebox=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("jokebox={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn build_engine(config: &Config) -> Result<RotationEngine<HttpJokeSource, FileStore>> {
    let source = HttpJokeSource::with_config(&config.source)?;
    let store = FileStore::new(&config.storage.dir)?;
    Ok(RotationEngine::from_config(config, source, store))
}

async fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Next { json } => {
            let mut engine = build_engine(config)?;
            engine.init().await?;
            let delivery = engine
                .get_next()
                .ok_or_else(|| Error::other("No jokes are available"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&delivery)?);
            } else {
                print_delivery(&delivery);
            }
        }

        Commands::Status => {
            let mut engine = build_engine(config)?;
            engine.init().await?;
            let progress = engine.progress();
            println!("State:    {}", engine.state());
            println!("Jokes:    {}", progress.total);
            println!("Seen:     {}", progress.seen);
            println!("Rotation: {progress}");
            if progress.is_complete() {
                println!("Every joke has been seen; the next one starts a new rotation");
            }
        }

        Commands::Reset => {
            let mut engine = build_engine(config)?;
            engine.init().await?;
            engine.reset_seen();
            println!("Seen jokes cleared ({} jokes available)", engine.jokes().len());
        }

        Commands::Refresh => {
            let mut engine = build_engine(config)?;
            engine.refresh().await?;
            println!("Fetched {} jokes", engine.jokes().len());
        }

        Commands::Segment { text } => print_segment(&segment(&text)),
    }

    Ok(())
}

fn print_delivery(delivery: &Delivery) {
    match (&delivery.setup, &delivery.punchline, &delivery.text) {
        (Some(setup), Some(punchline), _) => {
            println!("{setup}");
            println!();
            println!("    {punchline}");
        }
        (_, _, Some(text)) => println!("{text}"),
        _ => {}
    }
    println!();
    println!("[{}]", delivery.progress);
}

fn print_segment(seg: &Segment) {
    match seg {
        Segment::SingleBlock { text } => println!("single block: {text}"),
        Segment::TwoPart { setup, punchline } => {
            println!("setup:     {setup}");
            println!("punchline: {punchline}");
        }
    }
}
