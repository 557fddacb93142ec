use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use portfolio_scraper::config::{load_env_file, Config, Credentials, Strategy};
use portfolio_scraper::pipeline;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Log into the Scalable Capital portal and print the portfolio
#[derive(Parser, Debug)]
#[command(name = "portfolio_scraper", version, about, long_about = None)]
struct Cli {
    /// Session strategy; overrides the config file
    #[arg(short, long, value_enum)]
    strategy: Option<Strategy>,

    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// log4rs configuration file path
    #[arg(long, default_value = "log4rs.yml")]
    log_config: PathBuf,
}

fn init_logging(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        return log4rs::init_file(path, Default::default()).map_err(|e| e.into());
    }

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l:<5})} {t} - {m}{n}",
        )))
        .build();

    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Info))?;

    log4rs::init_config(config)?;
    Ok(())
}

async fn run(cli: Cli) -> portfolio_scraper::Result<()> {
    let config = Config::load(&cli.config)?;
    let credentials = Credentials::from_env()?;
    let strategy = cli.strategy.unwrap_or(config.strategy);

    pipeline::run(&config, strategy, credentials).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(&cli.log_config) {
        eprintln!("Failed to initialise logging: {}", e);
        return ExitCode::FAILURE;
    }

    // Credentials may come from a .env file
    match load_env_file(Path::new(".env")) {
        Ok(true) => log::info!("Loaded environment from .env"),
        Ok(false) => {}
        Err(e) => log::warn!("{}", e),
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
