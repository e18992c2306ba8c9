use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use careline_core::config::Config;
use careline_gateway::{AppState, start_clinic, start_therapy};

#[derive(Parser)]
#[command(
    name = "careline",
    about = "Emotion-aware therapy and clinic services backed by hosted AI models",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Service {
    Therapy,
    Clinic,
    All,
}

#[derive(Subcommand)]
enum Commands {
    /// Start one or both services
    Serve {
        /// Which service to run
        #[arg(long, value_enum, default_value = "all")]
        service: Service,

        /// Override the service port (ignored for `all`)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show system status
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Show the config file path
    Path,
}

fn init_logging(config: &Config, verbose: bool) {
    let logging = config.logging.clone().unwrap_or_default();
    let level = if verbose {
        "debug".to_string()
    } else {
        logging.level.unwrap_or_else(|| "info".to_string())
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::config_path);

    let config = Config::load(&config_path)?;

    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Serve { service, port } => {
            let state = Arc::new(AppState::from_config(Arc::new(config)));

            match service {
                Service::Therapy => {
                    let port = port.unwrap_or_else(|| state.config.therapy_port());
                    tracing::info!("Starting therapy service on port {port}");
                    start_therapy(state, port).await?;
                }
                Service::Clinic => {
                    let port = port.unwrap_or_else(|| state.config.clinic_port());
                    tracing::info!("Starting clinic service on port {port}");
                    start_clinic(state, port).await?;
                }
                Service::All => {
                    let therapy_port = state.config.therapy_port();
                    let clinic_port = state.config.clinic_port();
                    tracing::info!(
                        "Starting therapy service on port {therapy_port} and clinic service on port {clinic_port}"
                    );
                    let therapy_state = state.clone();
                    let therapy =
                        tokio::spawn(async move { start_therapy(therapy_state, therapy_port).await });
                    let clinic =
                        tokio::spawn(async move { start_clinic(state, clinic_port).await });
                    therapy.await??;
                    clinic.await??;
                }
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
            ConfigAction::Path => {
                println!("{}", config_path.display());
            }
        },
        Commands::Status => {
            println!("Careline v{}", env!("CARGO_PKG_VERSION"));
            println!("Config: {}", config_path.display());
            println!("Therapy port: {}", config.therapy_port());
            println!("Clinic port: {}", config.clinic_port());
            println!(
                "Groq API key: {}",
                if config
                    .groq
                    .as_ref()
                    .and_then(|g| g.resolve_api_key())
                    .is_some()
                {
                    "configured"
                } else {
                    "missing"
                }
            );
        }
    }

    Ok(())
}
