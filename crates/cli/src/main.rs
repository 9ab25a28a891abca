use clap::{Parser, Subcommand};

mod commands;

use commands::{CollectArgs, DataStatusArgs, UploadArgs};

#[derive(Parser)]
#[command(name = "extended-stats")]
#[command(about = "Collects Extended exchange statistics into CSV tables", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = "config/Config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every stream once and merge the results into the output tables
    Collect(CollectArgs),
    /// Upload the collected tables to the warehouse
    Upload(UploadArgs),
    /// Report row counts and date ranges of the collected tables
    DataStatus(DataStatusArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Collect(args) => commands::run_collect(&cli.config, args).await,
        Commands::Upload(args) => commands::run_upload(&cli.config, args).await,
        Commands::DataStatus(args) => commands::run_data_status(&cli.config, args),
    }
}
