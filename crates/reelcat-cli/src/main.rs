mod output;
mod pipeline;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "reelcat-cli")]
#[command(about = "Movie catalog listing and detail scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl the listing pages and write deduplicated `title,url` rows
    List,
    /// Extract metadata for every entry in the raw listing file
    Details {
        /// Only process the first N entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run `list` then `details` in one process
    Run {
        /// Only process the first N entries in the details pass
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = reelcat_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::debug!(env = %config.env, command = ?cli.command, "starting");

    match cli.command {
        Commands::List => {
            pipeline::run_list(&config).await?;
        }
        Commands::Details { limit } => pipeline::run_details(&config, limit).await?,
        Commands::Run { limit } => {
            pipeline::run_list(&config).await?;
            pipeline::run_details(&config, limit).await?;
        }
    }

    Ok(())
}
