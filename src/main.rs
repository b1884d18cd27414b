use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tributary::app::AppContext;
use tributary::cli::{commands, Cli, Commands};
use tributary::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; RUST_LOG overrides the info default
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(&config, cli.db)?;

    match cli.command {
        Commands::Add { name, url } => {
            commands::add_feed(&ctx, &name, &url)?;
        }
        Commands::Remove { url } => {
            commands::remove_feed(&ctx, &url)?;
        }
        Commands::Feeds => {
            commands::list_feeds(&ctx)?;
        }
        Commands::Posts { limit } => {
            commands::list_posts(&ctx, limit)?;
        }
        Commands::Poll { interval } => {
            commands::poll(&ctx, &interval).await?;
        }
        Commands::Reset => {
            commands::reset(&ctx)?;
        }
    }

    Ok(())
}
