use clap::Parser;
use tiffin::{
    cli::{commands, Cli, Commands},
    config::Settings,
    pipeline::SearchService,
    Result,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tiffin=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::from_env()?;
    settings.validate()?;

    let service = SearchService::from_settings(settings)?;

    match cli.command {
        Commands::Query {
            text,
            language,
            limit,
            stats,
        } => {
            commands::query(&service, &text, &language, limit, stats).await?;
        }
        Commands::Extract { text, language } => {
            commands::extract(&service, &text, &language).await?;
        }
        Commands::Compile { text } => {
            commands::compile(&service, &text).await?;
        }
        Commands::Resolve { term } => {
            commands::resolve(&service, &term);
        }
    }

    Ok(())
}
