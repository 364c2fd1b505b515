use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use broadsheet::app::AppContext;
use broadsheet::cli::{commands, Cli, Commands};
use broadsheet::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config)?;

    let ctx = AppContext::new(&config)?;

    match cli.command {
        Commands::Refresh => {
            commands::refresh(&ctx).await?;
        }
        Commands::List => {
            commands::list_articles(&ctx)?;
        }
        Commands::Show { id } => {
            commands::show_article(&ctx, &id)?;
        }
        Commands::Status => {
            commands::status(&ctx)?;
        }
        Commands::Watch {
            no_initial_refresh, ..
        } => {
            commands::watch(&ctx, config.watch_interval()?, !no_initial_refresh).await?;
        }
    }

    Ok(())
}
