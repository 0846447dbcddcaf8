mod cli;

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::{EnvFilter, prelude::*};
use yatube_api::Config;
use yatube_service::Mutation;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // Loads `.env`, which may set RUST_LOG.
    let config = Config::from_env()?;
    init_tracing(cli.verbose);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => yatube_api::serve(config).await,
        Command::CreateGroup {
            title,
            slug,
            description,
        } => {
            let conn = yatube_api::connect(&config).await?;
            let group = Mutation::create_group(&conn, &title, &slug, &description).await?;
            tracing::info!(id = group.id, "group available at /group/{}/", group.slug);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
