//! piazza-cli: headless automation client for the piazza sync engine.
//! Exercises the library end to end: auth, feed, posts, interactions,
//! profile, and search, printing JSON for scripting.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod context;
mod handlers;
mod io;
mod print;

#[cfg(test)]
mod tests;

use clap::Parser;

use args::{Cli, Commands};
use context::{CliError, build_client};
use handlers::{auth, feed, interact, posts, profile, search};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = piazza_client::config::load(cli.config_file.as_deref(), &cli.overrides)?;
    piazza_client::infra::telemetry::init(&settings.logging)?;
    let client = build_client(&settings)?;

    match cli.command {
        Commands::Auth(cmd) => auth::handle(&client, cmd.action).await?,
        Commands::Feed { page } => feed::handle(&client, page).await?,
        Commands::Posts(cmd) => posts::handle(&client, cmd.action).await?,
        Commands::Interact(cmd) => interact::handle(&client, cmd.action).await?,
        Commands::Profile(cmd) => profile::handle(&client, cmd.action).await?,
        Commands::Search { query, page } => search::handle(&client, &query, page).await?,
    }

    Ok(())
}
