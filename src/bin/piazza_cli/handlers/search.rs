#![deny(clippy::all, clippy::pedantic)]

use piazza_client::client::PiazzaClient;

use crate::context::CliError;
use crate::print::print_json;

pub async fn handle(client: &PiazzaClient, query: &str, page: u32) -> Result<(), CliError> {
    let results = client.search_users(query, page).await?;
    print_json(&results)
}
