#![deny(clippy::all, clippy::pedantic)]

use piazza_client::client::PiazzaClient;

use crate::context::CliError;
use crate::print::print_json;

pub async fn handle(client: &PiazzaClient, page: u32) -> Result<(), CliError> {
    let feed = client.feed(page).await?;
    print_json(&feed)
}
