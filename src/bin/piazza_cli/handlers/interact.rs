#![deny(clippy::all, clippy::pedantic)]

use piazza_client::client::PiazzaClient;
use piazza_client::mutation::{Mutation, MutationOutcome};

use crate::args::InteractCmd;
use crate::context::CliError;
use crate::print::print_json;

pub async fn handle(client: &PiazzaClient, cmd: InteractCmd) -> Result<(), CliError> {
    match cmd {
        InteractCmd::Like { post_id } => {
            run(client, Mutation::Like { post_id }).await?;
            show_post(client, post_id).await
        }
        InteractCmd::Unlike { post_id } => {
            run(client, Mutation::Unlike { post_id }).await?;
            show_post(client, post_id).await
        }
        InteractCmd::Save { post_id } => {
            run(client, Mutation::Save { post_id }).await?;
            show_post(client, post_id).await
        }
        InteractCmd::Unsave { post_id } => {
            run(client, Mutation::Unsave { post_id }).await?;
            show_post(client, post_id).await
        }
        InteractCmd::Follow { username } => {
            run(
                client,
                Mutation::Follow {
                    username: username.clone(),
                },
            )
            .await?;
            show_profile(client, &username).await
        }
        InteractCmd::Unfollow { username } => {
            run(
                client,
                Mutation::Unfollow {
                    username: username.clone(),
                },
            )
            .await?;
            show_profile(client, &username).await
        }
        InteractCmd::Comment { post_id, text } => {
            run(client, Mutation::AddComment { post_id, text }).await?;
            show_post(client, post_id).await
        }
        InteractCmd::Uncomment {
            post_id,
            comment_id,
        } => {
            run(
                client,
                Mutation::DeleteComment {
                    post_id,
                    comment_id,
                },
            )
            .await?;
            show_post(client, post_id).await
        }
    }
}

/// Run the mutation and wait for the cache to reconcile, so the entity
/// printed afterwards reflects server truth.
async fn run(client: &PiazzaClient, mutation: Mutation) -> Result<(), CliError> {
    let receipt = client.invoke(mutation).await;
    match receipt.settled().await {
        MutationOutcome::Committed => Ok(()),
        MutationOutcome::RolledBack(err) => Err(CliError::Api(err)),
    }
}

async fn show_post(client: &PiazzaClient, post_id: i64) -> Result<(), CliError> {
    let post = client.post(post_id).await?;
    print_json(&post)
}

async fn show_profile(client: &PiazzaClient, username: &str) -> Result<(), CliError> {
    let profile = client.profile(username).await?;
    print_json(&profile)
}
