#![deny(clippy::all, clippy::pedantic)]

use piazza_client::client::PiazzaClient;

use crate::args::PostsCmd;
use crate::context::CliError;
use crate::io::read_image;
use crate::print::print_json;

pub async fn handle(client: &PiazzaClient, cmd: PostsCmd) -> Result<(), CliError> {
    match cmd {
        PostsCmd::Get { id } => {
            let post = client.post(id).await?;
            print_json(&post)
        }
        PostsCmd::Create { image, caption } => {
            let upload = read_image(&image)?;
            let post = client.create_post(upload, caption.as_deref()).await?;
            print_json(&post)
        }
        PostsCmd::Delete { id } => {
            client.delete_post(id).await?;
            Ok(())
        }
        PostsCmd::Comments { id, page } => {
            let comments = client.comments(id, page).await?;
            print_json(&comments)
        }
        PostsCmd::Likers { id, page } => {
            let likers = client.post_likers(id, page).await?;
            print_json(&likers)
        }
        PostsCmd::Mine { page } => {
            let posts = client.my_posts(page).await?;
            print_json(&posts)
        }
        PostsCmd::Liked { page } => {
            let posts = client.my_likes(page).await?;
            print_json(&posts)
        }
        PostsCmd::Saved { page } => {
            let posts = client.my_saved(page).await?;
            print_json(&posts)
        }
    }
}
