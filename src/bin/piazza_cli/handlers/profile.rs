#![deny(clippy::all, clippy::pedantic)]

use piazza_client::client::PiazzaClient;
use piazza_client::domain::ProfileUpdate;

use crate::args::ProfileCmd;
use crate::context::CliError;
use crate::io::read_image;
use crate::print::print_json;

pub async fn handle(client: &PiazzaClient, cmd: ProfileCmd) -> Result<(), CliError> {
    match cmd {
        ProfileCmd::Me => {
            let me = client.me().await?;
            print_json(&me)
        }
        ProfileCmd::Show { username } => {
            let profile = client.profile(&username).await?;
            print_json(&profile)
        }
        ProfileCmd::Posts { username, page } => {
            let posts = client.user_posts(&username, page).await?;
            print_json(&posts)
        }
        ProfileCmd::Likes { username, page } => {
            let posts = client.user_likes(&username, page).await?;
            print_json(&posts)
        }
        ProfileCmd::Followers { username, page } => {
            let users = client.user_followers(&username, page).await?;
            print_json(&users)
        }
        ProfileCmd::Following { username, page } => {
            let users = client.user_following(&username, page).await?;
            print_json(&users)
        }
        ProfileCmd::MyFollowers { page } => {
            let users = client.my_followers(page).await?;
            print_json(&users)
        }
        ProfileCmd::MyFollowing { page } => {
            let users = client.my_following(page).await?;
            print_json(&users)
        }
        ProfileCmd::Update { name, bio } => {
            let update = ProfileUpdate { name, bio };
            let profile = client.update_profile(&update).await?;
            print_json(&profile)
        }
        ProfileCmd::Avatar { file } => {
            let upload = read_image(&file)?;
            let profile = client.update_avatar(upload).await?;
            print_json(&profile)
        }
    }
}
