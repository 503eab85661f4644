//! Command-line surface for `piazza-cli`.
//! Kept in a shared file so tests can reuse the same definitions as the
//! binary itself.

#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use piazza_client::config::Overrides;

#[derive(Parser, Debug)]
#[command(name = "piazza-cli", version, about = "Piazza headless sync CLI", long_about = None)]
pub struct Cli {
    /// Extra configuration file layered over the defaults
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Session lifecycle (login/register/logout)
    Auth(AuthArgs),
    /// Read the home feed
    Feed {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Post access and management
    Posts(PostsArgs),
    /// Optimistic interactions (like/save/follow/comment)
    Interact(InteractArgs),
    /// Profile access and edits
    Profile(ProfileArgs),
    /// Search users by name or username
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthCmd,
}

#[derive(Subcommand, Debug)]
pub enum AuthCmd {
    /// Sign in and store the bearer token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and store the bearer token
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        password: String,
    },
    /// Clear the stored token
    Logout,
}

#[derive(Parser, Debug)]
pub struct PostsArgs {
    #[command(subcommand)]
    pub action: PostsCmd,
}

#[derive(Subcommand, Debug)]
pub enum PostsCmd {
    /// Get a post by id
    Get { id: i64 },
    /// Create a post from an image file
    Create {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        caption: Option<String>,
    },
    /// Delete a post
    Delete { id: i64 },
    /// List comments on a post
    Comments {
        id: i64,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List users who liked a post
    Likers {
        id: i64,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List the viewer's posts
    Mine {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List posts the viewer liked
    Liked {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List posts the viewer saved
    Saved {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[derive(Parser, Debug)]
pub struct InteractArgs {
    #[command(subcommand)]
    pub action: InteractCmd,
}

#[derive(Subcommand, Debug)]
pub enum InteractCmd {
    /// Like a post
    Like { post_id: i64 },
    /// Remove a like
    Unlike { post_id: i64 },
    /// Save a post
    Save { post_id: i64 },
    /// Remove a save
    Unsave { post_id: i64 },
    /// Follow a user
    Follow { username: String },
    /// Unfollow a user
    Unfollow { username: String },
    /// Comment on a post
    Comment {
        post_id: i64,
        #[arg(long)]
        text: String,
    },
    /// Delete a comment
    Uncomment { post_id: i64, comment_id: i64 },
}

#[derive(Parser, Debug)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub action: ProfileCmd,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCmd {
    /// Show the viewer's profile
    Me,
    /// Show a user's profile
    Show { username: String },
    /// List a user's posts
    Posts {
        username: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List posts a user liked
    Likes {
        username: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List a user's followers
    Followers {
        username: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List who a user follows
    Following {
        username: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List the viewer's followers
    MyFollowers {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List who the viewer follows
    MyFollowing {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Update name and bio (only provided fields)
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },
    /// Replace the avatar from an image file
    Avatar { file: PathBuf },
}
