#![deny(clippy::all, clippy::pedantic)]

pub mod auth;
pub mod feed;
pub mod interact;
pub mod posts;
pub mod profile;
pub mod search;
