#![deny(clippy::all, clippy::pedantic)]

use std::io::Write;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use httpmock::prelude::*;
use serde_json::json;
use tempfile::NamedTempFile;

use piazza_client::client::PiazzaClient;
use piazza_client::config::{
    ApiSettings, CacheSettings, CredentialSettings, LogFormat, LoggingSettings, Settings,
};
use piazza_client::infra::credentials::MemoryCredentialStore;

use crate::args::{Cli, Commands, InteractCmd, PostsCmd};
use crate::context::CliError;
use crate::handlers::{feed, interact, posts};
use crate::io::read_image;

fn settings_for(server: &MockServer) -> Settings {
    Settings {
        api: ApiSettings {
            base_url: reqwest::Url::parse(&server.base_url()).expect("mock server URL"),
            timeout: Duration::from_secs(5),
            page_limit: NonZeroU32::new(20).expect("nonzero"),
            comment_page_limit: NonZeroU32::new(10).expect("nonzero"),
        },
        credentials: CredentialSettings { token_path: None },
        cache: CacheSettings {
            post_limit: 64,
            profile_limit: 64,
            post_page_limit: 16,
            comment_page_limit: 16,
            user_page_limit: 16,
            search_freshness_secs: 30,
        },
        logging: LoggingSettings {
            level: tracing::level_filters::LevelFilter::INFO,
            format: LogFormat::Compact,
        },
    }
}

fn client_for(server: &MockServer) -> PiazzaClient {
    let store = Arc::new(MemoryCredentialStore::with_token("sesame"));
    PiazzaClient::with_store(&settings_for(server), store).expect("client")
}

fn post_json(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "imageUrl": format!("/img/{id}.jpg"),
        "createdAt": "2026-05-01T10:00:00Z",
        "author": {"id": 1, "username": "ada", "name": "Ada"},
        "likesCount": 2,
        "commentsCount": 0,
        "isLiked": false,
        "isSaved": false
    })
}

#[test]
fn cli_parses_search_with_page() {
    let cli = Cli::try_parse_from(["piazza-cli", "search", "ada", "--page", "2"])
        .expect("parse search");
    match cli.command {
        Commands::Search { query, page } => {
            assert_eq!(query, "ada");
            assert_eq!(page, 2);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_parses_interact_comment() {
    let cli = Cli::try_parse_from([
        "piazza-cli",
        "interact",
        "comment",
        "11",
        "--text",
        "nice shot",
    ])
    .expect("parse comment");
    match cli.command {
        Commands::Interact(cmd) => match cmd.action {
            InteractCmd::Comment { post_id, text } => {
                assert_eq!(post_id, 11);
                assert_eq!(text, "nice shot");
            }
            other => panic!("unexpected action: {other:?}"),
        },
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_accepts_api_base_override() {
    let cli = Cli::try_parse_from([
        "piazza-cli",
        "--api-base",
        "https://piazza.example",
        "feed",
    ])
    .expect("parse feed");
    assert_eq!(
        cli.overrides.api_base.as_deref(),
        Some("https://piazza.example")
    );
}

#[test]
fn read_image_infers_content_type_from_extension() -> Result<(), CliError> {
    let mut file = NamedTempFile::with_suffix(".png").expect("tmp file");
    file.write_all(&[0x89, 0x50, 0x4E, 0x47]).expect("write tmp");

    let upload = read_image(file.path())?;
    assert_eq!(upload.content_type, "image/png");
    Ok(())
}

#[test]
fn read_image_falls_back_to_octet_stream() -> Result<(), CliError> {
    let mut file = NamedTempFile::with_suffix(".dat").expect("tmp file");
    file.write_all(b"not an image").expect("write tmp");

    let upload = read_image(file.path())?;
    assert_eq!(upload.content_type, "application/octet-stream");
    Ok(())
}

#[test]
fn read_image_reports_missing_file() {
    let err = read_image(std::path::Path::new("/nonexistent/image.jpg"))
        .expect_err("missing file should fail");
    assert!(matches!(err, CliError::InputFile { .. }));
}

#[tokio::test]
async fn feed_handler_fetches_requested_page() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/feed").query_param("page", "3");
        then.status(200).json_body(json!({
            "success": true, "message": "ok",
            "data": {
                "items": [post_json(31)],
                "pagination": {"page": 3, "limit": 20, "total": 41, "totalPages": 3}
            }
        }));
    });

    let client = client_for(&server);
    feed::handle(&client, 3).await.expect("feed handler");
    mock.assert_hits(1);
}

#[tokio::test]
async fn posts_get_prints_normalized_post() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/posts/11");
        then.status(200)
            .json_body(json!({"success": true, "message": "ok", "data": post_json(11)}));
    });

    let client = client_for(&server);
    posts::handle(&client, PostsCmd::Get { id: 11 })
        .await
        .expect("posts get");
}

#[tokio::test]
async fn rejected_like_surfaces_as_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/posts/11");
        then.status(200)
            .json_body(json!({"success": true, "message": "ok", "data": post_json(11)}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/posts/11/like");
        then.status(500)
            .json_body(json!({"success": false, "message": "nope"}));
    });

    let client = client_for(&server);
    let err = interact::handle(&client, InteractCmd::Like { post_id: 11 })
        .await
        .expect_err("rejected like should fail");
    assert!(matches!(err, CliError::Api(_)));
}
