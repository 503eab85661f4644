#![deny(clippy::all, clippy::pedantic)]

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use piazza_client::api::ImageUpload;

use crate::context::CliError;

/// Read an image file into an upload part, inferring the MIME type from
/// the file extension.
pub fn read_image(path: &Path) -> Result<ImageUpload, CliError> {
    let bytes = fs::read(path).map_err(|source| CliError::InputFile {
        path: path.display().to_string(),
        source,
    })?;
    let filename = path
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or("upload.bin")
        .to_string();
    Ok(ImageUpload::new(bytes, filename, content_type_for(path)))
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
