//! File extension helpers for downloaded attachments.
//!
//! Extensions are returned with their leading dot (`".jpg"`).

use std::path::Path;

/// Generic extension for attachments whose type cannot be determined.
pub const BINARY_EXTENSION: &str = ".bin";

/// Extension for a declared MIME type, if it is one we recognise.
///
/// Parameters such as `; codecs=opus` are ignored.
pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    let ext = match essence.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/png" => ".png",
        "image/webp" => ".webp",
        "image/gif" => ".gif",
        "video/mp4" => ".mp4",
        "video/3gpp" => ".3gp",
        "video/quicktime" => ".mov",
        "audio/ogg" | "audio/opus" => ".ogg",
        "audio/mpeg" | "audio/mp3" => ".mp3",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => ".m4a",
        "audio/aac" => ".aac",
        "audio/wav" | "audio/x-wav" => ".wav",
        "application/pdf" => ".pdf",
        _ => return None,
    };
    Some(ext)
}

/// Extension to save an attachment under: the MIME-derived one when known,
/// otherwise `fallback`.
pub fn extension_or(mime_type: Option<&str>, fallback: &str) -> String {
    mime_type
        .and_then(extension_for_mime)
        .unwrap_or(fallback)
        .to_string()
}

/// Extension taken from a declared file name, falling back to
/// [`BINARY_EXTENSION`] when the name is absent, empty, or has none.
pub fn extension_from_filename(file_name: Option<&str>) -> String {
    file_name
        .filter(|name| !name.is_empty())
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| BINARY_EXTENSION.to_string())
}
