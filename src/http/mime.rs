//! MIME type detection module
//!
//! Maps a stored file's extension to the Content-Type sent with GET and HEAD.

use crate::store::StorePath;

/// Content-Type for a path inside a store
///
/// # Examples
/// ```
/// use fsgate::http::mime::content_type_for;
/// use fsgate::store::StorePath;
/// let path = StorePath::parse("docs/README.MD").unwrap();
/// assert_eq!(content_type_for(&path), "text/plain; charset=utf-8");
/// ```
pub fn content_type_for(path: &StorePath) -> &'static str {
    match path.extension() {
        Some(ext) => get_content_type(Some(&ext.to_ascii_lowercase())),
        None => get_content_type(None),
    }
}

/// Get MIME Content-Type based on a lowercase file extension
///
/// # Examples
/// ```
/// use fsgate::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("html")), "text/html; charset=utf-8");
/// assert_eq!(get_content_type(None), "application/octet-stream");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        // Text
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("txt" | "md" | "log") => "text/plain; charset=utf-8",
        Some("csv") => "text/csv",
        Some("xml") => "application/xml",

        Some("js" | "mjs") => "application/javascript",
        Some("json") => "application/json",

        // Images
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",

        // Media
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",

        // Archives and documents
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz" | "gzip") => "application/gzip",
        Some("tar") => "application/x-tar",

        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(get_content_type(Some("html")), "text/html; charset=utf-8");
        assert_eq!(get_content_type(Some("json")), "application/json");
        assert_eq!(get_content_type(Some("png")), "image/png");
        assert_eq!(get_content_type(Some("gz")), "application/gzip");
    }

    #[test]
    fn test_path_lookup() {
        let path = StorePath::parse("a/b/photo.JPG").unwrap();
        assert_eq!(content_type_for(&path), "image/jpeg");

        let path = StorePath::parse("a.txt").unwrap();
        assert_eq!(content_type_for(&path), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(get_content_type(Some("xyz")), "application/octet-stream");
        let dotfile = StorePath::parse(".profile").unwrap();
        assert_eq!(content_type_for(&dotfile), "application/octet-stream");
        let bare = StorePath::parse("Makefile").unwrap();
        assert_eq!(content_type_for(&bare), "application/octet-stream");
    }
}
