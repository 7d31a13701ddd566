//! MIME type detection for uploaded files.
//!
//! Uploads are labelled by extension first, the way a browser file picker
//! does; files without a recognised extension fall back to magic bytes.

use std::path::Path;

use tracing::debug;

const OCTET_STREAM: &str = "application/octet-stream";

/// Detect MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "png"          => "image/png",
        "gif"          => "image/gif",
        "webp"         => "image/webp",
        "avif"         => "image/avif",
        "heic"         => "image/heic",
        "bmp"          => "image/bmp",
        "tiff" | "tif" => "image/tiff",
        "svg"          => "image/svg+xml",

        "pdf"          => "application/pdf",
        "txt"          => "text/plain",
        "json"         => "application/json",
        "mp4"          => "video/mp4",

        _              => OCTET_STREAM,
    }
}

/// Identify common raster formats from their leading bytes.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'B', b'M', ..] => Some("image/bmp"),
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some("image/tiff"),
        _ => None,
    }
}

/// MIME type for an uploaded file: extension first, then content.
pub fn resolve_mime_type(path: &Path, bytes: &[u8]) -> &'static str {
    match detect_mime_type(path) {
        OCTET_STREAM => {
            let sniffed = sniff_image_mime(bytes).unwrap_or(OCTET_STREAM);
            debug!(path = %path.display(), mime = sniffed, "MIME type sniffed from content");
            sniffed
        }
        by_extension => by_extension,
    }
}

/// Whether a MIME type is for an image.
pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_jpeg() {
        assert_eq!(detect_mime_type(&PathBuf::from("photo.JPG")), "image/jpeg");
    }

    #[test]
    fn unknown_extension_fallback() {
        assert_eq!(detect_mime_type(&PathBuf::from("file.xyz")), OCTET_STREAM);
    }

    #[test]
    fn sniffs_png_without_extension() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        assert_eq!(resolve_mime_type(&PathBuf::from("capture"), &png), "image/png");
    }

    #[test]
    fn extension_wins_over_content() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0];
        assert_eq!(resolve_mime_type(&PathBuf::from("notes.txt"), &jpeg), "text/plain");
    }

    #[test]
    fn text_is_not_an_image() {
        assert!(is_image("image/webp"));
        assert!(!is_image("text/plain"));
        assert!(!is_image(OCTET_STREAM));
    }
}
