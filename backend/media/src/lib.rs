//! Media type handling for captured and uploaded photos.

pub mod mime_detect;

pub use mime_detect::{detect_mime_type, is_image, resolve_mime_type, sniff_image_mime};
