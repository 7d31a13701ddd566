pub mod error;
pub mod extraction;
pub mod photo;
pub mod prompts;
pub mod traits;

pub use error::PhotoError;
pub use extraction::{humanize_field_name, ExtraValue, ExtractionResult, KNOWN_FIELDS};
pub use photo::{ImageDataUrl, Photo, PhotoRequest, PhotoSource};
pub use traits::{DescriptionStream, VisionProvider};
