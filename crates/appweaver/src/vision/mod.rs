//! Attachment handling for the vision path: building the multi-part user
//! message and shrinking oversized images.

pub mod content;
pub mod normalize;

pub use content::{Attachment, ContentBuilder, enforce_image_limits, prepare_attachment};
pub use normalize::{DEFAULT_MAX_IMAGE_BYTES, NormalizedImage, normalize, validate_size};
