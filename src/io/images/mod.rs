//! Image transfer: export-side materialization and import-side matching.

pub mod materializer;
pub mod matcher;

pub use materializer::{MaterializeReport, image_source_path, materialize_images, measure_image_payload};
pub use matcher::{ImageFolder, ImageMatch, MatchStrategy, resolve_image};

/// Extensions treated as image files when comparing names.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "heic", "heif", "bmp"];
