//! Core data types for the Aperture critique pipeline.
//!
//! These types flow between the local stages (discovery, preprocessing,
//! request building) and the batch reconciliation stage. Provider wire
//! types live private to each adapter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Locally tracked metadata for one submitted image.
///
/// Keyed by correlation id, the only join key between local state and
/// batch results. Serialized as the sidecar format written by
/// `critique --metadata-out` and read back by `resume --metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Correlation id assigned at request-build time (`custom_id` on the wire)
    #[serde(rename = "custom_id")]
    pub correlation_id: String,

    /// Absolute path to the source file
    pub path: PathBuf,

    /// Just the filename portion
    pub filename: String,

    /// Dimensions before any downscaling, (width, height)
    pub original_dimensions: (u32, u32),
}

/// A structured photo critique parsed from the model's response text.
///
/// Four sub-scores with notes, an overall score, and free-form feedback.
/// Field names match the JSON schema the system prompt asks the model
/// to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Critique {
    pub composition_score: f64,
    pub composition_notes: String,
    pub lighting_score: f64,
    pub lighting_notes: String,
    pub subject_score: f64,
    pub subject_notes: String,
    pub technical_score: f64,
    pub technical_notes: String,
    /// Model-reported average of the four sub-scores; taken as-is
    pub overall_score: f64,
    pub summary: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

/// One reconciled record: image metadata joined with its parsed critique.
///
/// The critique fields serialize flattened so report records stay flat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedResult {
    #[serde(rename = "custom_id")]
    pub correlation_id: String,

    /// Filename from metadata, or "unknown" if the id had no metadata entry
    pub filename: String,

    /// Source path from metadata, or "unknown"
    pub path: PathBuf,

    /// Original dimensions from metadata, or (0, 0)
    pub original_dimensions: (u32, u32),

    #[serde(flatten)]
    pub critique: Critique,
}

/// An image that passed discovery filters.
#[derive(Debug, Clone)]
pub struct DiscoveredImage {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Modification time, used for newest-first ordering
    pub modified: std::time::SystemTime,
}

/// A preprocessed image ready for request building.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// Path to the source file
    pub path: PathBuf,
    /// Just the filename portion
    pub filename: String,
    /// Base64-encoded image bytes after resize and re-encode
    pub data: String,
    /// MIME type of the encoded bytes ("image/jpeg" or "image/png")
    pub media_type: String,
    /// Width before any downscaling
    pub original_width: u32,
    /// Height before any downscaling
    pub original_height: u32,
}

impl PreparedImage {
    /// File stem of the source image, used in correlation ids.
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
    }
}
