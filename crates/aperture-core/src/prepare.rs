//! Image preprocessing for batch API submission.
//!
//! Each image is decoded, downscaled so its long edge fits the API's token
//! sweet spot, re-encoded, and base64-encoded. Decoding runs on a blocking
//! task with a timeout so one corrupt file cannot wedge the pipeline.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::timeout;

use crate::batch::{BatchRequest, RequestBuilder};
use crate::config::PrepareConfig;
use crate::error::PipelineError;
use crate::types::{DiscoveredImage, ImageMetadata, PreparedImage};

/// Which optional image formats the linked decoder can actually handle.
///
/// Probed once at startup and threaded into the preparer, so format support
/// is an explicit value rather than something each call site re-detects.
#[derive(Debug, Clone, Copy)]
pub struct DecodeCapabilities {
    /// Whether HEIC files can be decoded
    pub heic: bool,
}

impl DecodeCapabilities {
    /// Probe the linked `image` crate for optional format support.
    pub fn detect() -> Self {
        Self {
            heic: ImageFormat::from_extension("heic").is_some(),
        }
    }
}

/// Preprocesses images for upload.
pub struct ImagePreparer {
    config: PrepareConfig,
    capabilities: DecodeCapabilities,
}

impl ImagePreparer {
    /// Create a new preparer with the given configuration and capabilities.
    pub fn new(config: PrepareConfig, capabilities: DecodeCapabilities) -> Self {
        Self {
            config,
            capabilities,
        }
    }

    /// Preprocess a single image: decode, downscale, re-encode, base64.
    ///
    /// JPEG sources are re-encoded as JPEG, PNG stays PNG, WebP stays WebP.
    /// Anything else (including HEIC, when decodable) is transcoded to JPEG.
    pub async fn prepare(&self, path: &Path) -> Result<PreparedImage, PipelineError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if ext == "heic" && !self.capabilities.heic {
            return Err(PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: "heic".to_string(),
            });
        }

        tracing::debug!(path = %path.display(), "Preprocessing");

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|_| PipelineError::FileNotFound(path.to_path_buf()))?;

        let path_owned = path.to_path_buf();
        let config = self.config.clone();
        let timeout_duration = Duration::from_millis(self.config.decode_timeout_ms);

        let result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || prepare_sync(bytes, &path_owned, &ext, &config))
                .await
        })
        .await;

        match result {
            Ok(Ok(prepared)) => prepared,
            Ok(Err(e)) => Err(PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Task join error: {}", e),
            }),
            Err(_) => Err(PipelineError::Timeout {
                path: path.to_path_buf(),
                stage: "prepare".to_string(),
                timeout_ms: self.config.decode_timeout_ms,
            }),
        }
    }
}

/// Synchronous decode/resize/encode (runs in spawn_blocking).
fn prepare_sync(
    bytes: Vec<u8>,
    path: &PathBuf,
    ext: &str,
    config: &PrepareConfig,
) -> Result<PreparedImage, PipelineError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PipelineError::Decode {
            path: path.clone(),
            message: format!("Cannot detect image format: {}", e),
        })?;
    let img = reader.decode().map_err(|e| PipelineError::Decode {
        path: path.clone(),
        message: e.to_string(),
    })?;

    let (original_width, original_height) = img.dimensions();

    let img = resize_to_long_edge(img, config.max_long_edge);

    let (format, media_type) = match ext {
        "png" => (ImageFormat::Png, "image/png"),
        "webp" => (ImageFormat::WebP, "image/webp"),
        _ => (ImageFormat::Jpeg, "image/jpeg"),
    };

    let encoded = encode_image(&img, format, config.jpeg_quality).map_err(|message| {
        PipelineError::Encode {
            path: path.clone(),
            message,
        }
    })?;

    Ok(PreparedImage {
        path: path.clone(),
        filename: path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string(),
        data: BASE64.encode(encoded),
        media_type: media_type.to_string(),
        original_width,
        original_height,
    })
}

/// Downscale so the long edge fits `max_long_edge`, preserving aspect ratio.
///
/// Images already within bounds pass through untouched.
fn resize_to_long_edge(img: DynamicImage, max_long_edge: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let long_edge = width.max(height);

    if long_edge <= max_long_edge {
        return img;
    }

    tracing::debug!(width, height, max_long_edge, "Resizing image");
    img.resize(max_long_edge, max_long_edge, FilterType::Lanczos3)
}

/// Encode to the target format, returning the raw bytes.
fn encode_image(
    img: &DynamicImage,
    format: ImageFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, String> {
    let mut buffer = Cursor::new(Vec::new());

    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, jpeg_quality);
            rgb.write_with_encoder(encoder).map_err(|e| e.to_string())?;
        }
        _ => {
            img.write_to(&mut buffer, format).map_err(|e| e.to_string())?;
        }
    }

    Ok(buffer.into_inner())
}

/// Preprocess a list of images and build their batch requests.
///
/// Images run sequentially so correlation ids stay index-ordered. Failed
/// images are skipped with a warning; they never abort the batch.
pub async fn prepare_batch(
    images: &[DiscoveredImage],
    preparer: &ImagePreparer,
    builder: &RequestBuilder,
) -> (Vec<BatchRequest>, Vec<ImageMetadata>) {
    let mut requests = Vec::new();
    let mut metadata = Vec::new();

    for image in images {
        let prepared = match preparer.prepare(&image.path).await {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::warn!(path = %image.path.display(), error = %e, "Skipping image");
                continue;
            }
        };

        let (request, meta) = builder.build(requests.len(), &prepared);
        tracing::info!(filename = %prepared.filename, id = %meta.correlation_id, "Prepared");

        requests.push(request);
        metadata.push(meta);
    }

    tracing::info!(
        prepared = requests.len(),
        total = images.len(),
        "Prepared batch requests"
    );

    (requests, metadata)
}
