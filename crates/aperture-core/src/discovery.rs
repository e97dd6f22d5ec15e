//! Image discovery for finding critique candidates in directories.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::SystemTime;
use walkdir::WalkDir;

use crate::config::DiscoveryConfig;
use crate::error::PipelineError;
use crate::types::DiscoveredImage;

/// Discovers image files in a directory.
pub struct ImageDiscovery {
    config: DiscoveryConfig,
}

/// Summary of a discovery pass, for the CLI table.
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    /// Total number of images
    pub total: usize,
    /// Total size in MB
    pub total_size_mb: f64,
    /// Average size per image in MB
    pub avg_size_mb: f64,
    /// Count by lowercase extension
    pub by_extension: BTreeMap<String, usize>,
}

impl ImageDiscovery {
    /// Create a new discovery instance.
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Discover supported images under a directory.
    ///
    /// Skips excluded directories and files below the minimum size
    /// (thumbnails). Results are sorted newest-first by modification time,
    /// then truncated to `max_images` if set.
    pub fn discover(
        &self,
        path: &Path,
        recursive: bool,
        max_images: Option<usize>,
    ) -> Result<Vec<DiscoveredImage>, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(PipelineError::NotADirectory(path.to_path_buf()));
        }

        tracing::info!(path = %path.display(), recursive, "Discovering images");

        let max_depth = if recursive { usize::MAX } else { 1 };
        let min_size = self.config.min_file_size_kb * 1024;
        let mut images = Vec::new();

        for entry in WalkDir::new(path)
            .max_depth(max_depth)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let entry_path = entry.path();
            if !entry_path.is_file() {
                continue;
            }
            if self.in_excluded_dir(entry_path) {
                tracing::debug!(path = %entry_path.display(), "Skipping (excluded dir)");
                continue;
            }
            if !self.is_supported(entry_path) {
                continue;
            }

            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!(path = %entry_path.display(), error = %e, "Cannot stat file");
                    continue;
                }
            };
            if meta.len() < min_size {
                tracing::debug!(
                    path = %entry_path.display(),
                    size = meta.len(),
                    "Skipping (too small)"
                );
                continue;
            }

            images.push(DiscoveredImage {
                path: entry_path.to_path_buf(),
                size: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        // Newest first, so the cap keeps the most recent shots
        images.sort_by(|a, b| b.modified.cmp(&a.modified));

        if let Some(max) = max_images {
            if images.len() > max {
                tracing::info!(max, "Truncating to max_images limit");
                images.truncate(max);
            }
        }

        tracing::info!(count = images.len(), "Discovered images");
        Ok(images)
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.to_lowercase() == ext_lower)
            })
            .unwrap_or(false)
    }

    /// Check if any path component matches an excluded directory name.
    fn in_excluded_dir(&self, path: &Path) -> bool {
        path.components().any(|c| {
            c.as_os_str()
                .to_str()
                .map(|name| self.config.excluded_dirs.iter().any(|d| d == name))
                .unwrap_or(false)
        })
    }
}

/// Summarize discovered images for display.
pub fn scan_stats(images: &[DiscoveredImage]) -> ScanStats {
    if images.is_empty() {
        return ScanStats::default();
    }

    let total_size: u64 = images.iter().map(|img| img.size).sum();
    let total_size_mb = total_size as f64 / (1024.0 * 1024.0);
    let avg_size_mb = total_size_mb / images.len() as f64;

    let mut by_extension = BTreeMap::new();
    for img in images {
        let ext = img
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_else(|| "unknown".to_string());
        *by_extension.entry(ext).or_insert(0) += 1;
    }

    ScanStats {
        total: images.len(),
        total_size_mb: (total_size_mb * 100.0).round() / 100.0,
        avg_size_mb: (avg_size_mb * 100.0).round() / 100.0,
        by_extension,
    }
}
