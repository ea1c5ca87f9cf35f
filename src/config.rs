//! Runtime configuration for the staging pipeline.

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::progress::ProgressChannelConfig;
use crate::providers::ImageFileFormat;

/// Default bound applied to template thumbnail dimensions.
pub const DEFAULT_THUMBNAIL_BOUND: u32 = 512;

/// Configuration an orchestrator is constructed with.
#[derive(Clone, Debug)]
pub struct StageConfig {
    /// Root of the on-disk cache (`Spaces/` and `Projects/` live under it).
    pub cache_root: PathBuf,
    /// Maximum width of a bound template thumbnail.
    pub max_thumbnail_width: u32,
    /// Maximum height of a bound template thumbnail.
    pub max_thumbnail_height: u32,
    /// Format requested from the thumbnail provider.
    pub thumbnail_format: ImageFileFormat,
    /// Progress channel behavior.
    pub channel: ProgressChannelConfig,
}

impl StageConfig {
    /// Configuration rooted at an explicit cache directory.
    pub fn with_cache_root(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            ..Self::default()
        }
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        let cache_root = ProjectDirs::from("", "", "simulacrum")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            cache_root,
            max_thumbnail_width: DEFAULT_THUMBNAIL_BOUND,
            max_thumbnail_height: DEFAULT_THUMBNAIL_BOUND,
            thumbnail_format: ImageFileFormat::Png,
            channel: ProgressChannelConfig::default(),
        }
    }
}
