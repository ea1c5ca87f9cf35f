//! On-disk cache layout and promotion.
//!
//! Two namespaces share one root:
//! `<root>/Spaces/<sceneId>/Assets/<assetId>/` holds scene-scoped payloads,
//! `<root>/Projects/<projectId>/Assets/<assetId>/` holds project-scoped
//! downloads. Directory presence is the cache-hit signal; the layout is
//! fixed for compatibility with caches written by earlier tooling.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::catalog::{AssetId, ProjectId, SceneId};

pub const SPACES_DIR: &str = "Spaces";
pub const PROJECTS_DIR: &str = "Projects";
pub const ASSETS_DIR: &str = "Assets";

/// Failure in the cache layer.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache io failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("promote from {src} to {dst} failed (destination rolled back): {source}")]
    PromoteFailed {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Maps (scene, asset) and (project, asset) pairs to deterministic on-disk
/// locations and moves fetched content between the two namespaces.
///
/// Path derivation is a pure function of the ids: a hit proves a prior
/// successful placement, not content correctness.
#[derive(Clone, Debug)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open a cache at `root`, creating the namespace roots when absent.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        for namespace in [SPACES_DIR, PROJECTS_DIR] {
            let dir = root.join(namespace);
            fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scene-scoped payload directory for one asset.
    pub fn scene_dir(&self, scene: &SceneId, asset: &AssetId) -> PathBuf {
        self.root
            .join(SPACES_DIR)
            .join(scene.as_str())
            .join(ASSETS_DIR)
            .join(asset.as_str())
    }

    /// Project-scoped download directory for one asset.
    pub fn project_dir(&self, project: &ProjectId, asset: &AssetId) -> PathBuf {
        self.root
            .join(PROJECTS_DIR)
            .join(project.as_str())
            .join(ASSETS_DIR)
            .join(asset.as_str())
    }

    /// Whether the scene-scoped payload directory exists. The sole hit
    /// signal for "already cached".
    pub fn has_scene_entry(&self, scene: &SceneId, asset: &AssetId) -> bool {
        self.scene_dir(scene, asset).is_dir()
    }

    pub fn has_project_entry(&self, project: &ProjectId, asset: &AssetId) -> bool {
        self.project_dir(project, asset).is_dir()
    }

    /// Copy every file under `src` into `dst`, preserving relative paths
    /// and overwriting same-path files.
    ///
    /// Not atomic, but never partial: on any error the destination
    /// directory is removed before the error is returned, so a later
    /// existence check cannot observe a half-written entry.
    pub fn promote(&self, src: &Path, dst: &Path) -> Result<(), CacheError> {
        debug!(src = %src.display(), dst = %dst.display(), "promoting cached payload");
        match copy_tree(src, dst) {
            Ok(()) => Ok(()),
            Err(source) => {
                if let Err(cleanup) = fs::remove_dir_all(dst) {
                    if cleanup.kind() != io::ErrorKind::NotFound {
                        warn!(
                            dst = %dst.display(),
                            error = %cleanup,
                            "failed to roll back partial promote"
                        );
                    }
                }
                Err(CacheError::PromoteFailed {
                    src: src.to_path_buf(),
                    dst: dst.to_path_buf(),
                    source,
                })
            }
        }
    }
}

fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
