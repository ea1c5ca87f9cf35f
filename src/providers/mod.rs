//! Capability interfaces the pipeline consumes.
//!
//! The core never reaches into a process-wide registry: an orchestrator is
//! constructed with a [`Providers`] bundle and every collaborator is an
//! explicit trait object behind an `Arc`.

pub mod testing;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;

use crate::catalog::{ImageId, ProjectAsset, ProjectData, SceneAssetRef, SceneData, SceneId};
use crate::scene::SceneNode;

/// Failure surfaced by a capability provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("decode failure: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

/// File format requested from the thumbnail service.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImageFileFormat {
    Png,
    Jpeg,
}

/// Options passed to the mesh-decode collaborator.
#[derive(Clone, Debug)]
pub struct MeshDecodeOptions {
    /// Directory the descriptor's relative references resolve against.
    pub base_dir: PathBuf,
    /// Descriptor flavor, derived from the descriptor file extension.
    pub descriptor_kind: String,
    /// Whether the decoded hierarchy should carry collision shapes.
    pub generate_colliders: bool,
}

/// Resolves a scene to its remote catalog records.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch the project owning `scene`. Fails with `NotFound` or
    /// `Forbidden` when the project is private and not owned by the caller.
    async fn project(&self, scene: &SceneData) -> Result<ProjectData, ProviderError>;

    /// Fetch the project assets referenced by `scene`.
    async fn project_assets(&self, scene: &SceneData) -> Result<Vec<ProjectAsset>, ProviderError>;

    /// Fetch the placement records of a scene by id.
    async fn scene_assets(&self, scene_id: &SceneId) -> Result<Vec<SceneAssetRef>, ProviderError>;
}

/// Downloads one asset's raw payload into the project-scoped cache
/// directory. Idempotent best-effort; errors on network or storage failure.
#[async_trait]
pub trait FetchProvider: Send + Sync {
    async fn download(&self, scene: &SceneData, asset: &ProjectAsset) -> Result<(), ProviderError>;
}

/// Fetches thumbnail images referenced by template payloads. `Ok(None)`
/// means the service had nothing for this id, which is not an error.
#[async_trait]
pub trait ThumbnailProvider: Send + Sync {
    async fn thumbnail(
        &self,
        image_id: &ImageId,
        format: ImageFileFormat,
    ) -> Result<Option<DynamicImage>, ProviderError>;
}

/// Maps a platform-independent bundle file prefix to the concrete file for
/// the running platform.
pub trait PlatformBundleResolver: Send + Sync {
    fn bundle_file_for_platform(&self, path_prefix: &str) -> PathBuf;
}

/// Decodes a mesh descriptor file into a renderable hierarchy.
#[async_trait]
pub trait MeshDecodeProvider: Send + Sync {
    async fn decode_scene(
        &self,
        path: &Path,
        options: &MeshDecodeOptions,
    ) -> Result<SceneNode, ProviderError>;
}

/// A loaded prefab bundle. Extraction yields an independent hierarchy; the
/// bundle itself is released right after and never retained.
pub trait Bundle: Send {
    /// Extract one named object from the bundle.
    fn extract(&self, name: &str) -> Option<SceneNode>;

    /// Release the bundle resource. `keep_loaded` retains already-extracted
    /// objects (always the case for extraction results in this pipeline).
    fn release(&mut self, keep_loaded: bool);
}

/// Loads prefab bundles from a local url.
#[async_trait]
pub trait BundleProvider: Send + Sync {
    async fn load_bundle(&self, url: &str) -> Result<Box<dyn Bundle>, ProviderError>;
}

/// The full set of collaborators an orchestrator is constructed with.
#[derive(Clone)]
pub struct Providers {
    pub catalog: Arc<dyn CatalogProvider>,
    pub fetcher: Arc<dyn FetchProvider>,
    pub thumbnails: Arc<dyn ThumbnailProvider>,
    pub platform: Arc<dyn PlatformBundleResolver>,
    pub mesh_decoder: Arc<dyn MeshDecodeProvider>,
    pub bundles: Arc<dyn BundleProvider>,
}
