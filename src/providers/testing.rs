// src/providers/testing.rs
// In-memory provider implementations for tests. Deterministic, no network,
// no real decoding.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::DynamicImage;

use super::{
    Bundle, BundleProvider, CatalogProvider, FetchProvider, ImageFileFormat, MeshDecodeOptions,
    MeshDecodeProvider, PlatformBundleResolver, ProviderError, ThumbnailProvider,
};
use crate::cache::{ASSETS_DIR, PROJECTS_DIR};
use crate::catalog::{AssetId, ImageId, ProjectAsset, ProjectData, SceneAssetRef, SceneData, SceneId};
use crate::scene::SceneNode;

/// Catalog provider answering from fixed in-memory records.
#[derive(Default)]
pub struct StaticCatalog {
    pub project: Option<ProjectData>,
    pub assets: Vec<ProjectAsset>,
    pub placements: Vec<SceneAssetRef>,
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn project(&self, scene: &SceneData) -> Result<ProjectData, ProviderError> {
        self.project.clone().ok_or_else(|| {
            ProviderError::NotFound(format!("project {} is not available", scene.project_id))
        })
    }

    async fn project_assets(&self, _scene: &SceneData) -> Result<Vec<ProjectAsset>, ProviderError> {
        Ok(self.assets.clone())
    }

    async fn scene_assets(&self, _scene_id: &SceneId) -> Result<Vec<SceneAssetRef>, ProviderError> {
        Ok(self.placements.clone())
    }
}

/// Fetch provider that "downloads" by writing fixed files into the
/// project-scoped cache directory, and records which assets it was asked
/// for.
pub struct WritingFetcher {
    /// Cache root the files are written under
    /// (`<root>/Projects/<project>/Assets/<asset>/<relative>`).
    pub root: PathBuf,
    /// Relative path and contents written per download.
    pub files: Vec<(String, Vec<u8>)>,
    pub downloaded: Mutex<Vec<AssetId>>,
}

impl WritingFetcher {
    pub fn new(root: impl Into<PathBuf>, files: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            root: root.into(),
            files,
            downloaded: Mutex::new(Vec::new()),
        }
    }

    pub fn downloaded_ids(&self) -> Vec<AssetId> {
        self.downloaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl FetchProvider for WritingFetcher {
    async fn download(&self, _scene: &SceneData, asset: &ProjectAsset) -> Result<(), ProviderError> {
        let dir = self
            .root
            .join(PROJECTS_DIR)
            .join(asset.project_id.as_str())
            .join(ASSETS_DIR)
            .join(asset.id.as_str());
        for (relative, contents) in &self.files {
            let target = dir.join(relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ProviderError::Storage(e.to_string()))?;
            }
            std::fs::write(&target, contents).map_err(|e| ProviderError::Storage(e.to_string()))?;
        }
        self.downloaded.lock().unwrap().push(asset.id.clone());
        Ok(())
    }
}

/// Fetch provider that always fails with a network error.
#[derive(Default)]
pub struct FailingFetcher;

#[async_trait]
impl FetchProvider for FailingFetcher {
    async fn download(&self, _scene: &SceneData, asset: &ProjectAsset) -> Result<(), ProviderError> {
        Err(ProviderError::Network(format!(
            "no route to host for asset {}",
            asset.id
        )))
    }
}

/// Thumbnail provider answering with one fixed image, or nothing.
#[derive(Default)]
pub struct StaticThumbnails {
    pub image: Option<DynamicImage>,
    pub requested: Mutex<Vec<ImageId>>,
}

impl StaticThumbnails {
    pub fn with_image(image: DynamicImage) -> Self {
        Self {
            image: Some(image),
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ThumbnailProvider for StaticThumbnails {
    async fn thumbnail(
        &self,
        image_id: &ImageId,
        _format: ImageFileFormat,
    ) -> Result<Option<DynamicImage>, ProviderError> {
        self.requested.lock().unwrap().push(image_id.clone());
        Ok(self.image.clone())
    }
}

/// Platform resolver that appends a fixed platform suffix to the prefix.
pub struct SuffixPlatformResolver {
    pub suffix: String,
}

impl SuffixPlatformResolver {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl PlatformBundleResolver for SuffixPlatformResolver {
    fn bundle_file_for_platform(&self, path_prefix: &str) -> PathBuf {
        PathBuf::from(format!("{}.{}", path_prefix, self.suffix))
    }
}

/// Mesh decoder producing a small fixed hierarchy named after the
/// descriptor file.
#[derive(Default)]
pub struct StubMeshDecoder;

#[async_trait]
impl MeshDecodeProvider for StubMeshDecoder {
    async fn decode_scene(
        &self,
        path: &std::path::Path,
        _options: &MeshDecodeOptions,
    ) -> Result<SceneNode, ProviderError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("mesh")
            .to_owned();
        let mut root = SceneNode::new(stem);
        root.add_child(SceneNode::new("surface"));
        Ok(root)
    }
}

/// Mesh decoder that always fails.
#[derive(Default)]
pub struct FailingMeshDecoder;

#[async_trait]
impl MeshDecodeProvider for FailingMeshDecoder {
    async fn decode_scene(
        &self,
        path: &std::path::Path,
        _options: &MeshDecodeOptions,
    ) -> Result<SceneNode, ProviderError> {
        Err(ProviderError::Decode(format!(
            "unreadable descriptor {}",
            path.display()
        )))
    }
}

pub struct MemoryBundle {
    objects: HashMap<String, SceneNode>,
    released: Arc<AtomicBool>,
}

impl Bundle for MemoryBundle {
    fn extract(&self, name: &str) -> Option<SceneNode> {
        self.objects.get(name).cloned()
    }

    fn release(&mut self, _keep_loaded: bool) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Bundle provider serving objects from memory, tracking release calls per
/// loaded bundle.
#[derive(Default)]
pub struct MemoryBundleProvider {
    pub objects: HashMap<String, SceneNode>,
    pub release_flags: Mutex<Vec<Arc<AtomicBool>>>,
}

impl MemoryBundleProvider {
    pub fn with_object(name: impl Into<String>, node: SceneNode) -> Self {
        let mut objects = HashMap::new();
        objects.insert(name.into(), node);
        Self {
            objects,
            release_flags: Mutex::new(Vec::new()),
        }
    }

    /// Whether every bundle handed out so far has been released.
    pub fn all_released(&self) -> bool {
        self.release_flags
            .lock()
            .unwrap()
            .iter()
            .all(|flag| flag.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl BundleProvider for MemoryBundleProvider {
    async fn load_bundle(&self, _url: &str) -> Result<Box<dyn Bundle>, ProviderError> {
        let released = Arc::new(AtomicBool::new(false));
        self.release_flags.lock().unwrap().push(released.clone());
        Ok(Box::new(MemoryBundle {
            objects: self.objects.clone(),
            released,
        }))
    }
}
