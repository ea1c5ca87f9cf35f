//! Materialization: cached payload + asset record → instantiable handle.
//!
//! Per-asset failure is the normal case here, not an edge case. Every error
//! raised while one asset materializes is caught, logged and recorded on
//! the asset; the batch always runs to the end.
//!
//! Public submodules:
//! - mesh (mesh-bundle payloads)
//! - bundle (platform prefab bundles)
//! - template (code-defined template assets)
//! - image (deferred thumbnail tasks)

pub mod bundle;
pub mod image;
pub mod mesh;
pub mod template;

pub use image::{CompressedImage, ImageTask};
pub use template::{TemplateConfig, TemplateDefinition, TemplateRegistry};

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::cache::CacheStore;
use crate::catalog::{AssetId, AssetKind, AssetStatus, ProjectAsset, SceneData, TemplateKind};
use crate::fetch::AssetFetcher;
use crate::progress::{fraction, LoadEvent, LoadEventSender};
use crate::providers::{
    BundleProvider, ImageFileFormat, MeshDecodeProvider, PlatformBundleResolver, ThumbnailProvider,
};
use crate::scene::{NodeTag, SceneNode};

/// Recoverable per-asset materialization failure. Never propagates past the
/// materializer; it ends up in the asset's status message and the logs.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("payload directory unreadable at {path}: {source}")]
    Payload {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("bundle file has an invalid naming scheme: {0}")]
    MalformedBundleName(String),

    #[error("bundle file does not exist: {0}")]
    MissingBundleFile(PathBuf),

    #[error("bundle load failed: {0}")]
    BundleLoad(String),

    #[error("no object named \"{object}\" in bundle")]
    ExtractFailed { object: String },

    #[error("mesh decode failed: {0}")]
    Decode(String),

    #[error("template configuration is invalid: {0}")]
    BadTemplateConfig(String),
}

/// Metadata recorded for an object extracted from a prefab bundle.
#[derive(Clone, Debug)]
pub struct BundleMeta {
    /// Name the object carried inside the bundle.
    pub object_name: String,
    /// Locator it was extracted under.
    pub source_url: String,
}

/// Deferred-image state of a template original.
#[derive(Clone, Debug)]
pub enum ImageBinding {
    /// The template does not reference an image.
    NotRequested,
    /// A fetch task is in flight; bound after assembly.
    Pending,
    /// The processed image is attached.
    Bound(CompressedImage),
    /// Nothing usable came back; the placeholder state is shown.
    Empty,
}

/// Template-specific state carried by a materialized template original.
#[derive(Clone, Debug)]
pub struct TemplateState {
    pub kind: TemplateKind,
    pub config: TemplateConfig,
    pub image: ImageBinding,
}

/// An instantiable handle produced by materialization, keyed by asset id.
///
/// The handle is the template original: it stays inactive inside the
/// registry for the scene's lifetime, and every placed instance is an
/// independent clone of its hierarchy.
#[derive(Clone, Debug)]
pub struct MaterializedAsset {
    pub asset_id: AssetId,
    pub kind: AssetKind,
    pub root: SceneNode,
    /// True when the handle is a stand-in for content that could not be
    /// materialized.
    pub placeholder: bool,
    pub bundle: Option<BundleMeta>,
    pub template: Option<TemplateState>,
}

impl MaterializedAsset {
    /// A named, inactive stand-in keeping the asset's slot in the scene.
    pub fn placeholder(asset: &ProjectAsset) -> Self {
        let mut root = SceneNode::new(asset.name.clone());
        root.active = false;
        root.set_tag_recursive(NodeTag::AssetTemplate);
        Self {
            asset_id: asset.id.clone(),
            kind: asset.kind,
            root,
            placeholder: true,
            bundle: None,
            template: None,
        }
    }

    /// Clone the hierarchy into a fresh scene instance: activated, renamed,
    /// stripped of the staging tag.
    pub fn instantiate(&self, name: &str) -> SceneNode {
        let mut node = self.root.clone();
        node.name = name.to_owned();
        node.active = true;
        node.set_tag_recursive(NodeTag::SceneAsset);
        node
    }
}

/// A template image task still in flight, remembered until the bind stage.
pub struct PendingImage {
    pub asset_id: AssetId,
    pub task: ImageTask,
}

/// Explicit mapping from asset id to materialized handle.
///
/// Appended by the materializer, read by the assembler; owned by the
/// orchestration context for the scene's lifetime.
#[derive(Default)]
pub struct MaterializedRegistry {
    assets: HashMap<AssetId, MaterializedAsset>,
    pending_images: Vec<PendingImage>,
}

impl MaterializedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: MaterializedAsset) {
        self.assets.insert(asset.asset_id.clone(), asset);
    }

    pub fn get(&self, id: &AssetId) -> Option<&MaterializedAsset> {
        self.assets.get(id)
    }

    pub fn get_mut(&mut self, id: &AssetId) -> Option<&mut MaterializedAsset> {
        self.assets.get_mut(id)
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.assets.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn push_pending_image(&mut self, pending: PendingImage) {
        self.pending_images.push(pending);
    }

    /// Take ownership of every image task still in flight.
    pub fn take_pending_images(&mut self) -> Vec<PendingImage> {
        std::mem::take(&mut self.pending_images)
    }

    pub fn pending_image_count(&self) -> usize {
        self.pending_images.len()
    }
}

/// Thumbnail processing parameters handed to template materialization.
#[derive(Clone, Debug)]
pub struct ThumbnailSettings {
    pub format: ImageFileFormat,
    pub max_width: u32,
    pub max_height: u32,
}

/// Converts project assets plus their cached payloads into registry
/// entries, one at a time, in catalog order.
#[derive(Clone)]
pub struct AssetMaterializer {
    cache: CacheStore,
    fetcher: AssetFetcher,
    mesh_decoder: Arc<dyn MeshDecodeProvider>,
    platform: Arc<dyn PlatformBundleResolver>,
    bundles: Arc<dyn BundleProvider>,
    thumbnails: Arc<dyn ThumbnailProvider>,
    templates: Arc<TemplateRegistry>,
    thumbnail_settings: ThumbnailSettings,
    events: LoadEventSender,
}

impl AssetMaterializer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: CacheStore,
        fetcher: AssetFetcher,
        mesh_decoder: Arc<dyn MeshDecodeProvider>,
        platform: Arc<dyn PlatformBundleResolver>,
        bundles: Arc<dyn BundleProvider>,
        thumbnails: Arc<dyn ThumbnailProvider>,
        templates: Arc<TemplateRegistry>,
        thumbnail_settings: ThumbnailSettings,
        events: LoadEventSender,
    ) -> Self {
        Self {
            cache,
            fetcher,
            mesh_decoder,
            platform,
            bundles,
            thumbnails,
            templates,
            thumbnail_settings,
            events,
        }
    }

    /// Materialize every asset into `registry`, mutating statuses in place.
    ///
    /// Returns the ids that materialized successfully. `handled` advances
    /// by exactly one per asset, success or failure alike, and an
    /// `AssetProgress` event follows each one; an empty asset list reports
    /// completion immediately.
    pub async fn materialize_all(
        &self,
        scene: &SceneData,
        assets: &mut [ProjectAsset],
        registry: &mut MaterializedRegistry,
    ) -> Vec<AssetId> {
        let total = assets.len();
        if total == 0 {
            self.events
                .emit(LoadEvent::AssetProgress {
                    handled: 0,
                    total: 0,
                    errors: 0,
                    fraction: 1.0,
                })
                .await;
            return Vec::new();
        }

        let mut handled = 0;
        let mut errors = 0;
        let mut materialized_ids = Vec::new();

        for asset in assets.iter_mut() {
            self.stage_payload(scene, asset).await;

            match self.dispatch(scene, asset).await {
                Ok(Some((materialized, image_task))) => {
                    let succeeded = !materialized.placeholder;
                    let asset_id = materialized.asset_id.clone();
                    registry.insert(materialized);
                    if let Some(task) = image_task {
                        registry.push_pending_image(PendingImage {
                            asset_id: asset_id.clone(),
                            task,
                        });
                    }
                    if succeeded {
                        asset.mark_loaded();
                        materialized_ids.push(asset_id);
                    }
                }
                Ok(None) => {
                    // Handled without output: nothing to place, nothing to report.
                }
                Err(error) => {
                    warn!(asset = %asset.id, error = %error, "asset failed to materialize");
                    asset.mark_error(error.to_string());
                }
            }

            if asset.status == AssetStatus::Error {
                errors += 1;
            }
            handled += 1;
            self.events
                .emit(LoadEvent::AssetProgress {
                    handled,
                    total,
                    errors,
                    fraction: fraction(handled, total),
                })
                .await;
        }

        materialized_ids
    }

    /// Fetch the payload for a cache miss before dispatch. A failed fetch
    /// is recoverable: the kind-specific path sees the missing directory
    /// and degrades on its own.
    async fn stage_payload(&self, scene: &SceneData, asset: &ProjectAsset) {
        if asset.kind.has_payload() && !self.cache.has_scene_entry(&scene.id, &asset.id) {
            if let Err(error) = self.fetcher.fetch(scene, asset).await {
                warn!(asset = %asset.id, error = %error, "payload fetch failed");
            }
        }
    }

    async fn dispatch(
        &self,
        scene: &SceneData,
        asset: &mut ProjectAsset,
    ) -> Result<Option<(MaterializedAsset, Option<ImageTask>)>, MaterializeError> {
        let payload_dir = self.cache.scene_dir(&scene.id, &asset.id);
        match asset.kind {
            AssetKind::MeshBundle => {
                let materialized =
                    mesh::materialize(asset, &payload_dir, self.mesh_decoder.as_ref()).await?;
                Ok(materialized.map(|m| (m, None)))
            }
            AssetKind::PrefabBundle => {
                let materialized = bundle::materialize(
                    asset,
                    &payload_dir,
                    self.platform.as_ref(),
                    self.bundles.as_ref(),
                )
                .await?;
                Ok(materialized.map(|m| (m, None)))
            }
            AssetKind::Template => {
                template::materialize(
                    asset,
                    &self.templates,
                    &self.thumbnails,
                    &self.thumbnail_settings,
                )
            }
        }
    }
}
