//! The end-to-end load pipeline.
//!
//! One orchestrator drives: availability check → fetch-missing →
//! materialize-all → assemble-scene, reporting progress and failure through
//! its event channel. Per-asset degradation never surfaces here; only
//! catalog and cache failures abort a load.

use std::sync::Arc;

use tracing::{error, info};

use crate::assemble::{SceneAssembler, SceneInstance};
use crate::cache::{CacheError, CacheStore};
use crate::catalog::{AssetCatalog, AssetStatus, ProjectAsset, ProjectData, SceneData, SceneId};
use crate::config::StageConfig;
use crate::fetch::{AssetFetcher, FetchError};
use crate::materialize::template::bind_empty_image;
use crate::materialize::{
    AssetMaterializer, ImageBinding, MaterializedRegistry, PendingImage, TemplateRegistry,
    ThumbnailSettings,
};
use crate::progress::{fraction, LoadEvent, LoadEventReceiver, LoadEventSender, LoadPhase};
use crate::providers::{ProviderError, Providers};

/// Fatal load failure. Everything recoverable was already swallowed by the
/// stage that hit it.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("catalog resolution failed: {0}")]
    Catalog(#[from] ProviderError),

    #[error("scene cannot be loaded, make sure it is not private: {0}")]
    ProjectUnavailable(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Everything a completed load pass produced.
pub struct LoadedScene {
    pub scene_id: SceneId,
    /// The owning project, with `project_asset_ids` refreshed to the ids
    /// that materialized.
    pub project: ProjectData,
    /// The resolved asset records, statuses updated in place.
    pub assets: Vec<ProjectAsset>,
    /// Template originals, keyed by asset id.
    pub registry: MaterializedRegistry,
    /// Positioned instances, one per placement that had a handle.
    pub instances: Vec<SceneInstance>,
}

impl LoadedScene {
    /// Number of assets that ended the pass in an error state.
    pub fn error_count(&self) -> usize {
        self.assets
            .iter()
            .filter(|asset| asset.status == AssetStatus::Error)
            .count()
    }
}

/// Drives the staging pipeline for one scene at a time.
///
/// All collaborators are injected at construction; the orchestrator keeps
/// no global state and can be shared behind an `Arc`. Loads are sequential
/// within one invocation and must not be overlapped for the same scene.
pub struct LoadOrchestrator {
    cache: CacheStore,
    catalog: AssetCatalog,
    fetcher: AssetFetcher,
    materializer: AssetMaterializer,
    assembler: SceneAssembler,
    events: LoadEventSender,
}

impl LoadOrchestrator {
    /// Build an orchestrator and the receiver observing its events.
    pub fn new(
        providers: Providers,
        templates: TemplateRegistry,
        config: StageConfig,
    ) -> Result<(Self, LoadEventReceiver), CacheError> {
        let cache = CacheStore::new(&config.cache_root)?;
        let (events, receiver) = LoadEventSender::new(config.channel.clone());

        let catalog = AssetCatalog::new(providers.catalog.clone());
        let fetcher = AssetFetcher::new(providers.fetcher.clone(), cache.clone());
        let materializer = AssetMaterializer::new(
            cache.clone(),
            fetcher.clone(),
            providers.mesh_decoder.clone(),
            providers.platform.clone(),
            providers.bundles.clone(),
            providers.thumbnails.clone(),
            Arc::new(templates),
            ThumbnailSettings {
                format: config.thumbnail_format,
                max_width: config.max_thumbnail_width,
                max_height: config.max_thumbnail_height,
            },
            events.clone(),
        );
        let assembler = SceneAssembler::new(catalog.clone(), events.clone());

        Ok((
            Self {
                cache,
                catalog,
                fetcher,
                materializer,
                assembler,
                events,
            },
            receiver,
        ))
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Whether every payload-bearing asset the scene references is already
    /// staged in the scene-scoped cache. Vacuously true for an asset-less
    /// scene.
    pub async fn is_cache_complete(&self, scene: &SceneData) -> Result<bool, LoadError> {
        let assets = self.catalog.resolve_assets(scene).await?;
        for asset in assets.iter().filter(|asset| asset.kind.has_payload()) {
            if !self.cache.has_scene_entry(&scene.id, &asset.id) {
                return Ok(false);
            }
        }
        info!(scene = %scene.id, "all assets available in cache");
        Ok(true)
    }

    /// Download every payload-bearing asset the scene references,
    /// sequentially, emitting `FetchProgress` after each one and a final
    /// completion event even for an empty set.
    ///
    /// Sequential on purpose: it bounds disk and network contention and
    /// keeps the fractions monotonic and deterministic.
    pub async fn fetch_missing(&self, scene: &SceneData) -> Result<(), LoadError> {
        let assets = self.catalog.resolve_assets(scene).await?;
        let total = assets.len();

        for (index, asset) in assets.iter().enumerate() {
            if asset.kind.has_payload() {
                self.fetcher.fetch(scene, asset).await?;
            }
            self.events
                .emit(LoadEvent::FetchProgress {
                    completed: index + 1,
                    total,
                    fraction: fraction(index + 1, total),
                })
                .await;
        }

        self.events
            .emit(LoadEvent::FetchProgress {
                completed: total,
                total,
                fraction: 1.0,
            })
            .await;
        info!(scene = %scene.id, total, "asset download pass finished");
        Ok(())
    }

    /// Run the full pipeline for one scene.
    ///
    /// Fatal failures emit a `Failed` event carrying a human-readable
    /// message and are returned; a load degraded by per-asset errors still
    /// returns `Ok` with placeholders and omissions in place.
    pub async fn load_scene(&self, scene: &mut SceneData) -> Result<LoadedScene, LoadError> {
        match self.run(scene).await {
            Ok(loaded) => {
                self.events.emit(LoadEvent::PhaseChanged(LoadPhase::Done)).await;
                info!(
                    scene = %scene.id,
                    instances = loaded.instances.len(),
                    errors = loaded.error_count(),
                    "scene load finished"
                );
                Ok(loaded)
            }
            Err(load_error) => {
                error!(scene = %scene.id, error = %load_error, "scene load failed");
                self.events
                    .emit(LoadEvent::Failed {
                        message: load_error.to_string(),
                    })
                    .await;
                self.events
                    .emit(LoadEvent::PhaseChanged(LoadPhase::Failed))
                    .await;
                Err(load_error)
            }
        }
    }

    async fn run(&self, scene: &mut SceneData) -> Result<LoadedScene, LoadError> {
        self.events
            .emit(LoadEvent::PhaseChanged(LoadPhase::ResolvingCatalog))
            .await;

        let mut project = self
            .catalog
            .resolve_project(scene)
            .await
            .map_err(|provider_error| match provider_error {
                ProviderError::NotFound(message) | ProviderError::Forbidden(message) => {
                    LoadError::ProjectUnavailable(message)
                }
                other => LoadError::Catalog(other),
            })?;
        let mut assets = self.catalog.resolve_assets(scene).await?;

        self.events
            .emit(LoadEvent::PhaseChanged(LoadPhase::Materializing))
            .await;
        let mut registry = MaterializedRegistry::new();
        let materialized_ids = self
            .materializer
            .materialize_all(scene, &mut assets, &mut registry)
            .await;
        project.project_asset_ids = materialized_ids;

        self.events
            .emit(LoadEvent::PhaseChanged(LoadPhase::Assembling))
            .await;
        let mut instances = self.assembler.assemble(scene, &registry).await?;

        self.bind_pending_images(&mut registry, &mut instances).await;

        scene.project = Some(project.clone());
        Ok(LoadedScene {
            scene_id: scene.id.clone(),
            project,
            assets,
            registry,
            instances,
        })
    }

    /// Resolve every deferred template image, patching the registry
    /// original and all instances cloned from it.
    async fn bind_pending_images(
        &self,
        registry: &mut MaterializedRegistry,
        instances: &mut [SceneInstance],
    ) {
        for PendingImage { asset_id, task } in registry.take_pending_images() {
            let result = task.bind().await;
            let bound = result.is_some();

            if let Some(materialized) = registry.get_mut(&asset_id) {
                match result {
                    Some(image) => {
                        if let Some(state) = materialized.template.as_mut() {
                            state.image = ImageBinding::Bound(image.clone());
                        }
                        for instance in instances
                            .iter_mut()
                            .filter(|instance| instance.project_asset_id == asset_id)
                        {
                            instance.image = Some(image.clone());
                        }
                    }
                    None => {
                        if let Some(state) = materialized.template.as_mut() {
                            state.image = ImageBinding::Empty;
                        }
                        bind_empty_image(&mut materialized.root);
                        for instance in instances
                            .iter_mut()
                            .filter(|instance| instance.project_asset_id == asset_id)
                        {
                            bind_empty_image(&mut instance.node);
                        }
                    }
                }
            }

            self.events
                .emit(LoadEvent::ImageBound { asset_id, bound })
                .await;
        }
    }
}
