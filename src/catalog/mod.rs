//! Catalog resolution: scene → owning project + deduplicated asset set.
//!
//! Public submodules:
//! - ids (newtype identifiers)
//! - model (SceneData, ProjectData, ProjectAsset, SceneAssetRef)

pub mod ids;
pub mod model;

pub use ids::{AssetId, ImageId, ProjectId, SceneAssetId, SceneId};
pub use model::{
    AssetKind, AssetStatus, Placement, ProjectAsset, ProjectData, SceneAssetRef, SceneData,
    TemplateKind,
};

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::providers::{CatalogProvider, ProviderError};

/// Resolves a scene to its owning project and the set of logical assets the
/// scene references, deduplicated by identity.
///
/// Prefers data already embedded in the scene (inlined project, inlined
/// project assets on the placement records) and falls back to the catalog
/// provider when the scene arrived cold.
#[derive(Clone)]
pub struct AssetCatalog {
    provider: Arc<dyn CatalogProvider>,
}

impl AssetCatalog {
    pub fn new(provider: Arc<dyn CatalogProvider>) -> Self {
        Self { provider }
    }

    /// Resolve the owning project.
    ///
    /// Uses the scene's embedded project when its id matches; otherwise asks
    /// the catalog, which fails with `NotFound`/`Forbidden` for private
    /// projects loaded by a non-owner.
    pub async fn resolve_project(&self, scene: &SceneData) -> Result<ProjectData, ProviderError> {
        if let Some(project) = &scene.project {
            if project.id == scene.project_id {
                return Ok(project.clone());
            }
        }
        debug!(project = %scene.project_id, "resolving project from catalog");
        self.provider.project(scene).await
    }

    /// Resolve the deduplicated set of project assets the scene references,
    /// in first-reference order.
    pub async fn resolve_assets(&self, scene: &SceneData) -> Result<Vec<ProjectAsset>, ProviderError> {
        let embedded: Vec<ProjectAsset> = scene
            .scene_assets
            .iter()
            .filter_map(|scene_asset| scene_asset.project_asset.clone())
            .collect();

        let assets = if embedded.is_empty() {
            self.provider.project_assets(scene).await?
        } else {
            embedded
        };

        let used: HashSet<&AssetId> = scene
            .scene_assets
            .iter()
            .map(|scene_asset| &scene_asset.project_asset_id)
            .collect();

        let mut seen = HashSet::new();
        let deduplicated: Vec<ProjectAsset> = assets
            .into_iter()
            .filter(|asset| seen.insert(asset.id.clone()))
            .filter(|asset| used.is_empty() || used.contains(&asset.id))
            .collect();

        if deduplicated.is_empty() {
            info!(scene = %scene.id, "scene references no assets");
        }
        Ok(deduplicated)
    }

    /// Resolve the scene's placement records, fetching them from the
    /// catalog when the scene arrived without them.
    pub async fn resolve_placements(
        &self,
        scene: &SceneData,
    ) -> Result<Vec<SceneAssetRef>, ProviderError> {
        if scene.scene_assets.is_empty() {
            debug!(scene = %scene.id, "placement list empty, fetching from catalog");
            return self.provider.scene_assets(&scene.id).await;
        }
        Ok(scene.scene_assets.clone())
    }
}
