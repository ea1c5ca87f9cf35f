//! Fetching one asset's payload and promoting it into the scene cache.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheError, CacheStore};
use crate::catalog::{ProjectAsset, SceneData};
use crate::providers::{FetchProvider, ProviderError};

/// Failure while staging one asset's payload.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Downloads a single logical asset into the project-scoped cache through
/// the fetch provider, then promotes the result into the scene-scoped
/// namespace.
///
/// Concurrent fetches for the same (scene, asset) pair are not serialized
/// here; callers must not overlap them.
#[derive(Clone)]
pub struct AssetFetcher {
    provider: Arc<dyn FetchProvider>,
    cache: CacheStore,
}

impl AssetFetcher {
    pub fn new(provider: Arc<dyn FetchProvider>, cache: CacheStore) -> Self {
        Self { provider, cache }
    }

    /// Download `asset` and place it under the scene's cache namespace.
    pub async fn fetch(&self, scene: &SceneData, asset: &ProjectAsset) -> Result<(), FetchError> {
        debug!(asset = %asset.id, scene = %scene.id, "downloading asset payload");
        self.provider.download(scene, asset).await?;

        let project_dir = self.cache.project_dir(&asset.project_id, &asset.id);
        let scene_dir = self.cache.scene_dir(&scene.id, &asset.id);
        self.cache.promote(&project_dir, &scene_dir)?;
        Ok(())
    }
}
