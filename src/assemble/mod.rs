//! Scene assembly: placement records × materialized handles → positioned
//! instances.

use tracing::{debug, info};

use crate::catalog::{AssetCatalog, AssetId, SceneAssetId, SceneAssetRef, SceneData};
use crate::geometry::{GeoLocation, Quaternion, Vector3};
use crate::materialize::{CompressedImage, MaterializedRegistry};
use crate::progress::{fraction, LoadEvent, LoadEventSender};
use crate::providers::ProviderError;
use crate::scene::SceneNode;

/// One positioned instance in the assembled scene.
///
/// Instances are independent clones of the materialized original; mutating
/// one never touches the registry or other instances.
#[derive(Clone, Debug)]
pub struct SceneInstance {
    pub scene_asset_id: SceneAssetId,
    pub project_asset_id: AssetId,
    pub name: String,
    pub node: SceneNode,
    pub location: GeoLocation,
    pub orientation: Quaternion,
    pub scale: Vector3,
    /// Deferred template image, patched in once its task binds.
    pub image: Option<CompressedImage>,
}

/// Binds materialized assets to the scene's placement records.
#[derive(Clone)]
pub struct SceneAssembler {
    catalog: AssetCatalog,
    events: LoadEventSender,
}

impl SceneAssembler {
    pub fn new(catalog: AssetCatalog, events: LoadEventSender) -> Self {
        Self { catalog, events }
    }

    /// Produce one instance per placement whose referenced asset
    /// materialized; placements without a handle are skipped silently and
    /// stay visible only in the scene's metadata.
    ///
    /// A scene that arrived without placements fetches them from the
    /// catalog first. Progress is emitted after every processed placement,
    /// and immediately as complete for an empty list.
    pub async fn assemble(
        &self,
        scene: &SceneData,
        registry: &MaterializedRegistry,
    ) -> Result<Vec<SceneInstance>, ProviderError> {
        let placements = self.catalog.resolve_placements(scene).await?;
        let total = placements.len();

        if total == 0 {
            info!(scene = %scene.id, "no placements to assemble");
            self.events
                .emit(LoadEvent::SceneProgress {
                    processed: 0,
                    total: 0,
                    fraction: 1.0,
                })
                .await;
            return Ok(Vec::new());
        }

        let mut instances = Vec::new();
        let mut processed = 0;

        for placement in &placements {
            if let Some(materialized) = registry.get(&placement.project_asset_id) {
                instances.push(place(placement, materialized));
            } else {
                debug!(
                    placement = %placement.id,
                    asset = %placement.project_asset_id,
                    "no materialized handle, placement omitted"
                );
            }

            processed += 1;
            self.events
                .emit(LoadEvent::SceneProgress {
                    processed,
                    total,
                    fraction: fraction(processed, total),
                })
                .await;
        }

        info!(
            scene = %scene.id,
            placed = instances.len(),
            skipped = total - instances.len(),
            "scene assembled"
        );
        Ok(instances)
    }
}

/// Instantiate the materialized original under one placement record.
fn place(
    placement: &SceneAssetRef,
    materialized: &crate::materialize::MaterializedAsset,
) -> SceneInstance {
    let node = materialized.instantiate(&placement.name);
    SceneInstance {
        scene_asset_id: placement.id.clone(),
        project_asset_id: placement.project_asset_id.clone(),
        name: placement.name.clone(),
        node,
        location: placement.placement.location,
        orientation: placement.placement.orientation,
        scale: placement.placement.scale,
        image: None,
    }
}
