// src/catalog/model.rs
// Data model shared by the staging pipeline: scenes, projects, assets and
// placement records.

use serde::{Deserialize, Serialize};

use super::ids::{AssetId, ProjectId, SceneAssetId, SceneId};
use crate::geometry::{GeoLocation, Quaternion, Vector3};

/// Declared content kind of a project asset. Drives materialization
/// dispatch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    /// An archive containing a mesh descriptor decoded into a renderable
    /// hierarchy.
    MeshBundle,
    /// A platform-specific prefab bundle from which one named object is
    /// extracted.
    PrefabBundle,
    /// A code-defined object configured by per-instance data.
    Template,
}

impl AssetKind {
    /// Whether this kind is backed by a downloaded payload directory.
    /// Templates are code-defined and never hit the cache.
    pub fn has_payload(&self) -> bool {
        !matches!(self, AssetKind::Template)
    }
}

/// Subtype of a template asset.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateKind {
    Image,
    Billboard,
    SpawnPoint,
}

/// Load-time status of a project asset, mutated in place as the pipeline
/// proceeds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetStatus {
    #[default]
    Pending,
    Loaded,
    Error,
}

/// A logical, de-duplicated content unit referenced by one or more scene
/// placements.
///
/// Assets are never removed during a load pass: a failed asset stays in the
/// list with `status == Error` and a placeholder standing in for it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectAsset {
    pub id: AssetId,
    pub project_id: ProjectId,
    pub kind: AssetKind,
    /// Present when `kind == Template`.
    pub template_kind: Option<TemplateKind>,
    pub name: String,
    /// Remote data locator; for prefab bundles this is also the name of the
    /// object extracted from the bundle.
    pub data_url: String,
    /// Embedded JSON configuration payload for template assets.
    pub template_payload: Option<String>,
    #[serde(default)]
    pub status: AssetStatus,
    #[serde(default)]
    pub status_message: Option<String>,
}

impl ProjectAsset {
    pub fn mark_loaded(&mut self) {
        self.status = AssetStatus::Loaded;
        self.status_message = None;
    }

    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.status = AssetStatus::Error;
        self.status_message = Some(message.into());
    }
}

/// Spatial placement of one scene instance.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub location: GeoLocation,
    pub orientation: Quaternion,
    pub scale: Vector3,
}

/// A placement record: one spatial instance of a project asset.
///
/// Placement fields are always present, even when the referenced asset
/// fails to materialize; a placeholder keeps the slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneAssetRef {
    pub id: SceneAssetId,
    pub project_asset_id: AssetId,
    pub name: String,
    pub placement: Placement,
    /// Embedded copy of the referenced asset, when the catalog service
    /// inlines it. Used to resolve the asset set without a second fetch.
    pub project_asset: Option<ProjectAsset>,
}

/// The project owning a scene's assets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectData {
    pub id: ProjectId,
    pub name: String,
    pub is_public: bool,
    /// Ids of the assets that materialized during the last load pass.
    #[serde(default)]
    pub project_asset_ids: Vec<AssetId>,
}

/// A placement manifest: the set of spatial instances to materialize for
/// one viewable space.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneData {
    pub id: SceneId,
    pub project_id: ProjectId,
    pub name: String,
    /// Ordered placement records. May be empty on cold data; the assembler
    /// re-fetches it from the catalog in that case.
    #[serde(default)]
    pub scene_assets: Vec<SceneAssetRef>,
    /// Already-resolved owning project, when known.
    #[serde(default)]
    pub project: Option<ProjectData>,
}
