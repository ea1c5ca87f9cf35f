//! Template materialization: registered base object + per-instance data.
//!
//! Templates are code-defined; nothing is fetched from the cache. The only
//! remote dependency is the optional thumbnail referenced by image-bearing
//! kinds, which loads on a deferred [`ImageTask`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::image::ImageTask;
use super::{ImageBinding, MaterializeError, MaterializedAsset, TemplateState, ThumbnailSettings};
use crate::catalog::{ImageId, ProjectAsset, TemplateKind};
use crate::providers::ThumbnailProvider;
use crate::scene::{NodeTag, SceneNode};

/// Child node that renders the bound image on image templates.
pub const IMAGE_SURFACE_NODE: &str = "ImageSurface";
/// Child node shown while a billboard image loads; hidden when nothing
/// binds.
pub const IMAGE_LOADER_NODE: &str = "ImageLoader";
/// Billboard backdrop node.
pub const BILLBOARD_BACKGROUND_NODE: &str = "Background";

/// Duplicate registration of a template kind.
#[derive(Debug, thiserror::Error)]
#[error("template {0:?} is already registered")]
pub struct TemplateAlreadyRegistered(pub TemplateKind);

/// Configuration payload of an image template.
///
/// Field names follow the catalog service's wire casing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ImageTemplateConfig {
    pub image_id: String,
    pub caption: String,
}

/// Configuration payload of a billboard template.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BillboardTemplateConfig {
    pub image_id: String,
    pub caption: String,
}

/// Parsed per-kind configuration attached to a materialized template.
#[derive(Clone, Debug, PartialEq)]
pub enum TemplateConfig {
    Image(ImageTemplateConfig),
    Billboard(BillboardTemplateConfig),
    SpawnPoint,
}

/// A registered template: the clonable base object for one kind.
#[derive(Clone, Debug)]
pub struct TemplateDefinition {
    pub kind: TemplateKind,
    pub name: String,
    pub base: SceneNode,
}

/// Explicit lookup from template kind to definition, owned by the
/// orchestration context.
#[derive(Default)]
pub struct TemplateRegistry {
    definitions: HashMap<TemplateKind, TemplateDefinition>,
}

impl TemplateRegistry {
    /// An empty registry. Template assets materialize as skips until
    /// definitions are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry carrying the built-in definitions for every known kind.
    pub fn with_builtin_templates() -> Self {
        let mut image = SceneNode::new("Image");
        image.add_child(SceneNode::new(IMAGE_SURFACE_NODE));

        let mut billboard = SceneNode::new("Billboard");
        billboard.add_child(SceneNode::new(BILLBOARD_BACKGROUND_NODE));
        billboard.add_child(SceneNode::new(IMAGE_LOADER_NODE));

        let builtins = [
            TemplateDefinition {
                kind: TemplateKind::Image,
                name: "Image".into(),
                base: image,
            },
            TemplateDefinition {
                kind: TemplateKind::Billboard,
                name: "Billboard".into(),
                base: billboard,
            },
            TemplateDefinition {
                kind: TemplateKind::SpawnPoint,
                name: "SpawnPoint".into(),
                base: SceneNode::new("SpawnPoint"),
            },
        ];

        let mut registry = Self::new();
        for definition in builtins {
            registry.definitions.insert(definition.kind, definition);
        }
        registry
    }

    /// Register a definition; each kind can be registered once.
    pub fn register(
        &mut self,
        definition: TemplateDefinition,
    ) -> Result<(), TemplateAlreadyRegistered> {
        if self.definitions.contains_key(&definition.kind) {
            return Err(TemplateAlreadyRegistered(definition.kind));
        }
        self.definitions.insert(definition.kind, definition);
        Ok(())
    }

    pub fn definition(&self, kind: TemplateKind) -> Option<&TemplateDefinition> {
        self.definitions.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Materialize one template asset.
///
/// Unknown or unregistered kinds are skipped (handled). A malformed image
/// reference binds the placeholder state instead of failing the asset.
pub fn materialize(
    asset: &mut ProjectAsset,
    templates: &TemplateRegistry,
    thumbnails: &Arc<dyn ThumbnailProvider>,
    settings: &ThumbnailSettings,
) -> Result<Option<(MaterializedAsset, Option<ImageTask>)>, MaterializeError> {
    let Some(kind) = asset.template_kind else {
        warn!(asset = %asset.id, "template asset without a subtype, skipping");
        return Ok(None);
    };
    let Some(definition) = templates.definition(kind) else {
        debug!(asset = %asset.id, ?kind, "no template registered, skipping");
        return Ok(None);
    };

    let mut root = definition.base.clone();
    root.name = asset.name.clone();
    root.active = false;
    root.set_tag_recursive(NodeTag::AssetTemplate);

    let payload = asset.template_payload.as_deref().unwrap_or("{}");
    let (config, image_reference) = match kind {
        TemplateKind::Image => {
            let config: ImageTemplateConfig = serde_json::from_str(payload)
                .map_err(|error| MaterializeError::BadTemplateConfig(error.to_string()))?;
            let reference = config.image_id.clone();
            (TemplateConfig::Image(config), Some(reference))
        }
        TemplateKind::Billboard => {
            let config: BillboardTemplateConfig = serde_json::from_str(payload)
                .map_err(|error| MaterializeError::BadTemplateConfig(error.to_string()))?;
            let reference = config.image_id.clone();
            (TemplateConfig::Billboard(config), Some(reference))
        }
        TemplateKind::SpawnPoint => (TemplateConfig::SpawnPoint, None),
    };

    let mut binding = ImageBinding::NotRequested;
    let mut task = None;
    if let Some(reference) = image_reference {
        match ImageId::parse(&reference) {
            Some(image_id) => {
                debug!(asset = %asset.id, image = %image_id, "image load deferred");
                task = Some(ImageTask::spawn(
                    thumbnails.clone(),
                    image_id,
                    settings.format,
                    settings.max_width,
                    settings.max_height,
                ));
                binding = ImageBinding::Pending;
            }
            None => {
                if !reference.is_empty() {
                    warn!(asset = %asset.id, reference = %reference, "malformed image reference");
                }
                bind_empty_image(&mut root);
                binding = ImageBinding::Empty;
            }
        }
    }

    Ok(Some((
        MaterializedAsset {
            asset_id: asset.id.clone(),
            kind: asset.kind,
            root,
            placeholder: false,
            bundle: None,
            template: Some(TemplateState {
                kind,
                config,
                image: binding,
            }),
        },
        task,
    )))
}

/// Put a template hierarchy into its no-image state.
pub(crate) fn bind_empty_image(root: &mut SceneNode) {
    if let Some(loader) = root.find_by_name_mut(IMAGE_LOADER_NODE) {
        loader.active = false;
    }
}
