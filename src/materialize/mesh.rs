//! Mesh-bundle materialization: cached descriptor → decoded hierarchy.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{MaterializeError, MaterializedAsset};
use crate::catalog::ProjectAsset;
use crate::providers::{MeshDecodeOptions, MeshDecodeProvider};
use crate::scene::{NodeTag, SceneNode};

/// File stem of the descriptor the decoder is pointed at.
pub const MESH_DESCRIPTOR_STEM: &str = "mesh";

/// Materialize one mesh-bundle asset from its payload directory.
///
/// A missing payload directory yields a placeholder and marks the asset
/// (handled, not fatal); a payload with no descriptor is skipped entirely.
pub async fn materialize(
    asset: &mut ProjectAsset,
    payload_dir: &Path,
    decoder: &dyn MeshDecodeProvider,
) -> Result<Option<MaterializedAsset>, MaterializeError> {
    if !payload_dir.is_dir() {
        warn!(asset = %asset.id, "payload directory missing, staging placeholder");
        asset.mark_error("Asset data missing. Please re-import.");
        return Ok(Some(MaterializedAsset::placeholder(asset)));
    }

    let Some(descriptor) = find_descriptor(payload_dir)? else {
        warn!(asset = %asset.id, "no mesh descriptor in payload, skipping");
        return Ok(None);
    };

    let descriptor_kind = descriptor
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    debug!(asset = %asset.id, kind = %descriptor_kind, "decoding mesh descriptor");

    let options = MeshDecodeOptions {
        base_dir: payload_dir.to_path_buf(),
        descriptor_kind,
        generate_colliders: true,
    };
    let decoded = decoder
        .decode_scene(&descriptor, &options)
        .await
        .map_err(|error| MaterializeError::Decode(error.to_string()))?;

    let mut root = SceneNode::new(asset.name.clone());
    root.add_child(decoded);
    root.active = false;
    root.set_tag_recursive(NodeTag::AssetTemplate);

    Ok(Some(MaterializedAsset {
        asset_id: asset.id.clone(),
        kind: asset.kind,
        root,
        placeholder: false,
        bundle: None,
        template: None,
    }))
}

/// First file in `dir` whose stem is the descriptor stem.
fn find_descriptor(dir: &Path) -> Result<Option<PathBuf>, MaterializeError> {
    let entries = std::fs::read_dir(dir).map_err(|source| MaterializeError::Payload {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| MaterializeError::Payload {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file()
            && path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem == MESH_DESCRIPTOR_STEM)
        {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AssetKind, AssetStatus};
    use crate::providers::testing::{FailingMeshDecoder, StubMeshDecoder};

    fn asset() -> ProjectAsset {
        ProjectAsset {
            id: "mesh-1".into(),
            project_id: "p1".into(),
            kind: AssetKind::MeshBundle,
            template_kind: None,
            name: "fountain".into(),
            data_url: String::new(),
            template_payload: None,
            status: AssetStatus::Pending,
            status_message: None,
        }
    }

    #[tokio::test]
    async fn missing_payload_stages_inactive_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let mut asset = asset();
        let result = materialize(
            &mut asset,
            &dir.path().join("absent"),
            &StubMeshDecoder,
        )
        .await
        .unwrap()
        .unwrap();

        assert!(result.placeholder);
        assert!(!result.root.active);
        assert_eq!(result.root.name, "fountain");
        assert_eq!(asset.status, AssetStatus::Error);
        assert!(asset.status_message.as_deref().unwrap().contains("re-import"));
    }

    #[tokio::test]
    async fn payload_without_descriptor_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("texture.png"), b"pixels").unwrap();
        let mut asset = asset();

        let result = materialize(&mut asset, dir.path(), &StubMeshDecoder)
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(asset.status, AssetStatus::Pending);
    }

    #[tokio::test]
    async fn descriptor_decodes_into_inactive_tagged_hierarchy() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mesh.gltf"), b"{}").unwrap();
        let mut asset = asset();

        let result = materialize(&mut asset, dir.path(), &StubMeshDecoder)
            .await
            .unwrap()
            .unwrap();

        assert!(!result.placeholder);
        assert!(!result.root.active);
        assert_eq!(result.root.name, "fountain");
        assert_eq!(result.root.children.len(), 1);
        let mut tags_ok = true;
        result
            .root
            .traverse(&mut |node| tags_ok &= node.tag == NodeTag::AssetTemplate);
        assert!(tags_ok);
    }

    #[tokio::test]
    async fn decode_failure_is_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mesh.gltf"), b"junk").unwrap();
        let mut asset = asset();

        let result = materialize(&mut asset, dir.path(), &FailingMeshDecoder).await;
        assert!(matches!(result, Err(MaterializeError::Decode(_))));
    }
}
