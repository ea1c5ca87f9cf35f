//! Prefab-bundle materialization: platform bundle file → extracted object.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{BundleMeta, MaterializeError, MaterializedAsset};
use crate::catalog::ProjectAsset;
use crate::providers::{BundleProvider, PlatformBundleResolver};
use crate::scene::NodeTag;

/// Extension bundle payloads are stored under.
pub const BUNDLE_EXTENSION: &str = "assetbundle";

/// Derive the platform-independent file prefix from a bundle file path.
///
/// Bundle names carry platform and extension as trailing dot-segments
/// (`name.platform.assetbundle`); older payloads carry only the extension
/// (`name.assetbundle`). Anything without a dot is malformed.
pub fn platform_file_prefix(bundle_file: &str) -> Result<String, MaterializeError> {
    let parts: Vec<&str> = bundle_file.split('.').collect();
    if parts.len() > 2 {
        Ok(parts[..parts.len() - 2].join("."))
    } else if parts.len() == 2 {
        Ok(parts[0].to_owned())
    } else {
        Err(MaterializeError::MalformedBundleName(bundle_file.to_owned()))
    }
}

/// Materialize one prefab-bundle asset from its payload directory.
///
/// The extracted object is kept; the bundle resource itself is released
/// immediately after extraction, success or not.
pub async fn materialize(
    asset: &mut ProjectAsset,
    payload_dir: &Path,
    platform: &dyn PlatformBundleResolver,
    bundles: &dyn BundleProvider,
) -> Result<Option<MaterializedAsset>, MaterializeError> {
    let Some(bundle_file) = find_bundle_file(payload_dir)? else {
        warn!(asset = %asset.id, "no bundle file in payload, skipping");
        return Ok(None);
    };

    let prefix = platform_file_prefix(&bundle_file.to_string_lossy())?;
    let platform_file = platform.bundle_file_for_platform(&prefix);
    if !platform_file.is_file() {
        return Err(MaterializeError::MissingBundleFile(platform_file));
    }

    let url = format!("file:///{}", platform_file.display());
    debug!(asset = %asset.id, url = %url, "loading prefab bundle");
    let mut bundle = bundles
        .load_bundle(&url)
        .await
        .map_err(|error| MaterializeError::BundleLoad(error.to_string()))?;

    let extracted = bundle.extract(&asset.data_url);
    bundle.release(false);

    let Some(mut node) = extracted else {
        return Err(MaterializeError::ExtractFailed {
            object: asset.data_url.clone(),
        });
    };

    let object_name = node.name.clone();
    node.name = asset.name.clone();
    node.active = false;
    node.set_tag_recursive(NodeTag::AssetTemplate);

    Ok(Some(MaterializedAsset {
        asset_id: asset.id.clone(),
        kind: asset.kind,
        root: node,
        placeholder: false,
        bundle: Some(BundleMeta {
            object_name,
            source_url: asset.data_url.clone(),
        }),
        template: None,
    }))
}

/// First file in `dir` carrying the bundle extension.
fn find_bundle_file(dir: &Path) -> Result<Option<PathBuf>, MaterializeError> {
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
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(BUNDLE_EXTENSION))
        {
            return Ok(Some(path));
        }
    }
    Ok(None)
}
