// src/catalog/ids.rs
// Newtype identifiers for scenes, projects, assets and images.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

string_id!(
    /// Identifier of a viewable space (a scene).
    SceneId
);
string_id!(
    /// Identifier of the project that owns a scene's assets.
    ProjectId
);
string_id!(
    /// Identifier of a logical content unit referenced by placements.
    AssetId
);
string_id!(
    /// Identifier of a placement record inside a scene.
    SceneAssetId
);

/// Identifier of a remotely stored image referenced by template payloads.
///
/// Template configuration arrives as free-form JSON; the image reference in
/// it is only usable once it parses as a canonical 8-4-4-4-12 hex id, so the
/// constructor is the validation gate.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    /// Parse a canonical-form id, returning `None` for anything malformed.
    pub fn parse(value: &str) -> Option<Self> {
        let groups: Vec<&str> = value.split('-').collect();
        let expected = [8usize, 4, 4, 4, 12];
        if groups.len() != expected.len() {
            return None;
        }
        for (group, len) in groups.iter().zip(expected) {
            if group.len() != len || !group.chars().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }
        }
        Some(Self(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
