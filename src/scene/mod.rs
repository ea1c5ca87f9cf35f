//! simulacrum::scene - the instantiable node hierarchy
//!
//! Public submodules:
//! - node (SceneNode, NodeTag)

pub mod node;

pub use node::{NodeTag, SceneNode};
