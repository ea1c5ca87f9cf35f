use std::fmt;

/// Marker applied recursively to a node hierarchy so later stages can tell
/// staged template originals apart from placed scene content.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeTag {
    /// No classification yet (freshly decoded or constructed content).
    Untagged,
    /// A materialized template original held by the registry.
    AssetTemplate,
    /// An instance placed into the assembled scene.
    SceneAsset,
}

/// A node in the instantiable hierarchy.
///
/// Children are stored as `Vec<Box<SceneNode>>` to avoid recursive-size
/// issues. The hierarchy is deliberately renderer-agnostic: it records
/// names, activation and tags, and leaves geometry payloads to the
/// mesh-decode collaborator that produced them.
#[derive(Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub active: bool,
    pub tag: NodeTag,
    pub children: Vec<Box<SceneNode>>,
}

impl SceneNode {
    /// Create a new active, untagged node with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            tag: NodeTag::Untagged,
            children: Vec::new(),
        }
    }

    /// Push a child node.
    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(Box::new(child));
    }

    /// Apply a tag to this node and every descendant.
    pub fn set_tag_recursive(&mut self, tag: NodeTag) {
        self.traverse_mut(&mut |node| node.tag = tag);
    }

    /// Pre-order traversal (immutable).
    pub fn traverse<F: FnMut(&SceneNode)>(&self, f: &mut F) {
        f(self);
        for child in &self.children {
            child.traverse(f);
        }
    }

    /// Pre-order traversal (mutable).
    pub fn traverse_mut<F: FnMut(&mut SceneNode)>(&mut self, f: &mut F) {
        f(self);
        for child in &mut self.children {
            child.traverse_mut(f);
        }
    }

    /// Find first node by name (immutable, pre-order).
    pub fn find_by_name(&self, target: &str) -> Option<&SceneNode> {
        if self.name == target {
            return Some(self);
        }
        for child in &self.children {
            if let Some(found) = child.find_by_name(target) {
                return Some(found);
            }
        }
        None
    }

    /// Find first node by name (mutable, pre-order).
    pub fn find_by_name_mut(&mut self, target: &str) -> Option<&mut SceneNode> {
        if self.name == target {
            return Some(self);
        }
        for child in &mut self.children {
            if let Some(found) = child.find_by_name_mut(target) {
                return Some(found);
            }
        }
        None
    }

    /// Total node count including this node.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.traverse(&mut |_| count += 1);
        count
    }
}

impl fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keep debug concise: name, state and counts
        f.debug_struct("SceneNode")
            .field("name", &self.name)
            .field("active", &self.active)
            .field("tag", &self.tag)
            .field("children_count", &self.children.len())
            .finish()
    }
}

impl fmt::Display for SceneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SceneNode(\"{}\", active={}, children={})",
            self.name,
            self.active,
            self.children.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_node_basic_operations() {
        let mut root = SceneNode::new("root");
        let mut child = SceneNode::new("surface");
        child.add_child(SceneNode::new("detail"));
        root.add_child(child);

        let mut names = Vec::new();
        root.traverse(&mut |node| names.push(node.name.clone()));
        assert_eq!(names, vec!["root", "surface", "detail"]);

        assert!(root.find_by_name("detail").is_some());
        assert!(root.find_by_name("missing").is_none());
        assert_eq!(root.node_count(), 3);
    }

    #[test]
    fn tags_apply_recursively() {
        let mut root = SceneNode::new("root");
        root.add_child(SceneNode::new("child"));
        root.set_tag_recursive(NodeTag::AssetTemplate);

        let mut tags = Vec::new();
        root.traverse(&mut |node| tags.push(node.tag));
        assert!(tags.iter().all(|t| *t == NodeTag::AssetTemplate));
    }
}
