//! Arena-backed scene graph.
//!
//! Nodes live in a slotmap and refer to each other by handle, so a cached
//! resource subgraph can be shared into several places of the final scene
//! by inserting the same handle under several parents. Callers that need
//! structural independence take a [`SceneGraph::clone_subtree`] copy first.

use slotmap::{new_key_type, SlotMap};

use crate::scene::node::{NodeKind, SceneNode};

new_key_type! {
    /// Handle to a node stored in a [`SceneGraph`].
    pub struct NodeHandle;
}

/// Owns every node a reader builds; outputs of all reads within one reader
/// share this arena.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeHandle, SceneNode>,
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: SceneNode) -> NodeHandle {
        self.nodes.insert(node)
    }

    pub fn add_kind(&mut self, kind: NodeKind) -> NodeHandle {
        self.nodes.insert(SceneNode::new(kind))
    }

    #[must_use]
    pub fn get(&self, handle: NodeHandle) -> Option<&SceneNode> {
        self.nodes.get(handle)
    }

    #[must_use]
    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut SceneNode> {
        self.nodes.get_mut(handle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends `child` to `parent`'s children. Only group-like parents can
    /// carry children.
    pub fn attach(&mut self, parent: NodeHandle, child: NodeHandle) {
        if let Some(node) = self.nodes.get_mut(parent) {
            debug_assert!(node.kind.is_group_like());
            node.children.push(child);
        }
    }

    /// Removes the first occurrence of `child` from `parent`'s children.
    /// Returns false when `child` was not a child of `parent`. The detached
    /// subtree stays in the arena.
    pub fn detach(&mut self, parent: NodeHandle, child: NodeHandle) -> bool {
        if let Some(node) = self.nodes.get_mut(parent) {
            if let Some(index) = node.children.iter().position(|&c| c == child) {
                node.children.remove(index);
                return true;
            }
        }
        false
    }

    /// Removes `handle` from the arena. Children are not touched; callers
    /// detach or re-home them first.
    pub fn remove(&mut self, handle: NodeHandle) -> Option<SceneNode> {
        self.nodes.remove(handle)
    }

    /// Moves all children of `from` onto `to`, preserving order.
    pub fn move_children(&mut self, from: NodeHandle, to: NodeHandle) {
        let children = match self.nodes.get_mut(from) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        if let Some(node) = self.nodes.get_mut(to) {
            debug_assert!(node.kind.is_group_like());
            node.children.extend(children);
        }
    }

    /// Deep-copies the subtree rooted at `root` and returns the copy's root.
    pub fn clone_subtree(&mut self, root: NodeHandle) -> NodeHandle {
        let mut copy = match self.nodes.get(root) {
            Some(node) => node.clone(),
            None => return root,
        };
        let children = std::mem::take(&mut copy.children);
        let new_root = self.nodes.insert(copy);
        for child in children {
            let new_child = self.clone_subtree(child);
            self.attach(new_root, new_child);
        }
        new_root
    }

    /// Depth-first search for the first node named `name` within the subtree
    /// rooted at `root` (the root itself included).
    #[must_use]
    pub fn find_by_name(&self, root: NodeHandle, name: &str) -> Option<NodeHandle> {
        let node = self.nodes.get(root)?;
        if node.name() == Some(name) {
            return Some(root);
        }
        node.children
            .iter()
            .find_map(|&child| self.find_by_name(child, name))
    }

    /// Number of nodes in the subtree rooted at `root` (shared nodes counted
    /// once per occurrence).
    #[must_use]
    pub fn subtree_len(&self, root: NodeHandle) -> usize {
        match self.nodes.get(root) {
            None => 0,
            Some(node) => {
                1 + node
                    .children
                    .iter()
                    .map(|&child| self.subtree_len(child))
                    .sum::<usize>()
            }
        }
    }
}

impl std::ops::Index<NodeHandle> for SceneGraph {
    type Output = SceneNode;

    fn index(&self, handle: NodeHandle) -> &SceneNode {
        &self.nodes[handle]
    }
}

impl std::ops::IndexMut<NodeHandle> for SceneGraph {
    fn index_mut(&mut self, handle: NodeHandle) -> &mut SceneNode {
        &mut self.nodes[handle]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_and_detach() {
        let mut graph = SceneGraph::new();
        let parent = graph.add_node(SceneNode::group());
        let child = graph.add_node(SceneNode::group());
        graph.attach(parent, child);
        assert_eq!(graph[parent].children(), &[child]);
        assert!(graph.detach(parent, child));
        assert!(!graph.detach(parent, child));
        assert!(graph[parent].children().is_empty());
        // Detached nodes stay alive.
        assert!(graph.get(child).is_some());
    }

    #[test]
    fn clone_subtree_is_independent() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(SceneNode::group());
        let mut named = SceneNode::group();
        named.name = Some("leaf".into());
        let child = graph.add_node(named);
        graph.attach(root, child);

        let copy = graph.clone_subtree(root);
        assert_ne!(copy, root);
        assert_eq!(graph.subtree_len(copy), 2);

        let copied_child = graph[copy].children()[0];
        graph[copied_child].name = Some("renamed".into());
        assert_eq!(graph[child].name(), Some("leaf"));
    }

    #[test]
    fn find_by_name_searches_depth_first() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(SceneNode::group());
        let mid = graph.add_node(SceneNode::group());
        let mut named = SceneNode::group();
        named.name = Some("target".into());
        let leaf = graph.add_node(named);
        graph.attach(root, mid);
        graph.attach(mid, leaf);
        assert_eq!(graph.find_by_name(root, "target"), Some(leaf));
        assert_eq!(graph.find_by_name(root, "absent"), None);
    }
}
