//! Scene node data.
//!
//! A node is a name, a kind and (for group-like kinds) an ordered list of
//! child handles. Only hierarchy and local spatial data live here; meshes,
//! materials and light parameters are plain values owned by their variant.

use std::sync::Arc;

use glam::{Mat3, Vec3};

use crate::mesh::Mesh;
use crate::scene::light::{DirectionalLight, SpotLight};
use crate::scene::material::{Material, Texture};
use crate::scene::NodeHandle;

/// One shape: a mesh with optional surface appearance.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    pub mesh: Option<Arc<Mesh>>,
    pub material: Option<Material>,
    pub texture: Option<Texture>,
}

/// The closed set of scene node variants.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A placeholder leaf (`type: Node`). Never elided.
    Empty,
    /// Ordered children, no transform.
    Group,
    /// Rotation and translation applied to the subtree.
    PositionalTransform { rotation: Mat3, translation: Vec3 },
    /// Non-uniform scale applied to the subtree.
    ScaleTransform { scale: Vec3 },
    /// General linear part plus translation; produced when folding rotation
    /// onto a scaled subtree.
    AffineTransform { linear: Mat3, translation: Vec3 },
    Shape(Shape),
    DirectionalLight(DirectionalLight),
    SpotLight(SpotLight),
}

impl NodeKind {
    /// Group-like kinds may carry children.
    #[must_use]
    pub fn is_group_like(&self) -> bool {
        matches!(
            self,
            NodeKind::Group
                | NodeKind::PositionalTransform { .. }
                | NodeKind::ScaleTransform { .. }
                | NodeKind::AffineTransform { .. }
        )
    }
}

/// A scene graph node.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: Option<String>,
    pub kind: NodeKind,
    pub children: Vec<NodeHandle>,
}

impl SceneNode {
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            kind,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// The linear part this node contributes to descendant coordinates,
    /// identity for non-transform kinds.
    #[must_use]
    pub fn local_linear(&self) -> Mat3 {
        match &self.kind {
            NodeKind::PositionalTransform { rotation, .. } => *rotation,
            NodeKind::ScaleTransform { scale } => Mat3::from_diagonal(*scale),
            NodeKind::AffineTransform { linear, .. } => *linear,
            _ => Mat3::IDENTITY,
        }
    }
}
