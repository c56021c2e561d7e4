//! Scene graph: arena storage, node variants and the data they carry.

mod graph;
pub mod light;
pub mod material;
mod node;

pub use graph::{NodeHandle, SceneGraph};
pub use node::{NodeKind, SceneNode, Shape};
