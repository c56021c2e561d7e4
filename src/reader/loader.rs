//! Hook for loading non-document scene files referenced as resources.

use std::path::Path;

use crate::errors::Result;
use crate::scene::{NodeHandle, SceneGraph};

/// Loads scene files in formats the document reader does not understand
/// itself (mesh formats such as STL or COLLADA). Implementations build the
/// loaded scene into `graph` and return its root handle.
pub trait SceneFileLoader {
    fn load(&mut self, graph: &mut SceneGraph, path: &Path) -> Result<NodeHandle>;

    /// Forwarded from the reader so loaders that tessellate can match the
    /// reader's resolution.
    fn set_default_division_number(&mut self, _n: u32) {}
}
