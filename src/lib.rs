#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Declarative scene descriptions.
//!
//! `scenedoc` loads YAML scene descriptions into a typed scene graph:
//! documents are parsed into a position-carrying [`document::Value`] tree,
//! and [`reader::SceneReader`] turns scene values into
//! [`scene::SceneGraph`] nodes with meshes, materials, textures and lights.
//! External files referenced through `Resource` nodes are cached per reader
//! and can be pulled in whole, by node name, or with named subtrees
//! excluded.

pub mod document;
pub mod errors;
pub mod mesh;
pub mod reader;
pub mod scene;

pub use document::{Mapping, Pos, Value};
pub use errors::{Error, Result};
pub use mesh::{Mesh, MeshGenerator, Primitive};
pub use reader::{
    AngleUnit, PathVariableProcessor, Resource, SceneFileLoader, SceneReader, UriSchemeRegistry,
};
pub use scene::{NodeHandle, NodeKind, SceneGraph, SceneNode};
