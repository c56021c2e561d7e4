//! Triangle meshes, primitive tessellation and mesh post-processing.

mod filter;
mod generator;
mod triangulator;

pub use filter::{generate_normals, generate_normals_ex};
pub use generator::{generate_texture_coordinates, ElevationGrid, Extrusion, MeshGenerator};
pub use triangulator::PolygonTriangulator;

use glam::{Vec2, Vec3};

/// Parameters of the primitive a mesh was generated from, kept so downstream
/// consumers (physics, exporters) can recover the analytic shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Box {
        size: Vec3,
    },
    Sphere {
        radius: f32,
    },
    Cylinder {
        radius: f32,
        height: f32,
        top: bool,
        bottom: bool,
    },
    Cone {
        radius: f32,
        height: f32,
        bottom: bool,
    },
    Capsule {
        radius: f32,
        height: f32,
    },
}

impl Primitive {
    /// Short noun used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Primitive::Box { .. } => "box",
            Primitive::Sphere { .. } => "sphere",
            Primitive::Cylinder { .. } => "cylinder",
            Primitive::Cone { .. } => "cone",
            Primitive::Capsule { .. } => "capsule",
        }
    }
}

/// A triangle mesh.
///
/// `triangles` holds three vertex indices per triangle. Normals and texture
/// coordinates are indexed per corner through their own index arrays so that
/// generating them never rewrites `vertices`; an empty index array means the
/// attribute is absent.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<u32>,
    pub normals: Vec<Vec3>,
    pub normal_indices: Vec<u32>,
    pub tex_coords: Vec<Vec2>,
    pub tex_coord_indices: Vec<u32>,
    pub primitive: Option<Primitive>,
    /// Closed-volume hint used by collision/culling consumers.
    pub solid: bool,
    /// Crease angle (radians) the normals were generated with.
    pub crease_angle: f32,
}

impl Mesh {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    #[must_use]
    pub fn has_normals(&self) -> bool {
        !self.normal_indices.is_empty()
    }

    #[must_use]
    pub fn has_tex_coords(&self) -> bool {
        !self.tex_coord_indices.is_empty()
    }

    pub fn add_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.triangles.extend_from_slice(&[a, b, c]);
    }

    /// The three corner indices of triangle `index`.
    #[must_use]
    pub fn triangle(&self, index: usize) -> (u32, u32, u32) {
        let i = index * 3;
        (self.triangles[i], self.triangles[i + 1], self.triangles[i + 2])
    }
}

/// Intermediate polygon soup read from an IndexedFaceSet: polygons are runs
/// of vertex indices separated by `-1`, as in VRML `coordIndex`.
#[derive(Debug, Clone, Default)]
pub struct PolygonMesh {
    pub vertices: Vec<Vec3>,
    pub polygon_vertices: Vec<i32>,
    pub tex_coords: Vec<Vec2>,
    pub tex_coord_indices: Vec<i32>,
}
