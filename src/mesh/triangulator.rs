//! Fan triangulation of `-1`-separated polygon index lists.

use crate::mesh::{Mesh, PolygonMesh};

/// Converts [`PolygonMesh`] face lists into triangle meshes. Failure details
/// are kept in [`error_message`](Self::error_message) so the caller can
/// attach document positions.
#[derive(Debug, Default)]
pub struct PolygonTriangulator {
    error: String,
}

impl PolygonTriangulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn error_message(&self) -> &str {
        &self.error
    }

    /// Fan-triangulates every polygon in `polygon`. Vertex positions are kept
    /// as-is, and per-corner texture coordinate indices are carried through
    /// in step with the generated triangles.
    pub fn triangulate(&mut self, polygon: &PolygonMesh) -> Option<Mesh> {
        self.error.clear();

        let mut mesh = Mesh::new();
        mesh.vertices = polygon.vertices.clone();
        let vertex_count = mesh.vertices.len() as i64;

        // Texture coordinates reuse the polygon layout: either a dedicated
        // index list shaped like the vertex list, or the vertex indices
        // themselves when coordinates are given per vertex.
        let tex_indices: Option<&[i32]> = if !polygon.tex_coord_indices.is_empty() {
            if polygon.tex_coord_indices.len() != polygon.polygon_vertices.len() {
                self.error =
                    "the number of texture coordinate indices does not match the polygon list"
                        .to_owned();
                return None;
            }
            Some(&polygon.tex_coord_indices)
        } else if !polygon.tex_coords.is_empty() {
            Some(&polygon.polygon_vertices)
        } else {
            None
        };
        let tex_count = polygon.tex_coords.len() as i64;

        let mut polygon_number = 0;
        let mut begin = 0;
        let list = &polygon.polygon_vertices;
        for end in 0..=list.len() {
            let at_separator = end == list.len() || list[end] < 0;
            if !at_separator {
                continue;
            }
            if begin == end {
                begin = end + 1;
                continue;
            }
            polygon_number += 1;
            let face = &list[begin..end];
            if face.len() < 3 {
                self.error = format!(
                    "polygon {} has only {} vertices",
                    polygon_number,
                    face.len()
                );
                return None;
            }
            for &v in face {
                if i64::from(v) >= vertex_count {
                    self.error = format!("vertex index {v} is out of range");
                    return None;
                }
            }
            for t in 1..face.len() - 1 {
                mesh.add_triangle(face[0] as u32, face[t] as u32, face[t + 1] as u32);
            }
            if let Some(indices) = tex_indices {
                let face_tex = &indices[begin..end];
                for &i in face_tex {
                    if i < 0 || i64::from(i) >= tex_count {
                        self.error = format!("texture coordinate index {i} is out of range");
                        return None;
                    }
                }
                for t in 1..face_tex.len() - 1 {
                    mesh.tex_coord_indices.push(face_tex[0] as u32);
                    mesh.tex_coord_indices.push(face_tex[t] as u32);
                    mesh.tex_coord_indices.push(face_tex[t + 1] as u32);
                }
            }
            begin = end + 1;
        }

        if tex_indices.is_some() {
            mesh.tex_coords = polygon.tex_coords.clone();
        }
        Some(mesh)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn quad_becomes_two_triangles() {
        let polygon = PolygonMesh {
            vertices: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            polygon_vertices: vec![0, 1, 2, 3, -1],
            ..PolygonMesh::default()
        };
        let mut triangulator = PolygonTriangulator::new();
        let mesh = triangulator.triangulate(&polygon).unwrap();
        assert_eq!(mesh.triangles, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.vertices, polygon.vertices);
    }

    #[test]
    fn short_polygon_is_reported() {
        let polygon = PolygonMesh {
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            polygon_vertices: vec![0, 1, 2, -1, 0, 1, -1],
            ..PolygonMesh::default()
        };
        let mut triangulator = PolygonTriangulator::new();
        assert!(triangulator.triangulate(&polygon).is_none());
        assert!(triangulator.error_message().contains("polygon 2"));
    }

    #[test]
    fn out_of_range_index_is_reported() {
        let polygon = PolygonMesh {
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            polygon_vertices: vec![0, 1, 5, -1],
            ..PolygonMesh::default()
        };
        let mut triangulator = PolygonTriangulator::new();
        assert!(triangulator.triangulate(&polygon).is_none());
        assert!(triangulator.error_message().contains('5'));
    }
}
