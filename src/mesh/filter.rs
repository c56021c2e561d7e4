//! Normal generation for triangle meshes.

use glam::Vec3;
use rustc_hash::FxHashMap;

use crate::mesh::Mesh;

/// Computes smooth normals for `mesh`, keeping any normals already present.
/// Faces whose angle exceeds `crease_angle` keep a hard edge between them.
pub fn generate_normals(mesh: &mut Mesh, crease_angle: f32) {
    generate_normals_ex(mesh, crease_angle, false, false);
}

/// Full-control variant of [`generate_normals`].
///
/// With `overwrite` the existing normals are discarded first. With
/// `remove_redundant_vertices` positionally identical vertices are merged
/// before adjacency is built, so seams introduced by per-ring duplication
/// smooth across.
pub fn generate_normals_ex(
    mesh: &mut Mesh,
    crease_angle: f32,
    overwrite: bool,
    remove_redundant_vertices: bool,
) {
    if mesh.has_normals() && !overwrite {
        return;
    }
    if remove_redundant_vertices {
        merge_identical_vertices(mesh);
    }

    let face_count = mesh.triangle_count();
    let mut face_normals = Vec::with_capacity(face_count);
    let mut vertex_faces: Vec<Vec<u32>> = vec![Vec::new(); mesh.vertices.len()];
    for f in 0..face_count {
        let (a, b, c) = mesh.triangle(f);
        let pa = mesh.vertices[a as usize];
        let n = (mesh.vertices[b as usize] - pa)
            .cross(mesh.vertices[c as usize] - pa)
            .normalize_or_zero();
        face_normals.push(n);
        for v in [a, b, c] {
            vertex_faces[v as usize].push(f as u32);
        }
    }

    let cos_crease = crease_angle.cos();
    mesh.normals.clear();
    mesh.normal_indices.clear();
    mesh.normal_indices.reserve(face_count * 3);

    for f in 0..face_count {
        let (a, b, c) = mesh.triangle(f);
        let fn_f = face_normals[f];
        for v in [a, b, c] {
            let mut sum = Vec3::ZERO;
            for &g in &vertex_faces[v as usize] {
                let fn_g = face_normals[g as usize];
                if fn_f.dot(fn_g) >= cos_crease - 1.0e-6 {
                    sum += fn_g;
                }
            }
            let n = sum.try_normalize().unwrap_or(fn_f);
            mesh.normals.push(n);
            mesh.normal_indices.push(mesh.normals.len() as u32 - 1);
        }
    }
    mesh.crease_angle = crease_angle;
}

/// Remaps triangles so that vertices with bit-identical positions collapse
/// into one, then drops the unused positions.
fn merge_identical_vertices(mesh: &mut Mesh) {
    let mut first_at: FxHashMap<[u32; 3], u32> = FxHashMap::default();
    let mut remap = Vec::with_capacity(mesh.vertices.len());
    let mut kept = Vec::with_capacity(mesh.vertices.len());
    for v in &mesh.vertices {
        let key = [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()];
        let index = *first_at.entry(key).or_insert_with(|| {
            kept.push(*v);
            kept.len() as u32 - 1
        });
        remap.push(index);
    }
    if kept.len() == mesh.vertices.len() {
        return;
    }
    for t in &mut mesh.triangles {
        *t = remap[*t as usize];
    }
    mesh.vertices = kept;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        mesh.add_triangle(0, 1, 2);
        mesh.add_triangle(0, 2, 3);
        mesh
    }

    #[test]
    fn flat_quad_gets_uniform_normals() {
        let mut mesh = quad();
        generate_normals(&mut mesh, 0.5);
        assert_eq!(mesh.normal_indices.len(), 6);
        for &i in &mesh.normal_indices {
            let n = mesh.normals[i as usize];
            assert!((n - Vec3::Z).length() < 1.0e-5);
        }
    }

    #[test]
    fn existing_normals_survive_without_overwrite() {
        let mut mesh = quad();
        mesh.normals.push(Vec3::Y);
        mesh.normal_indices = vec![0; 6];
        generate_normals(&mut mesh, 0.5);
        assert_eq!(mesh.normals, vec![Vec3::Y]);
        generate_normals_ex(&mut mesh, 0.5, true, false);
        assert_eq!(mesh.normal_indices.len(), 6);
        assert!((mesh.normals[0] - Vec3::Z).length() < 1.0e-5);
    }

    #[test]
    fn redundant_vertices_are_merged() {
        let mut mesh = Mesh::new();
        mesh.vertices = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0), // duplicate of 0
            Vec3::new(1.0, 1.0, 0.0), // duplicate of 2
            Vec3::new(0.0, 1.0, 0.0),
        ];
        mesh.add_triangle(0, 1, 2);
        mesh.add_triangle(3, 4, 5);
        generate_normals_ex(&mut mesh, 0.5, true, true);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.triangles, vec![0, 1, 2, 0, 2, 3]);
    }
}
