//! Primitive tessellation.
//!
//! Turns primitive parameter records into triangle meshes. Invalid
//! parameters (non-positive extents, too few profile points, a height array
//! that does not cover the grid) yield `None`; the readers turn that into a
//! fatal error naming the primitive kind.

use std::f32::consts::PI;

use glam::{Mat3, Vec2, Vec3};

use crate::mesh::filter::generate_normals_ex;
use crate::mesh::{Mesh, Primitive};

/// Parameters of an `Extrusion` geometry: a 2D cross-section swept along a
/// spine, with optional per-point orientation and scale.
#[derive(Debug, Clone)]
pub struct Extrusion {
    pub cross_section: Vec<Vec2>,
    pub spine: Vec<Vec3>,
    /// Angle-axis orientation per spine point; the last entry repeats when
    /// the list is shorter than the spine.
    pub orientation: Vec<(Vec3, f32)>,
    /// Cross-section scale per spine point; the last entry repeats.
    pub scale: Vec<Vec2>,
    pub begin_cap: bool,
    pub end_cap: bool,
    pub crease_angle: f32,
}

impl Default for Extrusion {
    fn default() -> Self {
        Self {
            cross_section: Vec::new(),
            spine: Vec::new(),
            orientation: Vec::new(),
            scale: Vec::new(),
            begin_cap: true,
            end_cap: true,
            crease_angle: 0.0,
        }
    }
}

/// Parameters of an `ElevationGrid` geometry: a regular XZ grid of heights.
#[derive(Debug, Clone)]
pub struct ElevationGrid {
    pub x_dimension: u32,
    pub z_dimension: u32,
    pub x_spacing: f32,
    pub z_spacing: f32,
    pub ccw: bool,
    pub crease_angle: f32,
    /// Row-major heights, `x + z * x_dimension`.
    pub height: Vec<f32>,
}

impl Default for ElevationGrid {
    fn default() -> Self {
        Self {
            x_dimension: 0,
            z_dimension: 0,
            x_spacing: 1.0,
            z_spacing: 1.0,
            ccw: true,
            crease_angle: 0.0,
            height: Vec::new(),
        }
    }
}

/// Crease angle used for curved primitive surfaces: ring faces smooth into
/// each other, cap faces stay hard.
const CURVED_SURFACE_CREASE: f32 = PI / 3.0;

/// Tessellates primitives into triangle meshes.
#[derive(Debug, Clone)]
pub struct MeshGenerator {
    division_number: u32,
}

impl Default for MeshGenerator {
    fn default() -> Self {
        Self {
            division_number: 20,
        }
    }
}

impl MeshGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_division_number(&mut self, n: u32) {
        self.division_number = n.max(3);
    }

    #[must_use]
    pub fn division_number(&self) -> u32 {
        self.division_number
    }

    /// Generates a mesh for `primitive`, overriding the generator's division
    /// number with `division` when given. Returns `None` when the parameters
    /// cannot produce a valid mesh.
    #[must_use]
    pub fn generate_primitive(
        &self,
        primitive: Primitive,
        division: Option<u32>,
    ) -> Option<Mesh> {
        let div = division.unwrap_or(self.division_number).max(3);
        let mut mesh = match primitive {
            Primitive::Box { size } => generate_box(size)?,
            Primitive::Sphere { radius } => generate_sphere(radius, Vec3::ZERO, div)?,
            Primitive::Cylinder {
                radius,
                height,
                top,
                bottom,
            } => generate_cylinder(radius, height, top, bottom, div)?,
            Primitive::Cone {
                radius,
                height,
                bottom,
            } => generate_cone(radius, height, bottom, div)?,
            Primitive::Capsule { radius, height } => generate_capsule(radius, height, div)?,
        };
        mesh.primitive = Some(primitive);
        Some(mesh)
    }

    /// Sweeps `extrusion.cross_section` along its spine.
    #[must_use]
    pub fn generate_extrusion(
        &self,
        extrusion: &Extrusion,
        generate_tex_coords: bool,
    ) -> Option<Mesh> {
        let section = &extrusion.cross_section;
        let spine = &extrusion.spine;
        if section.len() < 2 || spine.len() < 2 {
            return None;
        }

        let mut mesh = Mesh::new();
        let k = section.len() as u32;

        for (i, point) in spine.iter().enumerate() {
            let mut frame = spine_frame(spine, i);
            if let Some(&(axis, angle)) = pick_entry(&extrusion.orientation, i) {
                if axis.length_squared() > 1.0e-12 {
                    frame *= Mat3::from_axis_angle(axis.normalize(), angle);
                }
            }
            let scale = pick_entry(&extrusion.scale, i).copied().unwrap_or(Vec2::ONE);
            for s in section {
                let local = Vec3::new(s.x * scale.x, 0.0, s.y * scale.y);
                mesh.vertices.push(*point + frame * local);
            }
        }

        // Side walls between consecutive rings.
        for i in 0..spine.len() as u32 - 1 {
            let r0 = i * k;
            let r1 = (i + 1) * k;
            for j in 0..k - 1 {
                mesh.add_triangle(r0 + j, r1 + j, r1 + j + 1);
                mesh.add_triangle(r0 + j, r1 + j + 1, r0 + j + 1);
            }
        }

        // A section that repeats its first point is closed; skip the
        // duplicate when building cap fans.
        let closed = section.len() > 2 && section[0] == section[section.len() - 1];
        let cap_len = if closed { k - 1 } else { k };
        if extrusion.begin_cap && cap_len >= 3 {
            for j in 1..cap_len - 1 {
                mesh.add_triangle(0, j + 1, j);
            }
        }
        if extrusion.end_cap && cap_len >= 3 {
            let r = (spine.len() as u32 - 1) * k;
            for j in 1..cap_len - 1 {
                mesh.add_triangle(r, r + j, r + j + 1);
            }
        }

        generate_normals_ex(&mut mesh, extrusion.crease_angle, true, false);
        if generate_tex_coords {
            generate_texture_coordinates(&mut mesh);
        }
        Some(mesh)
    }

    /// Builds the height-field mesh of an `ElevationGrid`.
    #[must_use]
    pub fn generate_elevation_grid(
        &self,
        grid: &ElevationGrid,
        generate_tex_coords: bool,
    ) -> Option<Mesh> {
        let xd = grid.x_dimension as usize;
        let zd = grid.z_dimension as usize;
        if xd < 2 || zd < 2 || grid.height.len() != xd * zd {
            return None;
        }

        let mut mesh = Mesh::new();
        for z in 0..zd {
            for x in 0..xd {
                mesh.vertices.push(Vec3::new(
                    x as f32 * grid.x_spacing,
                    grid.height[x + z * xd],
                    z as f32 * grid.z_spacing,
                ));
            }
        }

        let stride = xd as u32;
        for z in 0..zd as u32 - 1 {
            for x in 0..stride - 1 {
                let v0 = z * stride + x;
                let v1 = v0 + 1;
                let v2 = v0 + stride;
                let v3 = v2 + 1;
                if grid.ccw {
                    mesh.add_triangle(v0, v3, v1);
                    mesh.add_triangle(v0, v2, v3);
                } else {
                    mesh.add_triangle(v0, v1, v3);
                    mesh.add_triangle(v0, v3, v2);
                }
            }
        }

        generate_normals_ex(&mut mesh, grid.crease_angle, true, false);
        if generate_tex_coords {
            for z in 0..zd {
                for x in 0..xd {
                    mesh.tex_coords.push(Vec2::new(
                        x as f32 / (xd - 1) as f32,
                        z as f32 / (zd - 1) as f32,
                    ));
                }
            }
            mesh.tex_coord_indices = mesh.triangles.clone();
        }
        Some(mesh)
    }
}

/// Box-projects texture coordinates from the two longest bounding-box axes.
/// Overwrites whatever coordinates the mesh had.
pub fn generate_texture_coordinates(mesh: &mut Mesh) {
    if mesh.vertices.is_empty() {
        return;
    }
    let mut min = mesh.vertices[0];
    let mut max = mesh.vertices[0];
    for v in &mesh.vertices {
        min = min.min(*v);
        max = max.max(*v);
    }
    let extent = max - min;

    // Sort axes by extent; u along the longest, v along the second.
    let mut axes = [0usize, 1, 2];
    axes.sort_by(|&a, &b| extent[b].partial_cmp(&extent[a]).unwrap_or(std::cmp::Ordering::Equal));
    let (ua, va) = (axes[0], axes[1]);
    let scale = if extent[ua] > 1.0e-6 { extent[ua] } else { 1.0 };

    mesh.tex_coords = mesh
        .vertices
        .iter()
        .map(|v| Vec2::new((v[ua] - min[ua]) / scale, (v[va] - min[va]) / scale))
        .collect();
    mesh.tex_coord_indices = mesh.triangles.clone();
}

fn pick_entry<T>(entries: &[T], i: usize) -> Option<&T> {
    if entries.is_empty() {
        None
    } else {
        Some(&entries[i.min(entries.len() - 1)])
    }
}

/// Tangent-aligned frame at spine point `i`: local Y follows the spine,
/// X/Z carry the cross-section plane.
fn spine_frame(spine: &[Vec3], i: usize) -> Mat3 {
    let next = spine[(i + 1).min(spine.len() - 1)];
    let prev = spine[i.saturating_sub(1)];
    let tangent = (next - prev).try_normalize().unwrap_or(Vec3::Y);
    let reference = if tangent.y.abs() > 0.99 { Vec3::X } else { Vec3::Y };
    let x = tangent.cross(reference).try_normalize().unwrap_or(Vec3::X);
    let z = x.cross(tangent);
    Mat3::from_cols(x, tangent, z)
}

fn generate_box(size: Vec3) -> Option<Mesh> {
    if size.min_element() <= 0.0 {
        return None;
    }
    let h = size * 0.5;
    let mut mesh = Mesh::new();
    mesh.vertices = vec![
        Vec3::new(-h.x, -h.y, -h.z),
        Vec3::new(h.x, -h.y, -h.z),
        Vec3::new(h.x, h.y, -h.z),
        Vec3::new(-h.x, h.y, -h.z),
        Vec3::new(-h.x, -h.y, h.z),
        Vec3::new(h.x, -h.y, h.z),
        Vec3::new(h.x, h.y, h.z),
        Vec3::new(-h.x, h.y, h.z),
    ];
    const FACES: [[u32; 4]; 6] = [
        [4, 5, 6, 7], // +z
        [1, 0, 3, 2], // -z
        [5, 1, 2, 6], // +x
        [0, 4, 7, 3], // -x
        [7, 6, 2, 3], // +y
        [0, 1, 5, 4], // -y
    ];
    for f in FACES {
        mesh.add_triangle(f[0], f[1], f[2]);
        mesh.add_triangle(f[0], f[2], f[3]);
    }
    generate_normals_ex(&mut mesh, 0.0, true, false);
    Some(mesh)
}

fn generate_sphere(radius: f32, center_offset: Vec3, div: u32) -> Option<Mesh> {
    if radius <= 0.0 {
        return None;
    }
    let width_segments = div.max(3);
    let height_segments = (div / 2).max(2);
    let mut mesh = Mesh::new();

    // Latitude rings from the south pole up, longitude loops around Y.
    for y in 0..=height_segments {
        let theta = y as f32 / height_segments as f32 * PI;
        let py = -radius * theta.cos();
        let ring_radius = radius * theta.sin();
        for x in 0..=width_segments {
            let phi = x as f32 / width_segments as f32 * 2.0 * PI;
            let p = Vec3::new(-ring_radius * phi.cos(), py, ring_radius * phi.sin());
            mesh.vertices.push(p + center_offset);
            mesh.normals.push(p / radius);
        }
    }

    let stride = width_segments + 1;
    for y in 0..height_segments {
        for x in 0..width_segments {
            let v0 = y * stride + x;
            let v1 = v0 + 1;
            let v2 = v0 + stride;
            let v3 = v2 + 1;
            mesh.add_triangle(v0, v1, v2);
            mesh.add_triangle(v1, v3, v2);
        }
    }
    mesh.normal_indices = mesh.triangles.clone();
    Some(mesh)
}

fn generate_cylinder(radius: f32, height: f32, top: bool, bottom: bool, div: u32) -> Option<Mesh> {
    if radius <= 0.0 || height <= 0.0 {
        return None;
    }
    let div = div.max(3);
    let h = height * 0.5;
    let mut mesh = Mesh::new();

    for &y in &[h, -h] {
        for i in 0..div {
            let phi = i as f32 / div as f32 * 2.0 * PI;
            mesh.vertices
                .push(Vec3::new(radius * phi.cos(), y, radius * phi.sin()));
        }
    }

    // Side wall.
    for i in 0..div {
        let j = (i + 1) % div;
        let (t0, t1) = (i, j);
        let (b0, b1) = (div + i, div + j);
        mesh.add_triangle(t0, b1, b0);
        mesh.add_triangle(t0, t1, b1);
    }

    if top {
        let c = mesh.vertices.len() as u32;
        mesh.vertices.push(Vec3::new(0.0, h, 0.0));
        for i in 0..div {
            mesh.add_triangle(c, (i + 1) % div, i);
        }
    }
    if bottom {
        let c = mesh.vertices.len() as u32;
        mesh.vertices.push(Vec3::new(0.0, -h, 0.0));
        for i in 0..div {
            mesh.add_triangle(c, div + i, div + (i + 1) % div);
        }
    }

    generate_normals_ex(&mut mesh, CURVED_SURFACE_CREASE, true, false);
    Some(mesh)
}

fn generate_cone(radius: f32, height: f32, bottom: bool, div: u32) -> Option<Mesh> {
    if radius <= 0.0 || height <= 0.0 {
        return None;
    }
    let div = div.max(3);
    let h = height * 0.5;
    let mut mesh = Mesh::new();

    for i in 0..div {
        let phi = i as f32 / div as f32 * 2.0 * PI;
        mesh.vertices
            .push(Vec3::new(radius * phi.cos(), -h, radius * phi.sin()));
    }
    let apex = mesh.vertices.len() as u32;
    mesh.vertices.push(Vec3::new(0.0, h, 0.0));

    for i in 0..div {
        let j = (i + 1) % div;
        mesh.add_triangle(apex, i, j);
    }
    if bottom {
        let c = mesh.vertices.len() as u32;
        mesh.vertices.push(Vec3::new(0.0, -h, 0.0));
        for i in 0..div {
            mesh.add_triangle(c, (i + 1) % div, i);
        }
    }

    generate_normals_ex(&mut mesh, CURVED_SURFACE_CREASE, true, false);
    Some(mesh)
}

fn generate_capsule(radius: f32, height: f32, div: u32) -> Option<Mesh> {
    if radius <= 0.0 || height < 0.0 {
        return None;
    }
    let width_segments = div.max(3);
    let height_segments = ((div / 2).max(2) / 2 * 2).max(2); // even
    let mut mesh = Mesh::new();

    // Latitude rows as for a sphere, with the equator row doubled and each
    // hemisphere shifted along Y by half the cylinder height.
    let mut rows: Vec<(f32, f32, f32)> = Vec::new(); // (py, ring_radius, center_y)
    for y in 0..=height_segments {
        let theta = y as f32 / height_segments as f32 * PI;
        let offset = if y * 2 <= height_segments {
            -height * 0.5
        } else {
            height * 0.5
        };
        let py = -radius * theta.cos() + offset;
        let ring_radius = radius * theta.sin();
        rows.push((py, ring_radius, offset));
        if y * 2 == height_segments && height > 0.0 {
            rows.push((py + height, ring_radius, height * 0.5));
        }
    }

    for &(py, ring_radius, center_y) in &rows {
        for x in 0..=width_segments {
            let phi = x as f32 / width_segments as f32 * 2.0 * PI;
            let p = Vec3::new(-ring_radius * phi.cos(), py, ring_radius * phi.sin());
            mesh.vertices.push(p);
            mesh.normals
                .push(((p - Vec3::new(0.0, center_y, 0.0)) / radius).normalize_or_zero());
        }
    }

    let stride = width_segments + 1;
    for y in 0..rows.len() as u32 - 1 {
        for x in 0..width_segments {
            let v0 = y * stride + x;
            let v1 = v0 + 1;
            let v2 = v0 + stride;
            let v3 = v2 + 1;
            mesh.add_triangle(v0, v1, v2);
            mesh.add_triangle(v1, v3, v2);
        }
    }
    mesh.normal_indices = mesh.triangles.clone();
    Some(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_has_twelve_triangles() {
        let g = MeshGenerator::new();
        let mesh = g
            .generate_primitive(
                Primitive::Box {
                    size: Vec3::new(2.0, 1.0, 0.5),
                },
                None,
            )
            .unwrap();
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.has_normals());
    }

    #[test]
    fn degenerate_box_is_rejected() {
        let g = MeshGenerator::new();
        assert!(g
            .generate_primitive(Primitive::Box { size: Vec3::ZERO }, None)
            .is_none());
    }

    #[test]
    fn sphere_stays_on_the_radius() {
        let g = MeshGenerator::new();
        let mesh = g
            .generate_primitive(Primitive::Sphere { radius: 2.0 }, Some(16))
            .unwrap();
        for v in &mesh.vertices {
            assert!((v.length() - 2.0).abs() < 1.0e-4);
        }
    }

    #[test]
    fn cylinder_respects_cap_flags() {
        let g = MeshGenerator::new();
        let closed = g
            .generate_primitive(
                Primitive::Cylinder {
                    radius: 1.0,
                    height: 2.0,
                    top: true,
                    bottom: true,
                },
                Some(8),
            )
            .unwrap();
        let open = g
            .generate_primitive(
                Primitive::Cylinder {
                    radius: 1.0,
                    height: 2.0,
                    top: false,
                    bottom: false,
                },
                Some(8),
            )
            .unwrap();
        assert_eq!(closed.triangle_count() - open.triangle_count(), 16);
    }

    #[test]
    fn elevation_grid_requires_full_height_array() {
        let g = MeshGenerator::new();
        let mut grid = ElevationGrid {
            x_dimension: 3,
            z_dimension: 2,
            height: vec![0.0; 6],
            ..ElevationGrid::default()
        };
        assert!(g.generate_elevation_grid(&grid, false).is_some());
        grid.height.pop();
        assert!(g.generate_elevation_grid(&grid, false).is_none());
    }

    #[test]
    fn extrusion_sweeps_section_along_spine() {
        let g = MeshGenerator::new();
        let extrusion = Extrusion {
            cross_section: vec![
                Vec2::new(-1.0, -1.0),
                Vec2::new(1.0, -1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(-1.0, 1.0),
                Vec2::new(-1.0, -1.0),
            ],
            spine: vec![Vec3::ZERO, Vec3::new(0.0, 3.0, 0.0)],
            ..Extrusion::default()
        };
        let mesh = g.generate_extrusion(&extrusion, false).unwrap();
        assert_eq!(mesh.vertices.len(), 10);
        assert!(mesh.triangle_count() > 0);
        let max_y = mesh.vertices.iter().map(|v| v.y).fold(f32::MIN, f32::max);
        assert!((max_y - 3.0).abs() < 1.0e-5);
    }
}
