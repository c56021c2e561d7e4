//! The declarative scene reader.
//!
//! [`SceneReader`] turns parsed documents into scene graphs: node mappings
//! become typed [`SceneNode`]s, geometry mappings become meshes, and
//! `Resource` nodes pull in other files through a per-reader cache. Angles in
//! the document are interpreted per the document header (degrees by
//! default).

mod loader;
mod path;
mod registry;
mod resource;

pub use loader::SceneFileLoader;
pub use path::PathVariableProcessor;
pub use registry::{UriSchemeHandler, UriSchemeRegistry};
pub use resource::Resource;

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, OnceLock};

use glam::{Mat3, Vec2, Vec3};
use rustc_hash::FxHashMap;

use crate::document::{Mapping, Sequence, Value, ValueKind};
use crate::errors::{Error, Result};
use crate::mesh::{
    self, ElevationGrid, Extrusion, Mesh, MeshGenerator, PolygonMesh, PolygonTriangulator,
    Primitive,
};
use crate::scene::light::{DirectionalLight, LightCommon, SpotLight};
use crate::scene::material::{Image, Material, Texture, TextureTransform};
use crate::scene::{NodeHandle, NodeKind, SceneGraph, SceneNode, Shape};

use resource::ResourceInfo;

// ============================================================================
// Angle Units
// ============================================================================

/// Unit of the angle values in a document, selected by the `angle_unit`
/// header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleUnit {
    Degree,
    Radian,
}

// ============================================================================
// Node Builder Dispatch
// ============================================================================

type NodeBuilderFn = fn(&mut SceneReader, &mut Mapping) -> Result<Option<NodeHandle>>;

fn node_builders() -> &'static FxHashMap<&'static str, NodeBuilderFn> {
    static BUILDERS: OnceLock<FxHashMap<&'static str, NodeBuilderFn>> = OnceLock::new();
    BUILDERS.get_or_init(|| {
        let mut builders: FxHashMap<&'static str, NodeBuilderFn> = FxHashMap::default();
        builders.insert("Node", SceneReader::read_empty_node);
        builders.insert("Group", SceneReader::read_group);
        builders.insert("Transform", SceneReader::read_transform);
        builders.insert("Shape", SceneReader::read_shape);
        builders.insert("DirectionalLight", SceneReader::read_directional_light);
        builders.insert("SpotLight", SceneReader::read_spot_light);
        builders.insert("Resource", SceneReader::read_resource_node);
        builders
    })
}

// ============================================================================
// Scene Reader
// ============================================================================

/// Reads scene documents into a [`SceneGraph`].
///
/// A reader owns the graph it builds into, a resource cache keyed by raw URI
/// and an image cache keyed by file path. Non-fatal problems (an unreadable
/// texture, a scheme handler complaint) go to the message sink; structural
/// problems are returned as errors carrying document positions.
pub struct SceneReader {
    graph: SceneGraph,
    degree_mode: bool,
    generator: MeshGenerator,
    triangulator: PolygonTriangulator,
    path_processor: PathVariableProcessor,
    scheme_registry: Arc<UriSchemeRegistry>,
    scene_loader: Option<Box<dyn SceneFileLoader>>,
    resources: FxHashMap<String, Rc<RefCell<ResourceInfo>>>,
    images: FxHashMap<String, Arc<Image>>,
    sink: Box<dyn Write>,
    /// Set per shape while its geometry is read; true when the shape has a
    /// texture but the geometry carries no coordinates of its own.
    generate_tex_coord: bool,
}

impl Default for SceneReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneReader {
    /// A reader bound to the process-wide URI scheme registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(Arc::clone(UriSchemeRegistry::instance()))
    }

    /// A reader bound to its own URI scheme registry.
    #[must_use]
    pub fn with_registry(registry: Arc<UriSchemeRegistry>) -> Self {
        Self {
            graph: SceneGraph::new(),
            degree_mode: true,
            generator: MeshGenerator::new(),
            triangulator: PolygonTriangulator::new(),
            path_processor: PathVariableProcessor::new(),
            scheme_registry: registry,
            scene_loader: None,
            resources: FxHashMap::default(),
            images: FxHashMap::default(),
            sink: Box::new(io::sink()),
            generate_tex_coord: false,
        }
    }

    #[must_use]
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    #[must_use]
    pub fn into_graph(self) -> SceneGraph {
        self.graph
    }

    /// Redirects warning messages. The default sink discards them.
    pub fn set_message_sink(&mut self, sink: Box<dyn Write>) {
        self.sink = sink;
    }

    pub fn set_angle_unit(&mut self, unit: AngleUnit) {
        self.degree_mode = unit == AngleUnit::Degree;
    }

    #[must_use]
    pub fn angle_unit(&self) -> AngleUnit {
        if self.degree_mode {
            AngleUnit::Degree
        } else {
            AngleUnit::Radian
        }
    }

    /// Converts a document angle to radians per the current angle unit.
    #[must_use]
    pub fn to_radian(&self, angle: f32) -> f32 {
        if self.degree_mode {
            angle.to_radians()
        } else {
            angle
        }
    }

    /// Tessellation resolution for primitives without an explicit
    /// `division_number`, forwarded to the scene file loader as well.
    pub fn set_default_division_number(&mut self, n: u32) {
        self.generator.set_division_number(n);
        if let Some(loader) = self.scene_loader.as_mut() {
            loader.set_default_division_number(n);
        }
    }

    #[must_use]
    pub fn default_division_number(&self) -> u32 {
        self.generator.division_number()
    }

    /// Directory that relative resource paths resolve against.
    pub fn set_base_directory(&mut self, directory: impl Into<PathBuf>) {
        self.path_processor.set_base_directory(directory);
    }

    #[must_use]
    pub fn base_directory(&self) -> &Path {
        self.path_processor.base_directory()
    }

    /// Defines a `${NAME}` variable for resource path expansion.
    pub fn set_path_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.path_processor.set_variable(name, value);
    }

    /// Installs the loader used for non-document resource files.
    pub fn set_scene_loader(&mut self, loader: Box<dyn SceneFileLoader>) {
        self.scene_loader = Some(loader);
    }

    /// Drops the built graph and all cached resources and images.
    pub fn clear(&mut self) {
        self.graph = SceneGraph::new();
        self.resources.clear();
        self.images.clear();
        self.degree_mode = true;
    }

    fn warn(&mut self, message: &str) {
        log::warn!("{message}");
        let _ = writeln!(self.sink, "{message}");
    }

    // ========================================================================
    // Document Entry Points
    // ========================================================================

    /// Reads reader settings from a document header mapping. Currently the
    /// only recognized field is `angle_unit`.
    pub fn read_header(&mut self, header: &mut Value) -> Result<()> {
        let mapping = header.as_mapping_mut()?;
        if let Some(unit) = mapping.extract_any(&["angle_unit", "angleUnit"]) {
            match unit.to_str()? {
                "degree" => self.degree_mode = true,
                "radian" => self.degree_mode = false,
                _ => return Err(Error::InvalidAngleUnit { pos: unit.pos }),
            }
        }
        Ok(())
    }

    /// Reads a scene value: a node mapping, a sequence of nodes (wrapped in
    /// a group), or null for an empty scene.
    pub fn read_scene(&mut self, scene: &mut Value) -> Result<Option<NodeHandle>> {
        match &mut scene.kind {
            ValueKind::Scalar(s) if s.is_null() => Ok(None),
            ValueKind::Scalar(_) => Err(Error::InvalidElements { pos: scene.pos }),
            ValueKind::Mapping(mapping) => self.read_node(mapping),
            ValueKind::Sequence(sequence) => {
                let group = self.graph.add_node(SceneNode::group());
                self.read_node_sequence(sequence, group)?;
                Ok(self.elide_group(group))
            }
        }
    }

    /// Reads one node mapping; its `type` field selects the builder.
    pub fn read_node(&mut self, mapping: &mut Mapping) -> Result<Option<NodeHandle>> {
        let type_name = mapping
            .read_string("type")?
            .ok_or(Error::MissingField {
                key: "type",
                pos: mapping.pos,
            })?;
        self.read_node_as(mapping, &type_name)
    }

    /// Reads a node mapping as the given type, ignoring any `type` field.
    pub fn read_node_as(
        &mut self,
        mapping: &mut Mapping,
        type_name: &str,
    ) -> Result<Option<NodeHandle>> {
        let Some(builder) = node_builders().get(type_name) else {
            // Nodes marked optional read as nothing when their type has no
            // builder, so documents can carry consumer-specific node types.
            if mapping.read_bool_any(&["is_optional", "isOptional"])?.unwrap_or(false) {
                self.warn(&format!(
                    "the optional node type \"{type_name}\" is skipped"
                ));
                return Ok(None);
            }
            return Err(Error::UndefinedNodeType {
                type_name: type_name.to_owned(),
                pos: mapping.pos,
            });
        };
        builder(self, mapping)
    }

    // ========================================================================
    // Structural Nodes
    // ========================================================================

    fn read_empty_node(&mut self, mapping: &mut Mapping) -> Result<Option<NodeHandle>> {
        let node = self.graph.add_kind(NodeKind::Empty);
        self.read_name(mapping, node)?;
        Ok(Some(node))
    }

    fn read_group(&mut self, mapping: &mut Mapping) -> Result<Option<NodeHandle>> {
        let group = self.graph.add_kind(NodeKind::Group);
        self.read_name(mapping, group)?;
        if let Some(elements) = mapping.find_mut("elements") {
            self.read_elements_into(elements, group)?;
        }
        Ok(self.elide_group(group))
    }

    /// Transforms nest positional outside scale; elements land on the
    /// innermost node. With no transform parameters the node degrades to a
    /// plain group.
    fn read_transform(&mut self, mapping: &mut Mapping) -> Result<Option<NodeHandle>> {
        let translation = self.read_translation(mapping, "translation")?;
        let rotation = self.read_rotation(mapping, "rotation")?;
        let scale = self.read_scale(mapping)?;

        let positional = if translation.is_some() || rotation.is_some() {
            Some(self.graph.add_kind(NodeKind::PositionalTransform {
                rotation: rotation.unwrap_or(Mat3::IDENTITY),
                translation: translation.unwrap_or(Vec3::ZERO),
            }))
        } else {
            None
        };
        let scaling = scale.map(|scale| self.graph.add_kind(NodeKind::ScaleTransform { scale }));

        let (top, inner) = match (positional, scaling) {
            (Some(p), Some(s)) => {
                self.graph.attach(p, s);
                (p, s)
            }
            (Some(p), None) => (p, p),
            (None, Some(s)) => (s, s),
            (None, None) => {
                let group = self.graph.add_kind(NodeKind::Group);
                (group, group)
            }
        };
        self.read_name(mapping, top)?;
        if let Some(elements) = mapping.find_mut("elements") {
            self.read_elements_into(elements, inner)?;
        }
        Ok(self.elide_group(top))
    }

    fn read_name(&mut self, mapping: &Mapping, node: NodeHandle) -> Result<()> {
        if let Some(name) = mapping.read_string("name")? {
            self.graph[node].name = Some(name);
        }
        Ok(())
    }

    /// An `elements` value is either a sequence of node mappings or a
    /// mapping whose keys are node types, read in document order.
    fn read_elements_into(&mut self, elements: &mut Value, parent: NodeHandle) -> Result<()> {
        match &mut elements.kind {
            ValueKind::Sequence(sequence) => self.read_node_sequence(sequence, parent),
            ValueKind::Mapping(mapping) => {
                for (key, value) in mapping.iter_mut() {
                    let type_name = key.to_owned();
                    let child = value.as_mapping_mut()?;
                    if let Some(declared) = child.read_string("type")? {
                        if declared != type_name {
                            return Err(Error::NodeTypeMismatch {
                                expected: type_name,
                                actual: declared,
                                pos: child.pos,
                            });
                        }
                    }
                    if let Some(node) = self.read_node_as(child, &type_name)? {
                        self.graph.attach(parent, node);
                    }
                }
                Ok(())
            }
            ValueKind::Scalar(_) => Err(Error::InvalidElements { pos: elements.pos }),
        }
    }

    fn read_node_sequence(&mut self, sequence: &mut Sequence, parent: NodeHandle) -> Result<()> {
        for element in &mut sequence.values {
            let mapping = element.as_mapping_mut()?;
            if let Some(node) = self.read_node(mapping)? {
                self.graph.attach(parent, node);
            }
        }
        Ok(())
    }

    /// Drops an unnamed plain group with fewer than two children: an empty
    /// group reads as nothing, a single-child group as the child itself.
    fn elide_group(&mut self, group: NodeHandle) -> Option<NodeHandle> {
        let node = &self.graph[group];
        if !matches!(node.kind, NodeKind::Group) || node.name.is_some() {
            return Some(group);
        }
        match node.children.len() {
            0 => {
                self.graph.remove(group);
                None
            }
            1 => {
                let child = node.children[0];
                self.graph.remove(group);
                Some(child)
            }
            _ => Some(group),
        }
    }

    // ========================================================================
    // Transform Parameters
    // ========================================================================

    /// Reads a translation: a three-vector, or a list of three-vectors whose
    /// sum is the translation.
    fn read_translation(&mut self, mapping: &Mapping, key: &str) -> Result<Option<Vec3>> {
        let Some(value) = mapping.find(key) else {
            return Ok(None);
        };
        let sequence = value.as_sequence()?;
        if sequence.values.first().is_some_and(Value::is_sequence) {
            let mut sum = Vec3::ZERO;
            for element in sequence {
                sum += read_vec3(element)?;
            }
            Ok(Some(sum))
        } else {
            Ok(Some(read_vec3(value)?))
        }
    }

    /// Reads a rotation: an angle-axis `[x, y, z, angle]`, or a list of them
    /// composed left to right.
    fn read_rotation(&mut self, mapping: &Mapping, key: &str) -> Result<Option<Mat3>> {
        let Some(value) = mapping.find(key) else {
            return Ok(None);
        };
        let sequence = value.as_sequence()?;
        if sequence.values.first().is_some_and(Value::is_sequence) {
            let mut rotation = Mat3::IDENTITY;
            for element in sequence {
                rotation *= self.read_angle_axis(element)?;
            }
            Ok(Some(rotation))
        } else {
            Ok(Some(self.read_angle_axis(value)?))
        }
    }

    fn read_angle_axis(&self, value: &Value) -> Result<Mat3> {
        let sequence = value.as_sequence()?;
        if sequence.len() != 4 {
            return Err(Error::TypeMismatch {
                expected: "a four-element angle-axis rotation",
                pos: value.pos,
            });
        }
        let axis = Vec3::new(
            sequence.values[0].to_f32()?,
            sequence.values[1].to_f32()?,
            sequence.values[2].to_f32()?,
        );
        let angle = sequence.values[3].to_f32()?;
        if axis.length_squared() < 1.0e-12 {
            return Err(Error::ZeroRotationAxis { pos: value.pos });
        }
        Ok(Mat3::from_axis_angle(axis.normalize(), self.to_radian(angle)))
    }

    /// A scale is a three-vector or a single scalar applied uniformly.
    fn read_scale(&mut self, mapping: &Mapping) -> Result<Option<Vec3>> {
        let Some(value) = mapping.find("scale") else {
            return Ok(None);
        };
        if value.is_scalar() {
            Ok(Some(Vec3::splat(value.to_f32()?)))
        } else {
            Ok(Some(read_vec3(value)?))
        }
    }

    fn read_angle(&self, mapping: &Mapping, keys: &[&str]) -> Result<Option<f32>> {
        Ok(mapping.read_f32_any(keys)?.map(|a| self.to_radian(a)))
    }

    /// Wraps `node` in the transform parameters declared on `mapping`,
    /// nesting as `read_transform` does: positional outside, scale inside.
    /// Without parameters the node comes back untouched.
    fn wrap_with_transform_parameters(
        &mut self,
        mapping: &Mapping,
        node: NodeHandle,
    ) -> Result<NodeHandle> {
        let translation = self.read_translation(mapping, "translation")?;
        let rotation = self.read_rotation(mapping, "rotation")?;
        let scale = self.read_scale(mapping)?;

        let mut top = node;
        if let Some(scale) = scale {
            let scaling = self.graph.add_kind(NodeKind::ScaleTransform { scale });
            self.graph.attach(scaling, top);
            top = scaling;
        }
        if translation.is_some() || rotation.is_some() {
            let positional = self.graph.add_kind(NodeKind::PositionalTransform {
                rotation: rotation.unwrap_or(Mat3::IDENTITY),
                translation: translation.unwrap_or(Vec3::ZERO),
            });
            self.graph.attach(positional, top);
            top = positional;
        }
        Ok(top)
    }

    // ========================================================================
    // Shapes and Appearance
    // ========================================================================

    fn read_shape(&mut self, mapping: &mut Mapping) -> Result<Option<NodeHandle>> {
        let mut shape = Shape::default();
        if let Some(appearance) = mapping.find_mapping_mut("appearance")? {
            self.read_appearance(appearance, &mut shape)?;
        }
        self.generate_tex_coord = shape.texture.is_some();
        if let Some(geometry) = mapping.find_mapping_mut("geometry")? {
            shape.mesh = Some(self.read_geometry(geometry)?);
        }
        let node = self.graph.add_kind(NodeKind::Shape(shape));
        self.read_name(mapping, node)?;
        Ok(Some(self.wrap_with_transform_parameters(mapping, node)?))
    }

    fn read_appearance(&mut self, mapping: &mut Mapping, shape: &mut Shape) -> Result<()> {
        if let Some(material) = mapping.find_mapping_mut("material")? {
            shape.material = Some(Self::read_material(material)?);
        }
        if let Some(texture) = mapping.find_mapping_mut("texture")? {
            shape.texture = self.read_texture(texture)?;
        }
        if shape.texture.is_some() {
            let transform = if mapping.contains("texture_transform") {
                mapping.find_mapping_mut("texture_transform")?
            } else {
                mapping.find_mapping_mut("textureTransform")?
            };
            if let Some(transform) = transform {
                let parameters = self.read_texture_transform(transform)?;
                if let Some(texture) = shape.texture.as_mut() {
                    texture.transform = parameters;
                }
            }
        }
        Ok(())
    }

    fn read_material(mapping: &Mapping) -> Result<Material> {
        let mut material = Material::default();
        if let Some(v) =
            mapping.read_f32_any(&["ambient", "ambient_intensity", "ambientIntensity"])?
        {
            material.ambient_intensity = v;
        }
        if let Some(v) = mapping.find_any(&["diffuse", "diffuse_color", "diffuseColor"]) {
            material.diffuse_color = read_vec3(v)?;
        }
        if let Some(v) = mapping.find_any(&["emissive", "emissive_color", "emissiveColor"]) {
            material.emissive_color = read_vec3(v)?;
        }
        if let Some(v) = mapping.find_any(&["specular", "specular_color", "specularColor"]) {
            material.specular_color = read_vec3(v)?;
        }
        if let Some(v) = mapping.read_f32_any(&["specular_exponent", "specularExponent"])? {
            material.specular_exponent = v;
        } else if let Some(shininess) = mapping.read_f32("shininess")? {
            // Deprecated field, kept readable: shininess maps onto the
            // exponent range.
            material.specular_exponent = shininess.clamp(0.0, 1.0) * 128.0;
        }
        if let Some(v) = mapping.read_f32("transparency")? {
            material.transparency = v;
        }
        Ok(material)
    }

    /// An unreadable texture degrades to a warning; the shape keeps its
    /// material and loses the texture.
    fn read_texture(&mut self, mapping: &Mapping) -> Result<Option<Texture>> {
        let Some(uri) = mapping.read_string_any(&["uri", "url"])? else {
            self.warn("a texture node has no uri");
            return Ok(None);
        };
        let Some(path) = self.path_processor.expand(&uri, true) else {
            let message = format!(
                "texture \"{uri}\" is not readable: {}",
                self.path_processor.error_message()
            );
            self.warn(&message);
            return Ok(None);
        };
        let key = path.to_string_lossy().into_owned();
        let image = if let Some(image) = self.images.get(&key) {
            Arc::clone(image)
        } else {
            let decoded = match image::open(&path) {
                Ok(decoded) => decoded.to_rgba8(),
                Err(error) => {
                    let message = format!("texture \"{uri}\" cannot be decoded: {error}");
                    self.warn(&message);
                    return Ok(None);
                }
            };
            let image = Arc::new(Image {
                width: decoded.width(),
                height: decoded.height(),
                pixels: decoded.into_raw(),
            });
            self.images.insert(key, Arc::clone(&image));
            image
        };
        let mut texture = Texture::new(image);
        if let Some(value) = mapping.find("repeat") {
            let sequence = value.as_sequence()?;
            if sequence.len() != 2 {
                return Err(Error::TypeMismatch {
                    expected: "a sequence of two booleans",
                    pos: value.pos,
                });
            }
            texture.repeat_s = sequence.values[0].to_bool()?;
            texture.repeat_t = sequence.values[1].to_bool()?;
        }
        if let Some(repeat) = mapping.read_bool_any(&["repeat_s", "repeatS"])? {
            texture.repeat_s = repeat;
        }
        if let Some(repeat) = mapping.read_bool_any(&["repeat_t", "repeatT"])? {
            texture.repeat_t = repeat;
        }
        Ok(Some(texture))
    }

    fn read_texture_transform(&mut self, mapping: &Mapping) -> Result<TextureTransform> {
        let mut transform = TextureTransform::default();
        if let Some(v) = mapping.find("center") {
            transform.center = read_vec2(v)?;
        }
        if let Some(v) = self.read_angle(mapping, &["rotation"])? {
            transform.rotation = v;
        }
        if let Some(v) = mapping.find("scale") {
            transform.scale = read_vec2(v)?;
        }
        if let Some(v) = mapping.find("translation") {
            transform.translation = read_vec2(v)?;
        }
        Ok(transform)
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    fn read_geometry(&mut self, mapping: &mut Mapping) -> Result<Arc<Mesh>> {
        let type_name = mapping
            .read_string("type")?
            .ok_or(Error::MissingField {
                key: "type",
                pos: mapping.pos,
            })?;
        match type_name.as_str() {
            "Box" => self.read_box(mapping).map(Arc::new),
            "Sphere" => self.read_sphere(mapping).map(Arc::new),
            "Cylinder" => self.read_cylinder(mapping).map(Arc::new),
            "Cone" => self.read_cone(mapping).map(Arc::new),
            "Capsule" => self.read_capsule(mapping).map(Arc::new),
            "Extrusion" => self.read_extrusion(mapping).map(Arc::new),
            "ElevationGrid" => self.read_elevation_grid(mapping).map(Arc::new),
            "TriangleMesh" => self.read_triangle_mesh(mapping).map(Arc::new),
            "IndexedFaceSet" => self.read_indexed_face_set(mapping).map(Arc::new),
            "Resource" => self.read_resource_as_geometry(mapping),
            _ => Err(Error::UnknownGeometry {
                type_name,
                pos: mapping.pos,
            }),
        }
    }

    fn division_of(mapping: &Mapping) -> Result<Option<u32>> {
        mapping.read_u32_any(&["division_number", "divisionNumber"])
    }

    fn finish_primitive(&self, mut mesh: Mesh) -> Mesh {
        if self.generate_tex_coord && !mesh.has_tex_coords() {
            mesh::generate_texture_coordinates(&mut mesh);
        }
        mesh
    }

    fn read_box(&mut self, mapping: &Mapping) -> Result<Mesh> {
        let size = match mapping.find("size") {
            Some(v) => read_vec3(v)?,
            None => Vec3::ONE,
        };
        let mesh = self
            .generator
            .generate_primitive(Primitive::Box { size }, None)
            .ok_or(Error::PrimitiveGeneration {
                kind: "box",
                pos: mapping.pos,
            })?;
        Ok(self.finish_primitive(mesh))
    }

    fn read_sphere(&mut self, mapping: &Mapping) -> Result<Mesh> {
        let radius = mapping.read_f32("radius")?.unwrap_or(1.0);
        let mesh = self
            .generator
            .generate_primitive(Primitive::Sphere { radius }, Self::division_of(mapping)?)
            .ok_or(Error::PrimitiveGeneration {
                kind: "sphere",
                pos: mapping.pos,
            })?;
        Ok(self.finish_primitive(mesh))
    }

    fn read_cylinder(&mut self, mapping: &Mapping) -> Result<Mesh> {
        let primitive = Primitive::Cylinder {
            radius: mapping.read_f32("radius")?.unwrap_or(1.0),
            height: mapping.read_f32("height")?.unwrap_or(1.0),
            top: mapping.read_bool("top")?.unwrap_or(true),
            bottom: mapping.read_bool("bottom")?.unwrap_or(true),
        };
        let mesh = self
            .generator
            .generate_primitive(primitive, Self::division_of(mapping)?)
            .ok_or(Error::PrimitiveGeneration {
                kind: "cylinder",
                pos: mapping.pos,
            })?;
        Ok(self.finish_primitive(mesh))
    }

    fn read_cone(&mut self, mapping: &Mapping) -> Result<Mesh> {
        let primitive = Primitive::Cone {
            radius: mapping.read_f32("radius")?.unwrap_or(1.0),
            height: mapping.read_f32("height")?.unwrap_or(1.0),
            bottom: mapping.read_bool("bottom")?.unwrap_or(true),
        };
        let mesh = self
            .generator
            .generate_primitive(primitive, Self::division_of(mapping)?)
            .ok_or(Error::PrimitiveGeneration {
                kind: "cone",
                pos: mapping.pos,
            })?;
        Ok(self.finish_primitive(mesh))
    }

    fn read_capsule(&mut self, mapping: &Mapping) -> Result<Mesh> {
        let primitive = Primitive::Capsule {
            radius: mapping.read_f32("radius")?.unwrap_or(1.0),
            height: mapping.read_f32("height")?.unwrap_or(1.0),
        };
        let mesh = self
            .generator
            .generate_primitive(primitive, Self::division_of(mapping)?)
            .ok_or(Error::PrimitiveGeneration {
                kind: "capsule",
                pos: mapping.pos,
            })?;
        Ok(self.finish_primitive(mesh))
    }

    fn read_extrusion(&mut self, mapping: &Mapping) -> Result<Mesh> {
        let mut extrusion = Extrusion::default();
        if let Some(values) =
            read_flat_floats(mapping, &["cross_section", "crossSection"], 2)?
        {
            extrusion.cross_section = values
                .chunks_exact(2)
                .map(|c| Vec2::new(c[0], c[1]))
                .collect();
        }
        if let Some(values) = read_flat_floats(mapping, &["spine"], 3)? {
            extrusion.spine = values
                .chunks_exact(3)
                .map(|c| Vec3::new(c[0], c[1], c[2]))
                .collect();
        }
        if let Some(values) = read_flat_floats(mapping, &["orientation"], 4)? {
            extrusion.orientation = values
                .chunks_exact(4)
                .map(|c| (Vec3::new(c[0], c[1], c[2]), self.to_radian(c[3])))
                .collect();
        }
        if let Some(values) = read_flat_floats(mapping, &["scale"], 2)? {
            extrusion.scale = values
                .chunks_exact(2)
                .map(|c| Vec2::new(c[0], c[1]))
                .collect();
        }
        if let Some(cap) = mapping.read_bool_any(&["begin_cap", "beginCap"])? {
            extrusion.begin_cap = cap;
        }
        if let Some(cap) = mapping.read_bool_any(&["end_cap", "endCap"])? {
            extrusion.end_cap = cap;
        }
        if let Some(angle) = self.read_angle(mapping, &["crease_angle", "creaseAngle"])? {
            extrusion.crease_angle = angle;
        }
        self.generator
            .generate_extrusion(&extrusion, self.generate_tex_coord)
            .ok_or(Error::PrimitiveGeneration {
                kind: "extrusion",
                pos: mapping.pos,
            })
    }

    fn read_elevation_grid(&mut self, mapping: &Mapping) -> Result<Mesh> {
        let mut grid = ElevationGrid::default();
        if let Some(v) = mapping.read_u32_any(&["x_dimension", "xDimension"])? {
            grid.x_dimension = v;
        }
        if let Some(v) = mapping.read_u32_any(&["z_dimension", "zDimension"])? {
            grid.z_dimension = v;
        }
        if let Some(v) = mapping.read_f32_any(&["x_spacing", "xSpacing"])? {
            grid.x_spacing = v;
        }
        if let Some(v) = mapping.read_f32_any(&["z_spacing", "zSpacing"])? {
            grid.z_spacing = v;
        }
        if let Some(v) = mapping.read_bool("ccw")? {
            grid.ccw = v;
        }
        if let Some(angle) = self.read_angle(mapping, &["crease_angle", "creaseAngle"])? {
            grid.crease_angle = angle;
        }
        if let Some(values) = read_flat_floats(mapping, &["height"], 1)? {
            grid.height = values;
        }
        let mut mesh = self
            .generator
            .generate_elevation_grid(&grid, self.generate_tex_coord)
            .ok_or(Error::PrimitiveGeneration {
                kind: "elevation grid",
                pos: mapping.pos,
            })?;
        // Explicit coordinates replace the generated grid parameterization.
        if let Some(values) = read_flat_floats(mapping, &["tex_coords", "texCoords"], 2)? {
            mesh.tex_coords = values
                .chunks_exact(2)
                .map(|c| Vec2::new(c[0], c[1]))
                .collect();
            mesh.tex_coord_indices = mesh.triangles.clone();
        }
        Ok(mesh)
    }

    /// An explicit triangle list: `vertices` and flat `triangles` index
    /// triples.
    fn read_triangle_mesh(&mut self, mapping: &Mapping) -> Result<Mesh> {
        let mut mesh = Mesh::new();
        if let Some(values) = read_flat_floats(mapping, &["vertices"], 3)? {
            mesh.vertices = values
                .chunks_exact(3)
                .map(|c| Vec3::new(c[0], c[1], c[2]))
                .collect();
        }
        if let Some(value) = mapping.find("triangles") {
            let sequence = value.as_sequence()?;
            let indices = sequence.to_vec_of(Value::to_u32)?;
            if indices.len() % 3 != 0 {
                return Err(Error::ArrayStride {
                    key: "triangles",
                    stride: 3,
                    pos: value.pos,
                });
            }
            let vertex_count = mesh.vertices.len() as u32;
            for &index in &indices {
                if index >= vertex_count {
                    return Err(Error::IndexOutOfRange {
                        index: i64::from(index),
                        pos: value.pos,
                    });
                }
            }
            mesh.triangles = indices;
        }
        if let Some(values) = read_flat_floats(mapping, &["tex_coords", "texCoords"], 2)? {
            mesh.tex_coords = values
                .chunks_exact(2)
                .map(|c| Vec2::new(c[0], c[1]))
                .collect();
            mesh.tex_coord_indices = mesh.triangles.clone();
        }
        let crease = self
            .read_angle(mapping, &["crease_angle", "creaseAngle"])?
            .unwrap_or(0.0);
        mesh::generate_normals(&mut mesh, crease);
        if let Some(solid) = mapping.read_bool("solid")? {
            mesh.solid = solid;
        }
        if self.generate_tex_coord && !mesh.has_tex_coords() {
            mesh::generate_texture_coordinates(&mut mesh);
        }
        Ok(mesh)
    }

    fn read_indexed_face_set(&mut self, mapping: &Mapping) -> Result<Mesh> {
        let mut polygon = PolygonMesh::default();
        if let Some(values) = read_flat_floats(mapping, &["vertices", "coordinate"], 3)? {
            polygon.vertices = values
                .chunks_exact(3)
                .map(|c| Vec3::new(c[0], c[1], c[2]))
                .collect();
        }
        if let Some(sequence) = mapping.find_sequence_any(&["faces", "coordIndex"])? {
            polygon.polygon_vertices = sequence.to_vec_of(Value::to_i32)?;
        }
        if let Some(values) = read_flat_floats(mapping, &["tex_coords", "texCoords"], 2)? {
            polygon.tex_coords = values
                .chunks_exact(2)
                .map(|c| Vec2::new(c[0], c[1]))
                .collect();
        }
        if let Some(sequence) =
            mapping.find_sequence_any(&["tex_coord_indices", "texCoordIndices"])?
        {
            polygon.tex_coord_indices = sequence.to_vec_of(Value::to_i32)?;
        }

        let mut mesh = match self.triangulator.triangulate(&polygon) {
            Some(mesh) => mesh,
            None => {
                return Err(Error::Triangulation {
                    message: self.triangulator.error_message().to_owned(),
                    pos: mapping.pos,
                })
            }
        };
        let crease = self
            .read_angle(mapping, &["crease_angle", "creaseAngle"])?
            .unwrap_or(0.0);
        mesh::generate_normals(&mut mesh, crease);
        if let Some(solid) = mapping.read_bool("solid")? {
            mesh.solid = solid;
        }
        if self.generate_tex_coord && !mesh.has_tex_coords() {
            mesh::generate_texture_coordinates(&mut mesh);
        }
        Ok(mesh)
    }

    // ========================================================================
    // Lights
    // ========================================================================

    fn read_light_common(&mut self, mapping: &Mapping, common: &mut LightCommon) -> Result<()> {
        if let Some(on) = mapping.read_bool("on")? {
            common.on = on;
        }
        if let Some(color) = mapping.find("color") {
            common.color = read_vec3(color)?;
        }
        if let Some(intensity) = mapping.read_f32("intensity")? {
            common.intensity = intensity;
        }
        if let Some(intensity) =
            mapping.read_f32_any(&["ambient_intensity", "ambientIntensity"])?
        {
            common.ambient_intensity = intensity;
        }
        Ok(())
    }

    fn read_directional_light(&mut self, mapping: &mut Mapping) -> Result<Option<NodeHandle>> {
        let mut light = DirectionalLight::default();
        self.read_light_common(mapping, &mut light.common)?;
        if let Some(direction) = mapping.find("direction") {
            light.direction = read_vec3(direction)?;
        }
        let node = self.graph.add_kind(NodeKind::DirectionalLight(light));
        self.read_name(mapping, node)?;
        Ok(Some(node))
    }

    fn read_spot_light(&mut self, mapping: &mut Mapping) -> Result<Option<NodeHandle>> {
        let mut light = SpotLight::default();
        self.read_light_common(mapping, &mut light.common)?;
        if let Some(direction) = mapping.find("direction") {
            light.direction = read_vec3(direction)?;
        }
        if let Some(angle) = self.read_angle(mapping, &["beam_width", "beamWidth"])? {
            light.beam_width = angle;
        }
        if let Some(angle) = self.read_angle(mapping, &["cut_off_angle", "cutOffAngle"])? {
            light.cut_off_angle = angle;
        }
        if let Some(exponent) =
            mapping.read_f32_any(&["cut_off_exponent", "cutOffExponent"])?
        {
            light.cut_off_exponent = exponent;
        }
        if let Some(value) = mapping.find("attenuation") {
            let sequence = value.as_sequence()?;
            if sequence.len() != 3 {
                return Err(Error::TypeMismatch {
                    expected: "a sequence of three numbers",
                    pos: value.pos,
                });
            }
            for (slot, element) in light.attenuation.iter_mut().zip(&sequence.values) {
                *slot = element.to_f32()?;
            }
        }
        let node = self.graph.add_kind(NodeKind::SpotLight(light));
        self.read_name(mapping, node)?;
        Ok(Some(node))
    }
}

// ============================================================================
// Value Helpers
// ============================================================================

fn read_vec3(value: &Value) -> Result<Vec3> {
    let sequence = value.as_sequence()?;
    if sequence.len() != 3 {
        return Err(Error::TypeMismatch {
            expected: "a sequence of three numbers",
            pos: value.pos,
        });
    }
    Ok(Vec3::new(
        sequence.values[0].to_f32()?,
        sequence.values[1].to_f32()?,
        sequence.values[2].to_f32()?,
    ))
}

fn read_vec2(value: &Value) -> Result<Vec2> {
    let sequence = value.as_sequence()?;
    if sequence.len() != 2 {
        return Err(Error::TypeMismatch {
            expected: "a sequence of two numbers",
            pos: value.pos,
        });
    }
    Ok(Vec2::new(
        sequence.values[0].to_f32()?,
        sequence.values[1].to_f32()?,
    ))
}

/// Reads a flattened number array whose length must be a multiple of
/// `stride`.
fn read_flat_floats(
    mapping: &Mapping,
    keys: &[&'static str],
    stride: usize,
) -> Result<Option<Vec<f32>>> {
    let Some(value) = mapping.find_any(keys) else {
        return Ok(None);
    };
    let sequence = value.as_sequence()?;
    let values = sequence.to_vec_of(Value::to_f32)?;
    if stride > 1 && values.len() % stride != 0 {
        return Err(Error::ArrayStride {
            key: keys[0],
            stride,
            pos: value.pos,
        });
    }
    Ok(Some(values))
}
