//! Resource references: loading, caching, exclusion and named-node
//! extraction.
//!
//! Resources are cached per reader, keyed by the raw URI string, so a file
//! referenced from several places is loaded once and its scene nodes are
//! shared. Extracting a node by name folds the rotations and scales
//! accumulated above it into the node so the extracted subtree stands alone;
//! translations accumulated above it are discarded along the way.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use glam::{Mat3, Vec3};
use rustc_hash::FxHashMap;

use crate::document::{self, Mapping, Pos, Sequence, Value, ValueKind};
use crate::errors::{Error, Result};
use crate::mesh::{self, Mesh};
use crate::scene::{NodeHandle, NodeKind, SceneNode};

use super::SceneReader;

// ============================================================================
// Resource Data
// ============================================================================

/// What a URI resolved to.
pub(super) enum ResourceContent {
    /// A parsed document (`.yaml`/`.yml` resources).
    Document(Value),
    /// A scene built by the scene file loader.
    Scene(NodeHandle),
}

/// Cached state of one loaded resource.
pub(super) struct ResourceInfo {
    content: ResourceContent,
    /// Name to node index, built lazily on the first named access.
    node_index: Option<FxHashMap<String, IndexedNode>>,
    directory: PathBuf,
}

/// Index entry: where a named node sits and which linear transform its
/// ancestors accumulate above it.
#[derive(Clone, Copy)]
struct IndexedNode {
    parent: Option<NodeHandle>,
    node: NodeHandle,
    rotation: Mat3,
    is_scaled: bool,
}

/// Result of resolving a `Resource` reference.
#[derive(Debug)]
pub struct Resource {
    /// The raw URI the resource was requested with.
    pub uri: String,
    /// Scene content, shared with the cache.
    pub scene: Option<NodeHandle>,
    /// Document content; a clone, callers may take it apart.
    pub document: Option<Value>,
    /// Directory the resource was loaded from, for resolving its own
    /// relative references.
    pub directory: PathBuf,
}

// ============================================================================
// Reading
// ============================================================================

impl SceneReader {
    /// Builder for `Resource` scene nodes: resolves the reference and wraps
    /// the result in any transform parameters given alongside it. Document
    /// resources are read as a node themselves.
    pub(super) fn read_resource_node(&mut self, mapping: &mut Mapping) -> Result<Option<NodeHandle>> {
        let resource = self.read_resource(mapping)?;
        let scene = match (resource.scene, resource.document) {
            (Some(scene), _) => scene,
            (None, Some(mut document)) => {
                // The document reads in the context of its own directory so
                // relative URIs nested in it resolve.
                let previous = self.path_processor.base_directory().to_path_buf();
                self.path_processor.set_base_directory(resource.directory.clone());
                let read = document.as_mapping_mut().and_then(|m| self.read_node(m));
                self.path_processor.set_base_directory(previous);
                let Some(node) = read? else {
                    return Ok(None);
                };
                node
            }
            (None, None) => {
                return Err(Error::ResourceLoadFailed {
                    uri: resource.uri,
                    message: "the resource is empty".to_owned(),
                    pos: mapping.pos,
                })
            }
        };
        let top = self.wrap_with_transform_parameters(mapping, scene)?;
        if let Some(name) = mapping.read_string("name")? {
            // The cached node is shared; a name must not leak into other
            // references, so it goes on a wrapper of our own.
            let named = if top == scene {
                let group = self.graph.add_kind(NodeKind::Group);
                self.graph.attach(group, top);
                group
            } else {
                top
            };
            self.graph[named].name = Some(name);
            return Ok(Some(named));
        }
        Ok(Some(top))
    }

    /// A `Resource` geometry must resolve to a bare shape; its mesh is the
    /// geometry.
    pub(super) fn read_resource_as_geometry(
        &mut self,
        mapping: &mut Mapping,
    ) -> Result<Arc<Mesh>> {
        let resource = self.read_resource(mapping)?;
        let mesh = resource
            .scene
            .and_then(|scene| match &self.graph[scene].kind {
                NodeKind::Shape(shape) => shape.mesh.clone(),
                _ => None,
            })
            .ok_or(Error::ResourceNotAMesh { pos: mapping.pos })?;
        let crease = self.read_angle(mapping, &["crease_angle", "creaseAngle"])?;
        if crease.is_some() || (self.generate_tex_coord && !mesh.has_tex_coords()) {
            let mut mesh = (*mesh).clone();
            if let Some(crease) = crease {
                // Loaders often emit per-ring duplicate vertices; merging
                // them lets the requested crease angle smooth across seams.
                mesh::generate_normals_ex(&mut mesh, crease, true, true);
            }
            if self.generate_tex_coord && !mesh.has_tex_coords() {
                mesh::generate_texture_coordinates(&mut mesh);
            }
            return Ok(Arc::new(mesh));
        }
        Ok(mesh)
    }

    /// Resolves a resource reference mapping: `uri` (required), optional
    /// `node` name or name list to extract, optional `exclude` names removed
    /// from the cached scene before extraction.
    pub fn read_resource(&mut self, mapping: &mut Mapping) -> Result<Resource> {
        let (uri, uri_pos) = match mapping.find("uri") {
            Some(value) => (value.to_str()?.to_owned(), value.pos),
            None => {
                return Err(Error::MissingField {
                    key: "uri",
                    pos: mapping.pos,
                })
            }
        };
        let names: Vec<String> = match mapping.find("node") {
            None => Vec::new(),
            Some(value) if value.is_scalar() => vec![value.to_str()?.to_owned()],
            Some(value) => value
                .as_sequence()?
                .to_vec_of(|e| e.to_str().map(str::to_owned))?,
        };
        let exclude = mapping.extract("exclude");

        let info_rc = self.get_or_create_resource_info(&uri, uri_pos)?;
        let mut info = info_rc.borrow_mut();
        if let Some(exclude) = &exclude {
            self.apply_exclusion(&mut info, exclude, &uri)?;
        }

        match info.content {
            ResourceContent::Scene(root) => {
                let scene = if names.is_empty() {
                    root
                } else {
                    self.extract_named_scene_nodes(&mut info, &names, &uri, uri_pos)?
                };
                Ok(Resource {
                    directory: info.directory.clone(),
                    uri,
                    scene: Some(scene),
                    document: None,
                })
            }
            ResourceContent::Document(ref doc) => {
                let document = if names.is_empty() {
                    doc.clone()
                } else {
                    extract_named_document_values(doc, &names, &uri, uri_pos)?
                };
                Ok(Resource {
                    directory: info.directory.clone(),
                    uri,
                    scene: None,
                    document: Some(document),
                })
            }
        }
    }

    // ========================================================================
    // Cache and Loading
    // ========================================================================

    fn get_or_create_resource_info(
        &mut self,
        uri: &str,
        pos: Pos,
    ) -> Result<Rc<RefCell<ResourceInfo>>> {
        if let Some(info) = self.resources.get(uri) {
            return Ok(Rc::clone(info));
        }
        let info = self.load_resource(uri, pos)?;
        let info = Rc::new(RefCell::new(info));
        self.resources.insert(uri.to_owned(), Rc::clone(&info));
        Ok(info)
    }

    fn load_resource(&mut self, uri: &str, pos: Pos) -> Result<ResourceInfo> {
        let path = if let Some((scheme, rest)) = uri.split_once("://") {
            if scheme == "file" {
                self.expand_resource_path(rest, uri, pos)?
            } else {
                let Some(handler) = self.scheme_registry.handler(scheme) else {
                    return Err(Error::UnknownUriScheme {
                        scheme: scheme.to_owned(),
                        uri: uri.to_owned(),
                        pos,
                    });
                };
                let mut messages: Vec<u8> = Vec::new();
                let resolved = handler(rest, &mut messages);
                let messages = String::from_utf8_lossy(&messages).trim().to_owned();
                if resolved.is_empty() {
                    return Err(Error::InvalidResourceUri {
                        uri: uri.to_owned(),
                        message: messages,
                        pos,
                    });
                }
                if !messages.is_empty() {
                    self.warn(&messages);
                }
                self.expand_resource_path(&resolved, uri, pos)?
            }
        } else {
            self.expand_resource_path(uri, uri, pos)?
        };

        let directory = path.parent().map(PathBuf::from).unwrap_or_default();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let content = match extension.as_deref() {
            Some("yaml" | "yml") => ResourceContent::Document(document::load_file(&path)?),
            _ => {
                let Some(loader) = self.scene_loader.as_mut() else {
                    return Err(Error::NoSceneLoader {
                        uri: uri.to_owned(),
                        pos,
                    });
                };
                let root =
                    loader
                        .load(&mut self.graph, &path)
                        .map_err(|error| Error::ResourceLoadFailed {
                            uri: uri.to_owned(),
                            message: error.to_string(),
                            pos,
                        })?;
                ResourceContent::Scene(root)
            }
        };
        Ok(ResourceInfo {
            content,
            node_index: None,
            directory,
        })
    }

    fn expand_resource_path(&mut self, raw: &str, uri: &str, pos: Pos) -> Result<PathBuf> {
        self.path_processor
            .expand(raw, true)
            .ok_or_else(|| Error::InvalidResourceUri {
                uri: uri.to_owned(),
                message: self.path_processor.error_message().to_owned(),
                pos,
            })
    }

    // ========================================================================
    // Exclusion
    // ========================================================================

    /// Removes the named nodes from the cached resource scene. The removal
    /// sticks: later references to the same URI see the reduced scene.
    fn apply_exclusion(
        &mut self,
        info: &mut ResourceInfo,
        exclude: &Value,
        uri: &str,
    ) -> Result<()> {
        if !matches!(info.content, ResourceContent::Scene(_)) {
            return Err(Error::ExcludeOnDocumentResource { pos: exclude.pos });
        }
        let names: Vec<(String, Pos)> = match &exclude.kind {
            ValueKind::Scalar(_) => vec![(exclude.to_str()?.to_owned(), exclude.pos)],
            ValueKind::Sequence(sequence) => sequence
                .values
                .iter()
                .map(|e| e.to_str().map(|s| (s.to_owned(), e.pos)))
                .collect::<Result<_>>()?,
            ValueKind::Mapping(_) => return Err(Error::InvalidExclude { pos: exclude.pos }),
        };
        for (name, pos) in names {
            self.ensure_node_index(info);
            let entry = info
                .node_index
                .as_ref()
                .and_then(|index| index.get(&name))
                .copied();
            let Some(entry) = entry else {
                return Err(Error::NamedNodeNotFound {
                    name,
                    uri: uri.to_owned(),
                    pos,
                });
            };
            if let Some(parent) = entry.parent {
                self.graph.detach(parent, entry.node);
                if let Some(index) = info.node_index.as_mut() {
                    index.remove(&name);
                }
            } else {
                // The root itself was excluded: the resource becomes empty.
                let empty = self.graph.add_kind(NodeKind::Group);
                info.content = ResourceContent::Scene(empty);
                info.node_index = None;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Named-Node Extraction
    // ========================================================================

    /// Extracts the named nodes from a scene resource. A single name yields
    /// the cached node itself (coordinate-adjusted in place); several names
    /// yield deep copies collected under a fresh group, so the copies can be
    /// re-parented freely.
    fn extract_named_scene_nodes(
        &mut self,
        info: &mut ResourceInfo,
        names: &[String],
        uri: &str,
        pos: Pos,
    ) -> Result<NodeHandle> {
        if names.len() == 1 {
            return self.adjust_named_node(info, &names[0], uri, pos);
        }
        let group = self.graph.add_kind(NodeKind::Group);
        for name in names {
            let adjusted = self.adjust_named_node(info, name, uri, pos)?;
            let copied = self.graph.clone_subtree(adjusted);
            self.graph.attach(group, copied);
        }
        Ok(group)
    }

    fn adjust_named_node(
        &mut self,
        info: &mut ResourceInfo,
        name: &str,
        uri: &str,
        pos: Pos,
    ) -> Result<NodeHandle> {
        self.ensure_node_index(info);
        let entry = info
            .node_index
            .as_ref()
            .and_then(|index| index.get(name))
            .copied();
        let Some(entry) = entry else {
            return Err(Error::NamedNodeNotFound {
                name: name.to_owned(),
                uri: uri.to_owned(),
                pos,
            });
        };
        // The node leaves the cached scene before folding, so whole-scene
        // reads of the same URI are not affected by the re-homing.
        if let Some(parent) = entry.parent {
            self.graph.detach(parent, entry.node);
        }
        let adjusted = self.adjust_node_coordinate(entry);
        if let Some(index) = info.node_index.as_mut() {
            // Re-extraction must not fold twice.
            index.insert(
                name.to_owned(),
                IndexedNode {
                    parent: None,
                    node: adjusted,
                    rotation: Mat3::IDENTITY,
                    is_scaled: false,
                },
            );
        }
        Ok(adjusted)
    }

    /// Folds the accumulated ancestor transform into the node so the subtree
    /// stands alone. Transform nodes absorb the rotation and have their
    /// translation reset; other nodes get a transform wrapper when the
    /// accumulation is not the identity.
    fn adjust_node_coordinate(&mut self, entry: IndexedNode) -> NodeHandle {
        enum Action {
            FoldPositional,
            ReplaceWithAffine(Mat3),
            FoldAffine,
            WrapAffine,
            WrapPositional,
            Keep,
        }
        let action = match &self.graph[entry.node].kind {
            NodeKind::PositionalTransform { .. } if !entry.is_scaled => Action::FoldPositional,
            NodeKind::PositionalTransform { rotation, .. } => {
                Action::ReplaceWithAffine(entry.rotation * *rotation)
            }
            NodeKind::AffineTransform { .. } => Action::FoldAffine,
            _ if entry.is_scaled => Action::WrapAffine,
            _ if !entry.rotation.abs_diff_eq(Mat3::IDENTITY, 1.0e-6) => Action::WrapPositional,
            _ => Action::Keep,
        };
        match action {
            Action::FoldPositional => {
                if let NodeKind::PositionalTransform {
                    rotation,
                    translation,
                } = &mut self.graph[entry.node].kind
                {
                    *rotation = entry.rotation * *rotation;
                    *translation = Vec3::ZERO;
                }
                entry.node
            }
            Action::ReplaceWithAffine(linear) => {
                // A rotation folded onto a scaled subtree is no longer a pure
                // rotation; the node is rebuilt as an affine transform.
                let name = self.graph[entry.node].name.clone();
                let affine = self.graph.add_node(SceneNode {
                    name,
                    kind: NodeKind::AffineTransform {
                        linear,
                        translation: Vec3::ZERO,
                    },
                    children: Vec::new(),
                });
                self.graph.move_children(entry.node, affine);
                affine
            }
            Action::FoldAffine => {
                if let NodeKind::AffineTransform {
                    linear,
                    translation,
                } = &mut self.graph[entry.node].kind
                {
                    *linear = entry.rotation * *linear;
                    *translation = Vec3::ZERO;
                }
                entry.node
            }
            Action::WrapAffine => self.wrap_node(
                entry.node,
                NodeKind::AffineTransform {
                    linear: entry.rotation,
                    translation: Vec3::ZERO,
                },
            ),
            Action::WrapPositional => self.wrap_node(
                entry.node,
                NodeKind::PositionalTransform {
                    rotation: entry.rotation,
                    translation: Vec3::ZERO,
                },
            ),
            Action::Keep => entry.node,
        }
    }

    /// The wrapper stays unnamed; the wrapped node keeps the name, so each
    /// name still sits on exactly one node.
    fn wrap_node(&mut self, node: NodeHandle, kind: NodeKind) -> NodeHandle {
        let wrapper = self.graph.add_kind(kind);
        self.graph.attach(wrapper, node);
        wrapper
    }

    // ========================================================================
    // Node Index
    // ========================================================================

    fn ensure_node_index(&self, info: &mut ResourceInfo) {
        if info.node_index.is_some() {
            return;
        }
        let ResourceContent::Scene(root) = info.content else {
            return;
        };
        let mut index = FxHashMap::default();
        self.build_node_index(root, None, Mat3::IDENTITY, false, &mut index);
        info.node_index = Some(index);
    }

    /// Depth-first index of named nodes, the root included. The first
    /// occurrence of a name wins; descent stops below a node whose name was
    /// already recorded.
    fn build_node_index(
        &self,
        node: NodeHandle,
        parent: Option<NodeHandle>,
        rotation: Mat3,
        is_scaled: bool,
        index: &mut FxHashMap<String, IndexedNode>,
    ) {
        let Some(current) = self.graph.get(node) else {
            return;
        };
        if let Some(name) = current.name() {
            if index.contains_key(name) {
                return;
            }
            index.insert(
                name.to_owned(),
                IndexedNode {
                    parent,
                    node,
                    rotation,
                    is_scaled,
                },
            );
        }
        let (next_rotation, next_scaled) = match &current.kind {
            NodeKind::PositionalTransform { rotation: r, .. } => (rotation * *r, is_scaled),
            NodeKind::ScaleTransform { scale } => (rotation * Mat3::from_diagonal(*scale), true),
            NodeKind::AffineTransform { linear, .. } => (rotation * *linear, true),
            _ => (rotation, is_scaled),
        };
        for &child in current.children() {
            self.build_node_index(child, Some(node), next_rotation, next_scaled, index);
        }
    }
}

// ============================================================================
// Document Extraction
// ============================================================================

/// Named extraction from document resources: the first mapping whose `name`
/// field matches, located by depth-first search in document order. Several
/// names come back as a sequence.
fn extract_named_document_values(
    document: &Value,
    names: &[String],
    uri: &str,
    pos: Pos,
) -> Result<Value> {
    let mut values = Vec::with_capacity(names.len());
    for name in names {
        let value =
            find_named_value(document, name).ok_or_else(|| Error::NamedNodeNotFound {
                name: name.clone(),
                uri: uri.to_owned(),
                pos,
            })?;
        values.push(value.clone());
    }
    if values.len() == 1 {
        Ok(values.remove(0))
    } else {
        Ok(Value {
            pos: document.pos,
            kind: ValueKind::Sequence(Sequence {
                pos: document.pos,
                values,
            }),
        })
    }
}

fn find_named_value<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    match &value.kind {
        ValueKind::Mapping(mapping) => {
            let named = mapping
                .find("name")
                .and_then(|v| v.as_scalar().ok())
                .is_some_and(|s| s.text == name);
            if named {
                return Some(value);
            }
            mapping.iter().find_map(|(_, v)| find_named_value(v, name))
        }
        ValueKind::Sequence(sequence) => sequence
            .values
            .iter()
            .find_map(|v| find_named_value(v, name)),
        ValueKind::Scalar(_) => None,
    }
}
