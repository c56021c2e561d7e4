//! Resource Tests
//!
//! Tests for:
//! - Per-reader caching keyed by raw URI (one load per URI, shared subtrees)
//! - Named-node extraction with coordinate folding (accumulated rotations
//!   folded in, accumulated translations discarded)
//! - Exclusion of named subtrees and its interaction with later extraction
//! - Document resources: named extraction, exclusion rejection
//! - URI schemes and path variables

use std::cell::Cell;
use std::f32::consts::FRAC_PI_2;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use glam::{Mat3, Vec3};

use scenedoc::document::load_string;
use scenedoc::scene::Shape;
use scenedoc::{
    Error, NodeHandle, NodeKind, SceneFileLoader, SceneGraph, SceneNode, SceneReader,
    UriSchemeRegistry,
};

const EPSILON: f32 = 1.0e-4;

fn fixtures_dir() -> String {
    format!("{}/tests/fixtures", env!("CARGO_MANIFEST_DIR"))
}

fn base_rotation() -> Mat3 {
    Mat3::from_axis_angle(Vec3::Z, FRAC_PI_2)
}

fn arm_rotation() -> Mat3 {
    Mat3::from_axis_angle(Vec3::X, FRAC_PI_2)
}

/// Counts loads and builds a fixed scene:
/// root > base (rotation, translation) > arm (rotation, translation) > tip.
struct CountingLoader {
    loads: Rc<Cell<usize>>,
}

impl SceneFileLoader for CountingLoader {
    fn load(&mut self, graph: &mut SceneGraph, _path: &Path) -> scenedoc::Result<NodeHandle> {
        self.loads.set(self.loads.get() + 1);
        let tip = graph.add_node(SceneNode {
            name: Some("tip".to_owned()),
            kind: NodeKind::Shape(Shape::default()),
            children: Vec::new(),
        });
        let arm = graph.add_node(SceneNode {
            name: Some("arm".to_owned()),
            kind: NodeKind::PositionalTransform {
                rotation: arm_rotation(),
                translation: Vec3::new(0.0, 1.0, 0.0),
            },
            children: vec![tip],
        });
        let base = graph.add_node(SceneNode {
            name: Some("base".to_owned()),
            kind: NodeKind::PositionalTransform {
                rotation: base_rotation(),
                translation: Vec3::new(1.0, 2.0, 3.0),
            },
            children: vec![arm],
        });
        let root = graph.add_node(SceneNode {
            name: Some("root".to_owned()),
            kind: NodeKind::Group,
            children: vec![base],
        });
        Ok(root)
    }
}

fn reader_with_loader() -> (SceneReader, Rc<Cell<usize>>) {
    let loads = Rc::new(Cell::new(0));
    let mut reader = SceneReader::new();
    reader.set_base_directory(fixtures_dir());
    reader.set_scene_loader(Box::new(CountingLoader {
        loads: Rc::clone(&loads),
    }));
    (reader, loads)
}

fn read_with(reader: &mut SceneReader, text: &str) -> Option<NodeHandle> {
    let mut doc = load_string(text).unwrap();
    reader.read_scene(&mut doc).unwrap()
}

// ============================================================================
// Caching
// ============================================================================

#[test]
fn same_uri_is_loaded_once_and_shared() {
    let (mut reader, loads) = reader_with_loader();
    let group = read_with(
        &mut reader,
        "- { type: Resource, uri: \"robot.scen\" }\n\
         - { type: Resource, uri: \"robot.scen\" }\n",
    )
    .unwrap();
    assert_eq!(loads.get(), 1);
    let children = reader.graph()[group].children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0], children[1], "cached scene must be shared");
}

#[test]
fn missing_resource_file_is_fatal() {
    let (mut reader, _) = reader_with_loader();
    let mut doc = load_string("{ type: Resource, uri: \"no_such.scen\" }").unwrap();
    let err = reader.read_scene(&mut doc).unwrap_err();
    match err {
        Error::InvalidResourceUri { uri, message, .. } => {
            assert_eq!(uri, "no_such.scen");
            assert!(message.contains("does not exist"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn non_document_resource_without_loader_is_fatal() {
    let mut reader = SceneReader::new();
    reader.set_base_directory(fixtures_dir());
    let mut doc = load_string("{ type: Resource, uri: \"robot.scen\" }").unwrap();
    let err = reader.read_scene(&mut doc).unwrap_err();
    assert!(matches!(err, Error::NoSceneLoader { .. }));
}

#[test]
fn transform_parameters_wrap_the_resource() {
    let (mut reader, _) = reader_with_loader();
    let node = read_with(
        &mut reader,
        "{ type: Resource, uri: \"robot.scen\", translation: [ 5, 0, 0 ] }",
    )
    .unwrap();
    match reader.graph()[node].kind {
        NodeKind::PositionalTransform { translation, .. } => {
            assert!(translation.abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), EPSILON));
        }
        ref other => panic!("unexpected kind: {other:?}"),
    }
    assert_eq!(reader.graph()[node].children().len(), 1);
}

#[test]
fn scale_on_a_resource_nests_inside_the_positional_transform() {
    let (mut reader, _) = reader_with_loader();
    let node = read_with(
        &mut reader,
        "{ type: Resource, uri: \"robot.scen\", translation: [ 5, 0, 0 ], scale: 2 }",
    )
    .unwrap();
    assert!(matches!(
        reader.graph()[node].kind,
        NodeKind::PositionalTransform { .. }
    ));
    let scaling = reader.graph()[node].children()[0];
    match reader.graph()[scaling].kind {
        NodeKind::ScaleTransform { scale } => {
            assert!(scale.abs_diff_eq(Vec3::splat(2.0), EPSILON));
        }
        ref other => panic!("unexpected kind: {other:?}"),
    }
    assert_eq!(reader.graph()[scaling].children().len(), 1);
}

// ============================================================================
// Named Extraction and Coordinate Folding
// ============================================================================

#[test]
fn extracted_node_folds_ancestor_rotations() {
    let (mut reader, _) = reader_with_loader();
    let node = read_with(
        &mut reader,
        "{ type: Resource, uri: \"robot.scen\", node: arm }",
    )
    .unwrap();
    let expected = base_rotation() * arm_rotation();
    match reader.graph()[node].kind {
        NodeKind::PositionalTransform { rotation, .. } => {
            assert!(rotation.abs_diff_eq(expected, EPSILON), "got {rotation:?}");
        }
        ref other => panic!("unexpected kind: {other:?}"),
    }
}

#[test]
fn extracted_transform_translation_is_reset() {
    // Accumulated translations are not preserved by extraction; the
    // extracted transform comes out with a zero translation.
    let (mut reader, _) = reader_with_loader();
    let node = read_with(
        &mut reader,
        "{ type: Resource, uri: \"robot.scen\", node: arm }",
    )
    .unwrap();
    match reader.graph()[node].kind {
        NodeKind::PositionalTransform { translation, .. } => {
            assert!(translation.abs_diff_eq(Vec3::ZERO, EPSILON), "got {translation:?}");
        }
        ref other => panic!("unexpected kind: {other:?}"),
    }
}

#[test]
fn extraction_is_idempotent_across_reads() {
    let (mut reader, loads) = reader_with_loader();
    let first = read_with(
        &mut reader,
        "{ type: Resource, uri: \"robot.scen\", node: arm }",
    )
    .unwrap();
    let second = read_with(
        &mut reader,
        "{ type: Resource, uri: \"robot.scen\", node: arm }",
    )
    .unwrap();
    assert_eq!(loads.get(), 1);
    assert_eq!(first, second);
    let expected = base_rotation() * arm_rotation();
    match reader.graph()[first].kind {
        NodeKind::PositionalTransform { rotation, .. } => {
            // folding must not be applied twice
            assert!(rotation.abs_diff_eq(expected, EPSILON), "got {rotation:?}");
        }
        ref other => panic!("unexpected kind: {other:?}"),
    }
}

#[test]
fn extraction_detaches_the_node_from_the_cached_scene() {
    let (mut reader, loads) = reader_with_loader();
    let arm = read_with(
        &mut reader,
        "{ type: Resource, uri: \"robot.scen\", node: arm }",
    )
    .unwrap();
    // a later whole-scene read must neither contain the extracted node nor
    // show the folded transform anywhere above the extraction point
    let root = read_with(&mut reader, "{ type: Resource, uri: \"robot.scen\" }").unwrap();
    assert_eq!(loads.get(), 1);
    assert_ne!(root, arm);
    assert!(reader.graph().find_by_name(root, "arm").is_none());
    let base = reader.graph().find_by_name(root, "base").unwrap();
    match reader.graph()[base].kind {
        NodeKind::PositionalTransform { rotation, translation } => {
            assert!(rotation.abs_diff_eq(base_rotation(), EPSILON));
            assert!(translation.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), EPSILON));
        }
        ref other => panic!("unexpected kind: {other:?}"),
    }
}

#[test]
fn folding_wrapper_carries_no_name() {
    let (mut reader, _) = reader_with_loader();
    let node = read_with(
        &mut reader,
        "{ type: Resource, uri: \"robot.scen\", node: tip }",
    )
    .unwrap();
    // a shape under rotated ancestors comes back wrapped in a transform;
    // the name stays on the shape alone
    match reader.graph()[node].kind {
        NodeKind::PositionalTransform { rotation, .. } => {
            assert!(rotation.abs_diff_eq(base_rotation() * arm_rotation(), EPSILON));
        }
        ref other => panic!("unexpected kind: {other:?}"),
    }
    assert!(reader.graph()[node].name().is_none());
    let inner = reader.graph()[node].children()[0];
    assert_eq!(reader.graph()[inner].name(), Some("tip"));
}

#[test]
fn several_names_come_back_copied_under_a_group() {
    let (mut reader, _) = reader_with_loader();
    let node = read_with(
        &mut reader,
        "{ type: Resource, uri: \"robot.scen\", node: [ arm, tip ] }",
    )
    .unwrap();
    assert!(matches!(reader.graph()[node].kind, NodeKind::Group));
    let children: Vec<NodeHandle> = reader.graph()[node].children().to_vec();
    assert_eq!(children.len(), 2);
    // copies, not the cached nodes themselves
    let cached_arm = read_with(
        &mut reader,
        "{ type: Resource, uri: \"robot.scen\", node: arm }",
    )
    .unwrap();
    assert_ne!(children[0], cached_arm);
    assert_eq!(reader.graph()[children[0]].name(), Some("arm"));
    assert!(reader.graph().find_by_name(children[1], "tip").is_some());
}

#[test]
fn unknown_node_name_is_fatal() {
    let (mut reader, _) = reader_with_loader();
    let mut doc =
        load_string("{ type: Resource, uri: \"robot.scen\", node: elbow }").unwrap();
    let err = reader.read_scene(&mut doc).unwrap_err();
    match err {
        Error::NamedNodeNotFound { name, uri, .. } => {
            assert_eq!(name, "elbow");
            assert_eq!(uri, "robot.scen");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ============================================================================
// Exclusion
// ============================================================================

#[test]
fn excluded_subtree_disappears_from_later_reads() {
    let (mut reader, loads) = reader_with_loader();
    let first = read_with(
        &mut reader,
        "{ type: Resource, uri: \"robot.scen\", exclude: tip }",
    )
    .unwrap();
    assert!(reader.graph().find_by_name(first, "tip").is_none());
    // the cache was modified in place; a later extraction sees the cut
    let arm = read_with(
        &mut reader,
        "{ type: Resource, uri: \"robot.scen\", node: arm }",
    )
    .unwrap();
    assert_eq!(loads.get(), 1);
    assert!(reader.graph().find_by_name(arm, "tip").is_none());
    assert_eq!(reader.graph()[arm].name(), Some("arm"));
}

#[test]
fn excluding_an_unknown_name_is_fatal() {
    let (mut reader, _) = reader_with_loader();
    let mut doc =
        load_string("{ type: Resource, uri: \"robot.scen\", exclude: elbow }").unwrap();
    let err = reader.read_scene(&mut doc).unwrap_err();
    assert!(matches!(err, Error::NamedNodeNotFound { .. }));
}

#[test]
fn exclude_on_a_document_resource_is_fatal() {
    let mut reader = SceneReader::new();
    reader.set_base_directory(fixtures_dir());
    let mut doc = load_string("{ uri: \"parts.yaml\", exclude: wheel }").unwrap();
    let err = reader
        .read_resource(doc.as_mapping_mut().unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::ExcludeOnDocumentResource { .. }));
}

// ============================================================================
// Document Resources
// ============================================================================

#[test]
fn document_resource_extracts_named_mappings() {
    let mut reader = SceneReader::new();
    reader.set_base_directory(fixtures_dir());
    let mut doc = load_string("{ uri: \"parts.yaml\", node: wheel }").unwrap();
    let resource = reader.read_resource(doc.as_mapping_mut().unwrap()).unwrap();
    assert!(resource.scene.is_none());
    let wheel = resource.document.unwrap();
    let wheel = wheel.as_mapping().unwrap();
    assert_eq!(wheel.read_string("name").unwrap().as_deref(), Some("wheel"));
    assert!((wheel.read_f32("radius").unwrap().unwrap() - 0.5).abs() < EPSILON);
}

#[test]
fn document_resource_without_names_returns_the_whole_document() {
    let mut reader = SceneReader::new();
    reader.set_base_directory(fixtures_dir());
    let mut doc = load_string("{ uri: \"parts.yaml\" }").unwrap();
    let resource = reader.read_resource(doc.as_mapping_mut().unwrap()).unwrap();
    let document = resource.document.unwrap();
    assert!(document.as_mapping().unwrap().contains("components"));
    assert!(resource.directory.ends_with("fixtures"));
}

#[test]
fn document_resource_reads_as_a_scene_node() {
    let mut reader = SceneReader::new();
    reader.set_base_directory(fixtures_dir());
    let node = read_with(
        &mut reader,
        "{ type: Resource, uri: \"shape_doc.yaml\", translation: [ 1, 0, 0 ] }",
    )
    .unwrap();
    match reader.graph()[node].kind {
        NodeKind::PositionalTransform { translation, .. } => {
            assert!(translation.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), EPSILON));
        }
        ref other => panic!("unexpected kind: {other:?}"),
    }
    let shape = reader.graph()[node].children()[0];
    match &reader.graph()[shape].kind {
        NodeKind::Shape(shape) => assert!(shape.mesh.is_some()),
        other => panic!("unexpected kind: {other:?}"),
    }
}

// ============================================================================
// URI Schemes and Path Variables
// ============================================================================

#[test]
fn registered_scheme_resolves_to_a_path() {
    let registry = Arc::new(UriSchemeRegistry::new());
    let fixtures = fixtures_dir();
    registry.register(
        "model",
        Arc::new(move |rest, _os| format!("{fixtures}/{rest}")),
    );
    let loads = Rc::new(Cell::new(0));
    let mut reader = SceneReader::with_registry(registry);
    reader.set_scene_loader(Box::new(CountingLoader {
        loads: Rc::clone(&loads),
    }));
    let node = read_with(&mut reader, "{ type: Resource, uri: \"model://robot.scen\" }");
    assert!(node.is_some());
    assert_eq!(loads.get(), 1);
}

#[test]
fn unknown_scheme_is_fatal() {
    let (mut reader, _) = reader_with_loader();
    let mut doc = load_string("{ type: Resource, uri: \"warehouse://robot.scen\" }").unwrap();
    let err = reader.read_scene(&mut doc).unwrap_err();
    match err {
        Error::UnknownUriScheme { scheme, .. } => assert_eq!(scheme, "warehouse"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failing_scheme_handler_is_fatal_with_its_message() {
    let registry = Arc::new(UriSchemeRegistry::new());
    registry.register(
        "model",
        Arc::new(|_rest, os: &mut dyn std::io::Write| {
            let _ = writeln!(os, "catalog is offline");
            String::new()
        }),
    );
    let mut reader = SceneReader::with_registry(registry);
    let mut doc = load_string("{ type: Resource, uri: \"model://robot.scen\" }").unwrap();
    let err = reader.read_scene(&mut doc).unwrap_err();
    match err {
        Error::InvalidResourceUri { message, .. } => {
            assert!(message.contains("catalog is offline"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn path_variables_expand_in_resource_uris() {
    let loads = Rc::new(Cell::new(0));
    let mut reader = SceneReader::new();
    reader.set_path_variable("FIXTURES", fixtures_dir());
    reader.set_scene_loader(Box::new(CountingLoader {
        loads: Rc::clone(&loads),
    }));
    let node = read_with(
        &mut reader,
        "{ type: Resource, uri: \"${FIXTURES}/robot.scen\" }",
    );
    assert!(node.is_some());
    assert_eq!(loads.get(), 1);
}

#[test]
fn file_scheme_uris_resolve_like_plain_paths() {
    let (mut reader, loads) = reader_with_loader();
    let node = read_with(&mut reader, "{ type: Resource, uri: \"file://robot.scen\" }");
    assert!(node.is_some());
    assert_eq!(loads.get(), 1);
}
