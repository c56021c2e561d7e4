//! Error Types
//!
//! The main error type [`Error`] covers every failure mode of the loader:
//! document parsing, structural errors in scene descriptions, resource
//! resolution and mesh generation. Fatal structural errors carry the source
//! position of the offending document node so callers can report exactly
//! where a description went wrong.
//!
//! All public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`.

use thiserror::Error;

use crate::document::Pos;

/// The main error type for the scene-description loader.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Document Errors
    // ========================================================================
    /// The underlying YAML parser rejected the document.
    #[error("document parse error: {0}")]
    Parse(String),

    /// A document node had the wrong kind for the requested access.
    #[error("{expected} expected ({pos})")]
    TypeMismatch { expected: &'static str, pos: Pos },

    /// A scalar could not be converted to the requested type.
    #[error("invalid {expected} value \"{value}\" ({pos})")]
    ScalarConversion {
        expected: &'static str,
        value: String,
        pos: Pos,
    },

    /// A required field is missing from a mapping.
    #[error("the \"{key}\" field is required ({pos})")]
    MissingField { key: &'static str, pos: Pos },

    /// A flattened array field has the wrong number of elements.
    #[error("the number of elements in \"{key}\" must be a multiple of {stride} ({pos})")]
    ArrayStride {
        key: &'static str,
        stride: usize,
        pos: Pos,
    },

    /// An index field points outside the array it indexes.
    #[error("index {index} is out of range ({pos})")]
    IndexOutOfRange { index: i64, pos: Pos },

    // ========================================================================
    // Structural Errors
    // ========================================================================
    /// The node type has no registered builder.
    #[error("the node type \"{type_name}\" is not defined ({pos})")]
    UndefinedNodeType { type_name: String, pos: Pos },

    /// The geometry type is not recognized.
    #[error("unknown geometry \"{type_name}\" ({pos})")]
    UnknownGeometry { type_name: String, pos: Pos },

    /// A mapping-style element declared a `type` that contradicts its key.
    #[error("the node type \"{actual}\" is different from the type \"{expected}\" specified in the parent node ({pos})")]
    NodeTypeMismatch {
        expected: String,
        actual: String,
        pos: Pos,
    },

    /// An `elements` field was a scalar.
    #[error("a scalar value is not accepted as the node elements ({pos})")]
    InvalidElements { pos: Pos },

    /// A rotation entry specified a zero axis.
    #[error("rotation axis is the zero vector ({pos})")]
    ZeroRotationAxis { pos: Pos },

    /// The `angle_unit` header had an unrecognized value.
    #[error("the \"angle_unit\" value must be either \"radian\" or \"degree\" ({pos})")]
    InvalidAngleUnit { pos: Pos },

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// The URI scheme has no registered handler.
    #[error("the \"{scheme}\" scheme of \"{uri}\" is not available ({pos})")]
    UnknownUriScheme {
        scheme: String,
        uri: String,
        pos: Pos,
    },

    /// The URI could not be resolved to an existing path.
    #[error("the resource URI \"{uri}\" is not valid: {message} ({pos})")]
    InvalidResourceUri {
        uri: String,
        message: String,
        pos: Pos,
    },

    /// The resource was resolved but could not be loaded.
    #[error("the resource \"{uri}\" cannot be loaded: {message} ({pos})")]
    ResourceLoadFailed {
        uri: String,
        message: String,
        pos: Pos,
    },

    /// A non-YAML resource was requested but no scene file loader is set.
    #[error("no scene file loader is available for \"{uri}\" ({pos})")]
    NoSceneLoader { uri: String, pos: Pos },

    /// A name listed in `node` or `exclude` does not exist in the resource.
    #[error("node \"{name}\" is not found in \"{uri}\" ({pos})")]
    NamedNodeNotFound {
        name: String,
        uri: String,
        pos: Pos,
    },

    /// The `exclude` field had a value other than a string or sequence.
    #[error("the value of \"exclude\" must be a string or a sequence ({pos})")]
    InvalidExclude { pos: Pos },

    /// `exclude` was applied to a resource that is a YAML document.
    #[error("\"exclude\" is only supported for scene file resources ({pos})")]
    ExcludeOnDocumentResource { pos: Pos },

    /// A resource used as a geometry did not resolve to a single shape.
    #[error("a resource specified as a geometry must be a single mesh ({pos})")]
    ResourceNotAMesh { pos: Pos },

    // ========================================================================
    // Mesh Errors
    // ========================================================================
    /// The mesh generator rejected the primitive parameters.
    #[error("a {kind} cannot be generated with the given parameters ({pos})")]
    PrimitiveGeneration { kind: &'static str, pos: Pos },

    /// The polygon triangulator failed.
    #[error("error of an IndexedFaceSet node: {message} ({pos})")]
    Triangulation { message: String, pos: Pos },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
