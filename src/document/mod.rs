//! Hierarchical document model consumed by the scene readers, plus the YAML
//! front end that produces it.

mod value;
mod yaml;

pub use value::{Mapping, Pos, Scalar, Sequence, Value, ValueKind};
pub use yaml::{load_file, load_string};
