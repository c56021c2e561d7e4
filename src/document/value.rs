//! Document Value Model
//!
//! A closed tagged tree of scalars, mappings and sequences, every node
//! carrying the source line/column it came from. Scene readers consume this
//! model read-only, with one exception: [`Mapping::extract`] removes a key
//! and hands its value to the caller.
//!
//! Scalars keep the raw text plus a "plain style" flag; typed access parses
//! on demand so a quoted `"5"` and a plain `5` both read back as numbers,
//! and conversion failures report the exact document position.

use std::fmt;

use crate::errors::{Error, Result};

/// A source position inside a document (1-based line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

impl Pos {
    #[must_use]
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A scalar document node: raw text plus its YAML presentation style.
#[derive(Debug, Clone)]
pub struct Scalar {
    pub text: String,
    /// True for plain (unquoted) scalars; quoted scalars never resolve to
    /// null even when their text is empty.
    pub plain: bool,
}

impl Scalar {
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.plain && matches!(self.text.as_str(), "" | "~" | "null" | "Null" | "NULL")
    }
}

/// The kind of a document node.
#[derive(Debug, Clone)]
pub enum ValueKind {
    Scalar(Scalar),
    Mapping(Mapping),
    Sequence(Sequence),
}

/// A document node: a kind plus the position it was read from.
#[derive(Debug, Clone)]
pub struct Value {
    pub pos: Pos,
    pub kind: ValueKind,
}

impl Value {
    #[must_use]
    pub fn scalar(text: impl Into<String>, plain: bool, pos: Pos) -> Self {
        Self {
            pos,
            kind: ValueKind::Scalar(Scalar {
                text: text.into(),
                plain,
            }),
        }
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, ValueKind::Scalar(_))
    }

    #[must_use]
    pub fn is_mapping(&self) -> bool {
        matches!(self.kind, ValueKind::Mapping(_))
    }

    #[must_use]
    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, ValueKind::Sequence(_))
    }

    pub fn as_scalar(&self) -> Result<&Scalar> {
        match &self.kind {
            ValueKind::Scalar(s) => Ok(s),
            _ => Err(Error::TypeMismatch {
                expected: "a scalar",
                pos: self.pos,
            }),
        }
    }

    pub fn as_mapping(&self) -> Result<&Mapping> {
        match &self.kind {
            ValueKind::Mapping(m) => Ok(m),
            _ => Err(Error::TypeMismatch {
                expected: "a mapping",
                pos: self.pos,
            }),
        }
    }

    pub fn as_mapping_mut(&mut self) -> Result<&mut Mapping> {
        match &mut self.kind {
            ValueKind::Mapping(m) => Ok(m),
            _ => Err(Error::TypeMismatch {
                expected: "a mapping",
                pos: self.pos,
            }),
        }
    }

    pub fn as_sequence(&self) -> Result<&Sequence> {
        match &self.kind {
            ValueKind::Sequence(s) => Ok(s),
            _ => Err(Error::TypeMismatch {
                expected: "a sequence",
                pos: self.pos,
            }),
        }
    }

    pub fn as_sequence_mut(&mut self) -> Result<&mut Sequence> {
        match &mut self.kind {
            ValueKind::Sequence(s) => Ok(s),
            _ => Err(Error::TypeMismatch {
                expected: "a sequence",
                pos: self.pos,
            }),
        }
    }

    pub fn to_str(&self) -> Result<&str> {
        Ok(self.as_scalar()?.text.as_str())
    }

    pub fn to_f64(&self) -> Result<f64> {
        let s = self.as_scalar()?;
        s.text.trim().parse().map_err(|_| Error::ScalarConversion {
            expected: "number",
            value: s.text.clone(),
            pos: self.pos,
        })
    }

    pub fn to_f32(&self) -> Result<f32> {
        self.to_f64().map(|v| v as f32)
    }

    pub fn to_i64(&self) -> Result<i64> {
        let s = self.as_scalar()?;
        s.text.trim().parse().map_err(|_| Error::ScalarConversion {
            expected: "integer",
            value: s.text.clone(),
            pos: self.pos,
        })
    }

    pub fn to_i32(&self) -> Result<i32> {
        Ok(self.to_i64()? as i32)
    }

    pub fn to_u32(&self) -> Result<u32> {
        let v = self.to_i64()?;
        u32::try_from(v).map_err(|_| Error::ScalarConversion {
            expected: "non-negative integer",
            value: v.to_string(),
            pos: self.pos,
        })
    }

    pub fn to_bool(&self) -> Result<bool> {
        let s = self.as_scalar()?;
        match s.text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Ok(true),
            "false" | "no" | "off" => Ok(false),
            _ => Err(Error::ScalarConversion {
                expected: "boolean",
                value: s.text.clone(),
                pos: self.pos,
            }),
        }
    }
}

/// An ordered sequence of document nodes.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    pub pos: Pos,
    pub values: Vec<Value>,
}

impl Sequence {
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// Reads the whole sequence as scalars converted by `f`.
    pub fn to_vec_of<T>(&self, f: impl Fn(&Value) -> Result<T>) -> Result<Vec<T>> {
        self.values.iter().map(f).collect()
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// A key/value mapping preserving document order. Keys are unique.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    pub pos: Pos,
    entries: Vec<(String, Value)>,
}

impl Mapping {
    #[must_use]
    pub fn new(pos: Pos) -> Self {
        Self {
            pos,
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts a new entry. Returns false when the key already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if self.contains(&key) {
            return false;
        }
        self.entries.push((key, value));
        true
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    #[must_use]
    pub fn find(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn find_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Finds the first present key out of `keys` (snake/camel alias pairs).
    #[must_use]
    pub fn find_any(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().find_map(|key| self.find(key))
    }

    /// Removes `key` from the mapping and returns its value.
    pub fn extract(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Removes the first present key out of `keys` and returns its value.
    pub fn extract_any(&mut self, keys: &[&str]) -> Option<Value> {
        keys.iter().find_map(|key| self.extract(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    // ========================================================================
    // Typed field access. `Ok(None)` means the key is absent; a present key
    // of the wrong kind is an error at that key's position.
    // ========================================================================

    pub fn read_string(&self, key: &str) -> Result<Option<String>> {
        self.find(key).map(|v| v.to_str().map(String::from)).transpose()
    }

    pub fn read_string_any(&self, keys: &[&str]) -> Result<Option<String>> {
        self.find_any(keys)
            .map(|v| v.to_str().map(String::from))
            .transpose()
    }

    pub fn read_f32(&self, key: &str) -> Result<Option<f32>> {
        self.find(key).map(Value::to_f32).transpose()
    }

    pub fn read_f32_any(&self, keys: &[&str]) -> Result<Option<f32>> {
        self.find_any(keys).map(Value::to_f32).transpose()
    }

    pub fn read_i32(&self, key: &str) -> Result<Option<i32>> {
        self.find(key).map(Value::to_i32).transpose()
    }

    pub fn read_u32_any(&self, keys: &[&str]) -> Result<Option<u32>> {
        self.find_any(keys).map(Value::to_u32).transpose()
    }

    pub fn read_bool(&self, key: &str) -> Result<Option<bool>> {
        self.find(key).map(Value::to_bool).transpose()
    }

    pub fn read_bool_any(&self, keys: &[&str]) -> Result<Option<bool>> {
        self.find_any(keys).map(Value::to_bool).transpose()
    }

    /// Finds a sequence-valued key; a present non-sequence is an error.
    pub fn find_sequence(&self, key: &str) -> Result<Option<&Sequence>> {
        self.find(key).map(Value::as_sequence).transpose()
    }

    pub fn find_sequence_any(&self, keys: &[&str]) -> Result<Option<&Sequence>> {
        self.find_any(keys).map(Value::as_sequence).transpose()
    }

    /// Finds a mapping-valued key; a present non-mapping is an error.
    pub fn find_mapping(&self, key: &str) -> Result<Option<&Mapping>> {
        self.find(key).map(Value::as_mapping).transpose()
    }

    pub fn find_mapping_mut(&mut self, key: &str) -> Result<Option<&mut Mapping>> {
        self.find_mut(key).map(Value::as_mapping_mut).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(text: &str) -> Value {
        Value::scalar(text, true, Pos::new(1, 1))
    }

    #[test]
    fn scalar_conversions() {
        assert_eq!(scalar("42").to_i64().unwrap(), 42);
        assert!((scalar("1.5").to_f64().unwrap() - 1.5).abs() < 1e-12);
        assert!(scalar("on").to_bool().unwrap());
        assert!(!scalar("FALSE").to_bool().unwrap());
        assert!(scalar("maybe").to_bool().is_err());
    }

    #[test]
    fn conversion_error_carries_position() {
        let v = Value::scalar("abc", true, Pos::new(7, 3));
        match v.to_f64() {
            Err(Error::ScalarConversion { pos, .. }) => {
                assert_eq!(pos, Pos::new(7, 3));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn mapping_extract_removes_key() {
        let mut m = Mapping::new(Pos::default());
        assert!(m.insert("a", scalar("1")));
        assert!(!m.insert("a", scalar("2")));
        assert!(m.extract("a").is_some());
        assert!(m.extract("a").is_none());
        assert!(m.is_empty());
    }

    #[test]
    fn mapping_find_any_prefers_first_key() {
        let mut m = Mapping::new(Pos::default());
        m.insert("angle_unit", scalar("degree"));
        m.insert("angleUnit", scalar("radian"));
        let v = m.find_any(&["angle_unit", "angleUnit"]).unwrap();
        assert_eq!(v.to_str().unwrap(), "degree");
    }
}
