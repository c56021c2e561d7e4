//! YAML front end for the document value model.
//!
//! Drives the `yaml-rust2` event parser and assembles a [`Value`] tree,
//! recording the parser's `Marker` on every node so downstream errors can
//! point at the offending line and column. Anchored nodes are remembered by
//! the parser-assigned id and aliases resolve to a clone of the anchored
//! value; the general-purpose scanning (quoting, escapes, indentation) all
//! stays in the external parser.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::document::{Mapping, Pos, Sequence, Value, ValueKind};
use crate::errors::{Error, Result};

/// Loads the first document of `text` into a value tree.
pub fn load_string(text: &str) -> Result<Value> {
    let mut builder = TreeBuilder::default();
    let mut parser = Parser::new_from_str(text);
    parser
        .load(&mut builder, false)
        .map_err(|e| Error::Parse(e.to_string()))?;
    if let Some(message) = builder.error {
        return Err(Error::Parse(message));
    }
    builder
        .root
        .ok_or_else(|| Error::Parse("the document is empty".into()))
}

/// Loads the first document of the file at `path`.
pub fn load_file(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)?;
    load_string(&text)
}

fn pos_of(marker: Marker) -> Pos {
    // Marker lines are 1-based, columns 0-based.
    Pos::new(marker.line(), marker.col() + 1)
}

enum Container {
    Mapping {
        mapping: Mapping,
        pending_key: Option<String>,
        anchor: usize,
    },
    Sequence {
        sequence: Sequence,
        anchor: usize,
    },
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Container>,
    root: Option<Value>,
    anchors: FxHashMap<usize, Value>,
    error: Option<String>,
}

impl TreeBuilder {
    fn place(&mut self, value: Value) {
        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(value);
                }
            }
            Some(Container::Sequence { sequence, .. }) => {
                sequence.values.push(value);
            }
            Some(Container::Mapping {
                mapping,
                pending_key,
                ..
            }) => match pending_key.take() {
                None => match value.kind {
                    ValueKind::Scalar(s) => *pending_key = Some(s.text),
                    _ => {
                        self.fail(format!(
                            "only scalar mapping keys are supported ({})",
                            value.pos
                        ));
                    }
                },
                Some(key) => {
                    let pos = value.pos;
                    if !mapping.insert(key.clone(), value) {
                        self.fail(format!("duplicate mapping key \"{key}\" ({pos})"));
                    }
                }
            },
        }
    }

    fn fail(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(message);
        }
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, event: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }
        match event {
            Event::Scalar(text, style, anchor, _) => {
                let value = Value::scalar(text, style == TScalarStyle::Plain, pos_of(marker));
                if anchor > 0 {
                    self.anchors.insert(anchor, value.clone());
                }
                self.place(value);
            }
            Event::Alias(anchor) => match self.anchors.get(&anchor) {
                Some(value) => {
                    let value = value.clone();
                    self.place(value);
                }
                None => self.fail(format!("unresolved alias ({})", pos_of(marker))),
            },
            Event::SequenceStart(anchor, _) => {
                self.stack.push(Container::Sequence {
                    sequence: Sequence {
                        pos: pos_of(marker),
                        values: Vec::new(),
                    },
                    anchor,
                });
            }
            Event::SequenceEnd => {
                if let Some(Container::Sequence { sequence, anchor }) = self.stack.pop() {
                    let value = Value {
                        pos: sequence.pos,
                        kind: ValueKind::Sequence(sequence),
                    };
                    if anchor > 0 {
                        self.anchors.insert(anchor, value.clone());
                    }
                    self.place(value);
                }
            }
            Event::MappingStart(anchor, _) => {
                self.stack.push(Container::Mapping {
                    mapping: Mapping::new(pos_of(marker)),
                    pending_key: None,
                    anchor,
                });
            }
            Event::MappingEnd => {
                if let Some(Container::Mapping {
                    mapping, anchor, ..
                }) = self.stack.pop()
                {
                    let value = Value {
                        pos: mapping.pos,
                        kind: ValueKind::Mapping(mapping),
                    };
                    if anchor > 0 {
                        self.anchors.insert(anchor, value.clone());
                    }
                    self.place(value);
                }
            }
            // stream and document boundaries carry nothing we keep
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_nested_structure_with_positions() {
        let doc = load_string("type: Group\nelements:\n  - type: Shape\n").unwrap();
        let mapping = doc.as_mapping().unwrap();
        assert_eq!(
            mapping.find("type").unwrap().to_str().unwrap(),
            "Group"
        );
        let elements = mapping.find("elements").unwrap();
        assert_eq!(elements.pos.line, 3);
        let first = &elements.as_sequence().unwrap().values[0];
        assert_eq!(
            first.as_mapping().unwrap().find("type").unwrap().to_str().unwrap(),
            "Shape"
        );
    }

    #[test]
    fn resolves_aliases_to_clones() {
        let doc = load_string("base: &b [1.0, 2.0, 3.0]\nother: *b\n").unwrap();
        let mapping = doc.as_mapping().unwrap();
        let other = mapping.find("other").unwrap().as_sequence().unwrap();
        assert_eq!(other.len(), 3);
        assert!((other.values[1].to_f64().unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        assert!(matches!(
            load_string("a: 1\na: 2\n"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn empty_document_is_an_error() {
        assert!(load_string("").is_err());
    }
}
