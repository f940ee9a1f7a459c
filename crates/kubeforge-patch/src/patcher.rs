//! Sets values inside a [`Document`] addressed by a [`Path`].
use indexmap::IndexMap;
use snafu::Snafu;
use tracing::trace;

use crate::{
    document::{Document, NodeKind, Scalar},
    path::{Path, PathStep},
};

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum PatchError {
    #[snafu(display("cannot access field {field:?} at {prefix:?}, the node is a {found}, not an object"))]
    TypeConflict {
        prefix: String,
        field: String,
        found: NodeKind,
    },
}

impl Document {
    /// Sets the node addressed by `path` to the coerced `raw_value`.
    ///
    /// Missing intermediate nodes are created: objects for field steps and
    /// sequences for index steps. Indexing past the end of a sequence pads
    /// it with empty objects up to the requested position. Null nodes and
    /// non-sequence nodes hit by an index step are replaced.
    ///
    /// A field step hitting a non-null scalar or a sequence is a
    /// [`PatchError::TypeConflict`]. The document is checked before it is
    /// modified, so a failing call leaves it untouched.
    pub fn apply(&mut self, path: &Path, raw_value: &str) -> Result<(), PatchError> {
        self.check_walk(path)?;

        let value = Scalar::coerce(raw_value);
        trace!(%path, ?value, "applying override");

        *self.slot_mut(path) = Document::Scalar(value);
        Ok(())
    }

    /// Follows `path` as far as nodes exist, without modifying anything,
    /// and reports the first step which cannot be walked.
    fn check_walk(&self, path: &Path) -> Result<(), PatchError> {
        let mut node = self;

        for (depth, step) in path.steps().iter().enumerate() {
            node = match (step, node) {
                (PathStep::Field(name), Document::Object(members)) => match members.get(name) {
                    Some(child) => child,
                    None => return Ok(()),
                },
                (PathStep::Field(_), node) if node.is_null() => return Ok(()),
                (PathStep::Field(name), node) => {
                    return TypeConflictSnafu {
                        prefix: path.prefix(depth),
                        field: name,
                        found: node.kind(),
                    }
                    .fail();
                }
                (PathStep::Index(position), Document::Sequence(elements)) => {
                    match elements.get(*position) {
                        Some(child) => child,
                        None => return Ok(()),
                    }
                }
                // Replaced by a fresh sequence, everything below is created
                (PathStep::Index(_), _) => return Ok(()),
            };
        }

        Ok(())
    }

    /// Walks `path`, creating or replacing nodes on the way. Callers must
    /// run [`Self::check_walk`] first.
    fn slot_mut(&mut self, path: &Path) -> &mut Document {
        let mut node = self;

        for step in path.steps() {
            node = match step {
                PathStep::Field(name) => node
                    .force_object()
                    .entry(name.clone())
                    .or_insert(Document::NULL),
                PathStep::Index(position) => {
                    let elements = node.force_sequence();
                    if *position >= elements.len() {
                        elements.resize_with(position + 1, Document::empty_object);
                    }
                    &mut elements[*position]
                }
            };
        }

        node
    }

    fn force_object(&mut self) -> &mut IndexMap<String, Document> {
        if !matches!(self, Self::Object(_)) {
            *self = Self::empty_object();
        }

        match self {
            Self::Object(members) => members,
            _ => unreachable!("node has just been replaced by an object"),
        }
    }

    fn force_sequence(&mut self) -> &mut Vec<Document> {
        if !matches!(self, Self::Sequence(_)) {
            *self = Self::Sequence(Vec::new());
        }

        match self {
            Self::Sequence(elements) => elements,
            _ => unreachable!("node has just been replaced by a sequence"),
        }
    }
}
