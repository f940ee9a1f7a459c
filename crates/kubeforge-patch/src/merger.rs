//! Applies lists of `--set` style override assignments to a serialized
//! document.
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::{debug, instrument};

use crate::{
    document::Document,
    patcher::PatchError,
    path::{MalformedPathError, Path},
};

type Result<T, E = MergeError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum MergeError {
    #[snafu(display("failed to parse base document"))]
    ParseBase { source: serde_json::Error },

    #[snafu(display("assignment {assignment:?} is missing '=', expected <path>=<value>"))]
    EmptyAssignment { assignment: String },

    #[snafu(display("invalid path in assignment {assignment:?}"))]
    MalformedPath {
        source: MalformedPathError,
        assignment: String,
    },

    #[snafu(display("failed to apply assignment {assignment:?}"))]
    Apply {
        source: PatchError,
        assignment: String,
    },

    #[snafu(display("failed to serialize merged document"))]
    Serialize { source: serde_json::Error },
}

/// A single `<path>=<value>` directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub path: Path,
    pub raw_value: String,
}

impl Assignment {
    /// Parses a single `<path>=<value>` directive. The value is everything
    /// after the first `=`, so it may contain further `=` characters.
    pub fn parse(assignment: &str) -> Result<Self> {
        let (path, raw_value) = assignment
            .split_once('=')
            .context(EmptyAssignmentSnafu { assignment })?;

        let path = Path::parse(path).context(MalformedPathSnafu { assignment })?;

        Ok(Self {
            path,
            raw_value: raw_value.to_owned(),
        })
    }
}

/// Splits every element of `assignments` on `,` and parses the non-empty
/// segments, in order.
pub fn parse_assignments(assignments: &[impl AsRef<str>]) -> Result<Vec<Assignment>> {
    assignments
        .iter()
        .flat_map(|assignments| assignments.as_ref().split(','))
        .filter(|segment| !segment.is_empty())
        .map(Assignment::parse)
        .collect()
}

/// Merges override assignments into a base document.
///
/// Paths of all assignments are interpreted relative to an optional root,
/// which allows callers to hide a common prefix from their users.
#[derive(Clone, Debug, Default)]
pub struct Merger {
    root: Option<Path>,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interprets every assignment path relative to `root`.
    pub fn with_root(mut self, root: Path) -> Self {
        self.root = Some(root);
        self
    }

    /// Applies `assignments` in order to `base` and returns the merged
    /// document as pretty-printed JSON.
    ///
    /// An empty `base` is treated as an empty object. The first failing
    /// assignment aborts the whole merge.
    #[instrument(skip(self, base, assignments), fields(root = ?self.root))]
    pub fn merge(&self, base: &[u8], assignments: &[impl AsRef<str>]) -> Result<Vec<u8>> {
        let mut document = if base.iter().all(u8::is_ascii_whitespace) {
            Document::empty_object()
        } else {
            serde_json::from_slice(base).context(ParseBaseSnafu)?
        };

        let segments = assignments
            .iter()
            .flat_map(|assignments| assignments.as_ref().split(','))
            .filter(|segment| !segment.is_empty());

        for segment in segments {
            let Assignment { path, raw_value } = Assignment::parse(segment)?;
            let path = match &self.root {
                Some(root) => path.rooted_at(root),
                None => path,
            };

            debug!(%path, %raw_value, "merging assignment");
            document
                .apply(&path, &raw_value)
                .context(ApplySnafu {
                    assignment: segment,
                })?;
        }

        let mut merged = serde_json::to_vec_pretty(&document).context(SerializeSnafu)?;
        merged.push(b'\n');
        Ok(merged)
    }
}

/// Merges `assignments` into `base` relative to the document root.
///
/// See [`Merger::merge`].
pub fn merge(base: &[u8], assignments: &[impl AsRef<str>]) -> Result<Vec<u8>> {
    Merger::new().merge(base, assignments)
}
