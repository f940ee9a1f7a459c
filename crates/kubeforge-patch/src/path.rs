//! Tokenizer for dotted-path override expressions.
//!
//! The grammar is a dot-separated sequence of field names, where every field
//! name may be followed by one or more `[<index>]` accessors:
//!
//! ```text
//! path  := field ( "." field )*
//! field := name ( "[" digits "]" )*
//! ```
use std::{fmt::Display, num::ParseIntError, str::FromStr};

use snafu::{ResultExt, Snafu, ensure};

type Result<T, E = MalformedPathError> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum MalformedPathError {
    #[snafu(display("path expression is empty"))]
    Empty,

    #[snafu(display("empty field name at offset {offset} in {input:?}"))]
    EmptyField { input: String, offset: usize },

    #[snafu(display("unbalanced brackets at offset {offset} in {input:?}"))]
    UnbalancedBrackets { input: String, offset: usize },

    #[snafu(display("index accessor [{accessor}] in {input:?} must be a non-negative integer"))]
    NonNumericIndex { input: String, accessor: String },

    #[snafu(display("index accessor [{accessor}] in {input:?} is out of range"))]
    IndexOutOfRange {
        source: ParseIntError,
        input: String,
        accessor: String,
    },

    #[snafu(display("unexpected {character:?} at offset {offset} in {input:?}, expected '.' or '['"))]
    UnexpectedCharacter {
        input: String,
        character: char,
        offset: usize,
    },
}

/// A single step of a [`Path`].
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum PathStep {
    /// Access the member `name` of an object.
    Field(String),

    /// Access the element at `position` of a sequence.
    Index(usize),
}

impl Display for PathStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(position) => write!(f, "[{position}]"),
        }
    }
}

/// An ordered, non-empty sequence of [`PathStep`]s addressing a node in a
/// [`Document`](crate::Document).
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Path(Vec<PathStep>);

impl Path {
    /// Parses a dotted-path expression such as `a.b[0].c`.
    pub fn parse(input: &str) -> Result<Self> {
        ensure!(!input.is_empty(), EmptySnafu);

        let mut steps = Vec::new();
        let mut chars = input.char_indices().peekable();

        loop {
            let start = chars.peek().map_or(input.len(), |(offset, _)| *offset);
            let mut name = String::new();
            while let Some((_, character)) = chars.next_if(|&(_, c)| !matches!(c, '.' | '[' | ']')) {
                name.push(character);
            }
            ensure!(
                !name.is_empty(),
                EmptyFieldSnafu {
                    input,
                    offset: start
                }
            );
            steps.push(PathStep::Field(name));

            while let Some((open, _)) = chars.next_if(|&(_, c)| c == '[') {
                let mut accessor = String::new();
                let mut closed = false;
                for (_, character) in chars.by_ref() {
                    match character {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '[' => break,
                        other => accessor.push(other),
                    }
                }
                ensure!(
                    closed,
                    UnbalancedBracketsSnafu {
                        input,
                        offset: open
                    }
                );
                steps.push(PathStep::Index(Self::parse_index(input, &accessor)?));
            }

            match chars.next() {
                None => break,
                Some((_, '.')) => {}
                Some((offset, ']')) => return UnbalancedBracketsSnafu { input, offset }.fail(),
                Some((offset, character)) => {
                    return UnexpectedCharacterSnafu {
                        input,
                        character,
                        offset,
                    }
                    .fail();
                }
            }
        }

        Ok(Self(steps))
    }

    /// A path addressing the top-level member `name`.
    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![PathStep::Field(name.into())])
    }

    fn parse_index(input: &str, accessor: &str) -> Result<usize> {
        // `usize::from_str` accepts a leading '+', which the grammar does not
        ensure!(
            !accessor.is_empty() && accessor.bytes().all(|b| b.is_ascii_digit()),
            NonNumericIndexSnafu { input, accessor }
        );
        accessor
            .parse()
            .context(IndexOutOfRangeSnafu { input, accessor })
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`, a parsed path contains at least one step.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path which addresses `self` relative to `root`.
    pub fn rooted_at(&self, root: &Self) -> Self {
        Self(root.0.iter().chain(&self.0).cloned().collect())
    }

    /// Renders the first `len` steps, used to point at the failing node in
    /// error messages.
    pub fn prefix(&self, len: usize) -> String {
        render(&self.0[..len.min(self.0.len())])
    }
}

fn render(steps: &[PathStep]) -> String {
    let mut rendered = String::new();
    for step in steps {
        if matches!(step, PathStep::Field(_)) && !rendered.is_empty() {
            rendered.push('.');
        }
        rendered.push_str(&step.to_string());
    }
    rendered
}

impl FromStr for Path {
    type Err = MalformedPathError;

    fn from_str(input: &str) -> Result<Self> {
        Self::parse(input)
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&render(&self.0))
    }
}
