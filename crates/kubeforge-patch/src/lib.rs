//! Applies dotted-path overrides such as `masterProfile.count=3` or
//! `agentPoolProfiles[0].vmSize=Standard_D4_v3` to arbitrary JSON documents.
//!
//! The crate is split into four layers:
//!
//! - [`path`] tokenizes an override expression into a [`Path`] of
//!   [`PathStep`]s.
//! - [`document`] contains the generic, ordered [`Document`] tree.
//! - [`patcher`] implements [`Document::apply`], which walks a path, creates
//!   intermediate structure as needed and sets a syntactically coerced leaf
//!   value.
//! - [`merger`] parses `--set` style assignment lists and applies them to a
//!   serialized base document, producing the merged bytes.
//!
//! ```
//! use kubeforge_patch::merger::Merger;
//!
//! let merged = Merger::new()
//!     .merge(br#"{"a": {"b": 1}}"#, &["a.c[1]=true,a.b=2"])
//!     .expect("valid assignments");
//!
//! let merged: serde_json::Value = serde_json::from_slice(&merged).expect("merged output is JSON");
//! assert_eq!(merged, serde_json::json!({"a": {"b": 2, "c": [{}, true]}}));
//! ```
pub mod document;
pub mod merger;
pub mod patcher;
pub mod path;

pub use document::{Document, NodeKind, Scalar};
pub use merger::{Assignment, MergeError, Merger};
pub use patcher::PatchError;
pub use path::{MalformedPathError, Path, PathStep};
