//! This library provides strongly-typed and validated API model version tags.
//! An API model declares the schema it was authored against in its top-level
//! `apiVersion` field, which is either the experimental `vlabs` tag or a dated
//! release tag in the `YYYY-MM-DD(-preview)` format.
//!
//! ## Usage
//!
//! Versions can be parsed and validated from [`str`] using Rust's standard
//! [`FromStr`](std::str::FromStr) trait.
//!
//! ```
//! # use std::str::FromStr;
//! use kubeforge_version::{ApiVersion, ReleaseDate};
//!
//! let api_version = ApiVersion::from_str("vlabs").expect("valid API version");
//! assert_eq!(api_version, ApiVersion::Labs);
//!
//! // Or using .parse()
//! let api_version: ApiVersion = "2017-07-01".parse().expect("valid API version");
//! assert_eq!(api_version, ApiVersion::Dated(ReleaseDate::new(2017, 7, 1, false)));
//! ```
//!
//! Versions are totally ordered: dated releases are ordered chronologically
//! (a preview sorts before the release of the same day) and `vlabs` sorts
//! after every dated release.

mod api_version;
mod release_date;

pub use api_version::*;
pub use release_date::*;
