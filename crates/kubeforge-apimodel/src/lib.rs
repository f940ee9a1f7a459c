//! Typed cluster specifications ("API models") for kubeforge.
//!
//! The [`api`] module contains the canonical [`ContainerService`] which the
//! rest of kubeforge operates on. Versioned wire formats live in [`vlabs`]
//! and [`v20170701`], the [`Loader`] picks the right one based on the
//! `apiVersion` of the input and converts it into the canonical form.
//!
//! Only the fields needed by kubeforge are modelled. Every struct carries
//! the remaining fields in an `extra` map, so unknown fields survive a load
//! and serialize cycle untouched.
pub mod api;
pub mod defaults;
pub mod loader;
pub mod v20170701;
pub mod validation;
pub mod vlabs;

pub use api::ContainerService;
pub use loader::{LoadError, Loader};
pub use validation::{ValidationError, validate};
