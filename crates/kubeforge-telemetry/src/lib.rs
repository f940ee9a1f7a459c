//! Logging setup shared by the kubeforge binaries.
pub mod tracing;

pub use tracing::Tracing;
