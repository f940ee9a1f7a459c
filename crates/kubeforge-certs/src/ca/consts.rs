use std::time::Duration;

/// Cluster CAs are long-lived, rotating them requires redeploying every
/// cluster component. Twenty years keeps `notAfter` encodable as UTCTime.
pub const DEFAULT_CA_VALIDITY: Duration = Duration::from_secs(20 * 365 * 24 * 60 * 60);

/// The root CA subject name containing only the common name.
pub const DEFAULT_CA_SUBJECT: &str = "CN=kubeforge cluster CA";
