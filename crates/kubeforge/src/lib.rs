//! The `kubeforge` command line.
//!
//! `kubeforge deploy` merges `--set` overrides into an API model, fills in
//! everything the model leaves open (credentials, DNS prefix, SSH keys,
//! certificate authority, output locations), validates the result and hands
//! it to a [`Deployer`](deploy::Deployer).
pub mod auth;
pub mod cli;
pub mod deploy;
