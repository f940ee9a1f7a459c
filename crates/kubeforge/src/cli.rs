//! Command line definition of the `kubeforge` binary.
use std::{cell::RefCell, io::Write};

use clap::{Parser, Subcommand};
use kubeforge_telemetry::tracing::TelemetryOptions;

use crate::deploy::{BoxedError, DeployCmd, Deployer, DeploymentContext};

#[derive(Debug, PartialEq, Eq, Parser)]
#[command(name = "kubeforge", author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub telemetry: TelemetryOptions,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Deploy a cluster from an API model.
    Deploy(DeployCmd),
}

/// Prints where the deployment artifacts were written.
///
/// Creating the cloud resources is left to external tooling, which picks up
/// the API model from the output directory.
pub struct SummaryDeployer<W> {
    writer: RefCell<W>,
}

impl<W: Write> SummaryDeployer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: RefCell::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> Deployer for SummaryDeployer<W> {
    fn deploy(&self, context: &DeploymentContext) -> Result<(), BoxedError> {
        let mut writer = self.writer.borrow_mut();
        writeln!(writer, "api model: {}", context.api_model_path().display())?;
        writeln!(writer, "resource group: {}", context.resource_group)?;
        writeln!(writer, "location: {}", context.location)?;
        Ok(())
    }
}
