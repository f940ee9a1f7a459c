use clap::Parser;
use kubeforge::cli::{Cli, Command, SummaryDeployer};
use kubeforge_telemetry::Tracing;
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    InitTracing {
        source: kubeforge_telemetry::tracing::Error,
    },

    #[snafu(display("failed to deploy"))]
    Deploy { source: kubeforge::deploy::Error },
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let Cli { command, telemetry } = Cli::parse();

    let _tracing_guard = Tracing::pre_configured(env!("CARGO_PKG_NAME"), telemetry)
        .init()
        .context(InitTracingSnafu)?;

    match command {
        Command::Deploy(deploy) => {
            let deployer = SummaryDeployer::new(std::io::stdout());
            deploy
                .execute(&deploy.auth, &deployer)
                .context(DeploySnafu)
        }
    }
}
