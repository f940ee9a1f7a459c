//! Issuing service principal credentials for new clusters.
//!
//! kubeforge itself never talks to the identity platform. Credentials are
//! either passed on the command line or requested from an [`AuthProvider`],
//! usually a [`CredentialHelper`] command configured by the user.
use std::{
    path::PathBuf,
    process::{Command, Stdio},
};

use clap::Args;
use serde::Deserialize;
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use tracing::{debug, instrument};

type Result<T, E = IssueError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum IssueError {
    #[snafu(display(
        "no credential helper is configured, pass --client-id and --client-secret or set --credential-helper"
    ))]
    NoCredentialHelper,

    #[snafu(display("failed to run credential helper {command:?}"))]
    SpawnHelper {
        source: std::io::Error,
        command: PathBuf,
    },

    #[snafu(display("credential helper {command:?} exited with {status}: {stderr}"))]
    HelperFailed {
        command: PathBuf,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[snafu(display("failed to parse the output of credential helper {command:?}"))]
    ParseHelperOutput {
        source: serde_json::Error,
        command: PathBuf,
    },

    #[snafu(display("credential helper {command:?} returned an empty appId or password"))]
    IncompleteCredentials { command: PathBuf },
}

/// Identifies the application credentials are issued for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssueRequest {
    /// Name of the application, derived from the DNS prefix of the cluster.
    pub application_name: String,

    /// Resource group the application gets a role assignment on.
    pub resource_group: String,

    pub subscription_id: Option<String>,
}

/// Credentials of a freshly created service principal.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCredentials {
    #[serde(rename = "appId")]
    pub client_id: String,

    #[serde(rename = "password")]
    pub secret: String,

    #[serde(default)]
    pub object_id: Option<String>,
}

/// Creates service principals on behalf of kubeforge.
pub trait AuthProvider {
    fn issue(&self, request: &IssueRequest) -> Result<IssuedCredentials>;
}

/// Command line arguments related to cluster credentials.
#[derive(Args, Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthArgs {
    /// Client id of an existing service principal used by the cluster.
    #[arg(long, env = "KUBEFORGE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Secret of the service principal given by --client-id.
    #[arg(long, env = "KUBEFORGE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Subscription the cluster is deployed into.
    #[arg(long, env = "KUBEFORGE_SUBSCRIPTION_ID")]
    pub subscription_id: Option<String>,

    /// Command which creates service principals, see `CredentialHelper`.
    #[arg(long, env = "KUBEFORGE_CREDENTIAL_HELPER", value_name = "COMMAND")]
    pub credential_helper: Option<PathBuf>,
}

impl AuthArgs {
    /// Returns the client id and secret if both were given and are non-empty.
    pub fn client_credentials(&self) -> Option<(&str, &str)> {
        let client_id = self.client_id.as_deref().filter(|id| !id.is_empty())?;
        let client_secret = self.client_secret.as_deref().filter(|secret| !secret.is_empty())?;
        Some((client_id, client_secret))
    }

    pub fn credential_helper(&self) -> Option<CredentialHelper> {
        self.credential_helper.clone().map(CredentialHelper::new)
    }
}

impl AuthProvider for AuthArgs {
    fn issue(&self, request: &IssueRequest) -> Result<IssuedCredentials> {
        self.credential_helper()
            .context(NoCredentialHelperSnafu)?
            .issue(request)
    }
}

/// Runs an external command to create a service principal.
///
/// The command is invoked as `<command> <application-name> <resource-group>
/// [<subscription-id>]` and must print a JSON object with the fields `appId`,
/// `password` and optionally `objectId` to stdout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialHelper {
    command: PathBuf,
}

impl CredentialHelper {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl AuthProvider for CredentialHelper {
    #[instrument(skip(self), fields(command = ?self.command))]
    fn issue(&self, request: &IssueRequest) -> Result<IssuedCredentials> {
        let command = &self.command;

        let mut helper = Command::new(command);
        helper
            .arg(&request.application_name)
            .arg(&request.resource_group)
            .args(request.subscription_id.iter())
            .stdin(Stdio::null());

        let output = helper.output().context(SpawnHelperSnafu { command })?;
        ensure!(
            output.status.success(),
            HelperFailedSnafu {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim(),
            }
        );

        let credentials: IssuedCredentials =
            serde_json::from_slice(&output.stdout).context(ParseHelperOutputSnafu { command })?;
        ensure!(
            !credentials.client_id.is_empty() && !credentials.secret.is_empty(),
            IncompleteCredentialsSnafu { command }
        );

        debug!(client_id = %credentials.client_id, "issued service principal");
        Ok(credentials)
    }
}
