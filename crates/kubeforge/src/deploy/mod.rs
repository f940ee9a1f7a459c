//! The `deploy` command.
//!
//! Deploying happens in four steps, each exposed separately so they can be
//! tested in isolation:
//!
//! 1. [`DeployCmd::validate_args`] checks the command line and resolves it
//!    into [`DeployOptions`].
//! 2. [`DeployOptions::merge_api_model`] applies `--set` overrides to the API
//!    model (or the built-in default model).
//! 3. [`DeployOptions::load_api_model`] loads the merged model, reconciles it
//!    with the command line, runs [`autofill`] and validates the result.
//! 4. [`DeployOptions::run`] persists the final API model and hands the
//!    [`DeploymentContext`] to a [`Deployer`].
use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::Args;
use kubeforge_apimodel::{
    ContainerService, LoadError, Loader, ValidationError,
    api::ServicePrincipalProfile,
    defaults::DEFAULT_API_MODEL,
    loader::serialize,
    validate,
};
use kubeforge_patch::{self as patch, MergeError, Merger};
use kubeforge_version::ApiVersion;
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use tracing::{debug, info, instrument};

use crate::auth::{AuthArgs, AuthProvider};

pub mod autofill;
pub use autofill::{AutofillError, Resolved, autofill};

/// The final API model is written to this file in the output directory.
pub const API_MODEL_FILE_NAME: &str = "apimodel.json";

/// Paths given with `--set` are relative to this member of the API model.
pub const SET_ROOT: &str = "properties";

pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("specified api model does not exist ({})", path.display()))]
    ApiModelNotFound { path: PathBuf },

    #[snafu(display("too many arguments were provided to 'deploy'"))]
    TooManyArguments,

    #[snafu(display("--location must be specified"))]
    MissingLocation,

    #[snafu(display("failed to read api model from {path:?}"))]
    ReadApiModel {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to apply --set values to the api model"))]
    MergeApiModel { source: MergeError },

    #[snafu(display("failed to load api model"))]
    LoadApiModel { source: LoadError },

    #[snafu(display(
        "--location does not match api model location ({location:?} != {model_location:?})"
    ))]
    LocationMismatch {
        location: String,
        model_location: String,
    },

    #[snafu(display("--ca-private-key-path must be specified together with --ca-certificate-path"))]
    MissingCaPrivateKeyPath,

    #[snafu(display("--ca-certificate-path must be specified together with --ca-private-key-path"))]
    MissingCaCertificatePath,

    #[snafu(display("failed to read certificate authority file {path:?}"))]
    ReadCaFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to autofill api model"))]
    Autofill { source: AutofillError },

    #[snafu(display("api model is invalid"))]
    Validate { source: ValidationError },

    #[snafu(display("output directory could not be resolved"))]
    UnresolvedOutputDirectory,

    #[snafu(display("resource group could not be resolved"))]
    UnresolvedResourceGroup,

    #[snafu(display("failed to serialize api model"))]
    SerializeApiModel { source: LoadError },

    #[snafu(display("failed to write api model to {path:?}"))]
    WriteApiModel {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("deployment failed"))]
    Deploy { source: BoxedError },
}

/// Deploy a cluster from an API model.
///
/// Every flag can also be set through the environment variable listed in
/// `--help`.
#[derive(Args, Clone, Debug, Default, PartialEq, Eq)]
pub struct DeployCmd {
    /// Path to the API model. Defaults to a single master Kubernetes cluster.
    #[arg(long, short = 'm', env = "KUBEFORGE_API_MODEL", value_name = "FILE")]
    pub api_model: Option<PathBuf>,

    /// Path to the API model, alternative to --api-model.
    #[arg(value_name = "API_MODEL")]
    pub args: Vec<PathBuf>,

    /// DNS prefix of the cluster, used when the API model does not set one.
    #[arg(long, short = 'p', env = "KUBEFORGE_DNS_PREFIX")]
    pub dns_prefix: Option<String>,

    /// Append a timestamp to the DNS prefix to make it unique.
    #[arg(long, env = "KUBEFORGE_AUTO_SUFFIX")]
    pub auto_suffix: bool,

    /// Directory for generated artifacts. Defaults to `_output/<dns prefix>`.
    #[arg(long, short = 'o', env = "KUBEFORGE_OUTPUT_DIRECTORY", value_name = "DIRECTORY")]
    pub output_directory: Option<PathBuf>,

    /// PEM encoded certificate of an existing cluster CA.
    #[arg(long, env = "KUBEFORGE_CA_CERTIFICATE_PATH", value_name = "FILE")]
    pub ca_certificate_path: Option<PathBuf>,

    /// PEM encoded private key of the CA given by --ca-certificate-path.
    #[arg(long, env = "KUBEFORGE_CA_PRIVATE_KEY_PATH", value_name = "FILE")]
    pub ca_private_key_path: Option<PathBuf>,

    /// Resource group to deploy into. Defaults to the DNS prefix.
    #[arg(long, short = 'g', env = "KUBEFORGE_RESOURCE_GROUP")]
    pub resource_group: Option<String>,

    /// Location to deploy to, e.g. `westeurope`.
    #[arg(long, short = 'l', env = "KUBEFORGE_LOCATION")]
    pub location: Option<String>,

    /// Reuse an existing output directory, overwriting generated files.
    #[arg(long, short = 'f', env = "KUBEFORGE_FORCE_OVERWRITE")]
    pub force_overwrite: bool,

    /// Override API model values, e.g. `masterProfile.count=3`. Can be
    /// repeated and accepts comma separated lists.
    #[arg(long, value_name = "PATH=VALUE")]
    pub set: Vec<String>,

    #[command(flatten)]
    pub auth: AuthArgs,
}

impl DeployCmd {
    /// Checks the command line and resolves it into [`DeployOptions`].
    ///
    /// The API model is optional. If given, as flag or as the only
    /// positional argument, it has to exist.
    pub fn validate_args(&self) -> Result<DeployOptions> {
        let mut api_models = self.api_model.iter().chain(&self.args);
        let api_model = api_models.next().cloned();
        ensure!(api_models.next().is_none(), TooManyArgumentsSnafu);

        if let Some(path) = &api_model {
            ensure!(path.exists(), ApiModelNotFoundSnafu { path });
        }

        let location = normalize_location(self.location.as_deref().unwrap_or_default());
        ensure!(!location.is_empty(), MissingLocationSnafu);

        Ok(DeployOptions {
            api_model,
            dns_prefix: non_empty(self.dns_prefix.as_ref()),
            auto_suffix: self.auto_suffix,
            output_directory: self.output_directory.clone(),
            base_output_directory: PathBuf::from(autofill::DEFAULT_OUTPUT_BASE),
            ca_certificate_path: self.ca_certificate_path.clone(),
            ca_private_key_path: self.ca_private_key_path.clone(),
            resource_group: non_empty(self.resource_group.as_ref()),
            location,
            force_overwrite: self.force_overwrite,
            set: self.set.clone(),
            auth: self.auth.clone(),
        })
    }

    /// Runs the whole `deploy` command.
    pub fn execute(&self, auth_provider: &dyn AuthProvider, deployer: &dyn Deployer) -> Result<()> {
        let options = self.validate_args()?;
        let merged = options.merge_api_model()?;
        let context = options.load_api_model(&merged, auth_provider)?;
        options.run(&context, deployer)
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|value| !value.is_empty()).cloned()
}

/// Lower-cases `location` and strips whitespace, so `West Europe` becomes
/// `westeurope`.
pub fn normalize_location(location: &str) -> String {
    location.split_whitespace().collect::<String>().to_lowercase()
}

/// The validated command line of a `deploy` invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployOptions {
    pub api_model: Option<PathBuf>,
    pub dns_prefix: Option<String>,
    pub auto_suffix: bool,
    pub output_directory: Option<PathBuf>,

    /// Parent of the output directory if none is given explicitly.
    pub base_output_directory: PathBuf,

    pub ca_certificate_path: Option<PathBuf>,
    pub ca_private_key_path: Option<PathBuf>,
    pub resource_group: Option<String>,

    /// Normalized, see [`normalize_location`].
    pub location: String,

    pub force_overwrite: bool,
    pub set: Vec<String>,
    pub auth: AuthArgs,
}

impl DeployOptions {
    /// Reads the API model, or falls back to [`DEFAULT_API_MODEL`], and
    /// applies the `--set` values to it.
    #[instrument(skip(self), fields(api_model = ?self.api_model))]
    pub fn merge_api_model(&self) -> Result<Vec<u8>> {
        let contents = match &self.api_model {
            Some(path) => fs::read(path).context(ReadApiModelSnafu { path })?,
            None => {
                info!("no api model given, using the default one");
                DEFAULT_API_MODEL.as_bytes().to_vec()
            }
        };

        if self.set.is_empty() {
            return Ok(contents);
        }

        debug!(set = ?self.set, "applying --set values");
        Merger::new()
            .with_root(patch::Path::field(SET_ROOT))
            .merge(&contents, &self.set)
            .context(MergeApiModelSnafu)
    }

    /// Loads the merged API model, fills in everything left open and
    /// validates the result.
    #[instrument(skip_all)]
    pub fn load_api_model(
        &self,
        merged: &[u8],
        auth_provider: &dyn AuthProvider,
    ) -> Result<DeploymentContext> {
        let (mut container_service, api_version) = Loader::new()
            .with_validate(true)
            .with_update(false)
            .load(merged)
            .context(LoadApiModelSnafu)?;

        self.reconcile_location(&mut container_service)?;
        self.read_certificate_authority(&mut container_service)?;

        let Resolved {
            container_service,
            output_directory,
            resource_group,
            ssh_private_key_path,
            ca_certificate_path,
            ca_private_key_path,
        } = autofill(container_service, self, auth_provider).context(AutofillSnafu)?;

        validate(&container_service).context(ValidateSnafu)?;

        Ok(DeploymentContext {
            service_principal: container_service.properties.service_principal_profile.clone(),
            location: container_service.location.clone(),
            container_service,
            api_version,
            output_directory: output_directory.context(UnresolvedOutputDirectorySnafu)?,
            resource_group: resource_group.context(UnresolvedResourceGroupSnafu)?,
            ssh_private_key_path,
            ca_certificate_path,
            ca_private_key_path,
        })
    }

    fn reconcile_location(&self, container_service: &mut ContainerService) -> Result<()> {
        let model_location = normalize_location(&container_service.location);

        if !model_location.is_empty() {
            ensure!(
                model_location == self.location,
                LocationMismatchSnafu {
                    location: &self.location,
                    model_location,
                }
            );
        }

        container_service.location.clone_from(&self.location);
        Ok(())
    }

    fn read_certificate_authority(&self, container_service: &mut ContainerService) -> Result<()> {
        let (certificate_path, private_key_path) =
            match (&self.ca_certificate_path, &self.ca_private_key_path) {
                (None, None) => return Ok(()),
                (Some(certificate_path), Some(private_key_path)) => {
                    (certificate_path, private_key_path)
                }
                (Some(_), None) => return MissingCaPrivateKeyPathSnafu.fail(),
                (None, Some(_)) => return MissingCaCertificatePathSnafu.fail(),
            };

        let ca_certificate = read_to_string(certificate_path)?;
        let ca_private_key = read_to_string(private_key_path)?;

        let profile = container_service
            .properties
            .certificate_profile
            .get_or_insert_default();
        profile.ca_certificate = ca_certificate;
        profile.ca_private_key = ca_private_key;

        debug!(?certificate_path, "using existing certificate authority");
        Ok(())
    }

    /// Persists the final API model into the output directory and hands the
    /// deployment over to `deployer`.
    #[instrument(skip_all, fields(output_directory = ?context.output_directory))]
    pub fn run(&self, context: &DeploymentContext, deployer: &dyn Deployer) -> Result<()> {
        let serialized = serialize(&context.container_service, context.api_version)
            .context(SerializeApiModelSnafu)?;

        let path = context.api_model_path();
        fs::write(&path, serialized).context(WriteApiModelSnafu { path: &path })?;
        info!(?path, "wrote api model");

        deployer.deploy(context).context(DeploySnafu)
    }
}

fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).context(ReadCaFileSnafu { path })
}

/// Everything resolved for a single deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentContext {
    pub container_service: ContainerService,
    pub api_version: ApiVersion,
    pub output_directory: PathBuf,
    pub resource_group: String,
    pub location: String,
    pub service_principal: Option<ServicePrincipalProfile>,
    pub ssh_private_key_path: Option<PathBuf>,
    pub ca_certificate_path: Option<PathBuf>,
    pub ca_private_key_path: Option<PathBuf>,
}

impl DeploymentContext {
    pub fn api_model_path(&self) -> PathBuf {
        self.output_directory.join(API_MODEL_FILE_NAME)
    }
}

/// Creates or updates the cloud resources of a [`DeploymentContext`].
pub trait Deployer {
    fn deploy(&self, context: &DeploymentContext) -> Result<(), BoxedError>;
}
