//! Loads API models of any supported version into the canonical
//! [`ContainerService`].
use std::path::{Path, PathBuf};

use kubeforge_version::{ApiVersion, ApiVersionParseError};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::{debug, instrument};

use crate::{api::ContainerService, v20170701, vlabs, vlabs::StructuralError};

/// The API versions the [`Loader`] accepts, oldest first.
pub const SUPPORTED_API_VERSIONS: [ApiVersion; 2] = [v20170701::API_VERSION, ApiVersion::Labs];

type Result<T, E = LoadError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum LoadError {
    #[snafu(display("failed to read API model from {path:?}"))]
    ReadFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse API model"))]
    ParseDocument { source: serde_json::Error },

    #[snafu(display("API model does not specify an apiVersion"))]
    MissingApiVersion,

    #[snafu(display("failed to parse apiVersion of API model"))]
    ParseApiVersion { source: ApiVersionParseError },

    #[snafu(display("apiVersion {api_version} is not supported, supported versions are {}", supported_versions()))]
    UnsupportedApiVersion { api_version: ApiVersion },

    #[snafu(display("failed to deserialize API model with apiVersion {api_version}"))]
    Deserialize {
        source: serde_json::Error,
        api_version: ApiVersion,
    },

    #[snafu(display("API model with apiVersion {api_version} is invalid"))]
    Structure {
        source: StructuralError,
        api_version: ApiVersion,
    },

    #[snafu(display("failed to serialize API model as apiVersion {api_version}"))]
    Serialize {
        source: serde_json::Error,
        api_version: ApiVersion,
    },
}

fn supported_versions() -> String {
    SUPPORTED_API_VERSIONS
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A wire format of the API model which can be converted from and into the
/// canonical [`ContainerService`].
pub trait VersionedModel: DeserializeOwned + Serialize {
    /// Checks the rules which are part of the versioned schema itself.
    fn validate_structure(&self, is_update: bool) -> Result<(), StructuralError>;

    fn into_canonical(self) -> ContainerService;

    fn from_canonical(container_service: ContainerService) -> Self;
}

#[derive(Deserialize)]
struct VersionProbe {
    #[serde(rename = "apiVersion")]
    api_version: Option<String>,
}

/// Loads API models from raw JSON.
///
/// ```
/// use kubeforge_apimodel::{Loader, defaults::DEFAULT_API_MODEL};
///
/// let (container_service, api_version) = Loader::new()
///     .with_validate(true)
///     .load(DEFAULT_API_MODEL.as_bytes())
///     .expect("the default API model is valid");
///
/// assert!(api_version.is_labs());
/// assert!(container_service.properties.is_kubernetes());
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Loader {
    validate: bool,
    is_update: bool,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the structural validation of the versioned model while loading.
    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Relaxes validation rules for models describing an existing cluster,
    /// for example agent pools may be scaled to zero.
    pub fn with_update(mut self, is_update: bool) -> Self {
        self.is_update = is_update;
        self
    }

    #[instrument(skip(self))]
    pub fn load_from_file(&self, path: &Path) -> Result<(ContainerService, ApiVersion)> {
        let contents = std::fs::read(path).context(ReadFileSnafu { path })?;
        self.load(&contents)
    }

    /// Detects the API version of `contents` and deserializes it into the
    /// canonical [`ContainerService`].
    #[instrument(skip(self, contents))]
    pub fn load(&self, contents: &[u8]) -> Result<(ContainerService, ApiVersion)> {
        let VersionProbe { api_version } =
            serde_json::from_slice(contents).context(ParseDocumentSnafu)?;

        let api_version: ApiVersion = api_version
            .filter(|api_version| !api_version.is_empty())
            .context(MissingApiVersionSnafu)?
            .parse()
            .context(ParseApiVersionSnafu)?;

        let container_service = match api_version {
            ApiVersion::Labs => self.load_versioned::<vlabs::ContainerService>(contents, api_version)?,
            version if version == v20170701::API_VERSION => {
                self.load_versioned::<v20170701::ContainerService>(contents, api_version)?
            }
            _ => return UnsupportedApiVersionSnafu { api_version }.fail(),
        };

        debug!(%api_version, "loaded API model");
        Ok((container_service, api_version))
    }

    fn load_versioned<M: VersionedModel>(
        &self,
        contents: &[u8],
        api_version: ApiVersion,
    ) -> Result<ContainerService> {
        let model: M = serde_json::from_slice(contents).context(DeserializeSnafu { api_version })?;

        if self.validate {
            model
                .validate_structure(self.is_update)
                .context(StructureSnafu { api_version })?;
        }

        Ok(model.into_canonical())
    }
}

/// Serializes `container_service` as pretty-printed JSON in the wire format
/// of `api_version`.
pub fn serialize(container_service: &ContainerService, api_version: ApiVersion) -> Result<Vec<u8>> {
    let mut container_service = container_service.clone();
    container_service.api_version = api_version;

    let mut serialized = match api_version {
        ApiVersion::Labs => serde_json::to_vec_pretty(&container_service),
        version if version == v20170701::API_VERSION => serde_json::to_vec_pretty(
            &v20170701::ContainerService::from_canonical(container_service),
        ),
        _ => return UnsupportedApiVersionSnafu { api_version }.fail(),
    }
    .context(SerializeSnafu { api_version })?;

    serialized.push(b'\n');
    Ok(serialized)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;
    use serde_json::Value;

    use super::*;

    const LABS_MODEL: &str = indoc! {r#"
        {
          "apiVersion": "vlabs",
          "location": "westus2",
          "properties": {
            "orchestratorProfile": {
              "orchestratorType": "Kubernetes",
              "orchestratorRelease": "1.15",
              "kubernetesConfig": {
                "useManagedIdentity": true,
                "etcdVersion": "3.3.13"
              }
            },
            "masterProfile": {
              "count": 3,
              "dnsPrefix": "mycluster",
              "vmSize": "Standard_D2_v3",
              "distro": "ubuntu"
            },
            "agentPoolProfiles": [
              {
                "name": "agentpool1",
                "count": 2,
                "vmSize": "Standard_D2_v3",
                "availabilityProfile": "AvailabilitySet"
              }
            ],
            "linuxProfile": {
              "adminUsername": "azureuser",
              "ssh": {
                "publicKeys": [
                  {
                    "keyData": "ssh-rsa AAAA"
                  }
                ]
              }
            },
            "featureFlags": {
              "enableTelemetry": true
            }
          },
          "tags": {
            "owner": "platform"
          }
        }
    "#};

    const DATED_MODEL: &str = indoc! {r#"
        {
          "apiVersion": "2017-07-01",
          "properties": {
            "orchestratorProfile": {
              "orchestratorType": "Kubernetes",
              "orchestratorVersion": "1.7.16"
            },
            "masterProfile": {
              "count": 1,
              "dnsPrefix": "oldcluster",
              "vmSize": "Standard_D2_v2"
            },
            "agentPoolProfiles": [
              {
                "name": "agentpool1",
                "count": 1,
                "vmSize": "Standard_D2_v2"
              }
            ],
            "servicePrincipalProfile": {
              "clientId": "client",
              "secret": "secret"
            }
          }
        }
    "#};

    #[test]
    fn load_labs_model() {
        let (container_service, api_version) = Loader::new()
            .with_validate(true)
            .load(LABS_MODEL.as_bytes())
            .expect("valid labs model");

        assert_eq!(api_version, ApiVersion::Labs);
        assert_eq!(container_service.location, "westus2");
        assert!(container_service.properties.uses_managed_identity());
        assert_eq!(container_service.properties.master_profile.count, 3);
        assert_eq!(
            container_service.properties.master_profile.extra["distro"],
            "ubuntu"
        );
        assert!(container_service.extra.contains_key("tags"));
    }

    #[test]
    fn unknown_fields_survive_serialization() {
        let (container_service, api_version) = Loader::new()
            .load(LABS_MODEL.as_bytes())
            .expect("valid labs model");

        let serialized = serialize(&container_service, api_version).expect("serializable");
        assert_eq!(String::from_utf8(serialized).expect("UTF-8"), LABS_MODEL);
    }

    #[test]
    fn load_dated_model() {
        let (container_service, api_version) = Loader::new()
            .with_validate(true)
            .load(DATED_MODEL.as_bytes())
            .expect("valid 2017-07-01 model");

        assert_eq!(api_version, v20170701::API_VERSION);
        let orchestrator = &container_service.properties.orchestrator_profile;
        assert_eq!(orchestrator.orchestrator_version.as_deref(), Some("1.7.16"));
        assert_eq!(orchestrator.kubernetes_config, None);
        assert!(!container_service.properties.uses_managed_identity());

        let serialized = serialize(&container_service, api_version).expect("serializable");
        let serialized: Value = serde_json::from_slice(&serialized).expect("valid JSON");
        let expected: Value = serde_json::from_str(DATED_MODEL).expect("valid JSON");
        assert_eq!(serialized, expected);
    }

    #[rstest]
    #[case::missing(r#"{"properties": {}}"#)]
    #[case::empty(r#"{"apiVersion": "", "properties": {}}"#)]
    fn missing_api_version(#[case] input: &str) {
        let err = Loader::new().load(input.as_bytes()).expect_err("no apiVersion");
        assert!(matches!(err, LoadError::MissingApiVersion), "{err:?}");
    }

    #[test]
    fn unsupported_api_version() {
        let err = Loader::new()
            .load(br#"{"apiVersion": "2018-03-31", "properties": {}}"#)
            .expect_err("unsupported version");
        assert_eq!(
            err.to_string(),
            "apiVersion 2018-03-31 is not supported, supported versions are 2017-07-01, vlabs"
        );
    }

    #[rstest]
    #[case::invalid_version(r#"{"apiVersion": "v1"}"#)]
    #[case::malformed_json(r#"{"apiVersion": "vlabs""#)]
    #[case::wrong_type(r#"{"apiVersion": "vlabs", "properties": {"masterProfile": {"count": "three"}}}"#)]
    #[case::missing_master(r#"{"apiVersion": "vlabs", "properties": {}}"#)]
    fn invalid_input(#[case] input: &str) {
        Loader::new()
            .load(input.as_bytes())
            .expect_err("invalid API model");
    }

    #[test]
    fn structural_validation_is_optional() {
        let model = LABS_MODEL.replace(r#""count": 3"#, r#""count": 2"#);

        Loader::new()
            .load(model.as_bytes())
            .expect("validation is disabled");

        let err = Loader::new()
            .with_validate(true)
            .load(model.as_bytes())
            .expect_err("two masters are invalid");
        assert!(
            matches!(
                err,
                LoadError::Structure {
                    source: StructuralError::InvalidMasterCount { count: 2 },
                    ..
                }
            ),
            "{err:?}"
        );
    }

    #[test]
    fn updates_allow_empty_agent_pools() {
        let model = LABS_MODEL.replace(r#""count": 2"#, r#""count": 0"#);

        Loader::new()
            .with_validate(true)
            .load(model.as_bytes())
            .expect_err("empty pools are invalid for new clusters");

        Loader::new()
            .with_validate(true)
            .with_update(true)
            .load(model.as_bytes())
            .expect("empty pools are valid for updates");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("apimodel.json");
        std::fs::write(&path, LABS_MODEL).expect("write API model");

        let (container_service, _) = Loader::new()
            .load_from_file(&path)
            .expect("valid labs model");
        assert_eq!(container_service.properties.master_profile.dns_prefix, "mycluster");

        let err = Loader::new()
            .load_from_file(&dir.path().join("missing.json"))
            .expect_err("missing file");
        assert!(matches!(err, LoadError::ReadFile { .. }));
    }
}
