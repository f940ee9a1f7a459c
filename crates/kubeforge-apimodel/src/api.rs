//! The canonical, version independent cluster specification.
//!
//! Field names follow the JSON wire format of the labs version, which is a
//! superset of every dated version.
use indexmap::IndexMap;
use kubeforge_version::ApiVersion;
use serde::{Deserialize, Serialize};

/// Fields of an API model which are not modelled explicitly.
pub type ExtraFields = IndexMap<String, serde_json::Value>;

pub const KUBERNETES: &str = "Kubernetes";

/// The number of masters a cluster may be created with.
pub const MASTER_COUNTS: [u32; 3] = [1, 3, 5];

/// Client ids set to the nil UUID are treated like empty ones.
pub const NIL_UUID: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerService {
    pub api_version: ApiVersion,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    pub properties: Properties,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    #[serde(default)]
    pub orchestrator_profile: OrchestratorProfile,

    pub master_profile: MasterProfile,

    #[serde(default)]
    pub agent_pool_profiles: Vec<AgentPoolProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux_profile: Option<LinuxProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows_profile: Option<WindowsProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_principal_profile: Option<ServicePrincipalProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_profile: Option<CertificateProfile>,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Properties {
    pub fn is_kubernetes(&self) -> bool {
        self.orchestrator_profile.orchestrator_type == KUBERNETES
    }

    pub fn uses_managed_identity(&self) -> bool {
        self.orchestrator_profile
            .kubernetes_config
            .as_ref()
            .is_some_and(|config| config.use_managed_identity)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorProfile {
    #[serde(default)]
    pub orchestrator_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestrator_release: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestrator_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_config: Option<KubernetesConfig>,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesConfig {
    #[serde(default)]
    pub use_managed_identity: bool,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterProfile {
    pub count: u32,

    #[serde(default)]
    pub dns_prefix: String,

    #[serde(default)]
    pub vm_size: String,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolProfile {
    #[serde(default)]
    pub name: String,

    pub count: u32,

    #[serde(default)]
    pub vm_size: String,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinuxProfile {
    #[serde(default)]
    pub admin_username: String,

    #[serde(default)]
    pub ssh: SshConfiguration,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl LinuxProfile {
    /// Returns `true` if no usable SSH public key is configured. Only the
    /// first key is considered.
    pub fn lacks_public_key(&self) -> bool {
        self.ssh
            .public_keys
            .first()
            .is_none_or(|key| key.key_data.is_empty())
    }

    /// Sets `key_data` as the first public key, keeping additional keys.
    pub fn set_public_key(&mut self, key_data: String) {
        match self.ssh.public_keys.first_mut() {
            Some(key) => key.key_data = key_data,
            None => self.ssh.public_keys.push(PublicKey {
                key_data,
                extra: ExtraFields::new(),
            }),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConfiguration {
    #[serde(default)]
    pub public_keys: Vec<PublicKey>,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
    #[serde(default)]
    pub key_data: String,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowsProfile {
    #[serde(default)]
    pub admin_username: String,

    #[serde(default)]
    pub admin_password: String,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipalProfile {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub secret: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl ServicePrincipalProfile {
    pub fn new(client_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secret: secret.into(),
            ..Self::default()
        }
    }

    pub fn has_client_id(&self) -> bool {
        !self.client_id.is_empty() && self.client_id != NIL_UUID
    }

    /// Returns `true` if neither a client id nor a secret is set.
    pub fn is_empty(&self) -> bool {
        !self.has_client_id() && self.secret.is_empty()
    }

    /// Returns `true` if both the client id and the secret are set.
    pub fn is_complete(&self) -> bool {
        self.has_client_id() && !self.secret.is_empty()
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateProfile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ca_certificate: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ca_private_key: String,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl CertificateProfile {
    pub fn has_certificate_authority(&self) -> bool {
        !self.ca_certificate.is_empty() && !self.ca_private_key.is_empty()
    }
}
