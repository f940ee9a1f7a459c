//! The `2017-07-01` API version.
//!
//! It predates `kubernetesConfig` (and with it managed identities) and
//! names the orchestrator version `orchestratorVersion`. All other profiles
//! are shared with the canonical types.
use kubeforge_version::{ApiVersion, ReleaseDate};
use serde::{Deserialize, Serialize};

use crate::{
    api::{
        self, AgentPoolProfile, CertificateProfile, ExtraFields, LinuxProfile, MasterProfile,
        ServicePrincipalProfile, WindowsProfile,
    },
    loader::VersionedModel,
    vlabs::{self, StructuralError},
};

pub const API_VERSION: ApiVersion = ApiVersion::Dated(ReleaseDate::new(2017, 7, 1, false));

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

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorProfile {
    #[serde(default)]
    pub orchestrator_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestrator_version: Option<String>,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl From<OrchestratorProfile> for api::OrchestratorProfile {
    fn from(profile: OrchestratorProfile) -> Self {
        Self {
            orchestrator_type: profile.orchestrator_type,
            orchestrator_release: None,
            orchestrator_version: profile.orchestrator_version,
            kubernetes_config: None,
            extra: profile.extra,
        }
    }
}

impl From<api::OrchestratorProfile> for OrchestratorProfile {
    /// The Kubernetes configuration has no counterpart in this version and is
    /// dropped.
    fn from(profile: api::OrchestratorProfile) -> Self {
        Self {
            orchestrator_type: profile.orchestrator_type,
            orchestrator_version: profile
                .orchestrator_version
                .or(profile.orchestrator_release),
            extra: profile.extra,
        }
    }
}

impl VersionedModel for ContainerService {
    fn validate_structure(&self, is_update: bool) -> Result<(), StructuralError> {
        vlabs::validate_orchestrator_type(&self.properties.orchestrator_profile.orchestrator_type)?;
        vlabs::validate_master_profile(&self.properties.master_profile)?;
        vlabs::validate_agent_pools(&self.properties.agent_pool_profiles, is_update)
    }

    fn into_canonical(self) -> api::ContainerService {
        let Properties {
            orchestrator_profile,
            master_profile,
            agent_pool_profiles,
            linux_profile,
            windows_profile,
            service_principal_profile,
            certificate_profile,
            extra,
        } = self.properties;

        api::ContainerService {
            api_version: self.api_version,
            location: self.location,
            name: self.name,
            properties: api::Properties {
                orchestrator_profile: orchestrator_profile.into(),
                master_profile,
                agent_pool_profiles,
                linux_profile,
                windows_profile,
                service_principal_profile,
                certificate_profile,
                extra,
            },
            extra: self.extra,
        }
    }

    fn from_canonical(container_service: api::ContainerService) -> Self {
        let api::Properties {
            orchestrator_profile,
            master_profile,
            agent_pool_profiles,
            linux_profile,
            windows_profile,
            service_principal_profile,
            certificate_profile,
            extra,
        } = container_service.properties;

        Self {
            api_version: API_VERSION,
            location: container_service.location,
            name: container_service.name,
            properties: Properties {
                orchestrator_profile: orchestrator_profile.into(),
                master_profile,
                agent_pool_profiles,
                linux_profile,
                windows_profile,
                service_principal_profile,
                certificate_profile,
                extra,
            },
            extra: container_service.extra,
        }
    }
}
