//! Semantic validation of a fully resolved [`ContainerService`].
//!
//! This runs after defaults have been filled in and reports the first rule
//! which is violated.
use std::collections::HashSet;

use snafu::{ResultExt, Snafu, ensure};
use tracing::instrument;

use crate::api::{ContainerService, KUBERNETES, MASTER_COUNTS};

pub mod dns;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ValidationError {
    #[snafu(display("location must be set"))]
    EmptyLocation,

    #[snafu(display("orchestrator type {orchestrator_type:?} is not supported, only {KUBERNETES} is"))]
    UnsupportedOrchestrator { orchestrator_type: String },

    #[snafu(display("master count {count} is invalid, it must be one of {MASTER_COUNTS:?}"))]
    InvalidMasterCount { count: u32 },

    #[snafu(display("masterProfile.dnsPrefix must be set"))]
    EmptyDnsPrefix,

    #[snafu(display("masterProfile.dnsPrefix {dns_prefix:?} is invalid"))]
    InvalidDnsPrefix {
        source: dns::Errors,
        dns_prefix: String,
    },

    #[snafu(display("agent pool name {name:?} is invalid"))]
    InvalidAgentPoolName { source: dns::Errors, name: String },

    #[snafu(display("agent pool name {name:?} is used more than once"))]
    DuplicateAgentPoolName { name: String },

    #[snafu(display("servicePrincipalProfile must set both clientId and secret, or neither"))]
    IncompleteServicePrincipal,

    #[snafu(display("servicePrincipalProfile must be empty when useManagedIdentity is enabled"))]
    ServicePrincipalWithManagedIdentity,

    #[snafu(display("linuxProfile.adminUsername must be set"))]
    EmptyAdminUsername,
}

/// Validates `container_service`, returning the first violation.
#[instrument(skip_all)]
pub fn validate(container_service: &ContainerService) -> Result<(), ValidationError> {
    let properties = &container_service.properties;

    ensure!(!container_service.location.is_empty(), EmptyLocationSnafu);
    ensure!(
        properties.is_kubernetes(),
        UnsupportedOrchestratorSnafu {
            orchestrator_type: &properties.orchestrator_profile.orchestrator_type
        }
    );

    let master = &properties.master_profile;
    ensure!(
        MASTER_COUNTS.contains(&master.count),
        InvalidMasterCountSnafu {
            count: master.count
        }
    );
    ensure!(!master.dns_prefix.is_empty(), EmptyDnsPrefixSnafu);
    dns::is_rfc_1123_label(&master.dns_prefix).context(InvalidDnsPrefixSnafu {
        dns_prefix: &master.dns_prefix,
    })?;

    let mut pool_names = HashSet::new();
    for pool in &properties.agent_pool_profiles {
        dns::is_agent_pool_name(&pool.name).context(InvalidAgentPoolNameSnafu { name: &pool.name })?;
        ensure!(
            pool_names.insert(pool.name.as_str()),
            DuplicateAgentPoolNameSnafu { name: &pool.name }
        );
    }

    if let Some(service_principal) = &properties.service_principal_profile {
        ensure!(
            service_principal.is_empty() || service_principal.is_complete(),
            IncompleteServicePrincipalSnafu
        );
        ensure!(
            !properties.uses_managed_identity() || service_principal.is_empty(),
            ServicePrincipalWithManagedIdentitySnafu
        );
    }

    if let Some(linux) = &properties.linux_profile {
        ensure!(!linux.admin_username.is_empty(), EmptyAdminUsernameSnafu);
    }

    Ok(())
}
