//! The labs API version.
//!
//! Labs models share their wire format with the canonical [`api`] types, so
//! loading them is a plain deserialization followed by the structural checks
//! in this module. The checks are shared with the dated versions.
use snafu::{Snafu, ensure};

use crate::{
    api::{self, AgentPoolProfile, KUBERNETES, MASTER_COUNTS, MasterProfile},
    loader::VersionedModel,
};

pub type ContainerService = api::ContainerService;

pub const MIN_AGENT_COUNT: u32 = 1;
pub const MAX_AGENT_COUNT: u32 = 1000;

/// Violations of the structural rules of a versioned API model.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum StructuralError {
    #[snafu(display("orchestratorProfile.orchestratorType must be set"))]
    MissingOrchestratorType,

    #[snafu(display("orchestrator type {orchestrator_type:?} is not supported, only {KUBERNETES} is"))]
    UnsupportedOrchestrator { orchestrator_type: String },

    #[snafu(display("master count {count} is invalid, it must be one of {MASTER_COUNTS:?}"))]
    InvalidMasterCount { count: u32 },

    #[snafu(display(
        "agent pool {name:?} has count {count}, it must be between {min} and {MAX_AGENT_COUNT}"
    ))]
    InvalidAgentPoolCount { name: String, count: u32, min: u32 },

    #[snafu(display("{profile} must set a vmSize"))]
    MissingVmSize { profile: String },
}

pub(crate) fn validate_orchestrator_type(orchestrator_type: &str) -> Result<(), StructuralError> {
    ensure!(!orchestrator_type.is_empty(), MissingOrchestratorTypeSnafu);
    ensure!(
        orchestrator_type == KUBERNETES,
        UnsupportedOrchestratorSnafu { orchestrator_type }
    );
    Ok(())
}

pub(crate) fn validate_master_profile(master: &MasterProfile) -> Result<(), StructuralError> {
    ensure!(
        MASTER_COUNTS.contains(&master.count),
        InvalidMasterCountSnafu {
            count: master.count
        }
    );
    ensure!(
        !master.vm_size.is_empty(),
        MissingVmSizeSnafu {
            profile: "masterProfile"
        }
    );
    Ok(())
}

/// Agent pools may be scaled to zero only when updating an existing
/// cluster.
pub(crate) fn validate_agent_pools(
    pools: &[AgentPoolProfile],
    is_update: bool,
) -> Result<(), StructuralError> {
    let min = if is_update { 0 } else { MIN_AGENT_COUNT };

    for pool in pools {
        ensure!(
            (min..=MAX_AGENT_COUNT).contains(&pool.count),
            InvalidAgentPoolCountSnafu {
                name: &pool.name,
                count: pool.count,
                min,
            }
        );
        ensure!(
            !pool.vm_size.is_empty(),
            MissingVmSizeSnafu {
                profile: format!("agent pool {:?}", pool.name)
            }
        );
    }

    Ok(())
}

impl VersionedModel for ContainerService {
    fn validate_structure(&self, is_update: bool) -> Result<(), StructuralError> {
        validate_orchestrator_type(&self.properties.orchestrator_profile.orchestrator_type)?;
        validate_master_profile(&self.properties.master_profile)?;
        validate_agent_pools(&self.properties.agent_pool_profiles, is_update)
    }

    fn into_canonical(self) -> api::ContainerService {
        self
    }

    fn from_canonical(container_service: api::ContainerService) -> Self {
        container_service
    }
}
