//! The Cloud Container Service client contract.
//!
//! The provider core never talks to the service directly; it goes through
//! [`CcsClient`] so tests inject fakes and the transport (REST, retries,
//! authentication) stays a separate concern. Retries are the client's
//! responsibility — the core treats transient and permanent failures the
//! same way and surfaces both.

use async_trait::async_trait;
use thiserror::Error;

use crate::aci::ContainerGroup;

/// Errors reported by the CCS client. A missing container group must be
/// distinguishable from other failures: the tracker turns [`CcsError::NotFound`]
/// into a terminated pod status instead of surfacing it.
#[derive(Debug, Error)]
pub enum CcsError {
    #[error("container group {0} was not found")]
    NotFound(String),

    #[error("{0}")]
    Api(String),

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl CcsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CcsError::NotFound(_))
    }
}

/// Options forwarded to the service's log API.
#[derive(Debug, Clone, Default)]
pub struct LogOpts {
    pub tail: Option<i32>,
    pub timestamps: bool,
    pub since_seconds: Option<i32>,
    pub limit_bytes: Option<i64>,
}

/// A region capability entry: which GPU SKU, if any, the region offers.
#[derive(Debug, Clone)]
pub struct Capability {
    pub location: String,
    pub gpu: Option<String>,
}

#[async_trait]
pub trait CcsClient: Send + Sync {
    async fn create_container_group(
        &self,
        resource_group: &str,
        container_group: &ContainerGroup,
    ) -> Result<(), CcsError>;

    async fn get_container_group_info(
        &self,
        resource_group: &str,
        namespace: &str,
        name: &str,
        node_name: &str,
    ) -> Result<ContainerGroup, CcsError>;

    async fn get_container_group_list(
        &self,
        resource_group: &str,
    ) -> Result<Vec<ContainerGroup>, CcsError>;

    async fn delete_container_group(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), CcsError>;

    /// Returns the container's log content, or `None` when the service has
    /// no logs for it. `None` is not an error.
    async fn list_logs(
        &self,
        resource_group: &str,
        container_group: &str,
        container: &str,
        opts: &LogOpts,
    ) -> Result<Option<String>, CcsError>;

    async fn list_capabilities(&self, region: &str) -> Result<Vec<Capability>, CcsError>;
}
