//! rkvn — a virtual node provider bridging a pod control plane to a
//! managed cloud container service.
//!
//! The provider presents itself to the orchestrator as a node. Each pod
//! scheduled onto it is translated into a *container group* — the remote
//! co-scheduled unit of containers with shared networking, volumes and
//! lifecycle — submitted through the [`client::CcsClient`] contract, and
//! continuously reconciled back into pod status by the
//! [`tracker::PodsTracker`].
//!
//! - [`mapping`] projects pod fragments (env, resources, probes, ports,
//!   volumes) onto the remote schema,
//! - [`credentials`] decodes registry credentials from image pull secrets,
//! - [`builder`] composes full container group submissions,
//! - [`status`] projects observed groups back into pod status,
//! - [`provider`] exposes the node-agent operations.

pub mod aci;
pub mod builder;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod listers;
pub mod mapping;
pub mod provider;
pub mod status;
pub mod tracker;

pub use error::ProviderError;
pub use provider::AciProvider;
