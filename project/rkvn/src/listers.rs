//! Read-only views over the orchestrator's informer caches.
//!
//! The provider consumes pods, secrets and config maps through these
//! narrow capability traits; the node-agent framework supplies the real
//! informer-backed implementations and tests supply fakes. Lister calls
//! may block on cache sync, so they are async like the remote calls.

use async_trait::async_trait;

use common::{ConfigMap, Pod, Secret};

#[async_trait]
pub trait PodLister: Send + Sync {
    /// All pods known to the orchestrator, across namespaces.
    async fn list(&self) -> anyhow::Result<Vec<Pod>>;

    async fn get(&self, namespace: &str, name: &str) -> anyhow::Result<Option<Pod>>;
}

#[async_trait]
pub trait SecretLister: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> anyhow::Result<Option<Secret>>;
}

#[async_trait]
pub trait ConfigMapLister: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> anyhow::Result<Option<ConfigMap>>;
}
