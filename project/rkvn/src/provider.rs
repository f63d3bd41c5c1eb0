//! The provider facade.
//!
//! [`AciProvider`] exposes the node-agent operations and routes them to
//! the builder, projector and tracker. It holds the CCS client and the
//! listers behind their capability traits; every operation runs on the
//! caller's task and aborts when the caller drops the future.

use std::io::Cursor;
use std::sync::{Arc, RwLock};

use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use common::{Node, NodeAddress, Pod, PodStatus};

use crate::builder::{self, container_group_name};
use crate::client::{CcsClient, LogOpts};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::listers::{ConfigMapLister, PodLister, SecretLister};
use crate::status::{TAG_NODE_NAME, has_identity_tags, pod_from_container_group, pod_status_from_container_group};
use crate::tracker::{PodsTracker, UpdateCallback, terminate_container_statuses};

pub const LABEL_EXCLUDE_BALANCER: &str = "alpha.service-controller.kubernetes.io/exclude-balancer";
pub const LABEL_EXCLUDE_FROM_EXTERNAL_LB: &str =
    "node.kubernetes.io/exclude-from-external-load-balancers";
pub const LABEL_AZURE_MANAGED: &str = "kubernetes.azure.com/managed";

/// A readable, closable stream of container log content.
pub type LogStream = Box<dyn AsyncRead + Send + Unpin>;

pub struct AciProvider {
    client: Arc<dyn CcsClient>,
    pods: Arc<dyn PodLister>,
    secrets: Arc<dyn SecretLister>,
    config_maps: Arc<dyn ConfigMapLister>,
    config: ProviderConfig,
    tracker: RwLock<Option<Arc<PodsTracker>>>,
}

impl AciProvider {
    pub fn new(
        client: Arc<dyn CcsClient>,
        pods: Arc<dyn PodLister>,
        secrets: Arc<dyn SecretLister>,
        config_maps: Arc<dyn ConfigMapLister>,
        config: ProviderConfig,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            client,
            pods,
            secrets,
            config_maps,
            config,
            tracker: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Creates the tracker, starts its reconcile loop and wires it into
    /// the facade. Called once at provider initialization.
    pub fn start_tracking(&self, update_cb: UpdateCallback) -> Arc<PodsTracker> {
        let tracker = Arc::new(PodsTracker::new(
            self.pods.clone(),
            self.client.clone(),
            self.config.clone(),
            update_cb,
        ));
        tracker.run();
        self.attach_tracker(tracker.clone());
        tracker
    }

    /// Wires an externally constructed tracker into the facade.
    pub fn attach_tracker(&self, tracker: Arc<PodsTracker>) {
        *self.tracker.write().unwrap() = Some(tracker);
    }

    fn tracker(&self) -> Option<Arc<PodsTracker>> {
        self.tracker.read().unwrap().clone()
    }

    /// Builds the container group for the pod and submits it. The pod is
    /// registered with the tracker only after the submission succeeds.
    pub async fn create_pod(&self, pod: &Pod) -> Result<(), ProviderError> {
        info!(
            pod = %pod.metadata.name,
            namespace = %pod.metadata.namespace,
            "[AciProvider] Creating container group for pod"
        );
        let container_group = builder::build_container_group(
            pod,
            &self.config,
            self.client.as_ref(),
            self.secrets.as_ref(),
            self.config_maps.as_ref(),
        )
        .await?;
        self.client
            .create_container_group(&self.config.resource_group, &container_group)
            .await?;

        if let Some(tracker) = self.tracker() {
            tracker.register(&pod.metadata.namespace, &pod.metadata.name);
        }
        Ok(())
    }

    /// Idempotent update: the group is rebuilt and resubmitted; a pod with
    /// no existing group behaves as a create.
    pub async fn update_pod(&self, pod: &Pod) -> Result<(), ProviderError> {
        debug!(
            pod = %pod.metadata.name,
            namespace = %pod.metadata.namespace,
            "[AciProvider] Updating container group for pod"
        );
        self.create_pod(pod).await
    }

    pub async fn delete_pod(&self, pod: &Pod) -> Result<(), ProviderError> {
        self.delete_container_group(&pod.metadata.namespace, &pod.metadata.name)
            .await?;
        if let Some(tracker) = self.tracker() {
            tracker.deregister(&pod.metadata.namespace, &pod.metadata.name);
        }
        Ok(())
    }

    /// Issues the remote delete. On success, any tracked pod observes the
    /// terminated state before this returns; a delete failure is returned
    /// to the caller with no status update emitted.
    pub async fn delete_container_group(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), ProviderError> {
        let container_group = container_group_name(namespace, name);
        info!(
            container_group = %container_group,
            "[AciProvider] Deleting container group"
        );
        self.client
            .delete_container_group(&self.config.resource_group, &container_group)
            .await?;

        if let Some(tracker) = self.tracker() {
            let exit_code = self.config.pod_deleted_exit_code;
            if let Err(err) = tracker
                .update_pod_status(namespace, name, |status| {
                    terminate_container_statuses(status, exit_code);
                })
                .await
            {
                warn!(
                    container_group = %container_group,
                    "[AciProvider] Failed to update pod status after delete: {err:#}"
                );
            }
        }
        Ok(())
    }

    /// Fetches the remote group and projects its status onto the local pod
    /// when the lister knows it, or onto a shell reconstructed from the
    /// identity tags. Groups without identity tags yield `None`.
    pub async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ProviderError> {
        let container_group = self
            .client
            .get_container_group_info(&self.config.resource_group, namespace, name, &self.config.node_name)
            .await?;
        if !has_identity_tags(&container_group.tags) {
            return Ok(None);
        }

        let status = pod_status_from_container_group(&container_group, &self.config.internal_ip)?;
        match self
            .pods
            .get(namespace, name)
            .await
            .map_err(ProviderError::Remote)?
        {
            Some(mut pod) => {
                pod.status = status;
                Ok(Some(pod))
            }
            None => pod_from_container_group(&container_group, &self.config.internal_ip),
        }
    }

    pub async fn get_pod_status(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PodStatus, ProviderError> {
        let container_group = self
            .client
            .get_container_group_info(&self.config.resource_group, namespace, name, &self.config.node_name)
            .await?;
        pod_status_from_container_group(&container_group, &self.config.internal_ip)
    }

    /// Lists the resource group's container groups, keeps the ones stamped
    /// with this node's name, and projects each into a pod. Groups that
    /// cannot be projected are logged and skipped rather than failing the
    /// whole listing.
    pub async fn get_pods(&self) -> Result<Vec<Pod>, ProviderError> {
        let container_groups = self
            .client
            .get_container_group_list(&self.config.resource_group)
            .await?;

        let mut pods = Vec::with_capacity(container_groups.len());
        for container_group in container_groups {
            if container_group.tags.get(TAG_NODE_NAME) != Some(&self.config.node_name) {
                continue;
            }
            match pod_from_container_group(&container_group, &self.config.internal_ip) {
                Ok(Some(pod)) => pods.push(pod),
                Ok(None) => debug!(
                    container_group = %container_group.name,
                    "[AciProvider] Skipping container group without identity tags"
                ),
                Err(err) => warn!(
                    container_group = %container_group.name,
                    "[AciProvider] Skipping container group that cannot be projected: {err}"
                ),
            }
        }
        Ok(pods)
    }

    /// Proxies to the service's log API. `None` log content yields `None`
    /// with no error; otherwise the stream reproduces the exact content.
    pub async fn get_container_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        container_name: &str,
        opts: &LogOpts,
    ) -> Result<Option<LogStream>, ProviderError> {
        let container_group = self
            .client
            .get_container_group_info(&self.config.resource_group, namespace, pod_name, &self.config.node_name)
            .await?;
        let logs = self
            .client
            .list_logs(
                &self.config.resource_group,
                &container_group.name,
                container_name,
                opts,
            )
            .await?;
        Ok(logs.map(|content| Box::new(Cursor::new(content.into_bytes())) as LogStream))
    }

    /// Stamps the virtual node with the labels that keep it out of load
    /// balancer rotation, and advertises the configured capacity.
    pub fn configure_node(&self, node: &mut Node) {
        node.metadata
            .labels
            .insert(LABEL_EXCLUDE_BALANCER.to_string(), "true".to_string());
        node.metadata.labels.insert(
            LABEL_EXCLUDE_FROM_EXTERNAL_LB.to_string(),
            "true".to_string(),
        );
        node.metadata
            .labels
            .insert(LABEL_AZURE_MANAGED.to_string(), "false".to_string());

        node.status.capacity = self.config.capacity();
        node.status.allocatable = self.config.capacity();
        if !self.config.internal_ip.is_empty() {
            node.status.addresses = vec![NodeAddress {
                address_type: "InternalIP".to_string(),
                address: self.config.internal_ip.clone(),
            }];
        }
    }
}
