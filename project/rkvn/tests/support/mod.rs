//! Shared fixtures for the facade and tracker tests: a mock CCS client
//! driven by per-call closures, fake listers, and pod / container-group
//! object builders.

#![allow(dead_code)]

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use common::{
    ConfigMap, Container, ContainerPort, ContainerState, ContainerStatus, EnvVar, ExecAction,
    HttpGetAction, ObjectMeta, Pod, PodPhase, PodSpec, PodStatus, PortValue, Probe, Quantity,
    ResourceRequirements, Secret,
};
use rkvn::aci;
use rkvn::client::{Capability, CcsClient, CcsError, LogOpts};
use rkvn::config::ProviderConfig;
use rkvn::listers::{ConfigMapLister, PodLister, SecretLister};

pub const FAKE_RESOURCE_GROUP: &str = "vk-rg";
pub const FAKE_NODE_NAME: &str = "vk";
pub const FAKE_REGION: &str = "westus2";
pub const FAKE_INTERNAL_IP: &str = "10.240.0.4";
pub const TEST_CONTAINER_NAME: &str = "nginx";
pub const TEST_IMAGE_NGINX: &str = "nginx";

/// The creation-timestamp tag layout existing remote groups carry.
pub const CREATION_TIME: &str = "2006-01-02 15:04:05.999999999 -0700 MST";

pub fn cg_creation_time() -> DateTime<Utc> {
    "2006-01-02T22:04:05.999999999Z".parse().expect("creation time")
}

pub fn test_config() -> ProviderConfig {
    ProviderConfig {
        resource_group: FAKE_RESOURCE_GROUP.to_string(),
        region: FAKE_REGION.to_string(),
        node_name: FAKE_NODE_NAME.to_string(),
        operating_system: aci::OS_TYPE_LINUX.to_string(),
        internal_ip: FAKE_INTERNAL_IP.to_string(),
        subscription_id: "00000000-0000-0000-0000-000000000000".to_string(),
        vnet_name: None,
        vnet_resource_group: None,
        subnet_name: "default".to_string(),
        cluster_domain: "cluster.local".to_string(),
        kube_dns_ip: None,
        log_analytics: None,
        pod_capacity: "5000".to_string(),
        cpu_capacity: "10000".to_string(),
        memory_capacity: "4Ti".to_string(),
        pod_deleted_exit_code: 0,
        gpu_type_annotation: "virtual-kubelet.io/container-gpu-type".to_string(),
    }
}

fn quantities(entries: &[(&str, &str)]) -> BTreeMap<String, Quantity> {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), Quantity::parse(value).expect("quantity")))
        .collect()
}

fn http_probe() -> Probe {
    Probe {
        http_get: Some(HttpGetAction {
            path: Some("/".to_string()),
            port: PortValue::Name("http".to_string()),
            scheme: None,
        }),
        initial_delay_seconds: 10,
        period_seconds: 5,
        timeout_seconds: 60,
        success_threshold: 3,
        failure_threshold: 5,
        ..Default::default()
    }
}

pub fn exec_probe() -> Probe {
    Probe {
        exec: Some(ExecAction {
            command: vec!["cat".to_string(), "/tmp/healthy".to_string()],
        }),
        initial_delay_seconds: 10,
        period_seconds: 5,
        timeout_seconds: 60,
        success_threshold: 3,
        failure_threshold: 5,
        ..Default::default()
    }
}

/// The standard test pod: one nginx container with requests, limits, a
/// named port and HTTP probes, scheduled onto the fake node.
pub fn create_pod_obj(name: &str, namespace: &str) -> Pod {
    Pod {
        api_version: "v1".to_string(),
        kind: "Pod".to_string(),
        metadata: ObjectMeta {
            name: name.to_string(),
            namespace: namespace.to_string(),
            uid: uuid::Uuid::new_v4().to_string(),
            creation_timestamp: Some(Utc::now()),
            ..Default::default()
        },
        spec: PodSpec {
            node_name: Some(FAKE_NODE_NAME.to_string()),
            containers: vec![Container {
                name: TEST_CONTAINER_NAME.to_string(),
                image: TEST_IMAGE_NGINX.to_string(),
                ports: vec![ContainerPort {
                    name: Some("http".to_string()),
                    container_port: 8080,
                    protocol: "TCP".to_string(),
                }],
                resources: Some(ResourceRequirements {
                    requests: Some(quantities(&[("cpu", "0.99"), ("memory", "1.5G")])),
                    limits: Some(quantities(&[("cpu", "3.999"), ("memory", "8Gi")])),
                }),
                liveness_probe: Some(http_probe()),
                readiness_probe: Some(http_probe()),
                ..Default::default()
            }],
            ..Default::default()
        },
        status: PodStatus::default(),
    }
}

/// Pods with running container statuses, as the delete flow observes them.
pub fn create_pods_list(names: &[&str], namespace: &str) -> Vec<Pod> {
    names
        .iter()
        .map(|name| {
            let mut pod = create_pod_obj(name, namespace);
            pod.status = PodStatus {
                phase: PodPhase::Running,
                container_statuses: vec![ContainerStatus {
                    name: TEST_CONTAINER_NAME.to_string(),
                    ready: true,
                    state: Some(ContainerState::Running {
                        started_at: Some(Utc::now()),
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            };
            pod
        })
        .collect()
}

/// One nginx container as the service reports it, with the instance view
/// and optional resources controlled by the flags.
pub fn create_aci_containers_list(
    current_state: &str,
    previous_state: &str,
    start_time: DateTime<Utc>,
    finish_time: DateTime<Utc>,
    has_resources: bool,
    has_limits: bool,
    has_ports: bool,
) -> Vec<aci::Container> {
    let resources = aci::ResourceRequirements {
        requests: has_resources.then(|| aci::ResourceRequests {
            cpu: 0.99,
            memory_in_gb: 1.5,
            gpu: None,
        }),
        limits: has_limits.then(|| aci::ResourceLimits {
            cpu: Some(3.999),
            memory_in_gb: Some(8.0),
            gpu: None,
        }),
    };
    let ports = if has_ports {
        vec![aci::ContainerPort {
            protocol: Some("TCP".to_string()),
            port: 8080,
        }]
    } else {
        Vec::new()
    };

    vec![aci::Container {
        name: TEST_CONTAINER_NAME.to_string(),
        properties: Some(aci::ContainerProperties {
            image: TEST_IMAGE_NGINX.to_string(),
            ports,
            resources,
            instance_view: Some(aci::ContainerInstanceView {
                restart_count: 0,
                current_state: Some(aci::ContainerState {
                    state: Some(current_state.to_string()),
                    start_time: Some(start_time),
                    finish_time: Some(finish_time),
                    ..Default::default()
                }),
                previous_state: Some(aci::ContainerState {
                    state: Some(previous_state.to_string()),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        }),
    }]
}

pub fn create_container_group_obj(
    pod_name: &str,
    namespace: &str,
    provisioning_state: &str,
    containers: Vec<aci::Container>,
    instance_state: &str,
) -> aci::ContainerGroup {
    let cg_name = format!("{namespace}-{pod_name}");
    aci::ContainerGroup {
        id: Some(format!(
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/{FAKE_RESOURCE_GROUP}/providers/Microsoft.ContainerInstance/containerGroups/{cg_name}"
        )),
        name: cg_name,
        location: Some(FAKE_REGION.to_string()),
        tags: BTreeMap::from([
            ("PodName".to_string(), pod_name.to_string()),
            ("Namespace".to_string(), namespace.to_string()),
            ("NodeName".to_string(), FAKE_NODE_NAME.to_string()),
            ("UID".to_string(), uuid::Uuid::new_v4().to_string()),
            ("CreationTimestamp".to_string(), CREATION_TIME.to_string()),
        ]),
        properties: aci::ContainerGroupProperties {
            provisioning_state: Some(provisioning_state.to_string()),
            containers,
            instance_view: Some(aci::ContainerGroupInstanceView {
                state: Some(instance_state.to_string()),
            }),
            ip_address: Some(aci::IpAddress {
                ip: Some("52.0.0.1".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
    }
}

pub fn running_container_group(pod_name: &str, namespace: &str) -> aci::ContainerGroup {
    create_container_group_obj(
        pod_name,
        namespace,
        "Succeeded",
        create_aci_containers_list(
            "Running",
            "Initializing",
            cg_creation_time() + Duration::seconds(2),
            cg_creation_time() + Duration::seconds(3),
            true,
            true,
            true,
        ),
        "Running",
    )
}

type CreateFn = dyn Fn(&str, &aci::ContainerGroup) -> Result<(), CcsError> + Send + Sync;
type GetInfoFn = dyn Fn(&str, &str, &str, &str) -> Result<aci::ContainerGroup, CcsError> + Send + Sync;
type ListFn = dyn Fn(&str) -> Result<Vec<aci::ContainerGroup>, CcsError> + Send + Sync;
type DeleteFn = dyn Fn(&str, &str) -> Result<(), CcsError> + Send + Sync;
type LogsFn = dyn Fn(&str, &str, &str, &LogOpts) -> Result<Option<String>, CcsError> + Send + Sync;
type CapabilitiesFn = dyn Fn(&str) -> Result<Vec<Capability>, CcsError> + Send + Sync;

/// A CCS client whose behavior is injected per test through closures.
/// Unset closures fall back to benign defaults: creates and deletes
/// succeed, lookups miss, the region offers one GPU SKU.
#[derive(Default)]
pub struct MockCcsClient {
    pub on_create: Option<Box<CreateFn>>,
    pub on_get_info: Option<Box<GetInfoFn>>,
    pub on_list: Option<Box<ListFn>>,
    pub on_delete: Option<Box<DeleteFn>>,
    pub on_logs: Option<Box<LogsFn>>,
    pub on_capabilities: Option<Box<CapabilitiesFn>>,
}

#[async_trait]
impl CcsClient for MockCcsClient {
    async fn create_container_group(
        &self,
        resource_group: &str,
        container_group: &aci::ContainerGroup,
    ) -> Result<(), CcsError> {
        match &self.on_create {
            Some(f) => f(resource_group, container_group),
            None => Ok(()),
        }
    }

    async fn get_container_group_info(
        &self,
        resource_group: &str,
        namespace: &str,
        name: &str,
        node_name: &str,
    ) -> Result<aci::ContainerGroup, CcsError> {
        match &self.on_get_info {
            Some(f) => f(resource_group, namespace, name, node_name),
            None => Err(CcsError::NotFound(format!("{namespace}-{name}"))),
        }
    }

    async fn get_container_group_list(
        &self,
        resource_group: &str,
    ) -> Result<Vec<aci::ContainerGroup>, CcsError> {
        match &self.on_list {
            Some(f) => f(resource_group),
            None => Ok(Vec::new()),
        }
    }

    async fn delete_container_group(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), CcsError> {
        match &self.on_delete {
            Some(f) => f(resource_group, name),
            None => Ok(()),
        }
    }

    async fn list_logs(
        &self,
        resource_group: &str,
        container_group: &str,
        container: &str,
        opts: &LogOpts,
    ) -> Result<Option<String>, CcsError> {
        match &self.on_logs {
            Some(f) => f(resource_group, container_group, container, opts),
            None => Ok(None),
        }
    }

    async fn list_capabilities(&self, region: &str) -> Result<Vec<Capability>, CcsError> {
        match &self.on_capabilities {
            Some(f) => f(region),
            None => Ok(vec![Capability {
                location: region.to_string(),
                gpu: Some("P100".to_string()),
            }]),
        }
    }
}

#[derive(Default)]
pub struct FakePodLister {
    pub pods: Vec<Pod>,
}

#[async_trait]
impl PodLister for FakePodLister {
    async fn list(&self) -> anyhow::Result<Vec<Pod>> {
        Ok(self.pods.clone())
    }

    async fn get(&self, namespace: &str, name: &str) -> anyhow::Result<Option<Pod>> {
        Ok(self
            .pods
            .iter()
            .find(|pod| pod.metadata.namespace == namespace && pod.metadata.name == name)
            .cloned())
    }
}

#[derive(Default)]
pub struct FakeSecretLister {
    pub secrets: Vec<Secret>,
}

#[async_trait]
impl SecretLister for FakeSecretLister {
    async fn get(&self, namespace: &str, name: &str) -> anyhow::Result<Option<Secret>> {
        Ok(self
            .secrets
            .iter()
            .find(|secret| secret.metadata.namespace == namespace && secret.metadata.name == name)
            .cloned())
    }
}

#[derive(Default)]
pub struct FakeConfigMapLister {
    pub config_maps: Vec<ConfigMap>,
}

#[async_trait]
impl ConfigMapLister for FakeConfigMapLister {
    async fn get(&self, namespace: &str, name: &str) -> anyhow::Result<Option<ConfigMap>> {
        Ok(self
            .config_maps
            .iter()
            .find(|config_map| {
                config_map.metadata.namespace == namespace && config_map.metadata.name == name
            })
            .cloned())
    }
}

/// Convenience: a plain pod with the given containers and no resources.
pub fn bare_pod(name: &str, namespace: &str, containers: Vec<Container>) -> Pod {
    Pod {
        api_version: "v1".to_string(),
        kind: "Pod".to_string(),
        metadata: ObjectMeta {
            name: name.to_string(),
            namespace: namespace.to_string(),
            uid: uuid::Uuid::new_v4().to_string(),
            creation_timestamp: Some(Utc::now()),
            ..Default::default()
        },
        spec: PodSpec {
            node_name: Some(FAKE_NODE_NAME.to_string()),
            containers,
            ..Default::default()
        },
        status: PodStatus::default(),
    }
}

/// A container with only a name, the way most create-pod tests start.
pub fn named_container(name: &str) -> Container {
    Container {
        name: name.to_string(),
        image: TEST_IMAGE_NGINX.to_string(),
        ..Default::default()
    }
}

pub fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: value.to_string(),
        value_from: None,
    }
}
