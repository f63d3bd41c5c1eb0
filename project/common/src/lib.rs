//! Orchestrator-facing API types shared across the workspace.
//!
//! These records mirror the subset of the pod control plane's object model
//! that the virtual node provider consumes: pods and their specs, statuses,
//! nodes, secrets and config maps. Field names follow the control plane's
//! JSON conventions so the records round-trip through informer payloads.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod quantity;

pub use quantity::Quantity;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(rename = "creationTimestamp", default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "deletionTimestamp", default)]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

fn default_namespace() -> String {
    "default".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Pod {
    #[serde(rename = "apiVersion", default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_pod_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
    #[serde(default)]
    pub status: PodStatus,
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_pod_kind() -> String {
    "Pod".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PodSpec {
    #[serde(rename = "nodeName", default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(rename = "initContainers", default)]
    pub init_containers: Vec<Container>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(rename = "imagePullSecrets", default)]
    pub image_pull_secrets: Vec<LocalObjectReference>,
    #[serde(rename = "nodeSelector", default)]
    pub node_selector: HashMap<String, String>,
    #[serde(default)]
    pub os: Option<PodOs>,
    #[serde(rename = "restartPolicy", default)]
    pub restart_policy: RestartPolicy,
    #[serde(rename = "dnsPolicy", default)]
    pub dns_policy: Option<String>,
}

/// The operating system requested by the pod, overriding the node default.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PodOs {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    #[default]
    Always,
    OnFailure,
    Never,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Container {
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,
    #[serde(rename = "volumeMounts", default)]
    pub volume_mounts: Vec<VolumeMount>,
    #[serde(rename = "livenessProbe", default)]
    pub liveness_probe: Option<Probe>,
    #[serde(rename = "readinessProbe", default)]
    pub readiness_probe: Option<Probe>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ContainerPort {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "containerPort")]
    pub container_port: i32,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String {
    "TCP".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "valueFrom", default)]
    pub value_from: Option<EnvVarSource>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EnvVarSource {
    #[serde(rename = "secretKeyRef", default)]
    pub secret_key_ref: Option<KeySelector>,
    #[serde(rename = "configMapKeyRef", default)]
    pub config_map_key_ref: Option<KeySelector>,
    #[serde(rename = "fieldRef", default)]
    pub field_ref: Option<ObjectFieldSelector>,
}

/// Selects a key of a named secret or config map in the pod's namespace.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct KeySelector {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ObjectFieldSelector {
    #[serde(rename = "fieldPath")]
    pub field_path: String,
}

pub type ResourceList = BTreeMap<String, Quantity>;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ResourceRequirements {
    #[serde(default)]
    pub requests: Option<ResourceList>,
    #[serde(default)]
    pub limits: Option<ResourceList>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Probe {
    #[serde(default)]
    pub exec: Option<ExecAction>,
    #[serde(rename = "httpGet", default)]
    pub http_get: Option<HttpGetAction>,
    #[serde(rename = "initialDelaySeconds", default)]
    pub initial_delay_seconds: i32,
    #[serde(rename = "periodSeconds", default)]
    pub period_seconds: i32,
    #[serde(rename = "timeoutSeconds", default)]
    pub timeout_seconds: i32,
    #[serde(rename = "successThreshold", default)]
    pub success_threshold: i32,
    #[serde(rename = "failureThreshold", default)]
    pub failure_threshold: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ExecAction {
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpGetAction {
    #[serde(default)]
    pub path: Option<String>,
    pub port: PortValue,
    #[serde(default)]
    pub scheme: Option<String>,
}

/// A port referenced either by number or by the name of a container port.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum PortValue {
    Number(i32),
    Name(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct VolumeMount {
    pub name: String,
    #[serde(rename = "mountPath")]
    pub mount_path: String,
    #[serde(rename = "readOnly", default)]
    pub read_only: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Volume {
    pub name: String,
    #[serde(rename = "emptyDir", default)]
    pub empty_dir: Option<EmptyDirVolumeSource>,
    #[serde(default)]
    pub secret: Option<SecretVolumeSource>,
    #[serde(rename = "configMap", default)]
    pub config_map: Option<ConfigMapVolumeSource>,
    #[serde(rename = "azureFile", default)]
    pub azure_file: Option<AzureFileVolumeSource>,
    #[serde(rename = "gitRepo", default)]
    pub git_repo: Option<GitRepoVolumeSource>,
    #[serde(default)]
    pub projected: Option<ProjectedVolumeSource>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EmptyDirVolumeSource {}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SecretVolumeSource {
    #[serde(rename = "secretName")]
    pub secret_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ConfigMapVolumeSource {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AzureFileVolumeSource {
    #[serde(rename = "shareName")]
    pub share_name: String,
    #[serde(rename = "secretName")]
    pub secret_name: String,
    #[serde(rename = "readOnly", default)]
    pub read_only: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GitRepoVolumeSource {
    pub repository: String,
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProjectedVolumeSource {
    #[serde(default)]
    pub sources: Vec<VolumeProjection>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct VolumeProjection {
    #[serde(default)]
    pub secret: Option<SecretVolumeSource>,
    #[serde(rename = "configMap", default)]
    pub config_map: Option<ConfigMapVolumeSource>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct LocalObjectReference {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PodStatus {
    #[serde(default)]
    pub phase: PodPhase,
    #[serde(default)]
    pub conditions: Vec<PodCondition>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(rename = "hostIP", default)]
    pub host_ip: Option<String>,
    #[serde(rename = "podIP", default)]
    pub pod_ip: Option<String>,
    #[serde(rename = "startTime", default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(rename = "containerStatuses", default)]
    pub container_statuses: Vec<ContainerStatus>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum PodPhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PodCondition {
    #[serde(rename = "type")]
    pub condition_type: PodConditionType,
    pub status: ConditionStatus,
    #[serde(rename = "lastTransitionTime", default)]
    pub last_transition_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PodConditionType {
    PodScheduled,
    Initialized,
    Ready,
    ContainersReady,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ContainerStatus {
    pub name: String,
    #[serde(default)]
    pub state: Option<ContainerState>,
    #[serde(rename = "lastState", default)]
    pub last_state: Option<ContainerState>,
    #[serde(default)]
    pub ready: bool,
    #[serde(rename = "restartCount", default)]
    pub restart_count: i32,
    #[serde(default)]
    pub image: String,
    #[serde(rename = "imageID", default)]
    pub image_id: String,
    #[serde(rename = "containerID", default)]
    pub container_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ContainerState {
    Waiting {
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    Running {
        #[serde(rename = "startedAt", default)]
        started_at: Option<DateTime<Utc>>,
    },
    Terminated {
        #[serde(rename = "exitCode")]
        exit_code: i32,
        #[serde(default)]
        signal: Option<i32>,
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        message: Option<String>,
        #[serde(rename = "startedAt", default)]
        started_at: Option<DateTime<Utc>>,
        #[serde(rename = "finishedAt", default)]
        finished_at: Option<DateTime<Utc>>,
    },
}

impl ContainerState {
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running { .. })
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, ContainerState::Terminated { .. })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Node {
    #[serde(rename = "apiVersion", default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_node_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: NodeStatus,
}

fn default_node_kind() -> String {
    "Node".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct NodeStatus {
    #[serde(default)]
    pub capacity: HashMap<String, String>,
    #[serde(default)]
    pub allocatable: HashMap<String, String>,
    #[serde(default)]
    pub addresses: Vec<NodeAddress>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NodeAddress {
    #[serde(rename = "type")]
    pub address_type: String,
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Secret {
    pub metadata: ObjectMeta,
    #[serde(rename = "type", default)]
    pub secret_type: String,
    #[serde(default)]
    pub data: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ConfigMap {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}
