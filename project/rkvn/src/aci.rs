//! Typed records for the Cloud Container Service's container-group schema.
//!
//! A container group is the remote co-scheduled unit that corresponds 1:1
//! to a pod: an ordered list of containers sharing networking, volumes and
//! lifecycle, plus the instance view the service reports back. The records
//! here mirror the service's wire format (camelCase properties) and are
//! deliberately plain; all translation logic lives in [`crate::mapping`]
//! and [`crate::status`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const OS_TYPE_LINUX: &str = "Linux";
pub const OS_TYPE_WINDOWS: &str = "Windows";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContainerGroup {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub properties: ContainerGroupProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContainerGroupProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub init_containers: Vec<InitContainerDefinition>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default)]
    pub image_registry_credentials: Vec<ImageRegistryCredential>,
    #[serde(default)]
    pub restart_policy: Option<String>,
    #[serde(default)]
    pub os_type: Option<String>,
    #[serde(default)]
    pub ip_address: Option<IpAddress>,
    #[serde(default)]
    pub dns_config: Option<DnsConfiguration>,
    #[serde(default)]
    pub subnet_ids: Vec<ContainerGroupSubnetId>,
    #[serde(default)]
    pub diagnostics: Option<ContainerGroupDiagnostics>,
    #[serde(default)]
    pub instance_view: Option<ContainerGroupInstanceView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Container {
    pub name: String,
    #[serde(default)]
    pub properties: Option<ContainerProperties>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContainerProperties {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
    #[serde(default)]
    pub environment_variables: Vec<EnvironmentVariable>,
    #[serde(default)]
    pub resources: ResourceRequirements,
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMount>,
    #[serde(default)]
    pub liveness_probe: Option<ContainerProbe>,
    #[serde(default)]
    pub readiness_probe: Option<ContainerProbe>,
    #[serde(default)]
    pub instance_view: Option<ContainerInstanceView>,
}

/// Init containers run to completion, in order, before the main containers
/// start; the service accepts neither ports, probes nor resources on them.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InitContainerDefinition {
    pub name: String,
    #[serde(default)]
    pub properties: InitContainerProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InitContainerProperties {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub environment_variables: Vec<EnvironmentVariable>,
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMount>,
}

/// Exactly one of `value` and `secure_value` is set; secure values are
/// write-only on the service side and never reported back.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentVariable {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub secure_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContainerPort {
    #[serde(default)]
    pub protocol: Option<String>,
    pub port: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResourceRequirements {
    #[serde(default)]
    pub requests: Option<ResourceRequests>,
    #[serde(default)]
    pub limits: Option<ResourceLimits>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequests {
    pub cpu: f64,
    #[serde(rename = "memoryInGB")]
    pub memory_in_gb: f64,
    #[serde(default)]
    pub gpu: Option<GpuResource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLimits {
    #[serde(default)]
    pub cpu: Option<f64>,
    #[serde(rename = "memoryInGB", default)]
    pub memory_in_gb: Option<f64>,
    #[serde(default)]
    pub gpu: Option<GpuResource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GpuResource {
    pub count: i32,
    #[serde(default)]
    pub sku: Option<String>,
}

/// A probe carries exactly one of `exec` and `http_get`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerProbe {
    #[serde(default)]
    pub exec: Option<ContainerExec>,
    #[serde(default)]
    pub http_get: Option<ContainerHttpGet>,
    #[serde(default)]
    pub initial_delay_seconds: Option<i32>,
    #[serde(default)]
    pub period_seconds: Option<i32>,
    #[serde(default)]
    pub timeout_seconds: Option<i32>,
    #[serde(default)]
    pub success_threshold: Option<i32>,
    #[serde(default)]
    pub failure_threshold: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ContainerExec {
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ContainerHttpGet {
    #[serde(default)]
    pub path: Option<String>,
    pub port: i32,
    #[serde(default)]
    pub scheme: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    #[serde(default)]
    pub empty_dir: Option<EmptyDirVolume>,
    #[serde(default)]
    pub secret: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub azure_file: Option<AzureFileVolume>,
    #[serde(default)]
    pub git_repo: Option<GitRepoVolume>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmptyDirVolume {}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AzureFileVolume {
    pub share_name: String,
    pub storage_account_name: String,
    #[serde(default)]
    pub storage_account_key: Option<String>,
    #[serde(default)]
    pub read_only: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GitRepoVolume {
    pub repository: String,
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    #[serde(default)]
    pub read_only: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImageRegistryCredential {
    pub server: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub identity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IpAddress {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
    #[serde(rename = "type", default)]
    pub address_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DnsConfiguration {
    pub name_servers: Vec<String>,
    #[serde(default)]
    pub search_domains: Option<String>,
    #[serde(default)]
    pub options: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContainerGroupSubnetId {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContainerGroupDiagnostics {
    #[serde(default)]
    pub log_analytics: Option<LogAnalytics>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LogAnalytics {
    pub workspace_id: String,
    pub workspace_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContainerGroupInstanceView {
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInstanceView {
    #[serde(default)]
    pub restart_count: i32,
    #[serde(default)]
    pub current_state: Option<ContainerState>,
    #[serde(default)]
    pub previous_state: Option<ContainerState>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContainerState {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finish_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub detail_status: Option<String>,
}
