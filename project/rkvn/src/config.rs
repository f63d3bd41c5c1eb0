//! Provider configuration.
//!
//! The provider reads its configuration once at construction into an
//! explicit [`ProviderConfig`] record. Environment variables are one
//! source; a YAML file is another, with environment values overriding
//! file values so deployments can patch a shared file per node.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::aci::{OS_TYPE_LINUX, OS_TYPE_WINDOWS};

pub const ENV_RESOURCE_GROUP: &str = "ACI_RESOURCE_GROUP";
pub const ENV_REGION: &str = "ACI_REGION";
pub const ENV_VNET_NAME: &str = "ACI_VNET_NAME";
pub const ENV_VNET_RESOURCE_GROUP: &str = "ACI_VNET_RESOURCE_GROUP";
pub const ENV_SUBNET_NAME: &str = "ACI_SUBNET_NAME";
pub const ENV_SUBSCRIPTION_ID: &str = "ACI_SUBSCRIPTION_ID";
pub const ENV_OPERATING_SYSTEM: &str = "PROVIDER_OPERATING_SYSTEM";

pub const DEFAULT_REGION: &str = "westus2";
pub const DEFAULT_CLUSTER_DOMAIN: &str = "cluster.local";
pub const DEFAULT_SUBNET_NAME: &str = "default";

/// Exit code reported for containers whose pod was deleted out from under
/// the orchestrator. Zero mirrors a normal termination, which conflates
/// the two cases; kept for compatibility with consumers of the status.
pub const DEFAULT_POD_DELETED_EXIT_CODE: i32 = 0;

/// Annotation naming the GPU SKU a pod wants its containers scheduled on.
pub const DEFAULT_GPU_TYPE_ANNOTATION: &str = "virtual-kubelet.io/container-gpu-type";

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_operating_system() -> String {
    OS_TYPE_LINUX.to_string()
}

fn default_cluster_domain() -> String {
    DEFAULT_CLUSTER_DOMAIN.to_string()
}

fn default_subnet_name() -> String {
    DEFAULT_SUBNET_NAME.to_string()
}

fn default_pod_deleted_exit_code() -> i32 {
    DEFAULT_POD_DELETED_EXIT_CODE
}

fn default_gpu_type_annotation() -> String {
    DEFAULT_GPU_TYPE_ANNOTATION.to_string()
}

fn default_pod_capacity() -> String {
    "5000".to_string()
}

fn default_cpu_capacity() -> String {
    "10000".to_string()
}

fn default_memory_capacity() -> String {
    "4Ti".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub resource_group: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub node_name: String,
    #[serde(default = "default_operating_system")]
    pub operating_system: String,
    #[serde(default)]
    pub internal_ip: String,
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub vnet_name: Option<String>,
    #[serde(default)]
    pub vnet_resource_group: Option<String>,
    #[serde(default = "default_subnet_name")]
    pub subnet_name: String,
    #[serde(default = "default_cluster_domain")]
    pub cluster_domain: String,
    #[serde(default)]
    pub kube_dns_ip: Option<String>,
    #[serde(default)]
    pub log_analytics: Option<LogAnalyticsConfig>,
    #[serde(default = "default_pod_capacity")]
    pub pod_capacity: String,
    #[serde(default = "default_cpu_capacity")]
    pub cpu_capacity: String,
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: String,
    #[serde(default = "default_pod_deleted_exit_code")]
    pub pod_deleted_exit_code: i32,
    #[serde(default = "default_gpu_type_annotation")]
    pub gpu_type_annotation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogAnalyticsConfig {
    pub workspace_id: String,
    pub workspace_key: String,
}

impl ProviderConfig {
    /// Builds the configuration from environment variables alone.
    pub fn from_env(node_name: &str, internal_ip: &str) -> anyhow::Result<Self> {
        let resource_group = env::var(ENV_RESOURCE_GROUP)
            .with_context(|| format!("{ENV_RESOURCE_GROUP} must be set"))?;

        let mut config = ProviderConfig {
            resource_group,
            region: env::var(ENV_REGION).unwrap_or_else(|_| default_region()),
            node_name: node_name.to_string(),
            operating_system: env::var(ENV_OPERATING_SYSTEM)
                .unwrap_or_else(|_| default_operating_system()),
            internal_ip: internal_ip.to_string(),
            subscription_id: env::var(ENV_SUBSCRIPTION_ID).unwrap_or_default(),
            vnet_name: env::var(ENV_VNET_NAME).ok(),
            vnet_resource_group: env::var(ENV_VNET_RESOURCE_GROUP).ok(),
            subnet_name: env::var(ENV_SUBNET_NAME).unwrap_or_else(|_| default_subnet_name()),
            cluster_domain: default_cluster_domain(),
            kube_dns_ip: None,
            log_analytics: None,
            pod_capacity: default_pod_capacity(),
            cpu_capacity: default_cpu_capacity(),
            memory_capacity: default_memory_capacity(),
            pod_deleted_exit_code: default_pod_deleted_exit_code(),
            gpu_type_annotation: default_gpu_type_annotation(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from a YAML file, then overlays environment
    /// variables on top.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        let mut config: ProviderConfig =
            serde_yaml::from_str(&content).context("failed to parse YAML config")?;
        config.overlay_env();
        config.validate()?;
        Ok(config)
    }

    fn overlay_env(&mut self) {
        if let Ok(resource_group) = env::var(ENV_RESOURCE_GROUP) {
            self.resource_group = resource_group;
        }
        if let Ok(region) = env::var(ENV_REGION) {
            self.region = region;
        }
        if let Ok(operating_system) = env::var(ENV_OPERATING_SYSTEM) {
            self.operating_system = operating_system;
        }
        if let Ok(vnet_name) = env::var(ENV_VNET_NAME) {
            self.vnet_name = Some(vnet_name);
        }
        if let Ok(vnet_resource_group) = env::var(ENV_VNET_RESOURCE_GROUP) {
            self.vnet_resource_group = Some(vnet_resource_group);
        }
        if let Ok(subnet_name) = env::var(ENV_SUBNET_NAME) {
            self.subnet_name = subnet_name;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.resource_group.is_empty() {
            anyhow::bail!("resource group cannot be empty");
        }
        if self.operating_system != OS_TYPE_LINUX && self.operating_system != OS_TYPE_WINDOWS {
            anyhow::bail!(
                "operating system {} is not supported, must be one of {OS_TYPE_LINUX} and {OS_TYPE_WINDOWS}",
                self.operating_system
            );
        }
        Ok(())
    }

    /// Node capacity advertised to the orchestrator.
    pub fn capacity(&self) -> HashMap<String, String> {
        HashMap::from([
            ("cpu".to_string(), self.cpu_capacity.clone()),
            ("memory".to_string(), self.memory_capacity.clone()),
            ("pods".to_string(), self.pod_capacity.clone()),
        ])
    }
}
