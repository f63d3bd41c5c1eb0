//! Container group composition.
//!
//! Turns one pod plus the provider configuration into a full container
//! group submission: identity tags, mapped containers and volumes,
//! registry credentials, DNS, diagnostics and networking, with the
//! Windows post-processing applied last.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::debug;

use common::{Pod, RestartPolicy};

use crate::aci;
use crate::client::CcsClient;
use crate::config::ProviderConfig;
use crate::credentials;
use crate::error::ProviderError;
use crate::listers::{ConfigMapLister, SecretLister};
use crate::mapping;
use crate::status::{
    TAG_CREATION_TIMESTAMP, TAG_NAMESPACE, TAG_NODE_NAME, TAG_POD_NAME, TAG_UID,
    format_creation_timestamp,
};

/// One pod maps to at most one container group; the name is deterministic
/// in the pod's identity.
pub fn container_group_name(namespace: &str, pod_name: &str) -> String {
    format!("{namespace}-{pod_name}")
}

/// The operating system a pod effectively runs on: the pod's own OS field
/// when set, the provider default otherwise.
pub fn effective_os(pod: &Pod, config: &ProviderConfig) -> String {
    pod.spec
        .os
        .as_ref()
        .map(|os| os.name.clone())
        .unwrap_or_else(|| config.operating_system.clone())
}

/// Composes the full container group submission for a pod.
pub async fn build_container_group(
    pod: &Pod,
    config: &ProviderConfig,
    client: &dyn CcsClient,
    secrets: &dyn SecretLister,
    config_maps: &dyn ConfigMapLister,
) -> Result<aci::ContainerGroup, ProviderError> {
    let name = container_group_name(&pod.metadata.namespace, &pod.metadata.name);
    let operating_system = effective_os(pod, config);
    let gpu_sku = resolve_gpu_sku(pod, config, client).await?;

    let mut containers = Vec::with_capacity(pod.spec.containers.len());
    for container in &pod.spec.containers {
        containers.push(mapping::map_container(pod, container, gpu_sku.as_deref(), config_maps).await?);
    }
    let mut init_containers = Vec::with_capacity(pod.spec.init_containers.len());
    for container in &pod.spec.init_containers {
        init_containers.push(mapping::map_init_container(pod, container, config_maps).await?);
    }

    let volumes = mapping::volumes::map_volumes(pod, secrets, config_maps).await?;
    let image_registry_credentials = credentials::get_image_pull_secrets(pod, secrets).await?;
    let ip_address = exposed_ip_address(&containers, config);

    let mut container_group = aci::ContainerGroup {
        id: None,
        name,
        location: Some(config.region.clone()),
        tags: identity_tags(pod, config),
        properties: aci::ContainerGroupProperties {
            provisioning_state: None,
            containers,
            init_containers,
            volumes,
            image_registry_credentials,
            restart_policy: Some(map_restart_policy(pod.spec.restart_policy)),
            os_type: Some(operating_system.clone()),
            ip_address,
            dns_config: dns_configuration(pod, config),
            subnet_ids: subnet_ids(config),
            diagnostics: config.log_analytics.as_ref().map(|workspace| {
                aci::ContainerGroupDiagnostics {
                    log_analytics: Some(aci::LogAnalytics {
                        workspace_id: workspace.workspace_id.clone(),
                        workspace_key: workspace.workspace_key.clone(),
                    }),
                }
            }),
            instance_view: None,
        },
    };

    mapping::windows::filter_service_account_secret_volume(&operating_system, &mut container_group);

    debug!(
        container_group = %container_group.name,
        containers = container_group.properties.containers.len(),
        volumes = container_group.properties.volumes.len(),
        os = %operating_system,
        "[Builder] Composed container group"
    );

    Ok(container_group)
}

fn identity_tags(pod: &Pod, config: &ProviderConfig) -> BTreeMap<String, String> {
    let creation_timestamp = pod
        .metadata
        .creation_timestamp
        .unwrap_or_else(Utc::now);
    BTreeMap::from([
        (TAG_POD_NAME.to_string(), pod.metadata.name.clone()),
        (TAG_NAMESPACE.to_string(), pod.metadata.namespace.clone()),
        (TAG_NODE_NAME.to_string(), config.node_name.clone()),
        (TAG_UID.to_string(), pod.metadata.uid.clone()),
        (
            TAG_CREATION_TIMESTAMP.to_string(),
            format_creation_timestamp(&creation_timestamp),
        ),
    ])
}

fn map_restart_policy(policy: RestartPolicy) -> String {
    match policy {
        RestartPolicy::Always => "Always".to_string(),
        RestartPolicy::OnFailure => "OnFailure".to_string(),
        RestartPolicy::Never => "Never".to_string(),
    }
}

/// Groups with exposed container ports get an IP address block; private
/// when the group joins a virtual network, public otherwise.
fn exposed_ip_address(
    containers: &[aci::Container],
    config: &ProviderConfig,
) -> Option<aci::IpAddress> {
    let ports: Vec<aci::ContainerPort> = containers
        .iter()
        .filter_map(|container| container.properties.as_ref())
        .flat_map(|properties| properties.ports.iter().cloned())
        .collect();
    if ports.is_empty() {
        return None;
    }
    let address_type = if config.vnet_name.is_some() {
        "Private"
    } else {
        "Public"
    };
    Some(aci::IpAddress {
        ip: None,
        ports,
        address_type: Some(address_type.to_string()),
    })
}

fn dns_configuration(pod: &Pod, config: &ProviderConfig) -> Option<aci::DnsConfiguration> {
    let kube_dns_ip = config.kube_dns_ip.as_ref()?;
    let domain = &config.cluster_domain;
    let search_domains = format!(
        "{namespace}.svc.{domain} svc.{domain} {domain}",
        namespace = pod.metadata.namespace
    );
    Some(aci::DnsConfiguration {
        name_servers: vec![kube_dns_ip.clone()],
        search_domains: Some(search_domains),
        options: Some("ndots:5".to_string()),
    })
}

fn subnet_ids(config: &ProviderConfig) -> Vec<aci::ContainerGroupSubnetId> {
    let Some(vnet_name) = &config.vnet_name else {
        return Vec::new();
    };
    let vnet_resource_group = config
        .vnet_resource_group
        .as_ref()
        .unwrap_or(&config.resource_group);
    let id = format!(
        "/subscriptions/{subscription}/resourceGroups/{vnet_resource_group}/providers/Microsoft.Network/virtualNetworks/{vnet_name}/subnets/{subnet}",
        subscription = config.subscription_id,
        subnet = config.subnet_name,
    );
    vec![aci::ContainerGroupSubnetId {
        id,
        name: Some(config.subnet_name.clone()),
    }]
}

async fn resolve_gpu_sku(
    pod: &Pod,
    config: &ProviderConfig,
    client: &dyn CcsClient,
) -> Result<Option<String>, ProviderError> {
    let wants_gpu = pod.spec.containers.iter().any(|container| {
        container
            .resources
            .as_ref()
            .and_then(|resources| resources.limits.as_ref())
            .is_some_and(|limits| limits.contains_key(mapping::GPU_RESOURCE_NAME))
    });
    if !wants_gpu {
        return Ok(None);
    }

    let capabilities = client.list_capabilities(&config.region).await?;
    let supported: Vec<String> = capabilities
        .iter()
        .filter(|capability| capability.location.eq_ignore_ascii_case(&config.region))
        .filter_map(|capability| capability.gpu.clone())
        .filter(|sku| !sku.is_empty())
        .collect();
    if supported.is_empty() {
        return Err(ProviderError::Validation(format!(
            "no GPU capability found for region {}",
            config.region
        )));
    }

    match pod.metadata.annotations.get(&config.gpu_type_annotation) {
        Some(requested) => {
            if supported.iter().any(|sku| sku.eq_ignore_ascii_case(requested)) {
                Ok(Some(requested.clone()))
            } else {
                Err(ProviderError::Validation(format!(
                    "the pod requires GPU SKU {requested}, which is not available in region {}; available SKUs are {supported:?}",
                    config.region
                )))
            }
        }
        None => Ok(None),
    }
}
