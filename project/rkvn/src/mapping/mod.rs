//! Pod-spec to container-group fragment translation.
//!
//! Pure projections of the pod's loosely-typed fields onto the remote
//! schema: environment variables, resources, ports and whole containers.
//! Probes, volumes and the Windows post-processing live in submodules.

pub mod probes;
pub mod volumes;
pub mod windows;

use common::{Container, EnvVar, Pod};

use crate::aci;
use crate::error::ProviderError;
use crate::listers::ConfigMapLister;

/// The extended resource name pods use to request GPUs.
pub const GPU_RESOURCE_NAME: &str = "nvidia.com/gpu";

pub const DEFAULT_CPU_REQUEST: f64 = 1.0;
pub const DEFAULT_MEMORY_REQUEST_GB: f64 = 1.5;

const MIN_CPU_REQUEST: f64 = 0.01;
const MIN_MEMORY_REQUEST_GB: f64 = 0.10;

/// Splits a pod environment variable into the remote plain/secure pair.
/// Secret-backed variables go out as `secure_value` so the service never
/// echoes them back; everything else is a plain `value`.
pub fn map_env_var(env: &EnvVar) -> aci::EnvironmentVariable {
    let is_secret = env
        .value_from
        .as_ref()
        .is_some_and(|source| source.secret_key_ref.is_some());

    if is_secret {
        aci::EnvironmentVariable {
            name: env.name.clone(),
            value: None,
            secure_value: Some(env.value.clone()),
        }
    } else {
        aci::EnvironmentVariable {
            name: env.name.clone(),
            value: Some(env.value.clone()),
            secure_value: None,
        }
    }
}

/// Resolves `valueFrom` references that the node agent does not expand:
/// config-map keys through the lister, downward-API fields against the
/// pod itself. Secret references stay as-is; their value was already
/// resolved into `value` and only needs the secure split.
pub async fn resolve_env_vars(
    pod: &Pod,
    container: &Container,
    config_maps: &dyn ConfigMapLister,
) -> Result<Vec<aci::EnvironmentVariable>, ProviderError> {
    let mut resolved = Vec::with_capacity(container.env.len());

    for env in &container.env {
        let mut env = env.clone();
        if let Some(source) = &env.value_from {
            if let Some(selector) = &source.config_map_key_ref {
                let config_map = config_maps
                    .get(&pod.metadata.namespace, &selector.name)
                    .await
                    .map_err(ProviderError::Remote)?
                    .ok_or_else(|| {
                        ProviderError::Validation(format!(
                            "config map {} referenced by pod {} was not found",
                            selector.name, pod.metadata.name
                        ))
                    })?;
                env.value = config_map.data.get(&selector.key).cloned().ok_or_else(|| {
                    ProviderError::Validation(format!(
                        "key {} was not found in config map {}",
                        selector.key, selector.name
                    ))
                })?;
            } else if let Some(field) = &source.field_ref {
                env.value = resolve_field_ref(pod, &field.field_path)?;
            }
        }
        resolved.push(map_env_var(&env));
    }

    Ok(resolved)
}

fn resolve_field_ref(pod: &Pod, field_path: &str) -> Result<String, ProviderError> {
    match field_path {
        "metadata.name" => Ok(pod.metadata.name.clone()),
        "metadata.namespace" => Ok(pod.metadata.namespace.clone()),
        "metadata.uid" => Ok(pod.metadata.uid.clone()),
        "spec.nodeName" => Ok(pod.spec.node_name.clone().unwrap_or_default()),
        "status.podIP" => Ok(pod.status.pod_ip.clone().unwrap_or_default()),
        other => Err(ProviderError::Validation(format!(
            "unsupported field reference {other} in pod {}",
            pod.metadata.name
        ))),
    }
}

/// Maps container resources onto the remote request/limit records.
///
/// Requests are truncated to the granularity the service accepts (two
/// decimals of a core, one decimal of a gigabyte) and floored at the
/// service minimums; absent requests fall back to the provider defaults.
/// Limits are only attached when the pod declares limits, with a GPU limit
/// mirrored into the requests.
pub fn map_resources(
    container: &Container,
    gpu_sku: Option<&str>,
) -> aci::ResourceRequirements {
    let requests_list = container
        .resources
        .as_ref()
        .and_then(|resources| resources.requests.as_ref());
    let limits_list = container
        .resources
        .as_ref()
        .and_then(|resources| resources.limits.as_ref());

    let mut cpu_request = DEFAULT_CPU_REQUEST;
    let mut memory_request = DEFAULT_MEMORY_REQUEST_GB;
    if let Some(requests) = requests_list {
        if let Some(cpu) = requests.get("cpu") {
            cpu_request = (cpu.milli_value() / 10) as f64 / 100.0;
            if cpu_request < MIN_CPU_REQUEST {
                cpu_request = MIN_CPU_REQUEST;
            }
        }
        if let Some(memory) = requests.get("memory") {
            memory_request = (memory.value() / 100_000_000) as f64 / 10.0;
            if memory_request < MIN_MEMORY_REQUEST_GB {
                memory_request = MIN_MEMORY_REQUEST_GB;
            }
        }
    }

    let mut requests = aci::ResourceRequests {
        cpu: cpu_request,
        memory_in_gb: memory_request,
        gpu: None,
    };

    let limits = limits_list.map(|limits| {
        let cpu = limits
            .get("cpu")
            .map(|cpu| cpu.milli_value() as f64 / 1000.0)
            .unwrap_or(cpu_request);
        let memory_in_gb = limits
            .get("memory")
            .map(|memory| memory.value() as f64 / 1_073_741_824.0)
            .unwrap_or(memory_request);
        let gpu = limits.get(GPU_RESOURCE_NAME).map(|count| aci::GpuResource {
            count: count.value() as i32,
            sku: gpu_sku.map(str::to_string),
        });
        if let Some(gpu) = &gpu {
            requests.gpu = Some(gpu.clone());
        }
        aci::ResourceLimits {
            cpu: Some(cpu),
            memory_in_gb: Some(memory_in_gb),
            gpu,
        }
    });

    aci::ResourceRequirements {
        requests: Some(requests),
        limits,
    }
}

/// Container ports pass through verbatim; duplicates across containers are
/// the service's problem to reject.
pub fn map_ports(container: &Container) -> Vec<aci::ContainerPort> {
    container
        .ports
        .iter()
        .map(|port| aci::ContainerPort {
            protocol: Some(port.protocol.clone()),
            port: port.container_port,
        })
        .collect()
}

/// Projects one pod container onto the remote container record.
pub async fn map_container(
    pod: &Pod,
    container: &Container,
    gpu_sku: Option<&str>,
    config_maps: &dyn ConfigMapLister,
) -> Result<aci::Container, ProviderError> {
    let environment_variables = resolve_env_vars(pod, container, config_maps).await?;

    let liveness_probe = container
        .liveness_probe
        .as_ref()
        .map(|probe| probes::map_probe(probe, &container.ports))
        .transpose()?;
    let readiness_probe = container
        .readiness_probe
        .as_ref()
        .map(|probe| probes::map_probe(probe, &container.ports))
        .transpose()?;

    let mut command = container.command.clone();
    command.extend(container.args.iter().cloned());

    Ok(aci::Container {
        name: container.name.clone(),
        properties: Some(aci::ContainerProperties {
            image: container.image.clone(),
            command,
            ports: map_ports(container),
            environment_variables,
            resources: map_resources(container, gpu_sku),
            volume_mounts: container.volume_mounts.iter().map(volumes::map_volume_mount).collect(),
            liveness_probe,
            readiness_probe,
            instance_view: None,
        }),
    })
}

/// Projects one pod init container onto the remote init-container record.
/// The service accepts neither ports, probes nor resources on these.
pub async fn map_init_container(
    pod: &Pod,
    container: &Container,
    config_maps: &dyn ConfigMapLister,
) -> Result<aci::InitContainerDefinition, ProviderError> {
    let environment_variables = resolve_env_vars(pod, container, config_maps).await?;

    let mut command = container.command.clone();
    command.extend(container.args.iter().cloned());

    Ok(aci::InitContainerDefinition {
        name: container.name.clone(),
        properties: aci::InitContainerProperties {
            image: container.image.clone(),
            command,
            environment_variables,
            volume_mounts: container.volume_mounts.iter().map(volumes::map_volume_mount).collect(),
        },
    })
}
