//! Projection of observed container groups into pod status.
//!
//! Everything here is pure: given a container group as the service reports
//! it, produce the pod phase, conditions, per-container state machines and
//! addresses the orchestrator expects. The identity tags stamped at
//! creation are the only durable state, so they also drive pod
//! reconstruction for groups observed without a local pod.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use common::{
    ConditionStatus, Container, ContainerState, ContainerStatus, ObjectMeta, Pod, PodCondition,
    PodConditionType, PodPhase, PodSpec, PodStatus, Quantity, ResourceRequirements,
};

use crate::aci;
use crate::error::ProviderError;

pub const TAG_POD_NAME: &str = "PodName";
pub const TAG_NAMESPACE: &str = "Namespace";
pub const TAG_NODE_NAME: &str = "NodeName";
pub const TAG_UID: &str = "UID";
pub const TAG_CREATION_TIMESTAMP: &str = "CreationTimestamp";

/// The `CreationTimestamp` tag layout: a numeric offset followed by a zone
/// abbreviation, e.g. `2006-01-02 15:04:05.999999999 -0700 MST`. Existing
/// remote groups carry this exact layout, so it is kept for round-trip
/// compatibility even though it is not an RFC format.
const CREATION_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z";

pub fn format_creation_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S%.9f %z %Z").to_string()
}

fn parse_creation_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    // Drop the trailing zone abbreviation; the numeric offset is authoritative.
    let without_zone = match trimmed.rsplit_once(' ') {
        Some((head, tail)) if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_alphabetic()) => {
            head
        }
        _ => trimmed,
    };
    DateTime::parse_from_str(without_zone, CREATION_TIMESTAMP_FORMAT)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// The creation time recorded in the group's tags, falling back to now
/// when the tag is missing or does not parse.
pub fn creation_time_from_tags(tags: &BTreeMap<String, String>) -> DateTime<Utc> {
    tags.get(TAG_CREATION_TIMESTAMP)
        .and_then(|raw| parse_creation_timestamp(raw))
        .unwrap_or_else(Utc::now)
}

pub fn has_identity_tags(tags: &BTreeMap<String, String>) -> bool {
    [
        TAG_POD_NAME,
        TAG_NAMESPACE,
        TAG_NODE_NAME,
        TAG_UID,
        TAG_CREATION_TIMESTAMP,
    ]
    .iter()
    .all(|tag| tags.contains_key(*tag))
}

/// Rejects container groups the projector cannot make sense of.
pub fn validate_container_group(container_group: &aci::ContainerGroup) -> Result<(), ProviderError> {
    if container_group.properties.containers.is_empty() {
        return Err(ProviderError::Validation(format!(
            "containers list cannot be nil for container group {}",
            container_group.name
        )));
    }
    for container in &container_group.properties.containers {
        if container.properties.is_none() {
            return Err(ProviderError::Validation(format!(
                "container {} properties cannot be nil",
                container.name
            )));
        }
    }
    Ok(())
}

/// The group state the service currently reports: the instance-view state
/// when present, the provisioning state otherwise.
pub fn aci_state(container_group: &aci::ContainerGroup) -> String {
    container_group
        .properties
        .instance_view
        .as_ref()
        .and_then(|view| view.state.clone())
        .or_else(|| container_group.properties.provisioning_state.clone())
        .unwrap_or_default()
}

pub fn pod_phase_from_state(state: &str) -> PodPhase {
    match state {
        "Running" => PodPhase::Running,
        "Succeeded" => PodPhase::Succeeded,
        "Failed" | "Canceled" => PodPhase::Failed,
        "Creating" | "Repairing" | "Pending" | "Accepted" => PodPhase::Pending,
        _ => PodPhase::Unknown,
    }
}

fn container_state_from_aci(state: &aci::ContainerState) -> ContainerState {
    match state.state.as_deref() {
        Some("Running") => ContainerState::Running {
            started_at: state.start_time,
        },
        Some("Terminated") => ContainerState::Terminated {
            exit_code: state.exit_code.unwrap_or(0),
            signal: None,
            reason: state.state.clone(),
            message: state.detail_status.clone(),
            started_at: state.start_time,
            finished_at: state.finish_time,
        },
        _ => ContainerState::Waiting {
            reason: state.state.clone(),
            message: state.detail_status.clone(),
        },
    }
}

/// Synthesizes the container ID the orchestrator reports: a digest of the
/// container's remote resource path under the provider scheme.
pub fn container_id(container_group_id: Option<&str>, container_name: &str) -> String {
    let Some(container_group_id) = container_group_id else {
        return String::new();
    };
    let resource_id = format!("{container_group_id}/containers/{container_name}");
    let digest = Sha256::digest(resource_id.to_uppercase().as_bytes());
    format!("aci://{digest:x}")
}

/// One status per remote container, in the group's container order.
pub fn container_statuses_from_container_group(
    container_group: &aci::ContainerGroup,
) -> Result<Vec<ContainerStatus>, ProviderError> {
    let mut statuses = Vec::with_capacity(container_group.properties.containers.len());

    for container in &container_group.properties.containers {
        let properties = container.properties.as_ref().ok_or_else(|| {
            ProviderError::Validation(format!(
                "container {} properties cannot be nil",
                container.name
            ))
        })?;
        let instance_view = properties.instance_view.as_ref();

        let state = instance_view
            .and_then(|view| view.current_state.as_ref())
            .map(container_state_from_aci)
            .unwrap_or(ContainerState::Waiting {
                reason: Some("Initializing".to_string()),
                message: None,
            });
        let last_state = instance_view
            .and_then(|view| view.previous_state.as_ref())
            .map(container_state_from_aci);

        statuses.push(ContainerStatus {
            name: container.name.clone(),
            ready: state.is_running(),
            restart_count: instance_view.map(|view| view.restart_count).unwrap_or(0),
            image: properties.image.clone(),
            image_id: String::new(),
            container_id: container_id(container_group.id.as_deref(), &container.name),
            state: Some(state),
            last_state,
        });
    }

    Ok(statuses)
}

/// Projects the full pod status out of an observed container group.
pub fn pod_status_from_container_group(
    container_group: &aci::ContainerGroup,
    internal_ip: &str,
) -> Result<PodStatus, ProviderError> {
    validate_container_group(container_group)?;

    let container_statuses = container_statuses_from_container_group(container_group)?;
    let all_ready = container_statuses.iter().all(|status| status.ready);

    let state = aci_state(container_group);
    let phase = pod_phase_from_state(&state);
    let created = creation_time_from_tags(&container_group.tags);
    let ready = phase == PodPhase::Running && all_ready;

    let condition = |condition_type: PodConditionType, status: ConditionStatus| PodCondition {
        condition_type,
        status,
        last_transition_time: Some(created),
        reason: None,
        message: None,
    };

    Ok(PodStatus {
        phase,
        conditions: vec![
            condition(PodConditionType::Initialized, ConditionStatus::True),
            condition(PodConditionType::Ready, ready.into()),
            condition(PodConditionType::ContainersReady, ready.into()),
        ],
        message: None,
        reason: None,
        host_ip: Some(internal_ip.to_string()),
        pod_ip: container_group
            .properties
            .ip_address
            .as_ref()
            .and_then(|address| address.ip.clone()),
        start_time: Some(created),
        container_statuses,
    })
}

/// Reconstructs a pod from an observed container group's tags and
/// containers. Returns `None` when any identity tag is absent; such groups
/// were not created by this provider and are not surfaced as pods.
pub fn pod_from_container_group(
    container_group: &aci::ContainerGroup,
    internal_ip: &str,
) -> Result<Option<Pod>, ProviderError> {
    if !has_identity_tags(&container_group.tags) {
        return Ok(None);
    }
    let tags = &container_group.tags;

    let mut containers = Vec::with_capacity(container_group.properties.containers.len());
    for container in &container_group.properties.containers {
        let properties = container.properties.as_ref().ok_or_else(|| {
            ProviderError::Validation(format!(
                "container {} properties cannot be nil",
                container.name
            ))
        })?;
        let requests = properties.resources.requests.as_ref().ok_or_else(|| {
            ProviderError::Validation(format!(
                "container {} resource requests cannot be nil",
                container.name
            ))
        })?;

        let mut resources = ResourceRequirements {
            requests: Some(BTreeMap::from([
                (
                    "cpu".to_string(),
                    Quantity::from_millis((requests.cpu * 1000.0).round() as i64),
                ),
                (
                    "memory".to_string(),
                    Quantity::from_value((requests.memory_in_gb * 1e9).round() as i64),
                ),
            ])),
            limits: None,
        };
        if let Some(limits) = &properties.resources.limits {
            let mut list = BTreeMap::new();
            if let Some(cpu) = limits.cpu {
                list.insert(
                    "cpu".to_string(),
                    Quantity::from_millis((cpu * 1000.0).round() as i64),
                );
            }
            if let Some(memory) = limits.memory_in_gb {
                list.insert(
                    "memory".to_string(),
                    Quantity::from_value((memory * 1e9).round() as i64),
                );
            }
            resources.limits = Some(list);
        }

        containers.push(Container {
            name: container.name.clone(),
            image: properties.image.clone(),
            command: properties.command.clone(),
            ports: properties
                .ports
                .iter()
                .map(|port| common::ContainerPort {
                    name: None,
                    container_port: port.port,
                    protocol: port.protocol.clone().unwrap_or_else(|| "TCP".to_string()),
                })
                .collect(),
            resources: Some(resources),
            ..Default::default()
        });
    }

    let status = pod_status_from_container_group(container_group, internal_ip)?;

    Ok(Some(Pod {
        api_version: "v1".to_string(),
        kind: "Pod".to_string(),
        metadata: ObjectMeta {
            name: tags[TAG_POD_NAME].clone(),
            namespace: tags[TAG_NAMESPACE].clone(),
            uid: tags[TAG_UID].clone(),
            creation_timestamp: Some(creation_time_from_tags(tags)),
            ..Default::default()
        },
        spec: PodSpec {
            node_name: tags.get(TAG_NODE_NAME).cloned(),
            containers,
            ..Default::default()
        },
        status,
    }))
}
