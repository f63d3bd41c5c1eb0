//! Windows-specific post-processing of a built container group.
//!
//! The orchestrator projects a service-account secret volume into every
//! container at a fixed path. The remote Windows runtime rejects that
//! mount, so it is stripped from Windows groups; Linux groups keep it.

use std::collections::HashSet;

use tracing::debug;

use crate::aci::{ContainerGroup, OS_TYPE_WINDOWS};

pub const SERVICE_ACCOUNT_SECRET_MOUNT_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount";

/// Removes the orchestrator-projected service-account secret volume from a
/// Windows container group: both the per-container mounts at the fixed
/// path and the backing entries in the group's volume list. A no-op for
/// any other operating system.
pub fn filter_service_account_secret_volume(operating_system: &str, container_group: &mut ContainerGroup) {
    if !operating_system.eq_ignore_ascii_case(OS_TYPE_WINDOWS) {
        return;
    }

    let mut filtered: HashSet<String> = HashSet::new();
    for container in &mut container_group.properties.containers {
        let Some(properties) = container.properties.as_mut() else {
            continue;
        };
        properties.volume_mounts.retain(|mount| {
            if mount.mount_path == SERVICE_ACCOUNT_SECRET_MOUNT_PATH {
                filtered.insert(mount.name.clone());
                false
            } else {
                true
            }
        });
    }

    if filtered.is_empty() {
        return;
    }

    debug!(
        container_group = %container_group.name,
        volumes = ?filtered,
        "[Mapping] Removed service account secret volume from Windows container group"
    );
    container_group
        .properties
        .volumes
        .retain(|volume| !filtered.contains(&volume.name));
}

#[cfg(test)]
mod tests {
    use crate::aci::{
        Container, ContainerProperties, EmptyDirVolume, OS_TYPE_LINUX, Volume, VolumeMount,
    };

    use super::*;

    fn group_with_mount(mount_path: &str) -> ContainerGroup {
        let mut group = ContainerGroup {
            name: "default-pod".to_string(),
            ..Default::default()
        };
        group.properties.containers = vec![Container {
            name: "app".to_string(),
            properties: Some(ContainerProperties {
                volume_mounts: vec![VolumeMount {
                    name: "sa-token".to_string(),
                    mount_path: mount_path.to_string(),
                    read_only: Some(true),
                }],
                ..Default::default()
            }),
        }];
        group.properties.volumes = vec![
            Volume {
                name: "data".to_string(),
                empty_dir: Some(EmptyDirVolume {}),
                ..Default::default()
            },
            Volume {
                name: "sa-token".to_string(),
                empty_dir: Some(EmptyDirVolume {}),
                ..Default::default()
            },
        ];
        group
    }

    #[test]
    fn windows_filters_service_account_volume() {
        let mut group = group_with_mount(SERVICE_ACCOUNT_SECRET_MOUNT_PATH);
        filter_service_account_secret_volume(OS_TYPE_WINDOWS, &mut group);

        let properties = group.properties.containers[0].properties.as_ref().unwrap();
        assert!(properties.volume_mounts.is_empty());
        assert_eq!(group.properties.volumes.len(), 1);
        assert_eq!(group.properties.volumes[0].name, "data");
    }

    #[test]
    fn windows_keeps_other_mounts() {
        let mut group = group_with_mount("/mnt/azure");
        filter_service_account_secret_volume(OS_TYPE_WINDOWS, &mut group);

        let properties = group.properties.containers[0].properties.as_ref().unwrap();
        assert_eq!(properties.volume_mounts.len(), 1);
        assert_eq!(group.properties.volumes.len(), 2);
    }

    #[test]
    fn linux_keeps_service_account_volume() {
        let mut group = group_with_mount(SERVICE_ACCOUNT_SECRET_MOUNT_PATH);
        filter_service_account_secret_volume(OS_TYPE_LINUX, &mut group);

        let properties = group.properties.containers[0].properties.as_ref().unwrap();
        assert_eq!(properties.volume_mounts.len(), 1);
        assert_eq!(group.properties.volumes.len(), 2);
    }
}
