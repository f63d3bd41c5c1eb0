//! Volume and volume-mount translation.
//!
//! Secret and config-map volumes materialize as remote secret volumes with
//! base64-encoded payloads, resolved through the injected listers.
//! Projected volumes flatten their secret and config-map sources into one
//! payload. Anything outside the supported set aborts the build with a
//! descriptive error.

use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose};

use common::{Pod, VolumeMount};

use crate::aci;
use crate::error::ProviderError;
use crate::listers::{ConfigMapLister, SecretLister};

const AZURE_FILE_ACCOUNT_NAME_KEY: &str = "azurestorageaccountname";
const AZURE_FILE_ACCOUNT_KEY_KEY: &str = "azurestorageaccountkey";

pub fn map_volume_mount(mount: &VolumeMount) -> aci::VolumeMount {
    aci::VolumeMount {
        name: mount.name.clone(),
        mount_path: mount.mount_path.clone(),
        read_only: Some(mount.read_only),
    }
}

/// Maps every volume of the pod onto the remote volume list, in order.
pub async fn map_volumes(
    pod: &Pod,
    secrets: &dyn SecretLister,
    config_maps: &dyn ConfigMapLister,
) -> Result<Vec<aci::Volume>, ProviderError> {
    let mut volumes = Vec::with_capacity(pod.spec.volumes.len());

    for volume in &pod.spec.volumes {
        let mapped = if volume.empty_dir.is_some() {
            aci::Volume {
                name: volume.name.clone(),
                empty_dir: Some(aci::EmptyDirVolume {}),
                ..Default::default()
            }
        } else if let Some(git_repo) = &volume.git_repo {
            aci::Volume {
                name: volume.name.clone(),
                git_repo: Some(aci::GitRepoVolume {
                    repository: git_repo.repository.clone(),
                    directory: git_repo.directory.clone(),
                    revision: git_repo.revision.clone(),
                }),
                ..Default::default()
            }
        } else if let Some(source) = &volume.secret {
            let payload =
                secret_payload(pod, &source.secret_name, &volume.name, secrets).await?;
            aci::Volume {
                name: volume.name.clone(),
                secret: Some(payload),
                ..Default::default()
            }
        } else if let Some(source) = &volume.config_map {
            let payload = config_map_payload(pod, &source.name, &volume.name, config_maps).await?;
            aci::Volume {
                name: volume.name.clone(),
                secret: Some(payload),
                ..Default::default()
            }
        } else if let Some(projected) = &volume.projected {
            let mut payload = BTreeMap::new();
            for source in &projected.sources {
                if let Some(secret_source) = &source.secret {
                    payload.extend(
                        secret_payload(pod, &secret_source.secret_name, &volume.name, secrets)
                            .await?,
                    );
                }
                if let Some(config_map_source) = &source.config_map {
                    payload.extend(
                        config_map_payload(pod, &config_map_source.name, &volume.name, config_maps)
                            .await?,
                    );
                }
            }
            aci::Volume {
                name: volume.name.clone(),
                secret: Some(payload),
                ..Default::default()
            }
        } else if let Some(azure_file) = &volume.azure_file {
            let secret = secrets
                .get(&pod.metadata.namespace, &azure_file.secret_name)
                .await
                .map_err(ProviderError::Remote)?
                .ok_or_else(|| {
                    ProviderError::Validation(format!(
                        "azure file volume {} requires secret {} which was not found",
                        volume.name, azure_file.secret_name
                    ))
                })?;
            let account_name = string_key(&secret, AZURE_FILE_ACCOUNT_NAME_KEY, &volume.name)?;
            let account_key = string_key(&secret, AZURE_FILE_ACCOUNT_KEY_KEY, &volume.name)?;
            aci::Volume {
                name: volume.name.clone(),
                azure_file: Some(aci::AzureFileVolume {
                    share_name: azure_file.share_name.clone(),
                    storage_account_name: account_name,
                    storage_account_key: Some(account_key),
                    read_only: Some(azure_file.read_only),
                }),
                ..Default::default()
            }
        } else {
            return Err(ProviderError::Validation(format!(
                "pod {} requires volume {} which is of an unsupported type",
                pod.metadata.name, volume.name
            )));
        };

        volumes.push(mapped);
    }

    Ok(volumes)
}

async fn secret_payload(
    pod: &Pod,
    secret_name: &str,
    volume_name: &str,
    secrets: &dyn SecretLister,
) -> Result<BTreeMap<String, String>, ProviderError> {
    let secret = secrets
        .get(&pod.metadata.namespace, secret_name)
        .await
        .map_err(ProviderError::Remote)?
        .ok_or_else(|| {
            ProviderError::Validation(format!(
                "volume {volume_name} requires secret {secret_name} which was not found"
            ))
        })?;
    Ok(secret
        .data
        .iter()
        .map(|(key, value)| (key.clone(), general_purpose::STANDARD.encode(value)))
        .collect())
}

async fn config_map_payload(
    pod: &Pod,
    config_map_name: &str,
    volume_name: &str,
    config_maps: &dyn ConfigMapLister,
) -> Result<BTreeMap<String, String>, ProviderError> {
    let config_map = config_maps
        .get(&pod.metadata.namespace, config_map_name)
        .await
        .map_err(ProviderError::Remote)?
        .ok_or_else(|| {
            ProviderError::Validation(format!(
                "volume {volume_name} requires config map {config_map_name} which was not found"
            ))
        })?;
    Ok(config_map
        .data
        .iter()
        .map(|(key, value)| (key.clone(), general_purpose::STANDARD.encode(value.as_bytes())))
        .collect())
}

fn string_key(
    secret: &common::Secret,
    key: &str,
    volume_name: &str,
) -> Result<String, ProviderError> {
    let value = secret.data.get(key).ok_or_else(|| {
        ProviderError::Validation(format!(
            "secret for azure file volume {volume_name} is missing key {key}"
        ))
    })?;
    String::from_utf8(value.clone()).map_err(|_| {
        ProviderError::Validation(format!(
            "secret key {key} for azure file volume {volume_name} is not valid UTF-8"
        ))
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use common::{
        AzureFileVolumeSource, ConfigMap, ConfigMapVolumeSource, EmptyDirVolumeSource, ObjectMeta,
        PodSpec, ProjectedVolumeSource, Secret, SecretVolumeSource, Volume, VolumeProjection,
    };

    use super::*;

    struct FakeSecrets(Vec<Secret>);

    #[async_trait]
    impl SecretLister for FakeSecrets {
        async fn get(&self, _namespace: &str, name: &str) -> anyhow::Result<Option<Secret>> {
            Ok(self.0.iter().find(|secret| secret.metadata.name == name).cloned())
        }
    }

    struct FakeConfigMaps(Vec<ConfigMap>);

    #[async_trait]
    impl ConfigMapLister for FakeConfigMaps {
        async fn get(&self, _namespace: &str, name: &str) -> anyhow::Result<Option<ConfigMap>> {
            Ok(self
                .0
                .iter()
                .find(|config_map| config_map.metadata.name == name)
                .cloned())
        }
    }

    fn pod_with_volumes(volumes: Vec<Volume>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: "pod".to_string(),
                namespace: "default".to_string(),
                ..Default::default()
            },
            spec: PodSpec {
                volumes,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn named_secret(name: &str, entries: &[(&str, &str)]) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: "default".to_string(),
                ..Default::default()
            },
            data: entries
                .iter()
                .map(|(key, value)| (key.to_string(), value.as_bytes().to_vec()))
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_dir_volume_maps() {
        let pod = pod_with_volumes(vec![Volume {
            name: "scratch".to_string(),
            empty_dir: Some(EmptyDirVolumeSource {}),
            ..Default::default()
        }]);
        let volumes = map_volumes(&pod, &FakeSecrets(vec![]), &FakeConfigMaps(vec![]))
            .await
            .unwrap();
        assert_eq!(volumes.len(), 1);
        assert!(volumes[0].empty_dir.is_some());
    }

    #[tokio::test]
    async fn secret_volume_encodes_payload() {
        let pod = pod_with_volumes(vec![Volume {
            name: "creds".to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: "db-creds".to_string(),
            }),
            ..Default::default()
        }]);
        let secrets = FakeSecrets(vec![named_secret("db-creds", &[("password", "hunter2")])]);

        let volumes = map_volumes(&pod, &secrets, &FakeConfigMaps(vec![])).await.unwrap();
        let payload = volumes[0].secret.as_ref().unwrap();
        assert_eq!(
            payload["password"],
            general_purpose::STANDARD.encode("hunter2")
        );
    }

    #[tokio::test]
    async fn config_map_volume_encodes_payload() {
        let pod = pod_with_volumes(vec![Volume {
            name: "settings".to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: "app-settings".to_string(),
            }),
            ..Default::default()
        }]);
        let config_maps = FakeConfigMaps(vec![ConfigMap {
            metadata: ObjectMeta {
                name: "app-settings".to_string(),
                ..Default::default()
            },
            data: BTreeMap::from([("mode".to_string(), "fast".to_string())]),
        }]);

        let volumes = map_volumes(&pod, &FakeSecrets(vec![]), &config_maps).await.unwrap();
        let payload = volumes[0].secret.as_ref().unwrap();
        assert_eq!(payload["mode"], general_purpose::STANDARD.encode("fast"));
    }

    #[tokio::test]
    async fn projected_volume_flattens_sources() {
        let pod = pod_with_volumes(vec![Volume {
            name: "projected".to_string(),
            projected: Some(ProjectedVolumeSource {
                sources: vec![
                    VolumeProjection {
                        secret: Some(SecretVolumeSource {
                            secret_name: "token".to_string(),
                        }),
                        ..Default::default()
                    },
                    VolumeProjection {
                        config_map: Some(ConfigMapVolumeSource {
                            name: "ca".to_string(),
                        }),
                        ..Default::default()
                    },
                ],
            }),
            ..Default::default()
        }]);
        let secrets = FakeSecrets(vec![named_secret("token", &[("token", "abc")])]);
        let config_maps = FakeConfigMaps(vec![ConfigMap {
            metadata: ObjectMeta {
                name: "ca".to_string(),
                ..Default::default()
            },
            data: BTreeMap::from([("ca.crt".to_string(), "pem".to_string())]),
        }]);

        let volumes = map_volumes(&pod, &secrets, &config_maps).await.unwrap();
        let payload = volumes[0].secret.as_ref().unwrap();
        assert_eq!(payload.len(), 2);
        assert!(payload.contains_key("token"));
        assert!(payload.contains_key("ca.crt"));
    }

    #[tokio::test]
    async fn azure_file_volume_reads_account_from_secret() {
        let pod = pod_with_volumes(vec![Volume {
            name: "share".to_string(),
            azure_file: Some(AzureFileVolumeSource {
                share_name: "files".to_string(),
                secret_name: "storage".to_string(),
                read_only: true,
            }),
            ..Default::default()
        }]);
        let secrets = FakeSecrets(vec![named_secret(
            "storage",
            &[
                (AZURE_FILE_ACCOUNT_NAME_KEY, "account"),
                (AZURE_FILE_ACCOUNT_KEY_KEY, "key"),
            ],
        )]);

        let volumes = map_volumes(&pod, &secrets, &FakeConfigMaps(vec![])).await.unwrap();
        let azure_file = volumes[0].azure_file.as_ref().unwrap();
        assert_eq!(azure_file.share_name, "files");
        assert_eq!(azure_file.storage_account_name, "account");
        assert_eq!(azure_file.read_only, Some(true));
    }

    #[tokio::test]
    async fn unsupported_volume_type_fails() {
        let pod = pod_with_volumes(vec![Volume {
            name: "mystery".to_string(),
            ..Default::default()
        }]);
        let err = map_volumes(&pod, &FakeSecrets(vec![]), &FakeConfigMaps(vec![]))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "pod pod requires volume mystery which is of an unsupported type"
        );
    }

    #[tokio::test]
    async fn secret_volume_with_missing_secret_fails() {
        let pod = pod_with_volumes(vec![Volume {
            name: "creds".to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: "db-creds".to_string(),
            }),
            ..Default::default()
        }]);
        let err = map_volumes(&pod, &FakeSecrets(vec![]), &FakeConfigMaps(vec![]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("requires secret db-creds"));
    }
}
