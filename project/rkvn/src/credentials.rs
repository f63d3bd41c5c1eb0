//! Registry credential resolution from image pull secrets.
//!
//! Pods reference registry credentials through secrets of two legacy
//! encodings: `kubernetes.io/dockercfg` (a bare server-to-auth map) and
//! `kubernetes.io/dockerconfigjson` (the same map nested under `auths`).
//! Both reduce to [`AuthConfig`] entries, which carry either an explicit
//! username/password pair or a base64 `user:pass` blob in `auth`.

use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose};
use serde::Deserialize;
use tracing::debug;

use common::{Pod, Secret};

use crate::aci::ImageRegistryCredential;
use crate::error::ProviderError;
use crate::listers::SecretLister;

pub const SECRET_TYPE_DOCKERCFG: &str = "kubernetes.io/dockercfg";
pub const SECRET_TYPE_DOCKER_CONFIG_JSON: &str = "kubernetes.io/dockerconfigjson";

pub const DOCKERCFG_KEY: &str = ".dockercfg";
pub const DOCKER_CONFIG_JSON_KEY: &str = ".dockerconfigjson";

/// One server entry of a docker config, in either encoding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub auth: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "identitytoken", default)]
    pub identity_token: String,
}

/// Resolves every image pull secret referenced by the pod into registry
/// credentials for the container group submission.
pub async fn get_image_pull_secrets(
    pod: &Pod,
    secrets: &dyn SecretLister,
) -> Result<Vec<ImageRegistryCredential>, ProviderError> {
    let mut credentials = Vec::with_capacity(pod.spec.image_pull_secrets.len());

    for reference in &pod.spec.image_pull_secrets {
        let secret = secrets
            .get(&pod.metadata.namespace, &reference.name)
            .await
            .map_err(ProviderError::Remote)?
            .ok_or_else(|| ProviderError::Auth("error getting image pull secret".to_string()))?;

        debug!(
            secret = %reference.name,
            namespace = %pod.metadata.namespace,
            secret_type = %secret.secret_type,
            "[Credentials] Resolving image pull secret"
        );

        match secret.secret_type.as_str() {
            SECRET_TYPE_DOCKERCFG => read_dockercfg_secret(&secret, &mut credentials)?,
            SECRET_TYPE_DOCKER_CONFIG_JSON => {
                read_docker_config_json_secret(&secret, &mut credentials)?
            }
            _ => {
                return Err(ProviderError::Auth(format!(
                    "image pull secret type is not one of {SECRET_TYPE_DOCKERCFG} or {SECRET_TYPE_DOCKER_CONFIG_JSON}"
                )));
            }
        }
    }

    Ok(credentials)
}

fn read_dockercfg_secret(
    secret: &Secret,
    credentials: &mut Vec<ImageRegistryCredential>,
) -> Result<(), ProviderError> {
    let data = secret
        .data
        .get(DOCKERCFG_KEY)
        .filter(|data| !data.is_empty())
        .ok_or_else(|| ProviderError::Auth("no dockercfg present in secret".to_string()))?;

    let entries: BTreeMap<String, AuthConfig> = serde_json::from_slice(data)
        .map_err(|err| ProviderError::Auth(format!("malformed dockercfg in secret: {err}")))?;

    for (server, entry) in &entries {
        credentials.push(make_registry_credential(server, entry)?);
    }
    Ok(())
}

fn read_docker_config_json_secret(
    secret: &Secret,
    credentials: &mut Vec<ImageRegistryCredential>,
) -> Result<(), ProviderError> {
    let data = secret
        .data
        .get(DOCKER_CONFIG_JSON_KEY)
        .filter(|data| !data.is_empty())
        .ok_or_else(|| ProviderError::Auth("no dockerconfigjson present in secret".to_string()))?;

    let parsed: serde_json::Value = serde_json::from_slice(data).map_err(|err| {
        ProviderError::Auth(format!("malformed dockerconfigjson in secret: {err}"))
    })?;
    let auths = parsed
        .get("auths")
        .and_then(|value| value.as_object())
        .ok_or_else(|| ProviderError::Auth("malformed dockerconfigjson in secret".to_string()))?;

    for (server, value) in auths {
        let entry: AuthConfig = serde_json::from_value(value.clone()).map_err(|err| {
            ProviderError::Auth(format!("malformed dockerconfigjson in secret: {err}"))
        })?;
        credentials.push(make_registry_credential_from_docker_config(server, &entry)?);
    }
    Ok(())
}

/// Builds a registry credential from an [`AuthConfig`]. The explicit
/// username wins; otherwise the base64 `auth` blob decodes to `user:pass`.
pub fn make_registry_credential(
    server: &str,
    auth_config: &AuthConfig,
) -> Result<ImageRegistryCredential, ProviderError> {
    let (username, password) = if !auth_config.username.is_empty() {
        (auth_config.username.clone(), auth_config.password.clone())
    } else {
        if auth_config.auth.is_empty() {
            return Err(ProviderError::Auth(format!(
                "no username present in auth config for server: {server}"
            )));
        }
        decode_auth_pair(&auth_config.auth).map_err(|err| match err {
            AuthDecodeError::Decode(message) => ProviderError::Auth(format!(
                "error decoding the auth for server: {server} Error: {message}"
            )),
            AuthDecodeError::Malformed => {
                ProviderError::Auth(format!("malformed auth for server: {server}"))
            }
        })?
    };

    Ok(ImageRegistryCredential {
        server: server.to_string(),
        username,
        password,
        identity: None,
    })
}

/// Builds a registry credential from a docker-config entry. The username is
/// mandatory here; a missing password falls back to the `auth` blob, with
/// decode failures reported under the docker-auth prefix.
pub fn make_registry_credential_from_docker_config(
    server: &str,
    config_entry: &AuthConfig,
) -> Result<ImageRegistryCredential, ProviderError> {
    if config_entry.username.is_empty() {
        return Err(ProviderError::Auth(format!(
            "no username present in auth config for server: {server}"
        )));
    }

    let mut password = config_entry.password.clone();
    if password.is_empty() {
        let (_, decoded_password) = decode_auth_pair(&config_entry.auth).map_err(|err| {
            ProviderError::Auth(format!("error decoding docker auth for server: {server} Error: {err}"))
        })?;
        password = decoded_password;
    }

    Ok(ImageRegistryCredential {
        server: server.to_string(),
        username: config_entry.username.clone(),
        password,
        identity: None,
    })
}

#[derive(Debug)]
enum AuthDecodeError {
    Decode(String),
    Malformed,
}

impl std::fmt::Display for AuthDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthDecodeError::Decode(message) => f.write_str(message),
            AuthDecodeError::Malformed => f.write_str("auth is not of the form user:password"),
        }
    }
}

fn decode_auth_pair(auth: &str) -> Result<(String, String), AuthDecodeError> {
    let decoded = general_purpose::STANDARD
        .decode(auth)
        .map_err(|err| AuthDecodeError::Decode(err.to_string()))?;
    let decoded = String::from_utf8(decoded).map_err(|err| AuthDecodeError::Decode(err.to_string()))?;
    match decoded.split_once(':') {
        Some((username, password)) => Ok((username.to_string(), password.to_string())),
        None => Err(AuthDecodeError::Malformed),
    }
}
