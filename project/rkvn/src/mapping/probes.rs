//! Probe translation.
//!
//! The remote schema takes exactly one of an exec action and an HTTP GET,
//! and only numeric ports. Named ports resolve against the enclosing
//! container's port list before submission.

use common::{ContainerPort, PortValue, Probe};

use crate::aci;
use crate::error::ProviderError;

/// Maps a pod probe onto the remote probe record, resolving named HTTP
/// ports against `ports`.
pub fn map_probe(probe: &Probe, ports: &[ContainerPort]) -> Result<aci::ContainerProbe, ProviderError> {
    if probe.exec.is_some() && probe.http_get.is_some() {
        return Err(ProviderError::Validation(
            "probe may not specify more than one of \"exec\" and \"httpGet\"".to_string(),
        ));
    }
    if probe.exec.is_none() && probe.http_get.is_none() {
        return Err(ProviderError::Validation(
            "probe must specify one of \"exec\" and \"httpGet\"".to_string(),
        ));
    }

    let exec = probe.exec.as_ref().map(|action| aci::ContainerExec {
        command: action.command.clone(),
    });

    let http_get = match &probe.http_get {
        Some(action) => {
            let port = match &action.port {
                PortValue::Number(number) => *number,
                PortValue::Name(name) => resolve_named_port(name, ports)?,
            };
            Some(aci::ContainerHttpGet {
                path: action.path.clone(),
                port,
                scheme: action.scheme.clone(),
            })
        }
        None => None,
    };

    Ok(aci::ContainerProbe {
        exec,
        http_get,
        initial_delay_seconds: Some(probe.initial_delay_seconds),
        period_seconds: Some(probe.period_seconds),
        timeout_seconds: Some(probe.timeout_seconds),
        success_threshold: Some(probe.success_threshold),
        failure_threshold: Some(probe.failure_threshold),
    })
}

fn resolve_named_port(name: &str, ports: &[ContainerPort]) -> Result<i32, ProviderError> {
    ports
        .iter()
        .find(|port| port.name.as_deref() == Some(name))
        .map(|port| port.container_port)
        .ok_or_else(|| ProviderError::Validation(format!("unable to find named port: {name}")))
}
