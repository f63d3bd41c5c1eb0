//! Asynchronous reconciliation of tracked pods against the remote service.
//!
//! [`PodsTracker`] owns the only long-lived task in the provider. On each
//! tick it lists local pods, reconciles every pod registered for this node
//! against the observed container group, and pushes the projected status
//! through the update callback. A not-found from the service is the signal
//! that the group was deleted out from under the orchestrator; the tracker
//! answers with a synthesized terminated state instead of an error.
//!
//! The facade registers a pod only after a successful submission and
//! deregisters it after deletion, so the tracker never observes a group
//! racing its own creation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use common::{ContainerState, Pod, PodPhase, PodStatus};

use crate::client::CcsClient;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::listers::PodLister;
use crate::status::pod_status_from_container_group;

pub const STATUS_REASON_POD_DELETED: &str = "NotFound";
pub const STATUS_MESSAGE_POD_DELETED: &str = "Pod was deleted";

const DEFAULT_TRACKING_INTERVAL: Duration = Duration::from_secs(5);

/// Callback through which the tracker pushes updated pods back to the
/// orchestrator. A narrow capability rather than the whole facade, so the
/// facade can hold the tracker without a reference cycle.
pub type UpdateCallback = Arc<dyn Fn(Pod) + Send + Sync>;

pub struct PodsTracker {
    state: Arc<State>,
    interval: Duration,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
}

struct State {
    pods: Arc<dyn PodLister>,
    client: Arc<dyn CcsClient>,
    config: ProviderConfig,
    update_cb: UpdateCallback,
    tracked: DashMap<String, ()>,
}

impl PodsTracker {
    pub fn new(
        pods: Arc<dyn PodLister>,
        client: Arc<dyn CcsClient>,
        config: ProviderConfig,
        update_cb: UpdateCallback,
    ) -> Self {
        Self {
            state: Arc::new(State {
                pods,
                client,
                config,
                update_cb,
                tracked: DashMap::new(),
            }),
            interval: DEFAULT_TRACKING_INTERVAL,
            loop_handle: Mutex::new(None),
            stop_tx: Mutex::new(None),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Starts the reconcile loop as a background task. Calling `run` on a
    /// tracker that is already running is ignored.
    pub fn run(&self) {
        let mut handle_guard = self.loop_handle.lock().unwrap();
        if let Some(handle) = handle_guard.as_ref() {
            if !handle.is_finished() {
                warn!("[PodsTracker] run() called while already running; ignoring.");
                return;
            }
        }

        let (stop_tx, mut stop_rx) = oneshot::channel();
        *self.stop_tx.lock().unwrap() = Some(stop_tx);

        let state = self.state.clone();
        let interval = self.interval;
        debug!(
            interval_ms = interval.as_millis() as u64,
            "[PodsTracker] Starting reconcile loop"
        );
        *handle_guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        process_pods_updates(&state).await;
                    }
                    _ = &mut stop_rx => {
                        debug!("[PodsTracker] Received stop signal, exiting reconcile loop");
                        break;
                    }
                }
            }
        }));
    }

    /// Stops the reconcile loop. Safe to call repeatedly.
    pub fn stop(&self) {
        if let Some(stop_tx) = self.stop_tx.lock().unwrap().take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.loop_handle.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Registers a pod for reconciliation. The facade calls this only
    /// after the container group was successfully submitted.
    pub fn register(&self, namespace: &str, name: &str) {
        self.state.tracked.insert(pod_key(namespace, name), ());
    }

    /// Removes a pod from reconciliation after deletion.
    pub fn deregister(&self, namespace: &str, name: &str) {
        self.state.tracked.remove(&pod_key(namespace, name));
    }

    pub fn is_tracking(&self, namespace: &str, name: &str) -> bool {
        self.state.tracked.contains_key(&pod_key(namespace, name))
    }

    /// Applies `update` to the pod's status and pushes the mutated pod
    /// through the update callback. Used by the facade to surface the
    /// terminated state after a successful delete.
    pub async fn update_pod_status(
        &self,
        namespace: &str,
        name: &str,
        update: impl FnOnce(&mut PodStatus),
    ) -> anyhow::Result<()> {
        let pod = self.state.pods.get(namespace, name).await?;
        let Some(mut pod) = pod else {
            anyhow::bail!("pod {namespace}/{name} was not found in the lister");
        };
        update(&mut pod.status);
        (self.state.update_cb)(pod);
        Ok(())
    }
}

impl Drop for PodsTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One reconcile pass over every tracked pod on this node. Cancellation is
/// cooperative: dropping the loop task cancels the pass between pods.
async fn process_pods_updates(state: &Arc<State>) {
    let pods = match state.pods.list().await {
        Ok(pods) => pods,
        Err(err) => {
            warn!("[PodsTracker] Failed to list pods: {err:#}");
            return;
        }
    };

    for pod in pods {
        if pod.spec.node_name.as_deref() != Some(state.config.node_name.as_str()) {
            continue;
        }
        let key = pod_key(&pod.metadata.namespace, &pod.metadata.name);
        if !state.tracked.contains_key(&key) {
            continue;
        }
        if should_skip_pod_status_update(&pod) {
            continue;
        }
        process_pod_update(state, pod).await;
    }
}

async fn process_pod_update(state: &Arc<State>, mut pod: Pod) {
    match fetch_pod_status(state, &pod).await {
        Ok(status) => {
            debug!(
                pod = %pod.metadata.name,
                namespace = %pod.metadata.namespace,
                phase = ?status.phase,
                "[PodsTracker] Reconciled pod against remote container group"
            );
            pod.status = status;
            (state.update_cb)(pod);
        }
        Err(err) if err.is_not_found() => {
            debug!(
                pod = %pod.metadata.name,
                namespace = %pod.metadata.namespace,
                "[PodsTracker] Container group was deleted remotely; marking pod terminated"
            );
            terminate_container_statuses(&mut pod.status, state.config.pod_deleted_exit_code);
            (state.update_cb)(pod);
        }
        Err(err) => {
            warn!(
                pod = %pod.metadata.name,
                namespace = %pod.metadata.namespace,
                "[PodsTracker] Failed to reconcile pod: {err}"
            );
        }
    }
}

async fn fetch_pod_status(state: &Arc<State>, pod: &Pod) -> Result<PodStatus, ProviderError> {
    let container_group = state
        .client
        .get_container_group_info(
            &state.config.resource_group,
            &pod.metadata.namespace,
            &pod.metadata.name,
            &state.config.node_name,
        )
        .await?;
    pod_status_from_container_group(&container_group, &state.config.internal_ip)
}

fn pod_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

fn should_skip_pod_status_update(pod: &Pod) -> bool {
    matches!(pod.status.phase, PodPhase::Succeeded | PodPhase::Failed)
        || pod.metadata.deletion_timestamp.is_some()
}

/// Flips every container that has not already terminated into the
/// pod-deleted terminated state, preserving the start time of containers
/// that were running.
pub fn terminate_container_statuses(status: &mut PodStatus, exit_code: i32) {
    let now = Utc::now();
    for container_status in &mut status.container_statuses {
        let started_at = match &container_status.state {
            Some(ContainerState::Terminated { .. }) => continue,
            Some(ContainerState::Running { started_at }) => *started_at,
            _ => None,
        };
        container_status.state = Some(ContainerState::Terminated {
            exit_code,
            signal: None,
            reason: Some(STATUS_REASON_POD_DELETED.to_string()),
            message: Some(STATUS_MESSAGE_POD_DELETED.to_string()),
            started_at,
            finished_at: Some(now),
        });
        container_status.ready = false;
    }
}

#[cfg(test)]
mod tests {
    use common::ContainerStatus;

    use super::*;

    fn running_status(name: &str) -> ContainerStatus {
        ContainerStatus {
            name: name.to_string(),
            ready: true,
            state: Some(ContainerState::Running {
                started_at: Some(Utc::now()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn terminate_flips_running_containers() {
        let mut status = PodStatus {
            container_statuses: vec![running_status("app"), running_status("sidecar")],
            ..Default::default()
        };

        terminate_container_statuses(&mut status, 0);

        for container_status in &status.container_statuses {
            assert!(!container_status.ready);
            match container_status.state.as_ref().unwrap() {
                ContainerState::Terminated {
                    exit_code,
                    reason,
                    message,
                    started_at,
                    finished_at,
                    ..
                } => {
                    assert_eq!(*exit_code, 0);
                    assert_eq!(reason.as_deref(), Some(STATUS_REASON_POD_DELETED));
                    assert_eq!(message.as_deref(), Some(STATUS_MESSAGE_POD_DELETED));
                    assert!(started_at.is_some());
                    assert!(finished_at.is_some());
                }
                state => panic!("unexpected container state: {state:?}"),
            }
        }
    }

    #[test]
    fn terminate_leaves_already_terminated_containers_alone() {
        let terminated = ContainerState::Terminated {
            exit_code: 7,
            signal: None,
            reason: Some("Error".to_string()),
            message: None,
            started_at: None,
            finished_at: None,
        };
        let mut status = PodStatus {
            container_statuses: vec![ContainerStatus {
                name: "app".to_string(),
                state: Some(terminated.clone()),
                ..Default::default()
            }],
            ..Default::default()
        };

        terminate_container_statuses(&mut status, 0);
        assert_eq!(status.container_statuses[0].state, Some(terminated));
    }

    #[test]
    fn skips_terminal_and_deleting_pods() {
        let mut pod = Pod::default();
        assert!(!should_skip_pod_status_update(&pod));
        pod.status.phase = PodPhase::Succeeded;
        assert!(should_skip_pod_status_update(&pod));
        pod.status.phase = PodPhase::Running;
        pod.metadata.deletion_timestamp = Some(Utc::now());
        assert!(should_skip_pod_status_update(&pod));
    }
}
