use k8s_openapi::api::core::v1::{ContainerStatus, Pod};
use kube::ResourceExt;

use crate::types::PodObservation;

/// Container reasons that trigger remediation.
pub const ACTIONABLE_REASONS: [&str; 2] = ["CrashLoopBackOff", "OOMKilled"];

pub fn is_actionable(reason: &str) -> bool {
    ACTIONABLE_REASONS.contains(&reason)
}

/// Collect the reason of each container's current state, in container order.
///
/// A container reports at most one of `waiting` or `terminated`; running
/// containers and states without a reason contribute nothing.
pub fn classify(statuses: &[ContainerStatus]) -> Vec<String> {
    statuses.iter().filter_map(container_reason).collect()
}

fn container_reason(status: &ContainerStatus) -> Option<String> {
    let state = status.state.as_ref()?;
    let reason = if let Some(waiting) = &state.waiting {
        waiting.reason.as_ref()
    } else if let Some(terminated) = &state.terminated {
        terminated.reason.as_ref()
    } else {
        None
    }?;

    (!reason.is_empty()).then(|| reason.clone())
}

/// Build the per-notification view of a pod.
pub fn observe(pod: &Pod, default_namespace: &str) -> PodObservation {
    let container_reasons = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_deref())
        .map(classify)
        .unwrap_or_default();

    PodObservation {
        pod_name: pod.name_any(),
        namespace: pod
            .namespace()
            .unwrap_or_else(|| default_namespace.to_string()),
        container_reasons,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateRunning, ContainerStateTerminated, ContainerStateWaiting,
        ContainerStatus, Pod, PodStatus,
    };
    use kube::api::ObjectMeta;

    pub fn waiting(name: &str, reason: Option<&str>) -> ContainerStatus {
        ContainerStatus {
            name: name.to_string(),
            state: Some(ContainerState {
                waiting: Some(ContainerStateWaiting {
                    reason: reason.map(str::to_string),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn terminated(name: &str, reason: Option<&str>) -> ContainerStatus {
        ContainerStatus {
            name: name.to_string(),
            state: Some(ContainerState {
                terminated: Some(ContainerStateTerminated {
                    reason: reason.map(str::to_string),
                    exit_code: 137,
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn running(name: &str) -> ContainerStatus {
        ContainerStatus {
            name: name.to_string(),
            state: Some(ContainerState {
                running: Some(ContainerStateRunning::default()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn pod(name: &str, statuses: Vec<ContainerStatus>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("boutique".to_string()),
                ..Default::default()
            },
            status: Some(PodStatus {
                container_statuses: Some(statuses),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
