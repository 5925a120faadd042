/// What one watch notification says about a pod.
#[derive(Debug, Clone, PartialEq)]
pub struct PodObservation {
    pub pod_name: String,
    pub namespace: String,
    pub container_reasons: Vec<String>,
}

/// Connection state of the pod watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Streaming,
    Retrying,
}

/// One item of a pod watch subscription.
#[derive(Debug, Clone)]
pub enum Notification {
    /// The subscription opened. Nothing has been heard from the API server yet.
    Started,
    /// The initial list finished.
    Synced,
    /// A pod was added or changed.
    Changed(k8s_openapi::api::core::v1::Pod),
    /// A pod went away.
    Deleted(String),
}

impl Notification {
    /// Whether the API server actually answered.
    pub fn is_from_server(&self) -> bool {
        !matches!(self, Notification::Started)
    }
}
