use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::classifier::{is_actionable, observe};
use crate::events::EventLog;
use crate::remediation::RemediationEngine;
use crate::types::{ConnectionState, Notification};

pub const INITIAL_BACKOFF_SECS: u64 = 1;
pub const MAX_BACKOFF_SECS: u64 = 60;

/// A subscription to pod change notifications. An `Err` item ends the subscription.
pub trait PodSource: Send + Sync {
    fn subscribe(&self) -> BoxStream<'static, anyhow::Result<Notification>>;
}

/// Reconnect state of the watcher.
#[derive(Debug, Clone)]
pub struct WatchSession {
    state: ConnectionState,
    backoff_seconds: u64,
}

impl WatchSession {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            backoff_seconds: INITIAL_BACKOFF_SECS,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn backoff_seconds(&self) -> u64 {
        self.backoff_seconds
    }

    fn subscribed(&mut self) {
        self.state = ConnectionState::Streaming;
    }

    fn notification_received(&mut self) {
        self.backoff_seconds = INITIAL_BACKOFF_SECS;
    }

    /// Enter `Retrying` and return how long to wait before resubscribing.
    fn stream_failed(&mut self) -> Duration {
        self.state = ConnectionState::Retrying;
        let delay = Duration::from_secs(self.backoff_seconds);
        self.backoff_seconds = (self.backoff_seconds * 2).min(MAX_BACKOFF_SECS);
        delay
    }
}

impl Default for WatchSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Watches pods in one namespace and remediates crash-type failures.
pub struct PodWatcher<S> {
    source: S,
    engine: RemediationEngine,
    log: Arc<EventLog>,
    namespace: String,
    session: WatchSession,
}

impl<S: PodSource> PodWatcher<S> {
    pub fn new(source: S, engine: RemediationEngine, log: Arc<EventLog>, namespace: String) -> Self {
        Self {
            source,
            engine,
            log,
            namespace,
            session: WatchSession::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn session(&self) -> &WatchSession {
        &self.session
    }

    /// Watch forever, resubscribing with exponential backoff after each failure.
    pub async fn run(&mut self) {
        self.log
            .append(format!("Starting pod watcher for namespace {}...", self.namespace));

        loop {
            let err = self.stream().await;
            let delay = self.session.stream_failed();
            warn!(
                "Pod watch interrupted in namespace {}: {:#} ({:?}, next backoff {}s)",
                self.namespace,
                err,
                self.session.state(),
                self.session.backoff_seconds()
            );
            self.log.append(format!(
                "Pod watch stream error: {:#}; retrying in {}s",
                err,
                delay.as_secs()
            ));
            tokio::time::sleep(delay).await;
        }
    }

    /// Consume one subscription until it fails or ends.
    async fn stream(&mut self) -> anyhow::Error {
        let mut stream = self.source.subscribe();
        self.session.subscribed();
        debug!("Subscribed to pod changes in namespace {}", self.namespace);

        while let Some(item) = stream.next().await {
            match item {
                Ok(notification) => {
                    if notification.is_from_server() {
                        self.session.notification_received();
                    }
                    self.handle_notification(notification).await;
                }
                Err(e) => return e,
            }
        }
        anyhow::anyhow!("watch stream ended")
    }

    /// Record every actionable reason and delete the pod at most once.
    pub(crate) async fn handle_notification(&self, notification: Notification) {
        let pod = match notification {
            Notification::Changed(pod) => pod,
            // Deleted pods need no remediation.
            Notification::Deleted(name) => {
                debug!("Pod {} deleted", name);
                return;
            }
            Notification::Started | Notification::Synced => return,
        };
        let observation = observe(&pod, &self.namespace);

        let mut applied = false;
        for reason in &observation.container_reasons {
            if !is_actionable(reason) {
                debug!(
                    "Pod {} reports {}; no remediation",
                    observation.pod_name, reason
                );
                continue;
            }

            let suggestion = self.engine.suggest(&observation.pod_name, reason).await;
            self.log.append(format!(
                "Detected crash: {}, reason: {}, suggestion: {}",
                observation.pod_name, reason, suggestion
            ));

            if self.engine.auto_apply() && !applied {
                applied = true;
                self.engine
                    .apply(&observation.pod_name, &observation.namespace)
                    .await;
            }
        }
    }
}
