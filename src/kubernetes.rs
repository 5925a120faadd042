use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::api::DeleteParams;
use kube::runtime::watcher::{Config as WatcherConfig, Event, watcher};
use kube::{Api, Client, ResourceExt, config};
use tracing::info;

use crate::remediation::PodActions;
use crate::types::Notification;
use crate::watcher::PodSource;

/// Build a client from in-cluster service account credentials or the local kubeconfig.
pub async fn connect() -> anyhow::Result<Client> {
    let config = config::Config::infer().await?;
    info!("Connecting to cluster at {}", config.cluster_url);
    let client = Client::try_from(config)?;
    Ok(client)
}

/// Pod change notifications for one namespace, backed by the kube-runtime watcher.
pub struct KubePodSource {
    api: Api<Pod>,
}

impl KubePodSource {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
        }
    }
}

impl PodSource for KubePodSource {
    fn subscribe(&self) -> BoxStream<'static, anyhow::Result<Notification>> {
        watcher(self.api.clone(), WatcherConfig::default())
            .map(|event| event.map(notification_from).map_err(anyhow::Error::from))
            .boxed()
    }
}

/// `Init` is emitted before any request is made, so it is kept apart from
/// events that prove the API server answered.
pub fn notification_from(event: Event<Pod>) -> Notification {
    match event {
        Event::Init => Notification::Started,
        Event::InitDone => Notification::Synced,
        Event::Apply(pod) | Event::InitApply(pod) => Notification::Changed(pod),
        Event::Delete(pod) => Notification::Deleted(pod.name_any()),
    }
}

pub struct KubePodActions {
    client: Client,
}

impl KubePodActions {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PodActions for KubePodActions {
    async fn delete_pod(&self, name: &str, namespace: &str) -> anyhow::Result<()> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }
}
