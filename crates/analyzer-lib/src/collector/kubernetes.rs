//! Kubernetes-backed cluster listing

use super::ClusterApi;
use crate::error::{CollectError, CollectResult};
use crate::models::{ContainerResources, ContainerSpec, PodResources, RawResourceList};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, Namespace, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, ResourceExt};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::PathBuf;
use tracing::{debug, info};

/// Objects requested per list call
const PAGE_SIZE: u32 = 500;

/// Where cluster credentials come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterSource {
    /// A kubeconfig file, using `context` or the file's current context
    Kubeconfig {
        path: PathBuf,
        context: Option<String>,
    },
    /// The service account of the pod this process runs in
    InCluster,
}

/// [`ClusterApi`] implementation on top of a kube-rs client
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the given credentials source
    pub async fn connect(source: &ClusterSource) -> CollectResult<Self> {
        let config = match source {
            ClusterSource::Kubeconfig { path, context } => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    CollectError::Setup(format!("cannot load kubeconfig {}: {}", path.display(), e))
                })?;
                let options = KubeConfigOptions {
                    context: context.clone(),
                    ..Default::default()
                };
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| CollectError::Setup(format!("create rest config: {}", e)))?
            }
            ClusterSource::InCluster => Config::incluster()
                .map_err(|e| CollectError::Setup(format!("in-cluster config: {}", e)))?,
        };

        info!(cluster_url = %config.cluster_url, "Connecting to cluster");
        let client = Client::try_from(config)
            .map_err(|e| CollectError::Setup(format!("create client: {}", e)))?;

        Ok(Self::new(client))
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list_namespaces(&self) -> CollectResult<Vec<String>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespaces = list_all(&api)
            .await
            .map_err(|e| CollectError::ListNamespaces(e.to_string()))?;

        Ok(namespaces.iter().map(|ns| ns.name_any()).collect())
    }

    async fn list_pods(&self, namespace: &str) -> CollectResult<Vec<PodResources>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = list_all(&api).await.map_err(|e| CollectError::ListPods {
            namespace: namespace.to_string(),
            message: e.to_string(),
        })?;

        Ok(pods.into_iter().map(pod_resources).collect())
    }
}

/// List every object, following continue tokens
async fn list_all<K>(api: &Api<K>) -> Result<Vec<K>, kube::Error>
where
    K: Clone + DeserializeOwned + Debug,
{
    let mut items = Vec::new();
    let mut params = ListParams::default().limit(PAGE_SIZE);

    loop {
        let page = api.list(&params).await?;
        items.extend(page.items);

        match page.metadata.continue_ {
            Some(token) if !token.is_empty() => {
                debug!(fetched = items.len(), "Fetching next page");
                params = params.continue_token(&token);
            }
            _ => break,
        }
    }

    Ok(items)
}

fn pod_resources(pod: Pod) -> PodResources {
    let name = pod.name_any();
    let containers = pod
        .spec
        .map(|spec| spec.containers)
        .unwrap_or_default()
        .into_iter()
        .map(container_spec)
        .collect();

    PodResources { name, containers }
}

fn container_spec(container: Container) -> ContainerSpec {
    let resources = container.resources.unwrap_or_default();
    ContainerSpec {
        name: container.name,
        image: container.image.unwrap_or_default(),
        resources: ContainerResources {
            limits: raw_list(resources.limits),
            requests: raw_list(resources.requests),
        },
    }
}

fn raw_list(list: Option<BTreeMap<String, Quantity>>) -> RawResourceList {
    list.unwrap_or_default()
        .into_iter()
        .map(|(name, quantity)| (name, quantity.0))
        .collect()
}
