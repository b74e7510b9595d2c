//! Collection tests against an in-memory cluster

#[cfg(test)]
mod fake_cluster_tests {
    use crate::collector::{collect, ClusterApi, ReportBuilder};
    use crate::error::{CollectError, CollectResult};
    use crate::models::{ContainerResources, ContainerSpec, PodResources};
    use crate::quantity::ResourceQuantity;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    /// Cluster with fixed contents and optional listing failures
    #[derive(Default)]
    struct FakeCluster {
        namespaces: Vec<(String, Vec<PodResources>)>,
        fail_namespaces: bool,
        fail_pods_in: Option<String>,
    }

    impl FakeCluster {
        fn with_namespace(mut self, name: &str, pods: Vec<PodResources>) -> Self {
            self.namespaces.push((name.to_string(), pods));
            self
        }
    }

    #[async_trait]
    impl ClusterApi for FakeCluster {
        async fn list_namespaces(&self) -> CollectResult<Vec<String>> {
            if self.fail_namespaces {
                return Err(CollectError::ListNamespaces("connection refused".to_string()));
            }
            Ok(self.namespaces.iter().map(|(name, _)| name.clone()).collect())
        }

        async fn list_pods(&self, namespace: &str) -> CollectResult<Vec<PodResources>> {
            if self.fail_pods_in.as_deref() == Some(namespace) {
                return Err(CollectError::ListPods {
                    namespace: namespace.to_string(),
                    message: "forbidden".to_string(),
                });
            }
            Ok(self
                .namespaces
                .iter()
                .find(|(name, _)| name == namespace)
                .map(|(_, pods)| pods.clone())
                .unwrap_or_default())
        }
    }

    fn container(image: &str, cpu: &str, memory: &str) -> ContainerSpec {
        let limits: BTreeMap<String, String> = [("cpu", cpu), ("memory", memory)]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ContainerSpec {
            name: image.replace('/', "-").replace(':', "-"),
            image: image.to_string(),
            resources: ContainerResources {
                requests: limits.clone(),
                limits,
            },
        }
    }

    fn pod(name: &str, containers: Vec<ContainerSpec>) -> PodResources {
        PodResources {
            name: name.to_string(),
            containers,
        }
    }

    fn two_container_cluster() -> FakeCluster {
        FakeCluster::default()
            .with_namespace(
                "ns1",
                vec![pod(
                    "pod1",
                    vec![
                        container("imageA", "500m", "256Mi"),
                        container("imageB", "200m", "128Mi"),
                    ],
                )],
            )
            .with_namespace("ns2", vec![])
    }

    #[tokio::test]
    async fn test_end_to_end_two_namespaces() {
        let cluster = two_container_cluster();
        let report = collect(&cluster, "imageB").await.unwrap();

        assert_eq!(report.grand_totals.limits.cpu, ResourceQuantity::millicores(700));
        assert_eq!(report.target_totals.limits.cpu, ResourceQuantity::millicores(200));
        assert_eq!(
            report.grand_totals.limits.memory,
            ResourceQuantity::bytes(384 * 1024 * 1024)
        );
        assert_eq!(report.target_count, 1);
        assert_eq!(report.total_count, 2);

        let ratio = report.ratios().cpu_limits.unwrap();
        assert!((ratio - 200.0 / 700.0).abs() < 1e-9);
        assert!((ratio - 0.2857).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_totals_by_image_and_detail() {
        let cluster = FakeCluster::default()
            .with_namespace(
                "ns1",
                vec![
                    pod("a", vec![container("nginx:1.25", "100m", "64Mi")]),
                    pod("b", vec![container("nginx:1.25", "100m", "64Mi")]),
                ],
            )
            .with_namespace("ns2", vec![pod("c", vec![container("redis:7", "1", "1Gi")])]);

        let report = collect(&cluster, "redis").await.unwrap();

        assert_eq!(report.total_by_image.len(), 2);
        let nginx = &report.total_by_image["nginx:1.25"];
        assert_eq!(nginx.limits.cpu, ResourceQuantity::millicores(200));
        assert_eq!(nginx.requests.memory.to_string(), "128Mi");

        // Every nested level is created on demand
        assert_eq!(report.detail.len(), 2);
        assert_eq!(report.detail["ns1"].len(), 2);
        assert_eq!(report.detail["ns1"]["b"]["nginx:1.25"].limits["cpu"], "100m");
        assert_eq!(report.detail["ns2"]["c"]["redis:7"].requests["memory"], "1Gi");
        assert!(!report.detail.contains_key("ns3"));
    }

    #[tokio::test]
    async fn test_pattern_is_case_sensitive_substring() {
        let cluster = FakeCluster::default().with_namespace(
            "search",
            vec![pod(
                "es",
                vec![
                    container("registry/qbox-docker:6.2.1", "1", "2Gi"),
                    container("registry/QBOX-DOCKER:6.2.1", "1", "2Gi"),
                    container("registry/qbox-docker:6.2.*", "1", "2Gi"),
                ],
            )],
        );

        let report = collect(&cluster, "qbox-docker:6.2.1").await.unwrap();
        assert_eq!(report.target_count, 1);
        assert_eq!(report.total_count, 3);

        // No glob semantics
        let report = collect(&cluster, "qbox-docker:6.2.*").await.unwrap();
        assert_eq!(report.target_count, 1);
    }

    #[tokio::test]
    async fn test_namespace_listing_failure_aborts() {
        let cluster = FakeCluster {
            fail_namespaces: true,
            ..two_container_cluster()
        };

        let err = collect(&cluster, "imageB").await.unwrap_err();
        assert!(matches!(err, CollectError::ListNamespaces(_)));
    }

    #[tokio::test]
    async fn test_pod_listing_failure_in_one_namespace_aborts() {
        let cluster = FakeCluster {
            fail_pods_in: Some("ns2".to_string()),
            ..two_container_cluster()
        };

        let err = collect(&cluster, "imageB").await.unwrap_err();
        match err {
            CollectError::ListPods { namespace, .. } => assert_eq!(namespace, "ns2"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_quantity_aborts() {
        let cluster = FakeCluster::default()
            .with_namespace("ns1", vec![pod("p", vec![container("app", "lots", "1Gi")])]);

        let err = collect(&cluster, "app").await.unwrap_err();
        match err {
            CollectError::InvalidQuantity { resource, pod, .. } => {
                assert_eq!(resource, "cpu");
                assert_eq!(pod, "p");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_resources_count_as_zero() {
        let bare = ContainerSpec {
            name: "bare".to_string(),
            image: "busybox".to_string(),
            resources: ContainerResources::default(),
        };
        let cluster = FakeCluster::default().with_namespace("ns1", vec![pod("p", vec![bare])]);

        let report = collect(&cluster, "busybox").await.unwrap();
        assert_eq!(report.total_count, 1);
        assert!(report.grand_totals.limits.cpu.is_zero());
        assert_eq!(report.ratios().cpu_limits, None);
        assert_eq!(report.detail["ns1"]["p"]["busybox"], ContainerResources::default());
    }

    #[tokio::test]
    async fn test_empty_cluster() {
        let report = collect(&FakeCluster::default(), "anything").await.unwrap();
        assert_eq!(report.total_count, 0);
        assert!(report.total_by_image.is_empty());
        assert!(report.detail.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_collections_do_not_share_state() {
        let cluster = two_container_cluster();
        let first = collect(&cluster, "imageB").await.unwrap();
        let second = collect(&cluster, "imageB").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.total_count, 2);
    }

    #[test]
    fn test_builder_same_image_twice_in_pod() {
        let mut builder = ReportBuilder::new("app");
        builder
            .record("ns", "p", &container("app", "100m", "10Mi"))
            .unwrap();
        builder
            .record("ns", "p", &container("app", "300m", "30Mi"))
            .unwrap();
        let report = builder.finish();

        assert_eq!(report.total_count, 2);
        assert_eq!(report.total_by_image["app"].limits.cpu.to_string(), "400m");
        assert_eq!(report.detail["ns"]["p"]["app"].limits["cpu"], "300m");
    }
}

#[cfg(test)]
mod property_tests {
    use crate::collector::ReportBuilder;
    use crate::models::{ContainerResources, ContainerSpec};
    use crate::quantity::{ResourceKind, ResourceQuantity};
    use proptest::prelude::*;

    fn spec(index: usize, image: &str, cpu_millis: u32, memory_mi: u32) -> ContainerSpec {
        let mut resources = ContainerResources::default();
        resources
            .limits
            .insert("cpu".to_string(), format!("{}m", cpu_millis));
        resources
            .limits
            .insert("memory".to_string(), format!("{}Mi", memory_mi));
        resources
            .requests
            .insert("cpu".to_string(), format!("{}m", cpu_millis / 2));
        ContainerSpec {
            name: format!("c{}", index),
            image: image.to_string(),
            resources,
        }
    }

    fn containers() -> impl Strategy<Value = Vec<(String, u32, u32)>> {
        prop::collection::vec(
            (
                prop::sample::select(vec!["es:6.2.1", "nginx", "redis", "es:7"]),
                0u32..5000,
                0u32..8192,
            )
                .prop_map(|(image, cpu, mem)| (image.to_string(), cpu, mem)),
            0..40,
        )
    }

    proptest! {
        #[test]
        fn grand_total_is_exact_sum_in_any_order(items in containers()) {
            let mut forward = ReportBuilder::new("es");
            let mut backward = ReportBuilder::new("es");
            for (i, (image, cpu, mem)) in items.iter().enumerate() {
                forward.record("ns", &format!("p{}", i), &spec(i, image, *cpu, *mem)).unwrap();
            }
            for (i, (image, cpu, mem)) in items.iter().enumerate().rev() {
                backward.record("ns", &format!("p{}", i), &spec(i, image, *cpu, *mem)).unwrap();
            }
            let forward = forward.finish();
            let backward = backward.finish();

            let expected: i64 = items.iter().map(|(_, cpu, _)| *cpu as i64).sum();
            prop_assert_eq!(forward.grand_totals.limits.cpu, ResourceQuantity::millicores(expected));
            prop_assert_eq!(forward.grand_totals, backward.grand_totals);
            prop_assert_eq!(forward.total_by_image, backward.total_by_image);
        }

        #[test]
        fn target_never_exceeds_total(items in containers(), pattern in prop::sample::select(vec!["es", "es:7", "nginx", "missing", ""])) {
            let mut builder = ReportBuilder::new(pattern);
            for (i, (image, cpu, mem)) in items.iter().enumerate() {
                builder.record("ns", &format!("p{}", i), &spec(i, image, *cpu, *mem)).unwrap();
            }
            let report = builder.finish();

            prop_assert!(report.target_count <= report.total_count);
            let (t, g) = (&report.target_totals, &report.grand_totals);
            prop_assert!(t.limits.cpu <= g.limits.cpu);
            prop_assert!(t.limits.memory <= g.limits.memory);
            prop_assert!(t.requests.cpu <= g.requests.cpu);
            prop_assert!(t.requests.memory <= g.requests.memory);
            prop_assert_eq!(g.requests.memory, ResourceQuantity::zero(ResourceKind::Memory));
        }
    }
}
