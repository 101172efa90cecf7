//! Deployment running the JupyterLab server pods

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, ContainerPort, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use kube::ResourceExt;

use jupyterlab_common::crd::Jupyterlab;
use jupyterlab_common::labels::labels_for;

use super::{dependent_metadata, InstanceSettings, PORT_NAME};

/// Build the Deployment for `lab`.
///
/// - `spec.replicas` is `lab.spec.size`
/// - selector and pod template carry the instance labels
/// - a single `jupyterlab` container exposes `settings.port` over TCP
pub fn deployment_for(
    lab: &Jupyterlab,
    owner: &OwnerReference,
    settings: &InstanceSettings,
) -> Deployment {
    let labels = labels_for(&lab.name_any());

    let container = Container {
        name: PORT_NAME.to_string(),
        image: Some(settings.image.clone()),
        ports: Some(vec![ContainerPort {
            name: Some(PORT_NAME.to_string()),
            container_port: settings.port,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        ..Default::default()
    };

    Deployment {
        metadata: dependent_metadata(lab, owner),
        spec: Some(DeploymentSpec {
            replicas: Some(lab.spec.size),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Replica count of a live Deployment; an unset field means the API default of 1
pub fn current_replicas(deployment: &Deployment) -> i32 {
    deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn pod_spec(deployment: &Deployment) -> &PodSpec {
        deployment
            .spec
            .as_ref()
            .and_then(|s| s.template.spec.as_ref())
            .expect("pod spec")
    }

    #[test]
    fn replicas_follow_size() {
        for size in [0, 1, 3] {
            let lab = sample_lab("my-lab", size);
            let deployment = deployment_for(&lab, &owner_of(&lab), &InstanceSettings::default());
            assert_eq!(current_replicas(&deployment), size);
        }
    }

    #[test]
    fn selector_and_template_use_instance_labels() {
        let lab = sample_lab("my-lab", 1);
        let deployment = deployment_for(&lab, &owner_of(&lab), &InstanceSettings::default());
        let spec = deployment.spec.as_ref().expect("spec");

        assert_eq!(spec.selector.match_labels, Some(labels_for("my-lab")));
        assert_eq!(
            spec.template.metadata.as_ref().and_then(|m| m.labels.clone()),
            Some(labels_for("my-lab"))
        );
        assert_eq!(deployment.metadata.labels, Some(labels_for("my-lab")));
    }

    #[test]
    fn single_container_with_configured_image_and_port() {
        let lab = sample_lab("my-lab", 1);
        let settings = InstanceSettings {
            image: "registry.local/jupyter:4".to_string(),
            port: 9999,
            route_domain: None,
        };
        let deployment = deployment_for(&lab, &owner_of(&lab), &settings);
        let containers = &pod_spec(&deployment).containers;

        assert_eq!(containers.len(), 1);
        let container = &containers[0];
        assert_eq!(container.name, "jupyterlab");
        assert_eq!(container.image.as_deref(), Some("registry.local/jupyter:4"));

        let ports = container.ports.as_ref().expect("ports");
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].container_port, 9999);
        assert_eq!(ports[0].protocol.as_deref(), Some("TCP"));
    }

    #[test]
    fn owned_by_the_lab() {
        let lab = sample_lab("my-lab", 1);
        let owner = owner_of(&lab);
        let deployment = deployment_for(&lab, &owner, &InstanceSettings::default());
        assert_eq!(deployment.metadata.owner_references, Some(vec![owner]));
        assert_eq!(deployment.metadata.namespace.as_deref(), Some("data-science"));
    }

    #[test]
    fn building_twice_is_deterministic() {
        let lab = sample_lab("my-lab", 2);
        let owner = owner_of(&lab);
        let settings = InstanceSettings::default();
        assert_eq!(
            deployment_for(&lab, &owner, &settings),
            deployment_for(&lab, &owner, &settings)
        );
    }

    #[test]
    fn unset_replicas_reads_as_one() {
        assert_eq!(current_replicas(&Deployment::default()), 1);
    }
}
