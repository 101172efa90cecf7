//! OpenShift Route exposing the Service outside the cluster

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

use jupyterlab_common::crd::{Jupyterlab, Route, RoutePort, RouteSpec, RouteTargetReference};

use super::{dependent_metadata, InstanceSettings};

/// Build the Route for `lab`, pointing at the Service of the same name.
///
/// The host is `<name>-<namespace>.<route_domain>` when a route domain is
/// configured; otherwise it is left for the router to assign.
pub fn route_for(lab: &Jupyterlab, owner: &OwnerReference, settings: &InstanceSettings) -> Route {
    let name = lab.name_any();
    let host = settings.route_domain.as_deref().map(|domain| {
        format!(
            "{}-{}.{}",
            name,
            lab.namespace().unwrap_or_default(),
            domain.trim_start_matches('.')
        )
    });

    Route {
        metadata: dependent_metadata(lab, owner),
        spec: RouteSpec {
            host,
            path: None,
            to: RouteTargetReference {
                kind: "Service".to_string(),
                name,
                weight: Some(100),
            },
            port: Some(RoutePort {
                target_port: IntOrString::Int(settings.port),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use jupyterlab_common::labels::labels_for;

    #[test]
    fn targets_service_of_same_name() {
        let lab = sample_lab("my-lab", 1);
        let route = route_for(&lab, &owner_of(&lab), &InstanceSettings::default());

        assert_eq!(route.spec.to.kind, "Service");
        assert_eq!(route.spec.to.name, "my-lab");
        assert_eq!(route.spec.to.weight, Some(100));
        assert_eq!(
            route.spec.port.map(|p| p.target_port),
            Some(IntOrString::Int(8888))
        );
    }

    #[test]
    fn host_left_to_router_without_domain() {
        let lab = sample_lab("my-lab", 1);
        let route = route_for(&lab, &owner_of(&lab), &InstanceSettings::default());
        assert!(route.spec.host.is_none());
    }

    #[test]
    fn host_derived_from_route_domain() {
        let lab = sample_lab("my-lab", 1);
        let settings = InstanceSettings {
            route_domain: Some(".apps.example.com".to_string()),
            ..Default::default()
        };
        let route = route_for(&lab, &owner_of(&lab), &settings);
        assert_eq!(
            route.spec.host.as_deref(),
            Some("my-lab-data-science.apps.example.com")
        );
    }

    #[test]
    fn carries_labels_and_owner() {
        let lab = sample_lab("my-lab", 1);
        let owner = owner_of(&lab);
        let route = route_for(&lab, &owner, &InstanceSettings::default());

        assert_eq!(route.metadata.labels, Some(labels_for("my-lab")));
        assert_eq!(route.metadata.owner_references, Some(vec![owner]));
        assert_eq!(route.metadata.namespace.as_deref(), Some("data-science"));
    }

    #[test]
    fn building_twice_is_deterministic() {
        let lab = sample_lab("my-lab", 1);
        let owner = owner_of(&lab);
        let settings = InstanceSettings::default();
        assert_eq!(
            route_for(&lab, &owner, &settings).spec,
            route_for(&lab, &owner, &settings).spec
        );
    }
}
