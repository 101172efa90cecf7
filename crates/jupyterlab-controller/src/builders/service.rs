//! Service fronting the JupyterLab pods

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

use jupyterlab_common::crd::Jupyterlab;
use jupyterlab_common::labels::labels_for;

use super::{dependent_metadata, InstanceSettings, PORT_NAME};

/// Build the Service for `lab`: one TCP port selecting the instance's pods
pub fn service_for(lab: &Jupyterlab, owner: &OwnerReference, settings: &InstanceSettings) -> Service {
    Service {
        metadata: dependent_metadata(lab, owner),
        spec: Some(ServiceSpec {
            selector: Some(labels_for(&lab.name_any())),
            ports: Some(vec![ServicePort {
                name: Some(PORT_NAME.to_string()),
                port: settings.port,
                target_port: Some(IntOrString::Int(settings.port)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
