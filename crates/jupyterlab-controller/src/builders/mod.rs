//! Dependent resource construction
//!
//! Each builder is a pure function of the Jupyterlab, its controller owner
//! reference and the process-wide [`InstanceSettings`]. Builders do no I/O;
//! calling one twice with the same inputs yields equal objects.

mod deployment;
mod route;
mod service;

pub use deployment::{current_replicas, deployment_for};
pub use route::route_for;
pub use service::service_for;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::ResourceExt;

use jupyterlab_common::crd::Jupyterlab;
use jupyterlab_common::labels::labels_for;

/// Image run when none is configured
pub const DEFAULT_IMAGE: &str = "quay.io/aaziz/jupyterlab:latest";

/// Port the JupyterLab server listens on when none is configured
pub const DEFAULT_PORT: i32 = 8888;

/// Name of the JupyterLab container and of the Service port
pub const PORT_NAME: &str = "jupyterlab";

/// Operator-wide settings shared by every instance
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceSettings {
    /// Container image for the JupyterLab server
    pub image: String,
    /// Container and Service port
    pub port: i32,
    /// Base domain for Route hosts; the router picks a host when unset
    pub route_domain: Option<String>,
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            port: DEFAULT_PORT,
            route_domain: None,
        }
    }
}

/// Metadata shared by all dependents: same name and namespace as the lab,
/// instance labels, and the controller owner reference.
fn dependent_metadata(lab: &Jupyterlab, owner: &OwnerReference) -> ObjectMeta {
    let name = lab.name_any();
    ObjectMeta {
        name: Some(name.clone()),
        namespace: lab.namespace(),
        labels: Some(labels_for(&name)),
        owner_references: Some(vec![owner.clone()]),
        ..Default::default()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn default_settings() {
        let settings = InstanceSettings::default();
        assert_eq!(settings.image, DEFAULT_IMAGE);
        assert_eq!(settings.port, 8888);
        assert!(settings.route_domain.is_none());
    }

    #[test]
    fn dependent_metadata_mirrors_lab_identity() {
        let lab = sample_lab("my-lab", 1);
        let owner = owner_of(&lab);
        let meta = dependent_metadata(&lab, &owner);

        assert_eq!(meta.name.as_deref(), Some("my-lab"));
        assert_eq!(meta.namespace.as_deref(), Some("data-science"));
        assert_eq!(meta.labels, Some(labels_for("my-lab")));
        assert_eq!(meta.owner_references, Some(vec![owner]));
        assert!(meta.resource_version.is_none());
    }
}
