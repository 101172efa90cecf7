//! Shared Kubernetes helpers built on kube-rs

use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::discovery::{ApiResource, Discovery};
use kube::{Resource, ResourceExt};
use tracing::{info, warn};

use crate::Error;

// =============================================================================
// Object identity
// =============================================================================

/// Namespaced identity of an object: the unit of work for reconciliation
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Object namespace
    pub namespace: String,
    /// Object name
    pub name: String,
}

impl ObjectKey {
    /// Create a key from namespace and name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a namespaced object; `None` for cluster-scoped objects
    pub fn from_resource<K: Resource>(obj: &K) -> Option<Self> {
        let namespace = obj.meta().namespace.clone()?;
        Some(Self::new(namespace, obj.name_any()))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// =============================================================================
// Ownership
// =============================================================================

/// Controller owner reference pointing at `owner`
///
/// Dependents carrying this reference are garbage collected by Kubernetes
/// when the owner is deleted. The owner must have been persisted (have a uid).
pub fn controller_owner_ref<K>(owner: &K) -> Result<OwnerReference, Error>
where
    K: Resource<DynamicType = ()>,
{
    owner.controller_owner_ref(&()).ok_or_else(|| {
        Error::internal_with_context(
            "owner_reference",
            format!(
                "{} {} has no uid; it cannot own dependents",
                K::kind(&()),
                owner.meta().name.as_deref().unwrap_or_default()
            ),
        )
    })
}

/// True if `obj` is controlled by the owner described by `owner`
pub fn is_controlled_by<K: Resource>(obj: &K, owner: &OwnerReference) -> bool {
    obj.meta()
        .owner_references
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|r| r.uid == owner.uid && r.controller == Some(true))
}

// =============================================================================
// API discovery
// =============================================================================

/// Look up a resource in API discovery results.
///
/// Returns `None` if the group or kind is not served (not an error).
pub fn find_discovered_resource(
    discovery: &Discovery,
    group: &str,
    kind: &str,
) -> Option<ApiResource> {
    for api_group in discovery.groups() {
        if api_group.name() != group {
            continue;
        }
        for (ar, _caps) in api_group.resources_by_stability() {
            if ar.kind == kind {
                info!(
                    group = %group,
                    kind = %kind,
                    api_version = %ar.api_version,
                    "discovered API resource"
                );
                return Some(ar);
            }
        }
    }
    warn!(group = %group, kind = %kind, "resource not served by the API server");
    None
}
