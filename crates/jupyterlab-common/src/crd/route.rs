//! OpenShift Route (`route.openshift.io/v1`)
//!
//! Only the fields the operator writes are modelled. The CRD is owned by
//! OpenShift, so schema generation is disabled and this type is never
//! installed.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// API group serving Route
pub const ROUTE_API_GROUP: &str = "route.openshift.io";

/// Specification for an OpenShift Route
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[kube(
    group = "route.openshift.io",
    version = "v1",
    kind = "Route",
    plural = "routes",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// External hostname; the router generates one when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Path prefix routed to the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Backend the route points at
    pub to: RouteTargetReference,

    /// Backend port to route to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<RoutePort>,
}

/// Backend reference of a Route
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTargetReference {
    /// Backend kind, always `Service`
    pub kind: String,
    /// Backend name
    pub name: String,
    /// Relative weight among backends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
}

/// Backend port selection of a Route
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutePort {
    /// Service port name or number
    pub target_port: IntOrString,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;

    #[test]
    fn route_api_version() {
        assert_eq!(Route::api_version(&()), "route.openshift.io/v1");
        assert_eq!(Route::plural(&()), "routes");
        assert_eq!(Route::group(&()), ROUTE_API_GROUP);
    }

    #[test]
    fn spec_serializes_camel_case_and_skips_unset() {
        let spec = RouteSpec {
            host: None,
            path: None,
            to: RouteTargetReference {
                kind: "Service".to_string(),
                name: "lab".to_string(),
                weight: Some(100),
            },
            port: Some(RoutePort {
                target_port: IntOrString::Int(8888),
            }),
        };
        let json = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "to": { "kind": "Service", "name": "lab", "weight": 100 },
                "port": { "targetPort": 8888 }
            })
        );
    }

    #[test]
    fn parses_router_assigned_host() {
        let route: Route = serde_json::from_value(serde_json::json!({
            "apiVersion": "route.openshift.io/v1",
            "kind": "Route",
            "metadata": { "name": "lab", "namespace": "ds" },
            "spec": {
                "host": "lab-ds.apps.example.com",
                "to": { "kind": "Service", "name": "lab" },
                "port": { "targetPort": "jupyterlab" },
                "wildcardPolicy": "None"
            }
        }))
        .expect("parse route");
        assert_eq!(route.spec.host.as_deref(), Some("lab-ds.apps.example.com"));
        assert_eq!(
            route.spec.port.map(|p| p.target_port),
            Some(IntOrString::String("jupyterlab".to_string()))
        );
    }
}
