//! OpenShift Route API detection

use kube::discovery::Discovery;
use kube::Client;

use jupyterlab_common::crd::ROUTE_API_GROUP;
use jupyterlab_common::kube_utils::find_discovered_resource;

/// True if the API server serves `route.openshift.io` Routes.
///
/// Discovery failures are logged and treated as "not served"; the operator
/// still manages Deployments and Services without them.
pub async fn discover_route_api(client: &Client) -> bool {
    let discovery = match Discovery::new(client.clone())
        .filter(&[ROUTE_API_GROUP])
        .run()
        .await
    {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(error = %e, "API discovery failed, routes disabled");
            return false;
        }
    };

    find_discovered_resource(&discovery, ROUTE_API_GROUP, "Route").is_some()
}
