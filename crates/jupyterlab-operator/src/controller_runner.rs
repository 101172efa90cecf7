//! Controller runner - builds the Jupyterlab controller future
//!
//! The controller watches Jupyterlabs and the objects they own, so a change
//! to an owned Deployment, Service or Route re-triggers its owner.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::NamespaceResourceScope;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, Resource};
use tokio_util::sync::CancellationToken;

use jupyterlab_common::crd::{Jupyterlab, Route};
use jupyterlab_controller::{error_policy, reconcile, Context};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// This forces the API server to close the watch before the client times out,
/// preventing "body read timed out" errors on idle watches.
const WATCH_TIMEOUT_SECS: u32 = 25;

fn watcher_config() -> WatcherConfig {
    WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS)
}

/// Api scoped to `namespace`, or cluster-wide when `None`
fn scoped_api<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Build the Jupyterlab controller future
///
/// Routes are only watched when `ctx.routes_enabled`; watching a kind the
/// API server does not serve would fail the whole controller stream.
pub fn build_jupyterlab_controller(
    client: Client,
    ctx: Arc<Context>,
    watch_namespace: Option<&str>,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    match watch_namespace {
        Some(ns) => tracing::info!(namespace = %ns, "- Jupyterlab controller (namespaced)"),
        None => tracing::info!("- Jupyterlab controller (all namespaces)"),
    }

    let labs: Api<Jupyterlab> = scoped_api(client.clone(), watch_namespace);
    let deployments: Api<Deployment> = scoped_api(client.clone(), watch_namespace);
    let services: Api<Service> = scoped_api(client.clone(), watch_namespace);

    let mut controller = Controller::new(labs, watcher_config())
        .owns(deployments, watcher_config())
        .owns(services, watcher_config());

    if ctx.routes_enabled {
        let routes: Api<Route> = scoped_api(client, watch_namespace);
        controller = controller.owns(routes, watcher_config());
    }

    Box::pin(
        controller
            .shutdown_on_signal()
            .run(reconcile, error_policy, ctx)
            .for_each(log_reconcile_result("Jupyterlab")),
    )
}

/// Cancel `token` on SIGINT or SIGTERM so in-flight passes are abandoned
pub async fn cancel_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM, using SIGINT only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("shutdown signal received, cancelling in-flight reconciles");
    token.cancel();
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
