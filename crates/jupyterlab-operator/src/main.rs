//! JupyterLab Operator - runs JupyterLab servers declared as Jupyterlab resources

use std::sync::Arc;

use clap::Parser;
use kube::Client;
use tokio_util::sync::CancellationToken;

use jupyterlab_common::telemetry::init_logging;
use jupyterlab_controller::Context;
use jupyterlab_operator::config::OperatorArgs;
use jupyterlab_operator::controller_runner::{build_jupyterlab_controller, cancel_on_signal};
use jupyterlab_operator::startup::{crd_yaml, discover_route_api, ensure_crds_installed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = OperatorArgs::parse();

    if args.crd {
        print!("{}", crd_yaml()?);
        return Ok(());
    }

    init_logging(args.log_format)?;
    run_controller(args).await
}

async fn run_controller(args: OperatorArgs) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("failed to create kube client: {}", e))?;

    if args.skip_crd_install {
        tracing::info!("Skipping CRD installation");
    } else {
        ensure_crds_installed(&client).await?;
    }

    let routes_enabled = if args.disable_routes {
        tracing::info!("Routes disabled by configuration");
        false
    } else {
        discover_route_api(&client).await
    };

    let settings = args.instance_settings();
    tracing::info!(
        image = %settings.image,
        port = settings.port,
        route_domain = ?settings.route_domain,
        routes_enabled,
        "Starting JupyterLab operator"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let ctx = Arc::new(
        Context::from_client(client.clone(), settings, routes_enabled)
            .with_reconcile_timeout(args.reconcile_timeout())
            .with_shutdown(shutdown),
    );

    build_jupyterlab_controller(client, ctx, args.watch_namespace.as_deref()).await;

    tracing::info!("Controller stopped");
    Ok(())
}
