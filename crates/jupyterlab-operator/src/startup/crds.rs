//! CRD installation utilities
//!
//! The operator installs its own CRD on startup using server-side apply so
//! the installed schema always matches the operator version.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

use jupyterlab_common::crd::Jupyterlab;
use jupyterlab_common::FIELD_MANAGER;

/// CRD definition with name and resource
struct CrdDef {
    name: &'static str,
    crd: CustomResourceDefinition,
}

/// CRDs owned by this operator
fn operator_crds() -> Vec<CrdDef> {
    vec![CrdDef {
        name: "jupyterlabs.jupyter.example.com",
        crd: Jupyterlab::crd(),
    }]
}

/// Install a set of CRDs using server-side apply
async fn install_crds(client: &Client, crds_to_install: Vec<CrdDef>) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    for def in crds_to_install {
        tracing::info!("Installing {} CRD...", def.name);
        crds.patch(def.name, &params, &Patch::Apply(&def.crd))
            .await
            .map_err(|e| anyhow::anyhow!("failed to install {} CRD: {}", def.name, e))?;
    }

    Ok(())
}

/// Ensure the Jupyterlab CRD is installed and up to date
pub async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    install_crds(client, operator_crds()).await?;
    tracing::info!("CRDs installed/updated");
    Ok(())
}

/// All operator CRDs rendered as a multi-document YAML stream
pub fn crd_yaml() -> anyhow::Result<String> {
    let docs = operator_crds()
        .into_iter()
        .map(|def| {
            serde_yaml::to_string(&def.crd)
                .map_err(|e| anyhow::anyhow!("failed to serialize {} CRD: {}", def.name, e))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(docs.join("---\n"))
}
