//! Jupyterlab Custom Resource Definition
//!
//! A Jupyterlab declares how many JupyterLab server replicas should run.
//! The operator creates a Deployment, Service and Route for it and reports
//! the names of the backing pods in `status.nodes`.

use std::collections::BTreeSet;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Observed state of a Jupyterlab
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct JupyterlabStatus {
    /// Names of the pods currently backing this instance
    #[serde(default)]
    pub nodes: Vec<String>,
}

impl JupyterlabStatus {
    /// Create a status from a set of pod names, stored sorted
    pub fn with_nodes<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = nodes.into_iter().map(Into::into).collect();
        Self {
            nodes: set.into_iter().collect(),
        }
    }

    /// Pod names as a set; ordering in the stored list is not significant
    pub fn node_set(&self) -> BTreeSet<&str> {
        self.nodes.iter().map(String::as_str).collect()
    }
}

/// Specification for a Jupyterlab
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "jupyter.example.com",
    version = "v1alpha1",
    kind = "Jupyterlab",
    plural = "jupyterlabs",
    shortname = "jl",
    namespaced,
    status = "JupyterlabStatus",
    printcolumn = r#"{"name":"Size","type":"integer","jsonPath":".spec.size"}"#,
    printcolumn = r#"{"name":"Nodes","type":"string","jsonPath":".status.nodes"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
pub struct JupyterlabSpec {
    /// Number of JupyterLab server replicas
    #[schemars(range(min = 0))]
    pub size: i32,
}

impl JupyterlabSpec {
    /// Validate the spec
    ///
    /// The schema already rejects negative sizes, but objects written before
    /// the schema was tightened can still carry them.
    pub fn validate(&self) -> Result<(), String> {
        if self.size < 0 {
            return Err(format!("size must be >= 0, got {}", self.size));
        }
        Ok(())
    }
}

impl Jupyterlab {
    /// Current status, or an empty one if the controller has not written it yet
    pub fn status_or_default(&self) -> JupyterlabStatus {
        self.status.clone().unwrap_or_default()
    }
}
