//! Reconciliation for Jupyterlab resources
//!
//! [`builders`] turns a Jupyterlab into the Deployment, Service and Route that
//! serve it. [`controller`] drives the cluster toward those objects one
//! corrective write at a time and keeps `status.nodes` in line with the live
//! pods.

#![deny(missing_docs)]

pub mod builders;
pub mod controller;

pub use builders::InstanceSettings;
pub use controller::{
    error_policy, reconcile, reconcile_key, Context, LabKubeClient, LabKubeClientImpl,
    ReconcileOutcome, ERROR_REQUEUE, REQUEUE_SOON,
};
pub use jupyterlab_common::{Error, Result};
