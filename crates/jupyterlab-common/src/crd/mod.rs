//! Custom Resource Definitions for the JupyterLab operator
//!
//! `Jupyterlab` is owned by this operator and installed on start-up.
//! `Route` is OpenShift's external-access resource; it is only modelled here
//! so the controller can read and create it with a typed API.

mod jupyterlab;
mod route;

pub use jupyterlab::{Jupyterlab, JupyterlabSpec, JupyterlabStatus};
pub use route::{Route, RoutePort, RouteSpec, RouteTargetReference, ROUTE_API_GROUP};
