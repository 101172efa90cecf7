//! Start-up tasks run once before the controller starts watching

mod crds;
mod routes;

pub use crds::{crd_yaml, ensure_crds_installed};
pub use routes::discover_route_api;
