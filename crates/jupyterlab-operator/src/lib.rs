//! JupyterLab operator: CLI configuration, start-up and controller wiring

#![deny(missing_docs)]

/// Command-line and environment configuration
pub mod config;
/// Controller construction and shutdown wiring
pub mod controller_runner;
/// Start-up utilities (CRD install, Route API discovery)
pub mod startup;
