//! Operator configuration
//!
//! Every option can be given on the command line or through the environment,
//! which is how the Deployment manifest configures the operator.

use std::time::Duration;

use clap::Parser;

use jupyterlab_common::telemetry::LogFormat;
use jupyterlab_controller::builders::{DEFAULT_IMAGE, DEFAULT_PORT};
use jupyterlab_controller::InstanceSettings;

/// JupyterLab operator - runs JupyterLab instances declared as Jupyterlab resources
#[derive(Parser, Debug, Clone)]
#[command(name = "jupyterlab-operator", version, about, long_about = None)]
pub struct OperatorArgs {
    /// Print the CRD manifest and exit
    #[arg(long)]
    pub crd: bool,

    /// Container image for JupyterLab servers
    #[arg(long, env = "JUPYTERLAB_IMAGE", default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// Port the JupyterLab server listens on
    #[arg(
        long,
        env = "JUPYTERLAB_PORT",
        default_value_t = DEFAULT_PORT,
        value_parser = clap::value_parser!(i32).range(1..=65535)
    )]
    pub port: i32,

    /// Base domain for Route hosts (`<name>-<namespace>.<domain>`)
    #[arg(long, env = "JUPYTERLAB_ROUTE_DOMAIN")]
    pub route_domain: Option<String>,

    /// Never create Routes, even on clusters that serve them
    #[arg(long, env = "JUPYTERLAB_DISABLE_ROUTES")]
    pub disable_routes: bool,

    /// Do not install the Jupyterlab CRD on startup
    #[arg(long, env = "JUPYTERLAB_SKIP_CRD_INSTALL")]
    pub skip_crd_install: bool,

    /// Deadline for a single reconcile pass, in seconds
    #[arg(
        long,
        env = "JUPYTERLAB_RECONCILE_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub reconcile_timeout_secs: u64,

    /// Only watch Jupyterlabs in this namespace (all namespaces when unset)
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Log output format: text or json
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,
}

impl OperatorArgs {
    /// Settings stamped on every instance's dependents
    pub fn instance_settings(&self) -> InstanceSettings {
        InstanceSettings {
            image: self.image.clone(),
            port: self.port,
            route_domain: self
                .route_domain
                .clone()
                .filter(|domain| !domain.trim().is_empty()),
        }
    }

    /// Per-pass reconcile deadline
    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> OperatorArgs {
        let argv = std::iter::once("jupyterlab-operator").chain(args.iter().copied());
        OperatorArgs::try_parse_from(argv).expect("args should parse")
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert!(!args.crd);
        assert!(!args.disable_routes);
        assert!(!args.skip_crd_install);
        assert_eq!(args.instance_settings(), InstanceSettings::default());
        assert_eq!(args.reconcile_timeout(), Duration::from_secs(30));
        assert_eq!(args.log_format, LogFormat::Text);
    }

    #[test]
    fn overrides_instance_settings() {
        let args = parse(&[
            "--image",
            "registry.local/jupyter:4",
            "--port",
            "9999",
            "--route-domain",
            "apps.example.com",
        ]);
        let settings = args.instance_settings();
        assert_eq!(settings.image, "registry.local/jupyter:4");
        assert_eq!(settings.port, 9999);
        assert_eq!(settings.route_domain.as_deref(), Some("apps.example.com"));
    }

    #[test]
    fn blank_route_domain_is_unset() {
        let args = parse(&["--route-domain", " "]);
        assert!(args.instance_settings().route_domain.is_none());
    }

    #[test]
    fn rejects_out_of_range_port() {
        let argv = ["jupyterlab-operator", "--port", "70000"];
        assert!(OperatorArgs::try_parse_from(argv).is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let argv = ["jupyterlab-operator", "--reconcile-timeout-secs", "0"];
        assert!(OperatorArgs::try_parse_from(argv).is_err());
    }

    #[test]
    fn parses_json_log_format_and_namespace() {
        let args = parse(&["--log-format", "json", "--watch-namespace", "data-science"]);
        assert_eq!(args.log_format, LogFormat::Json);
        assert_eq!(args.watch_namespace.as_deref(), Some("data-science"));
    }

    #[test]
    fn rejects_unknown_log_format() {
        let argv = ["jupyterlab-operator", "--log-format", "yaml"];
        assert!(OperatorArgs::try_parse_from(argv).is_err());
    }
}
