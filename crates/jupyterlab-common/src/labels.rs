//! Label convention for JupyterLab instances
//!
//! The same label set is stamped on every resource the operator creates and
//! used to select the pods that back an instance. Both sides must go through
//! these functions or the status refresh will select the wrong pods.

use std::collections::BTreeMap;

/// Label key identifying the application
pub const APP_LABEL: &str = "app";

/// Fixed value of the [`APP_LABEL`] label
pub const APP_LABEL_VALUE: &str = "jupyterlab";

/// Label key carrying the owning Jupyterlab's name
pub const INSTANCE_LABEL: &str = "instance";

/// Labels for all resources belonging to the Jupyterlab named `name`
pub fn labels_for(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (APP_LABEL.to_string(), APP_LABEL_VALUE.to_string()),
        (INSTANCE_LABEL.to_string(), name.to_string()),
    ])
}

/// Equality-based label selector matching [`labels_for`]
///
/// Suitable for `ListParams::labels`.
pub fn selector_for(name: &str) -> String {
    labels_for(name)
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// True if `labels` carry every entry of [`labels_for`] for `name`
pub fn matches_instance(labels: &BTreeMap<String, String>, name: &str) -> bool {
    labels_for(name)
        .iter()
        .all(|(k, v)| labels.get(k) == Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_contain_app_and_instance() {
        let labels = labels_for("my-lab");
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.get("app").map(String::as_str), Some("jupyterlab"));
        assert_eq!(labels.get("instance").map(String::as_str), Some("my-lab"));
    }

    #[test]
    fn labels_are_deterministic() {
        assert_eq!(labels_for("lab"), labels_for("lab"));
        assert_eq!(selector_for("lab"), selector_for("lab"));
    }

    #[test]
    fn selector_renders_sorted_pairs() {
        assert_eq!(selector_for("my-lab"), "app=jupyterlab,instance=my-lab");
    }

    #[test]
    fn selector_does_not_cross_match_prefixed_names() {
        let lab2 = labels_for("lab-2");
        assert!(!matches_instance(&lab2, "lab"));
        assert!(matches_instance(&lab2, "lab-2"));
    }

    #[test]
    fn extra_labels_still_match() {
        let mut labels = labels_for("lab");
        labels.insert("pod-template-hash".to_string(), "abc123".to_string());
        assert!(matches_instance(&labels, "lab"));
    }

    #[test]
    fn missing_app_label_does_not_match() {
        let labels = BTreeMap::from([("instance".to_string(), "lab".to_string())]);
        assert!(!matches_instance(&labels, "lab"));
    }
}
