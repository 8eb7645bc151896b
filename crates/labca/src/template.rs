//! CSR templates.
//!
//! A template is a cfssl-style JSON request document with minijinja
//! placeholders (`{{ name }}`). Placeholders resolve against the serialized
//! [`CertificateInput`](labca_core::CertificateInput) or
//! [`CaRootInput`](labca_core::CaRootInput); unknown placeholders are an
//! error rather than an empty string.

use std::path::Path;

use labca_core::{LabCaError, Result};
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

/// Built-in root CA request document.
pub const DEFAULT_ROOT_TEMPLATE: &str = r#"{
    "CN": "{{ prefix }} Root CA",
    "key": {
       "algo": "rsa",
       "size": 2048
    },
    "names": [{
       "C": "{{ country }}",
       "L": "{{ locality }}",
       "O": "{{ organization }}",
       "OU": "{{ organization_unit }}"
    }],
    "ca": {
       "expiry": "{{ expiry }}"
    }
}
"#;

/// Built-in node request document.
pub const DEFAULT_NODE_TEMPLATE: &str = r#"{
    "CN": "{{ name }}.{{ prefix }}.io",
    "key": {
      "algo": "rsa",
      "size": 2048
    },
    "names": [{
      "C": "{{ country }}",
      "L": "{{ locality }}",
      "O": "{{ organization }}",
      "OU": "{{ organization_unit }}"
    }],
    "hosts": [
      "{{ name }}",
      "{{ long_name }}",
      "{{ fqdn }}"{% for host in hosts %},
      "{{ host }}"{% endfor %}
    ]
}
"#;

/// A parameterized certificate request document.
#[derive(Debug, Clone)]
pub struct CsrTemplate {
    name: String,
    source: String,
    env: Environment<'static>,
}

impl CsrTemplate {
    /// Compile a template, failing on syntax errors.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let source = source.into();

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);

        env.template_from_str(&source)
            .map_err(|e| LabCaError::Template(format!("failed to parse {name} template: {e}")))?;

        Ok(Self { name, source, env })
    }

    /// The built-in root CA template.
    pub fn default_root() -> Self {
        Self::new("ca-csr", DEFAULT_ROOT_TEMPLATE).expect("built-in root template is valid")
    }

    /// The built-in node template.
    pub fn default_node() -> Self {
        Self::new("node-csr", DEFAULT_NODE_TEMPLATE).expect("built-in node template is valid")
    }

    /// Load a template from a file.
    pub fn from_file(name: impl Into<String>, path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| LabCaError::io(path, e))?;
        Self::new(name, source)
    }

    /// Template name, used in error messages
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fill every placeholder from `input`.
    ///
    /// Output is a pure function of template and input.
    pub fn render<T: Serialize>(&self, input: &T) -> Result<Vec<u8>> {
        self.env
            .render_str(&self.source, input)
            .map(String::into_bytes)
            .map_err(|e| {
                LabCaError::Template(format!("failed to render {} template: {e}", self.name))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labca_core::{CaRootInput, CertificateInput, NodeInfo, Subject};

    fn leaf_input() -> CertificateInput {
        let node = NodeInfo::new("test", "leaf1", "srl");
        CertificateInput::for_node(&node, "test", &Subject::default())
    }

    #[test]
    fn test_node_template_fills_hosts() {
        let rendered = CsrTemplate::default_node().render(&leaf_input()).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&rendered).unwrap();

        assert_eq!(doc["CN"], "leaf1.test.io");
        assert_eq!(
            doc["hosts"],
            serde_json::json!(["leaf1", "clab-test-leaf1", "leaf1.test.io"])
        );
        assert_eq!(doc["names"][0]["OU"], "Container lab");
    }

    #[test]
    fn test_extra_hosts_are_appended() {
        let mut input = leaf_input();
        input.hosts = vec!["10.0.0.1".into(), "mgmt.leaf1".into()];

        let rendered = CsrTemplate::default_node().render(&input).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&rendered).unwrap();

        assert_eq!(doc["hosts"].as_array().unwrap().len(), 5);
        assert_eq!(doc["hosts"][3], "10.0.0.1");
    }

    #[test]
    fn test_root_template() {
        let input = CaRootInput::for_lab("lab1", &Subject::default(), "262800h");
        let rendered = CsrTemplate::default_root().render(&input).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&rendered).unwrap();

        assert_eq!(doc["CN"], "lab1 Root CA");
        assert_eq!(doc["ca"]["expiry"], "262800h");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let template = CsrTemplate::default_node();
        let input = leaf_input();
        assert_eq!(template.render(&input).unwrap(), template.render(&input).unwrap());
    }

    #[test]
    fn test_unknown_placeholder_fails() {
        let template = CsrTemplate::new("broken", r#"{"CN": "{{ hostname }}"}"#).unwrap();
        let err = template.render(&leaf_input()).unwrap_err();

        assert!(matches!(err, LabCaError::Template(_)));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_syntax_error_fails_at_construction() {
        let err = CsrTemplate::new("bad", r#"{"CN": "{{ name "}"#).unwrap_err();
        assert!(matches!(err, LabCaError::Template(_)));
    }
}
