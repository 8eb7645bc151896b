//! Node kinds and their container defaults.
//!
//! Every kind is described by data: default environment, bind mounts that
//! switch on with an environment value, and a launch command template. One
//! [`NodeAdapter`] applies any descriptor, so vrnetlab platforms that only
//! differ by name share a single code path.
//!
//! Default env values and command templates are minijinja strings rendered
//! against `node`, `mgmt` and (for the command) the merged `env`.

use std::collections::BTreeMap;

use labca_core::{LabCaError, Result};
use minijinja::{context, Environment, UndefinedBehavior};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::policy::KindPolicy;

/// Connection mode vrnetlab images start with unless told otherwise.
pub const VR_DEFAULT_CONNECTION_MODE: &str = "tc";

const VR_CMD_TEMPLATE: &str = "--username {{ env.USERNAME }} --password {{ env.PASSWORD }} \
--hostname {{ node.short_name }} --connection-mode {{ env.CONNECTION_MODE }} --trace";

/// How a kind's image is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFamily {
    /// Containerized network OS
    Native,
    /// VM wrapped by vrnetlab
    Vrnetlab,
    /// Plain Linux container
    Generic,
}

/// Default login of a node kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    fn admin() -> Self {
        Self {
            username: String::from("admin"),
            password: String::from("admin"),
        }
    }
}

/// Bind mount added when `env[var] == value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindRule {
    pub var: String,
    pub value: String,
    pub bind: String,
}

/// Everything the adapter needs to know about a node kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub kind: String,
    pub image_family: ImageFamily,

    /// Nodes of this kind get a leaf certificate from the lab CA
    #[serde(default)]
    pub requires_ca: bool,

    #[serde(default)]
    pub credentials: Option<Credentials>,

    #[serde(default)]
    pub default_env: BTreeMap<String, String>,

    #[serde(default)]
    pub bind_rules: Vec<BindRule>,

    /// Replaces the node command when set
    #[serde(default)]
    pub cmd_template: Option<String>,
}

impl NodeDescriptor {
    fn vrnetlab(kind: &str) -> Self {
        let default_env = [
            ("CONNECTION_MODE", VR_DEFAULT_CONNECTION_MODE),
            ("USERNAME", "admin"),
            ("PASSWORD", "admin"),
            ("DOCKER_NET_V4_ADDR", "{{ mgmt.ipv4_subnet }}"),
            ("DOCKER_NET_V6_ADDR", "{{ mgmt.ipv6_subnet }}"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            kind: kind.to_string(),
            image_family: ImageFamily::Vrnetlab,
            requires_ca: false,
            credentials: Some(Credentials::admin()),
            default_env,
            bind_rules: vec![BindRule {
                var: String::from("CONNECTION_MODE"),
                value: String::from("macvtap"),
                bind: String::from("/dev:/dev"),
            }],
            cmd_template: Some(String::from(VR_CMD_TEMPLATE)),
        }
    }
}

/// Management network the nodes attach to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MgmtNet {
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub ipv4_subnet: String,
    #[serde(default)]
    pub ipv6_subnet: String,
}

/// Container-level settings of one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub short_name: String,
    #[serde(default)]
    pub long_name: String,
    pub kind: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub binds: Vec<String>,
    #[serde(default)]
    pub cmd: String,
}

/// Applies a [`NodeDescriptor`] to node configs.
#[derive(Debug, Clone, Copy)]
pub struct NodeAdapter<'a> {
    descriptor: &'a NodeDescriptor,
}

impl<'a> NodeAdapter<'a> {
    pub const fn new(descriptor: &'a NodeDescriptor) -> Self {
        Self { descriptor }
    }

    pub const fn descriptor(&self) -> &NodeDescriptor {
        self.descriptor
    }

    /// Fill in kind defaults. Values already set by the user win.
    pub fn init(&self, mut cfg: NodeConfig, mgmt: &MgmtNet) -> Result<NodeConfig> {
        let jinja = environment();
        let node = context! {
            short_name => &cfg.short_name,
            long_name => &cfg.long_name,
            kind => &cfg.kind,
        };

        let mut env = BTreeMap::new();
        for (key, value) in &self.descriptor.default_env {
            let rendered = jinja
                .render_str(value, context! { node => &node, mgmt => mgmt })
                .map_err(|e| LabCaError::Template(format!("default env {key}: {e}")))?;
            env.insert(key.clone(), rendered);
        }
        env.extend(std::mem::take(&mut cfg.env));
        cfg.env = env;

        for rule in &self.descriptor.bind_rules {
            let matches = cfg.env.get(&rule.var).is_some_and(|v| *v == rule.value);
            if matches && !cfg.binds.contains(&rule.bind) {
                cfg.binds.push(rule.bind.clone());
            }
        }

        if let Some(template) = &self.descriptor.cmd_template {
            cfg.cmd = jinja
                .render_str(template, context! { node => &node, mgmt => mgmt, env => &cfg.env })
                .map_err(|e| LabCaError::Template(format!("{} command: {e}", cfg.kind)))?;
        }

        debug!(node = %cfg.short_name, kind = %cfg.kind, cmd = %cfg.cmd, "node initialized");
        Ok(cfg)
    }
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env
}

/// Known node kinds.
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    descriptors: BTreeMap<String, NodeDescriptor>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(NodeDescriptor {
            kind: String::from("srl"),
            image_family: ImageFamily::Native,
            requires_ca: true,
            credentials: Some(Credentials::admin()),
            default_env: BTreeMap::new(),
            bind_rules: Vec::new(),
            cmd_template: Some(String::from("sudo bash -c /opt/srlinux/bin/sr_linux")),
        });
        registry.register(NodeDescriptor::vrnetlab("vr-csr"));
        registry.register(NodeDescriptor::vrnetlab("vr-ftosv"));
        registry.register(NodeDescriptor {
            kind: String::from("linux"),
            image_family: ImageFamily::Generic,
            requires_ca: false,
            credentials: None,
            default_env: BTreeMap::new(),
            bind_rules: Vec::new(),
            cmd_template: None,
        });
        registry
    }
}

impl NodeRegistry {
    /// Registry without any kinds.
    pub const fn empty() -> Self {
        Self {
            descriptors: BTreeMap::new(),
        }
    }

    /// Add or replace a kind.
    pub fn register(&mut self, descriptor: NodeDescriptor) {
        self.descriptors.insert(descriptor.kind.clone(), descriptor);
    }

    pub fn get(&self, kind: &str) -> Option<&NodeDescriptor> {
        self.descriptors.get(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }

    /// Adapter for `kind`.
    pub fn adapter(&self, kind: &str) -> Result<NodeAdapter<'_>> {
        self.get(kind)
            .map(NodeAdapter::new)
            .ok_or_else(|| LabCaError::not_found(format!("node kind {kind}")))
    }

    /// CA allow-list made of the kinds flagged `requires_ca`.
    pub fn kind_policy(&self) -> KindPolicy {
        KindPolicy::new(
            self.descriptors
                .values()
                .filter(|d| d.requires_ca)
                .map(|d| d.kind.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mgmt() -> MgmtNet {
        MgmtNet {
            network: String::from("clab"),
            ipv4_subnet: String::from("172.20.20.0/24"),
            ipv6_subnet: String::from("2001:172:20:20::/64"),
        }
    }

    fn node(kind: &str) -> NodeConfig {
        NodeConfig {
            short_name: String::from("csr1"),
            long_name: String::from("clab-test-csr1"),
            kind: kind.to_string(),
            ..NodeConfig::default()
        }
    }

    #[test]
    fn test_vr_defaults() {
        let registry = NodeRegistry::default();
        let cfg = registry.adapter("vr-csr").unwrap().init(node("vr-csr"), &mgmt()).unwrap();

        assert_eq!(cfg.env["CONNECTION_MODE"], "tc");
        assert_eq!(cfg.env["USERNAME"], "admin");
        assert_eq!(cfg.env["DOCKER_NET_V4_ADDR"], "172.20.20.0/24");
        assert_eq!(cfg.env["DOCKER_NET_V6_ADDR"], "2001:172:20:20::/64");
        assert!(cfg.binds.is_empty());
        assert_eq!(
            cfg.cmd,
            "--username admin --password admin --hostname csr1 --connection-mode tc --trace"
        );
    }

    #[test]
    fn test_user_env_wins_and_macvtap_binds_dev() {
        let registry = NodeRegistry::default();
        let mut cfg = node("vr-ftosv");
        cfg.env.insert("CONNECTION_MODE".into(), "macvtap".into());
        cfg.env.insert("PASSWORD".into(), "s3cret".into());

        let cfg = registry.adapter("vr-ftosv").unwrap().init(cfg, &mgmt()).unwrap();

        assert_eq!(cfg.binds, vec!["/dev:/dev"]);
        assert!(cfg.cmd.contains("--password s3cret"));
        assert!(cfg.cmd.contains("--connection-mode macvtap"));

        // applying twice does not duplicate the bind
        let again = registry.adapter("vr-ftosv").unwrap().init(cfg, &mgmt()).unwrap();
        assert_eq!(again.binds, vec!["/dev:/dev"]);
    }

    #[test]
    fn test_linux_keeps_user_command() {
        let registry = NodeRegistry::default();
        let mut cfg = node("linux");
        cfg.cmd = String::from("sleep infinity");

        let cfg = registry.adapter("linux").unwrap().init(cfg, &mgmt()).unwrap();
        assert_eq!(cfg.cmd, "sleep infinity");
        assert!(cfg.env.is_empty());
    }

    #[test]
    fn test_unknown_kind() {
        let err = NodeRegistry::default().adapter("ceos").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_kind_policy_from_descriptors() {
        let mut registry = NodeRegistry::default();
        let policy = registry.kind_policy();
        assert!(policy.requires_ca("srl"));
        assert!(!policy.requires_ca("vr-csr"));

        let mut csr = NodeDescriptor::vrnetlab("vr-csr");
        csr.requires_ca = true;
        registry.register(csr);
        assert!(registry.kind_policy().requires_ca("vr-csr"));
    }

    #[test]
    fn test_bad_template_is_template_error() {
        let mut descriptor = NodeDescriptor::vrnetlab("vr-x");
        descriptor.cmd_template = Some(String::from("{{ env.NOPE }}"));
        let err = NodeAdapter::new(&descriptor).init(node("vr-x"), &mgmt()).unwrap_err();
        assert!(matches!(err, LabCaError::Template(_)));
    }
}
