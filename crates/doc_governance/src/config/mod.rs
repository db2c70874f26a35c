//! Config tree loading and per-domain rule resolution.
//!
//! Each config file names its domain and may name a parent file in the same directory. A
//! domain's [`Ruleset`] is the merge of every `[rules]` table on its parent chain, with the
//! child winning on conflicting keys. `[extend]` tables append to inherited arrays instead of
//! replacing them, so a child can grow a shared vocabulary without restating it.
//!
//! ```toml
//! domain = "evidence"
//! parent = "base.toml"
//!
//! [rules]
//! required_fields = ["date"]
//!
//! [extend]
//! allowed_tags = ["benchmark"]
//! ```

mod rules;

pub use rules::{
    ChangelogRules, ChangelogSection, CommitRules, DocumentRules, LifecycleRules, MigrationRules,
};

use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

/// Default config directory, relative to the repository root.
pub const DEFAULT_CONFIG_DIR: &str = "tools/governance";

#[derive(Debug, Deserialize)]
struct ConfigFile {
    domain: String,
    parent: Option<String>,
    #[serde(default)]
    rules: Table,
    #[serde(default)]
    extend: Table,
}

/// One config file in the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigNode {
    /// File name, used as the node identity and as the target of `parent` references.
    pub name: String,
    /// Domain this node declares.
    pub domain: String,
    /// Parent file name, if any.
    pub parent: Option<String>,
    /// Keys this node sets, overriding inherited values.
    pub rules: Table,
    /// Array keys this node appends to inherited values.
    pub extend: Table,
}

impl ConfigNode {
    /// Create a node with no rules.
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            parent: None,
            rules: Table::new(),
            extend: Table::new(),
        }
    }

    /// Set the parent reference.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set one rule key.
    pub fn with_rule(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.rules.insert(key.to_string(), value.into());
        self
    }

    /// Set one extension key.
    pub fn with_extend(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extend.insert(key.to_string(), value.into());
        self
    }

    /// Parse a node from TOML text.
    pub fn parse(name: &str, text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text).map_err(|err| ConfigError::Parse {
            path: PathBuf::from(name),
            message: err.to_string(),
        })?;
        Ok(Self {
            name: name.to_string(),
            domain: file.domain,
            parent: file.parent,
            rules: file.rules,
            extend: file.extend,
        })
    }
}

/// Loaded, cycle-checked config tree.
#[derive(Clone, Debug)]
pub struct ConfigTree {
    nodes: BTreeMap<String, ConfigNode>,
    by_domain: BTreeMap<String, String>,
}

impl ConfigTree {
    /// Load every `*.toml` file in `dir`.
    ///
    /// Missing parents and parent cycles are rejected here, before any domain is resolved.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let read_err = |source| ConfigError::Read {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(read_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        let mut nodes = Vec::with_capacity(paths.len());
        for path in paths {
            let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let node = ConfigNode::parse(&name, &text).map_err(|err| match err {
                ConfigError::Parse { message, .. } => ConfigError::Parse {
                    path: path.clone(),
                    message,
                },
                other => other,
            })?;
            tracing::debug!(file = %name, domain = %node.domain, "loaded config node");
            nodes.push(node);
        }
        Self::from_nodes(nodes)
    }

    /// Build a tree from in-memory nodes, applying the same checks as [`ConfigTree::load`].
    pub fn from_nodes(nodes: impl IntoIterator<Item = ConfigNode>) -> Result<Self, ConfigError> {
        let mut by_name = BTreeMap::new();
        let mut by_domain: BTreeMap<String, String> = BTreeMap::new();
        for node in nodes {
            if let Some(first) = by_domain.get(&node.domain) {
                return Err(ConfigError::DuplicateDomain {
                    domain: node.domain.clone(),
                    first: first.clone(),
                    second: node.name.clone(),
                });
            }
            by_domain.insert(node.domain.clone(), node.name.clone());
            by_name.insert(node.name.clone(), node);
        }
        let tree = Self {
            nodes: by_name,
            by_domain,
        };
        for name in tree.nodes.keys() {
            tree.chain(name)?;
        }
        Ok(tree)
    }

    /// Domains declared in the tree, sorted.
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.by_domain.keys().map(String::as_str)
    }

    /// Resolve one domain into its flat ruleset.
    pub fn resolve(&self, domain: &str) -> Result<Ruleset, ConfigError> {
        let leaf = self
            .by_domain
            .get(domain)
            .ok_or_else(|| ConfigError::UnknownDomain(domain.to_string()))?;
        let chain = self.chain(leaf)?;

        let mut rules = Table::new();
        for node in chain.iter().rev() {
            for (key, value) in &node.rules {
                rules.insert(key.clone(), value.clone());
            }
            for (key, value) in &node.extend {
                let merged = extend_value(rules.get(key), value).ok_or_else(|| {
                    ConfigError::InvalidRule {
                        domain: domain.to_string(),
                        message: format!(
                            "`{}` extends `{key}` but only arrays can be extended",
                            node.name
                        ),
                    }
                })?;
                rules.insert(key.clone(), merged);
            }
        }

        Ok(Ruleset {
            domain: domain.to_string(),
            chain: chain.iter().map(|node| node.name.clone()).collect(),
            rules,
        })
    }

    /// Leaf-first parent chain of `name`.
    fn chain(&self, name: &str) -> Result<Vec<&ConfigNode>, ConfigError> {
        let mut path: Vec<&ConfigNode> = Vec::new();
        let mut current = name;
        loop {
            if path.iter().any(|node| node.name == current) {
                let mut chain: Vec<String> = path.iter().map(|node| node.name.clone()).collect();
                chain.push(current.to_string());
                return Err(ConfigError::Cycle { chain });
            }
            let node = match self.nodes.get(current) {
                Some(node) => node,
                None => {
                    return Err(ConfigError::Missing {
                        child: path.last().map(|n| n.name.clone()).unwrap_or_default(),
                        parent: current.to_string(),
                    })
                }
            };
            path.push(node);
            match &node.parent {
                Some(parent) => current = parent,
                None => return Ok(path),
            }
        }
    }
}

fn extend_value(base: Option<&Value>, extra: &Value) -> Option<Value> {
    let Value::Array(extra) = extra else {
        return None;
    };
    let mut merged = match base {
        None => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => return None,
    };
    for item in extra {
        if !merged.contains(item) {
            merged.push(item.clone());
        }
    }
    Some(Value::Array(merged))
}

/// Immutable, flattened rules for one domain.
#[derive(Clone, Debug, PartialEq)]
pub struct Ruleset {
    domain: String,
    chain: Vec<String>,
    rules: Table,
}

impl Ruleset {
    /// Domain this ruleset was resolved for.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Config files that contributed, leaf first.
    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    /// Raw rule value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.rules.get(key)
    }

    /// String-array rule, empty when unset or not an array of strings.
    pub fn string_list(&self, key: &str) -> Vec<String> {
        match self.rules.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Deserialize the whole rule table into a typed view.
    pub fn view<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        Value::Table(self.rules.clone())
            .try_into()
            .map_err(|err: toml::de::Error| ConfigError::InvalidRule {
                domain: self.domain.clone(),
                message: err.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Value {
        Value::Array(items.iter().map(|s| Value::String((*s).into())).collect())
    }

    fn shared_tree() -> ConfigTree {
        ConfigTree::from_nodes([
            ConfigNode::new("base.toml", "base")
                .with_rule("allowed_tags", strings(&["storage", "api"]))
                .with_rule("date_format", "%Y-%m-%d"),
            ConfigNode::new("evidence.toml", "evidence")
                .with_parent("base.toml")
                .with_rule("required_fields", strings(&["date"])),
            ConfigNode::new("adr.toml", "adr")
                .with_parent("base.toml")
                .with_rule("date_format", "%d.%m.%Y")
                .with_extend("allowed_tags", strings(&["api", "decision"])),
        ])
        .expect("tree")
    }

    #[test]
    fn child_inherits_unset_keys_from_parent() {
        let ruleset = shared_tree().resolve("evidence").expect("resolve");
        assert_eq!(ruleset.string_list("required_fields"), vec!["date"]);
        assert_eq!(ruleset.string_list("allowed_tags"), vec!["storage", "api"]);
        assert_eq!(ruleset.chain(), ["evidence.toml", "base.toml"]);
    }

    #[test]
    fn child_keys_override_and_extend_appends() {
        let ruleset = shared_tree().resolve("adr").expect("resolve");
        assert_eq!(
            ruleset.get("date_format").and_then(Value::as_str),
            Some("%d.%m.%Y")
        );
        assert_eq!(
            ruleset.string_list("allowed_tags"),
            vec!["storage", "api", "decision"]
        );
    }

    #[test]
    fn resolve_is_deterministic() {
        let tree = shared_tree();
        assert_eq!(tree.resolve("adr").unwrap(), tree.resolve("adr").unwrap());
    }

    #[test]
    fn cycles_are_rejected_at_load_time() {
        let err = ConfigTree::from_nodes([
            ConfigNode::new("a.toml", "a").with_parent("b.toml"),
            ConfigNode::new("b.toml", "b").with_parent("a.toml"),
        ])
        .expect_err("cycle");
        match err {
            ConfigError::Cycle { chain } => assert_eq!(chain, ["a.toml", "b.toml", "a.toml"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_parent_is_reported() {
        let err = ConfigTree::from_nodes([ConfigNode::new("a.toml", "a").with_parent("gone.toml")])
            .expect_err("missing");
        assert!(matches!(
            err,
            ConfigError::Missing { ref child, ref parent } if child == "a.toml" && parent == "gone.toml"
        ));
    }

    #[test]
    fn extending_a_scalar_is_invalid() {
        let tree = ConfigTree::from_nodes([
            ConfigNode::new("base.toml", "base").with_rule("date_format", "%Y"),
            ConfigNode::new("adr.toml", "adr")
                .with_parent("base.toml")
                .with_extend("date_format", strings(&["%m"])),
        ])
        .expect("tree");
        assert!(matches!(
            tree.resolve("adr"),
            Err(ConfigError::InvalidRule { .. })
        ));
    }

    #[test]
    fn load_reads_config_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("base.toml"),
            "domain = \"base\"\n[rules]\nallowed_tags = [\"storage\"]\n",
        )
        .expect("write base");
        fs::write(
            dir.path().join("evidence.toml"),
            "domain = \"evidence\"\nparent = \"base.toml\"\n[rules]\nrequired_fields = [\"date\"]\n",
        )
        .expect("write evidence");
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write note");

        let tree = ConfigTree::load(dir.path()).expect("load");
        assert_eq!(tree.domains().collect::<Vec<_>>(), vec!["base", "evidence"]);
        let ruleset = tree.resolve("evidence").expect("resolve");
        assert_eq!(ruleset.string_list("allowed_tags"), vec!["storage"]);
    }

    #[test]
    fn load_reports_invalid_toml_with_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("broken.toml"), "domain = [").expect("write");
        let err = ConfigTree::load(dir.path()).expect_err("invalid");
        assert!(err.to_string().contains("broken.toml"));
    }
}
