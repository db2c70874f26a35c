//! Shared command context passed into command families.

use crate::runtime::error::{XtaskError, XtaskResult};
use crate::runtime::git::GitRepo;
use doc_governance::{
    CommitRules, ConfigTree, DocumentRules, RecordSet, ReferenceIndex, DEFAULT_CONFIG_DIR,
};
use std::env;
use std::path::{Path, PathBuf};

/// Environment override for the governance config directory.
pub const CONFIG_DIR_ENV: &str = "GOVERNANCE_CONFIG_DIR";

/// Domain holding commit and changelog rules.
pub const COMMIT_DOMAIN: &str = "commit";

/// Shared execution context for xtask command families.
#[derive(Clone, Debug)]
pub struct CommandContext {
    root: PathBuf,
    config_dir: PathBuf,
    git: GitRepo,
}

impl CommandContext {
    /// Create a context rooted at the current workspace.
    ///
    /// The config directory comes from `GOVERNANCE_CONFIG_DIR` when set, else
    /// `tools/governance` under the workspace root.
    pub fn new() -> XtaskResult<Self> {
        let root = workspace_root()?;
        let config_dir = env::var_os(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| root.join(DEFAULT_CONFIG_DIR));
        Ok(Self::with_paths(root, config_dir))
    }

    /// Create a context with explicit paths.
    pub fn with_paths(root: PathBuf, config_dir: PathBuf) -> Self {
        let git = GitRepo::new(root.clone());
        Self {
            root,
            config_dir,
            git,
        }
    }

    /// Replace the config directory, resolving relative paths against the workspace root.
    pub fn with_config_dir(mut self, config_dir: Option<&Path>) -> Self {
        if let Some(dir) = config_dir {
            self.config_dir = self.root.join(dir);
        }
        self
    }

    /// Workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Governance config directory.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Shared git access.
    pub fn git(&self) -> &GitRepo {
        &self.git
    }

    /// Load and cycle-check the config tree.
    pub fn config_tree(&self) -> XtaskResult<ConfigTree> {
        ConfigTree::load(&self.config_dir)
            .map_err(|err| XtaskError::from(err).with_path(&self.config_dir))
    }

    /// Typed rules for a document domain.
    pub fn document_rules(&self, tree: &ConfigTree, domain: &str) -> XtaskResult<DocumentRules> {
        let ruleset = tree.resolve(domain)?;
        tracing::debug!(domain, chain = ?ruleset.chain(), "resolved document rules");
        Ok(DocumentRules::from_ruleset(&ruleset)?)
    }

    /// Typed rules for commit messages and changelogs.
    pub fn commit_rules(&self, tree: &ConfigTree) -> XtaskResult<CommitRules> {
        let ruleset = tree.resolve(COMMIT_DOMAIN)?;
        tracing::debug!(chain = ?ruleset.chain(), "resolved commit rules");
        Ok(CommitRules::from_ruleset(&ruleset)?)
    }

    /// Reference namespace for `set`: its own ids plus every `reference_domains` entry.
    pub fn references(&self, tree: &ConfigTree, set: &RecordSet) -> XtaskResult<ReferenceIndex> {
        let mut references = ReferenceIndex::new();
        references.add_domain(set.domain(), set.rules(), set.ids());
        for domain in &set.rules().reference_domains {
            if domain == set.domain() {
                continue;
            }
            let rules = self.document_rules(tree, domain)?;
            let other = RecordSet::load(&self.root, domain, &rules)
                .map_err(|err| XtaskError::from(err).with_operation(format!("load `{domain}`")))?;
            references.add_domain(domain, &rules, other.ids());
        }
        Ok(references)
    }
}

fn workspace_root() -> XtaskResult<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| XtaskError::environment("xtask lives under workspace root"))
}
