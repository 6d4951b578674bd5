use {
    crate::{
        changelog::get_changelog_diff,
        types::{BaseRef, ChangelogDiff, VersionDiff, Workspace},
        utils::{Vcs, WorkspaceSource},
        version::get_version_diff,
    },
    anyhow::Result,
    std::collections::HashMap,
};

/// Version and changelog diffs, looked up at most once per workspace for
/// the life of one invocation.
pub struct DiffCache<'a> {
    vcs: &'a dyn Vcs,
    source: &'a dyn WorkspaceSource,
    base: &'a BaseRef,
    version_diffs: HashMap<String, VersionDiff>,
    changelog_diffs: HashMap<String, ChangelogDiff>,
}

impl<'a> DiffCache<'a> {
    pub fn new(vcs: &'a dyn Vcs, source: &'a dyn WorkspaceSource, base: &'a BaseRef) -> Self {
        Self {
            vcs,
            source,
            base,
            version_diffs: HashMap::new(),
            changelog_diffs: HashMap::new(),
        }
    }

    pub fn base(&self) -> &BaseRef {
        self.base
    }

    pub async fn version_diff(&mut self, workspace: &Workspace) -> VersionDiff {
        if let Some(diff) = self.version_diffs.get(&workspace.name) {
            return *diff;
        }
        let diff = get_version_diff(self.vcs, self.source, self.base, workspace).await;
        self.version_diffs.insert(workspace.name.clone(), diff);
        diff
    }

    pub async fn changelog_diff(&mut self, workspace: &Workspace) -> Result<ChangelogDiff> {
        if let Some(diff) = self.changelog_diffs.get(&workspace.name) {
            return Ok(*diff);
        }
        let diff =
            get_changelog_diff(self.source.root(), &workspace.location, &workspace.version).await?;
        self.changelog_diffs.insert(workspace.name.clone(), diff);
        Ok(diff)
    }
}
