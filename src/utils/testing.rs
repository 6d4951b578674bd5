//! In-memory stand-ins for git, registries and workspace enumeration.

use {
    super::{Registry, Vcs, WorkspaceSource},
    crate::types::{
        DeclaredDependency, DependencyKind, PublishOptions, Workspace, WorkspaceManifest,
    },
    anyhow::{anyhow, Result},
    async_trait::async_trait,
    semver::Version,
    std::{
        collections::{HashMap, HashSet},
        path::{Path, PathBuf},
        sync::Mutex,
    },
};

#[derive(Default)]
pub struct FakeVcs {
    files: HashMap<(String, String), String>,
    modified: HashSet<String>,
    latest_tag: Option<String>,
    uncommitted: Vec<String>,
    pub tags: Mutex<Vec<(String, String)>>,
    pub pushed: Mutex<Vec<String>>,
}

impl FakeVcs {
    pub fn with_file(mut self, reference: &str, path: &str, content: &str) -> Self {
        self.files.insert(
            (reference.to_string(), path.to_string()),
            content.to_string(),
        );
        self
    }

    pub fn with_modified(mut self, path: &str) -> Self {
        self.modified.insert(path.to_string());
        self
    }

    pub fn with_latest_tag(mut self, tag: &str) -> Self {
        self.latest_tag = Some(tag.to_string());
        self
    }

    pub fn with_uncommitted(mut self, path: &str) -> Self {
        self.uncommitted.push(path.to_string());
        self
    }
}

#[async_trait]
impl Vcs for FakeVcs {
    async fn file_at_ref(&self, reference: &str, path: &str) -> Result<Option<String>> {
        Ok(self
            .files
            .get(&(reference.to_string(), path.to_string()))
            .cloned())
    }

    async fn is_path_modified(&self, _reference: &str, path: &str) -> Result<bool> {
        Ok(self.modified.contains(path))
    }

    async fn describe_latest_tag(&self) -> Result<Option<String>> {
        Ok(self.latest_tag.clone())
    }

    async fn uncommitted(&self) -> Result<Vec<String>> {
        Ok(self.uncommitted.clone())
    }

    async fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        self.tags
            .lock()
            .unwrap()
            .push((name.to_string(), message.to_string()));
        Ok(())
    }

    async fn push_tag(&self, name: &str) -> Result<()> {
        self.pushed.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    published: HashSet<String>,
    failing: HashSet<String>,
    pub publishes: Mutex<Vec<(String, PublishOptions)>>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn with_published(mut self, name: &str, version: &str) -> Self {
        self.published.insert(format!("{name}@{version}"));
        self
    }

    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn published_names(&self) -> Vec<String> {
        self.publishes
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn exists(&self, name: &str, version: &Version) -> Result<bool> {
        let key = format!("{name}@{version}");
        self.queries.lock().unwrap().push(key.clone());
        Ok(self.published.contains(&key))
    }

    async fn publish(&self, workspace: &Workspace, options: &PublishOptions) -> Result<()> {
        if self.failing.contains(&workspace.name) {
            return Err(anyhow!("failed to publish {}", workspace.name));
        }
        self.publishes
            .lock()
            .unwrap()
            .push((workspace.name.clone(), options.clone()));
        Ok(())
    }
}

/// Manifests plus `package.json`-style historical versions.
pub struct FakeSource {
    root: PathBuf,
    manifests: Vec<WorkspaceManifest>,
}

impl FakeSource {
    pub fn new(root: &Path, manifests: Vec<WorkspaceManifest>) -> Self {
        Self {
            root: root.to_path_buf(),
            manifests,
        }
    }
}

#[async_trait]
impl WorkspaceSource for FakeSource {
    fn root(&self) -> &Path {
        &self.root
    }

    fn manifest_file(&self) -> &'static str {
        super::npm::MANIFEST_FILE
    }

    async fn list_workspaces(&self) -> Result<Vec<WorkspaceManifest>> {
        Ok(self.manifests.clone())
    }

    async fn version_at_ref(
        &self,
        vcs: &dyn Vcs,
        reference: &str,
        location: &str,
    ) -> Option<Version> {
        let path = crate::types::workspace::join_location(location, self.manifest_file());
        let text = vcs.file_at_ref(reference, &path).await.ok()??;
        super::npm::manifest_version(&text)
    }
}

pub fn manifest(name: &str, version: &str, deps: &[(&str, &str)]) -> WorkspaceManifest {
    WorkspaceManifest {
        location: format!("packages/{name}"),
        name: name.to_string(),
        version: version.to_string(),
        private: false,
        dependencies: deps
            .iter()
            .map(|(name, range)| DeclaredDependency::new(*name, *range, DependencyKind::Normal))
            .collect(),
    }
}

/// A workspace that is modified, unpublished and public unless adjusted.
pub fn workspace(name: &str, version: &str, deps: &[(&str, &str)]) -> Workspace {
    Workspace {
        location: format!("packages/{name}"),
        name: name.to_string(),
        version: Version::parse(version).unwrap(),
        private: false,
        modified: true,
        published: false,
        dependencies: deps
            .iter()
            .map(|(name, range)| crate::types::LocalDependency {
                name: name.to_string(),
                range: range.to_string(),
                kind: DependencyKind::Normal,
            })
            .collect(),
    }
}
