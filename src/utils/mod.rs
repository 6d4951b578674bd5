//! Thin wrappers around the outside world: git, package registries and
//! workspace enumeration. The release logic only talks to these traits.

pub mod cargo;
pub mod fs;
pub mod git;
pub mod npm;
pub mod spawn;

#[cfg(test)]
pub(crate) mod testing;

use {
    crate::types::{BaseRef, PublishOptions, Workspace, WorkspaceManifest},
    anyhow::Result,
    async_trait::async_trait,
    semver::Version,
    std::path::Path,
};

pub use cargo::Cargo;
pub use fs::{read_optional, read_optional_lossy};
pub use git::Git;
pub use npm::Npm;
pub use spawn::Spawn;

#[async_trait]
pub trait Vcs: Send + Sync {
    /// Content of `path` as committed at `reference`, `None` if it did not
    /// exist there (or cannot be read).
    async fn file_at_ref(&self, reference: &str, path: &str) -> Result<Option<String>>;

    /// Whether anything under `path` changed since `reference`, including
    /// uncommitted changes.
    async fn is_path_modified(&self, reference: &str, path: &str) -> Result<bool>;

    async fn describe_latest_tag(&self) -> Result<Option<String>>;

    /// Uncommitted files, relative to the repository root.
    async fn uncommitted(&self) -> Result<Vec<String>>;

    async fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()>;

    async fn push_tag(&self, name: &str) -> Result<()>;

    /// Make sure the history needed to compare against `base` is local.
    async fn prepare_history(&self, _base: &BaseRef) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait Registry: Send + Sync {
    /// Whether `name@version` already exists in the registry.
    async fn exists(&self, name: &str, version: &Version) -> Result<bool>;

    async fn publish(&self, workspace: &Workspace, options: &PublishOptions) -> Result<()>;
}

#[async_trait]
pub trait WorkspaceSource: Send + Sync {
    /// Directory every workspace location is relative to.
    fn root(&self) -> &Path;

    /// File name of a workspace manifest, e.g. `Cargo.toml`.
    fn manifest_file(&self) -> &'static str;

    async fn list_workspaces(&self) -> Result<Vec<WorkspaceManifest>>;

    /// Version declared by the manifest at `location` as of `reference`.
    /// Absent, unreadable or unparseable manifests yield `None`.
    async fn version_at_ref(&self, vcs: &dyn Vcs, reference: &str, location: &str)
        -> Option<Version>;
}
