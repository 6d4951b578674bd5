use {
    super::{spawn::Spawn, Vcs, WorkspaceSource},
    crate::types::{
        workspace::{join_location, ROOT_LOCATION},
        DeclaredDependency, DependencyKind, PublishOptions, Workspace, WorkspaceManifest,
    },
    anyhow::{Context, Result},
    async_trait::async_trait,
    cargo_metadata::{DependencyKind as CargoDependencyKind, Metadata, Package},
    log::debug,
    semver::Version,
    std::{
        collections::HashSet,
        path::{Path, PathBuf},
    },
    toml_edit::DocumentMut,
};

pub const MANIFEST_FILE: &str = "Cargo.toml";

/// How a `Cargo.toml` declares its package version.
#[derive(Debug, PartialEq, Eq)]
pub enum DeclaredVersion {
    Literal(String),
    /// `version.workspace = true`
    Inherited,
}

pub fn declared_version(doc: &DocumentMut) -> Option<DeclaredVersion> {
    let version = doc
        .get("package")
        .and_then(|package| package.get("version"))?;
    if let Some(version) = version.as_str() {
        return Some(DeclaredVersion::Literal(version.to_string()));
    }
    version
        .get("workspace")
        .and_then(|workspace| workspace.as_bool())
        .filter(|inherited| *inherited)
        .map(|_| DeclaredVersion::Inherited)
}

pub fn workspace_version(doc: &DocumentMut) -> Option<String> {
    doc.get("workspace")
        .and_then(|workspace| workspace.get("package"))
        .and_then(|package| package.get("version"))
        .and_then(|version| version.as_str())
        .map(str::to_string)
}

/// Cargo workspace members, read through `cargo metadata`.
pub struct Cargo {
    root: PathBuf,
    metadata: Metadata,
}

impl Cargo {
    pub async fn load(dir: &Path) -> Result<Self> {
        let metadata: Metadata = Spawn::new(
            "cargo",
            ["metadata", "--no-deps", "--format-version", "1"],
        )
        .current_dir(dir)
        .assert_success()
        .json()
        .await
        .context("failed to read cargo metadata")?;
        Ok(Self {
            root: metadata.workspace_root.clone().into_std_path_buf(),
            metadata,
        })
    }

    fn manifest_path(&self, workspace: &Workspace) -> PathBuf {
        self.root.join(workspace.path_of(self.manifest_file()))
    }

    fn manifest_of(&self, package: &Package) -> WorkspaceManifest {
        let location = package
            .manifest_path
            .parent()
            .and_then(|dir| dir.strip_prefix(&self.metadata.workspace_root).ok())
            .map(|dir| dir.as_str())
            .filter(|dir| !dir.is_empty())
            .unwrap_or(ROOT_LOCATION)
            .to_string();

        let mut dependencies: Vec<_> = package
            .dependencies
            .iter()
            .filter_map(|dependency| {
                let kind = match dependency.kind {
                    CargoDependencyKind::Normal if dependency.optional => {
                        DependencyKind::Optional
                    }
                    CargoDependencyKind::Normal => DependencyKind::Normal,
                    CargoDependencyKind::Build => DependencyKind::Build,
                    _ => return None,
                };
                Some(DeclaredDependency::new(
                    dependency.name.clone(),
                    dependency.req.to_string(),
                    kind,
                ))
            })
            .collect();
        dependencies.sort_by_key(|dependency| dependency.kind);

        WorkspaceManifest {
            location,
            name: package.name.to_string(),
            version: package.version.to_string(),
            private: matches!(package.publish.as_deref(), Some([])),
            dependencies,
        }
    }
}

async fn manifest_at_ref(vcs: &dyn Vcs, reference: &str, path: &str) -> Option<DocumentMut> {
    let text = match vcs.file_at_ref(reference, path).await {
        Ok(text) => text?,
        Err(e) => {
            debug!("failed to read {path} at {reference}: {e:#}");
            return None;
        }
    };
    text.parse::<DocumentMut>().ok()
}

/// Package version of the `Cargo.toml` at `location` as of `reference`,
/// resolving `version.workspace = true` through the root manifest at the
/// same reference.
pub async fn version_at_ref(vcs: &dyn Vcs, reference: &str, location: &str) -> Option<Version> {
    let doc = manifest_at_ref(vcs, reference, &join_location(location, MANIFEST_FILE)).await?;
    let version = match declared_version(&doc)? {
        DeclaredVersion::Literal(version) => version,
        DeclaredVersion::Inherited if location == ROOT_LOCATION => workspace_version(&doc)?,
        DeclaredVersion::Inherited => {
            let root = manifest_at_ref(vcs, reference, MANIFEST_FILE).await?;
            workspace_version(&root)?
        }
    };
    Version::parse(version.trim()).ok()
}

#[async_trait]
impl WorkspaceSource for Cargo {
    fn root(&self) -> &Path {
        &self.root
    }

    fn manifest_file(&self) -> &'static str {
        MANIFEST_FILE
    }

    async fn list_workspaces(&self) -> Result<Vec<WorkspaceManifest>> {
        let members: HashSet<_> = self.metadata.workspace_members.iter().collect();
        Ok(self
            .metadata
            .packages
            .iter()
            .filter(|package| members.contains(&package.id))
            .map(|package| self.manifest_of(package))
            .collect())
    }

    async fn version_at_ref(
        &self,
        vcs: &dyn Vcs,
        reference: &str,
        location: &str,
    ) -> Option<Version> {
        version_at_ref(vcs, reference, location).await
    }
}

#[async_trait]
impl super::Registry for Cargo {
    async fn exists(&self, name: &str, version: &Version) -> Result<bool> {
        // outside the workspace so a local package of the same name is not
        // reported instead of the registry one
        Spawn::new("cargo", ["info".to_string(), format!("{name}@{version}")])
            .current_dir(std::env::temp_dir())
            .wait()
            .await
    }

    async fn publish(&self, workspace: &Workspace, options: &PublishOptions) -> Result<()> {
        if let Some(channel) = &options.channel {
            debug!("crates.io has no distribution channels, ignoring {channel}");
        }
        let manifest_path = self.manifest_path(workspace);
        let mut args = vec![
            "publish".to_string(),
            "--manifest-path".to_string(),
            manifest_path.display().to_string(),
        ];
        if options.dry_run {
            args.push("--dry-run".to_string());
        }
        Spawn::new("cargo", args)
            .current_dir(&self.root)
            .assert_success()
            .wait()
            .await?;
        Ok(())
    }
}
