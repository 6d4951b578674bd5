use {
    super::{spawn::Spawn, Registry, Vcs, WorkspaceSource},
    crate::types::{
        workspace::{join_location, ROOT_LOCATION},
        DeclaredDependency, DependencyKind, PublishOptions, Workspace, WorkspaceManifest,
    },
    anyhow::{Context, Result},
    async_trait::async_trait,
    log::debug,
    semver::Version,
    serde::Deserialize,
    std::{
        collections::BTreeMap,
        path::{Path, PathBuf},
    },
};

pub const MANIFEST_FILE: &str = "package.json";

/// `package.json` fields the release checks care about. Everything is
/// optional here; entries without a name or version are dropped.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    location: Option<String>,
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    private: Option<bool>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    peer_dependencies: BTreeMap<String, String>,
}

impl PackageJson {
    fn into_manifest(self, fallback_location: &str) -> Option<WorkspaceManifest> {
        let name = self.name.filter(|name| !name.is_empty())?;
        let version = self.version.filter(|version| !version.is_empty())?;
        let dependencies = [
            (DependencyKind::Normal, self.dependencies),
            (DependencyKind::Optional, self.optional_dependencies),
            (DependencyKind::Peer, self.peer_dependencies),
        ]
        .into_iter()
        .flat_map(|(kind, deps)| {
            deps.into_iter()
                .map(move |(name, range)| DeclaredDependency::new(name, range, kind))
        })
        .collect();
        Some(WorkspaceManifest {
            location: self
                .location
                .unwrap_or_else(|| fallback_location.to_string()),
            name,
            version,
            private: self.private.unwrap_or(false),
            dependencies,
        })
    }
}

/// Reads the `version` field of a `package.json` document.
pub fn manifest_version(text: &str) -> Option<Version> {
    #[derive(Deserialize)]
    struct VersionOnly {
        version: Option<String>,
    }
    let parsed: VersionOnly = serde_json::from_str(text).ok()?;
    Version::parse(parsed.version?.trim()).ok()
}

/// npm workspaces, driven through the `npm` CLI.
pub struct Npm {
    root: PathBuf,
}

impl Npm {
    pub async fn load(dir: &Path) -> Result<Self> {
        let prefix = Spawn::new("npm", ["prefix"])
            .current_dir(dir)
            .assert_success()
            .text()
            .await
            .context("failed to locate the npm project root")?;
        Ok(Self {
            root: PathBuf::from(prefix),
        })
    }

    fn npm<I, S>(&self, args: I) -> Spawn
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Spawn::new("npm", args).current_dir(&self.root)
    }
}

pub fn publish_args(location: &str, options: &PublishOptions) -> Vec<String> {
    let mut args = vec!["--verbose".to_string()];
    if location != ROOT_LOCATION {
        args.push("-w".to_string());
        args.push(format!("./{}", location.trim_start_matches("./")));
    }
    args.push("publish".to_string());
    if options.dry_run {
        args.push("--dry-run".to_string());
    }
    if let Some(channel) = &options.channel {
        args.push("--tag".to_string());
        args.push(channel.clone());
    }
    args
}

#[async_trait]
impl WorkspaceSource for Npm {
    fn root(&self) -> &Path {
        &self.root
    }

    fn manifest_file(&self) -> &'static str {
        MANIFEST_FILE
    }

    async fn list_workspaces(&self) -> Result<Vec<WorkspaceManifest>> {
        let members: Vec<PackageJson> = self
            .npm(["query", ".workspace"])
            .assert_success()
            .json()
            .await
            .context("failed to list npm workspaces")?;
        let root: PackageJson = self
            .npm(["pkg", "get"])
            .assert_success()
            .json()
            .await
            .context("failed to read the root package.json")?;

        let mut manifests: Vec<_> = members
            .into_iter()
            .filter_map(|member| member.into_manifest(ROOT_LOCATION))
            .collect();
        // the root is always reported at the sentinel location
        manifests.extend(
            PackageJson {
                location: None,
                ..root
            }
            .into_manifest(ROOT_LOCATION),
        );
        Ok(manifests)
    }

    async fn version_at_ref(
        &self,
        vcs: &dyn Vcs,
        reference: &str,
        location: &str,
    ) -> Option<Version> {
        let path = join_location(location, self.manifest_file());
        match vcs.file_at_ref(reference, &path).await {
            Ok(text) => text.as_deref().and_then(manifest_version),
            Err(e) => {
                debug!("failed to read {path} at {reference}: {e:#}");
                None
            }
        }
    }
}

#[async_trait]
impl Registry for Npm {
    async fn exists(&self, name: &str, version: &Version) -> Result<bool> {
        let captured = self
            .npm(["view".to_string(), format!("{name}@{version}"), "name".to_string()])
            .output()
            .await?;
        Ok(captured.success && !captured.stdout.trim().is_empty())
    }

    async fn publish(&self, workspace: &Workspace, options: &PublishOptions) -> Result<()> {
        self.npm(publish_args(&workspace.location, options))
            .assert_success()
            .wait()
            .await?;
        Ok(())
    }
}
