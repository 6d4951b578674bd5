pub mod check;
pub mod list;
pub mod release;

use {
    crate::{
        config::Config,
        error::ReleaseError,
        graph::load_workspaces,
        types::{BaseRef, WorkspaceSet},
        utils::{fs::find_in_ancestors, Cargo, Git, Npm, Registry, Vcs, WorkspaceSource},
    },
    anyhow::{anyhow, Context, Result},
    clap::{Args, ValueEnum},
    log::{error, info},
    std::path::Path,
};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ecosystem {
    #[value(help = "Use the nearest Cargo.toml or package.json")]
    Auto,
    #[value(help = "Cargo workspace members")]
    Cargo,
    #[value(help = "npm workspaces")]
    Npm,
}

#[derive(Args, Debug, Clone)]
pub struct WorkspaceArgs {
    /// Git base reference for detecting modified workspaces
    #[arg(short, long, env = "GITHUB_BASE_REF")]
    pub base_ref: Option<String>,

    #[arg(long, value_enum, default_value_t = Ecosystem::Auto)]
    pub ecosystem: Ecosystem,
}

/// Picks the ecosystem whose manifest is closest to `dir`.
pub fn detect_ecosystem(dir: &Path) -> Result<Ecosystem> {
    let cargo = find_in_ancestors(dir, "Cargo.toml");
    let npm = find_in_ancestors(dir, "package.json");
    match (cargo, npm) {
        (Some(cargo), Some(npm)) if npm != cargo && npm.starts_with(&cargo) => Ok(Ecosystem::Npm),
        (Some(_), _) => Ok(Ecosystem::Cargo),
        (None, Some(_)) => Ok(Ecosystem::Npm),
        (None, None) => Err(anyhow!(
            "no Cargo.toml or package.json found in {} or its parents",
            dir.display()
        )),
    }
}

pub enum Backend {
    Cargo(Cargo),
    Npm(Npm),
}

impl Backend {
    pub async fn load(ecosystem: Ecosystem, dir: &Path) -> Result<Self> {
        let ecosystem = match ecosystem {
            Ecosystem::Auto => detect_ecosystem(dir)?,
            ecosystem => ecosystem,
        };
        Ok(match ecosystem {
            Ecosystem::Npm => Backend::Npm(Npm::load(dir).await?),
            Ecosystem::Cargo | Ecosystem::Auto => Backend::Cargo(Cargo::load(dir).await?),
        })
    }

    pub fn source(&self) -> &dyn WorkspaceSource {
        match self {
            Backend::Cargo(cargo) => cargo,
            Backend::Npm(npm) => npm,
        }
    }

    pub fn registry(&self) -> &dyn Registry {
        match self {
            Backend::Cargo(cargo) => cargo,
            Backend::Npm(npm) => npm,
        }
    }
}

/// `--base-ref`/`GITHUB_BASE_REF` if given, else the latest tag on the
/// first-parent chain.
pub async fn resolve_base_ref(explicit: Option<String>, vcs: &dyn Vcs) -> Result<BaseRef> {
    let base = BaseRef::from_option(explicit);
    if base.is_known() {
        return Ok(base);
    }
    Ok(BaseRef::from_option(vcs.describe_latest_tag().await?))
}

pub async fn ensure_committed(vcs: &dyn Vcs) -> Result<()> {
    let uncommitted = vcs
        .uncommitted()
        .await
        .context("failed to list uncommitted files")?;
    if uncommitted.is_empty() {
        return Ok(());
    }
    error!("All changes must be committed.");
    for file in &uncommitted {
        error!("  {file}");
    }
    Err(ReleaseError::Uncommitted { files: uncommitted }.into())
}

/// Everything one command invocation works against.
pub struct Session {
    pub backend: Backend,
    pub git: Git,
    pub config: Config,
    pub base: BaseRef,
}

impl Session {
    pub async fn open(args: &WorkspaceArgs) -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let backend = Backend::load(args.ecosystem, &cwd).await?;
        let root = backend.source().root().to_path_buf();
        let config = Config::load(&root).await?;
        let git = Git::new(
            &root,
            config.ignore_modified.as_slice(),
            config.ignore_uncommitted.as_slice(),
        )?;
        let base = resolve_base_ref(args.base_ref.clone(), &git).await?;
        info!("project root: {}", root.display());
        info!("base reference: {base}");
        Ok(Self {
            backend,
            git,
            config,
            base,
        })
    }

    /// Builds and sorts the workspace set.
    pub async fn workspaces(&self) -> Result<WorkspaceSet> {
        self.git
            .prepare_history(&self.base)
            .await
            .context("failed to prepare git history")?;
        let manifests = self.backend.source().list_workspaces().await?;
        load_workspaces(manifests, &self.base, &self.git, self.backend.registry()).await
    }
}
