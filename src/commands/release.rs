use {
    super::{ensure_committed, Session, WorkspaceArgs},
    crate::{
        error::ReleaseError,
        types::{PublishOptions, ReleaseOutcome, ReleaseStep, SkipReason, Workspace, WorkspaceSet},
        utils::{Registry, Vcs},
    },
    anyhow::{Context, Result},
    clap::Args,
    log::{error, info},
    std::time::{SystemTime, UNIX_EPOCH},
};

/// Channel used for prerelease versions when none is configured.
pub const PRERELEASE_CHANNEL: &str = "prerelease";

#[derive(Args, Debug)]
pub struct CommandArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Do not create or push a release tag
    #[arg(long)]
    pub no_tag: bool,

    /// Run the registry publish in dry-run mode, without tagging
    #[arg(long)]
    pub dry_run: bool,

    /// Only release prerelease versions
    #[arg(long)]
    pub prerelease: bool,

    /// Publish channel (npm dist-tag)
    #[arg(long, env = "NPM_CONFIG_TAG")]
    pub channel: Option<String>,

    /// Skip the uncommitted changes check
    #[arg(long)]
    pub allow_dirty: bool,
}

#[derive(Debug, Clone)]
pub struct ReleaseOptions {
    pub tag: bool,
    pub dry_run: bool,
    pub prerelease: bool,
    pub channel: Option<String>,
}

impl Default for ReleaseOptions {
    fn default() -> Self {
        Self {
            tag: true,
            dry_run: false,
            prerelease: false,
            channel: None,
        }
    }
}

pub fn tag_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis());
    format!("release-{millis}")
}

pub fn tag_message(workspaces: &[&Workspace]) -> String {
    workspaces
        .iter()
        .map(|workspace| format!("{}@{}", workspace.name, workspace.version))
        .collect::<Vec<_>>()
        .join("\n")
}

fn skip_reason(workspace: &Workspace) -> Option<SkipReason> {
    if workspace.is_release_candidate() {
        None
    } else if workspace.private {
        Some(SkipReason::Private)
    } else {
        Some(SkipReason::Published)
    }
}

fn publish_options(workspace: &Workspace, options: &ReleaseOptions) -> PublishOptions {
    let channel = options.channel.clone().or_else(|| {
        workspace
            .is_prerelease()
            .then(|| PRERELEASE_CHANNEL.to_string())
    });
    PublishOptions {
        prerelease: workspace.is_prerelease(),
        dry_run: options.dry_run,
        channel,
    }
}

/// Tags the release and publishes every public workspace that is modified or
/// unpublished, in dependency order. Stops at the first failure.
pub async fn release(
    set: &WorkspaceSet,
    options: &ReleaseOptions,
    vcs: &dyn Vcs,
    registry: &dyn Registry,
) -> Result<ReleaseOutcome> {
    let publishable = set
        .iter()
        .filter(|workspace| skip_reason(workspace).is_none())
        .collect::<Vec<_>>();
    if publishable.is_empty() {
        info!("Nothing to release.");
        return Ok(ReleaseOutcome::NothingToRelease);
    }

    let tag = if options.tag && !options.dry_run {
        let name = tag_name();
        vcs.create_annotated_tag(&name, &tag_message(&publishable))
            .await
            .with_context(|| format!("failed to create tag {name}"))?;
        vcs.push_tag(&name)
            .await
            .with_context(|| format!("failed to push tag {name}"))?;
        info!("tagged {name}");
        Some(name)
    } else {
        None
    };

    let mut steps = vec![];
    for workspace in set {
        let name = &workspace.name;
        let version = &workspace.version;
        if let Some(reason) = skip_reason(workspace) {
            info!("{name}: skipped v{version} ({reason}).");
            steps.push(ReleaseStep::Skipped {
                name: name.clone(),
                version: version.clone(),
                reason,
            });
            continue;
        }

        if options.prerelease && !workspace.is_prerelease() {
            error!("{name}: failed.");
            return Err(ReleaseError::PrereleaseRequired {
                name: name.clone(),
                version: version.clone(),
            }
            .into());
        }

        let why = if workspace.modified {
            "modified"
        } else {
            "unpublished"
        };
        info!("{name}: publishing v{version} ({why})...");
        let publish = publish_options(workspace, options);
        if let Err(err) = registry.publish(workspace, &publish).await {
            error!("{name}: failed.");
            return Err(err.context(format!("failed to publish {name} v{version}")));
        }
        info!("{name}: succeeded.");
        steps.push(ReleaseStep::Published {
            name: name.clone(),
            version: version.clone(),
        });
    }

    Ok(ReleaseOutcome::Released { tag, steps })
}

pub async fn run(args: CommandArgs) -> Result<()> {
    let session = Session::open(&args.workspace).await?;
    if !args.allow_dirty {
        ensure_committed(&session.git).await?;
    }
    if args.dry_run {
        info!("dry run: nothing will be tagged");
    }

    let set = session.workspaces().await?;
    let options = ReleaseOptions {
        tag: !args.no_tag && session.config.tag,
        dry_run: args.dry_run,
        prerelease: args.prerelease || session.config.prerelease,
        channel: args
            .channel
            .filter(|channel| !channel.is_empty())
            .or_else(|| session.config.channel.clone()),
    };

    release(&set, &options, &session.git, session.backend.registry()).await?;
    Ok(())
}
