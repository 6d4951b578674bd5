use {
    super::{Session, WorkspaceArgs},
    crate::types::{Workspace, WorkspaceSet},
    anyhow::Result,
    clap::Args,
    log::info,
    serde::Serialize,
};

#[derive(Args, Debug)]
pub struct CommandArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Print the workspaces as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WorkspaceSummary<'a> {
    pub name: &'a str,
    pub version: String,
    pub location: &'a str,
    pub private: bool,
    pub modified: bool,
    pub published: bool,
    pub dependencies: Vec<&'a str>,
}

impl<'a> From<&'a Workspace> for WorkspaceSummary<'a> {
    fn from(workspace: &'a Workspace) -> Self {
        Self {
            name: &workspace.name,
            version: workspace.version.to_string(),
            location: &workspace.location,
            private: workspace.private,
            modified: workspace.modified,
            published: workspace.published,
            dependencies: workspace
                .dependencies
                .iter()
                .map(|dependency| dependency.name.as_str())
                .collect(),
        }
    }
}

/// One line per workspace, e.g. `b@1.0.0 (packages/b) modified, unpublished`.
pub fn describe(workspace: &Workspace) -> String {
    let mut flags = vec![];
    if workspace.private {
        flags.push("private");
    }
    flags.push(if workspace.modified {
        "modified"
    } else {
        "unmodified"
    });
    if !workspace.private {
        flags.push(if workspace.published {
            "published"
        } else {
            "unpublished"
        });
    }
    format!(
        "{}@{} ({}) {}",
        workspace.name,
        workspace.version,
        workspace.location,
        flags.join(", ")
    )
}

pub fn to_json(set: &WorkspaceSet) -> Result<String> {
    let summaries = set.iter().map(WorkspaceSummary::from).collect::<Vec<_>>();
    Ok(serde_json::to_string_pretty(&summaries)?)
}

pub async fn run(args: CommandArgs) -> Result<()> {
    let session = Session::open(&args.workspace).await?;
    let set = session.workspaces().await?;
    if args.json {
        println!("{}", to_json(&set)?);
        return Ok(());
    }
    for workspace in &set {
        info!("{}", describe(workspace));
    }
    Ok(())
}
