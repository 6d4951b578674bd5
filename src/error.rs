use {semver::Version, thiserror::Error};

/// Fatal problems with the workspace set itself. Raised before any
/// validation or publishing runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("Workspace \"{name}\" version is invalid ({version}).")]
    InvalidVersion { name: String, version: String },

    #[error("Workspace name \"{name}\" is used more than once.")]
    DuplicateName { name: String },

    #[error("Dependency cycle detected ({}).", names.join(", "))]
    DependencyCycle { names: Vec<String> },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReleaseError {
    #[error("{name}: Use a prerelease version (found v{version}).")]
    PrereleaseRequired { name: String, version: Version },

    #[error("{count} workspace problem(s) must be fixed before release.")]
    Violations { count: usize },

    #[error("All changes must be committed.")]
    Uncommitted { files: Vec<String> },
}

/// A spawned process returned a non-zero exit code where success was
/// required.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Spawned process returned non-zero exit code ({exit_code}).")]
pub struct SpawnError {
    pub command: String,
    pub exit_code: i32,
    pub output: String,
    pub env: Vec<(String, String)>,
}
