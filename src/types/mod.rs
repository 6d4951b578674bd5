pub mod diff;
pub mod publish;
pub mod workspace;

pub use diff::{BaseRef, ChangelogDiff, ReleaseType, VersionDiff};
pub use publish::{PublishOptions, ReleaseOutcome, ReleaseStep, SkipReason};
pub use workspace::{
    DeclaredDependency, DependencyKind, LocalDependency, Workspace, WorkspaceManifest,
    WorkspaceSet,
};
