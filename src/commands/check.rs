use {
    super::{ensure_committed, Session, WorkspaceArgs},
    crate::{
        error::ReleaseError,
        lookup::DiffCache,
        types::{ChangelogDiff, DependencyKind, ReleaseType, VersionDiff, Workspace, WorkspaceSet},
        version::{min_version, precedence},
    },
    anyhow::Result,
    clap::Args,
    log::{error, info},
    semver::Version,
    std::{cmp::Ordering, fmt},
};

#[derive(Args, Debug)]
pub struct CommandArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Require prerelease versions for every released workspace
    #[arg(long)]
    pub prerelease: bool,

    /// Skip the uncommitted changes check
    #[arg(long)]
    pub allow_dirty: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub prerelease: bool,
}

/// One broken release rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    IncrementVersion,
    UsePrerelease,
    AddChangelogSection { version: Version },
    /// The changelog documents a smaller change than the version increment.
    IncrementToMatchChangelog { documented: ReleaseType },
    /// The version increment is smaller than what the changelog documents.
    DocumentChanges { actual: ReleaseType },
    PrivateDependency { name: String, kind: DependencyKind },
    StaleDependencyRange { name: String, version: Version },
    AlreadyPublished,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::IncrementVersion => write!(f, "Increment the version."),
            Problem::UsePrerelease => write!(f, "Use a prerelease version."),
            Problem::AddChangelogSection { version } => {
                write!(f, "Add a {version} section to the changelog.")
            }
            Problem::IncrementToMatchChangelog { documented } => {
                write!(f, "Increment the {documented} version to match the changelog.")
            }
            Problem::DocumentChanges { actual } => {
                write!(f, "Document the {actual} changes in the changelog.")
            }
            Problem::PrivateDependency { name, kind } => write!(
                f,
                "Move the local private \"{name}\" dependency from {kind} to dev dependencies."
            ),
            Problem::StaleDependencyRange { name, version } => write!(
                f,
                "Update the \"{name}\" dependency version range to make {version} the lower bound."
            ),
            Problem::AlreadyPublished => write!(f, "Use an unpublished version."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub workspace: String,
    pub problem: Problem,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.workspace, self.problem)
    }
}

/// Compares what the changelog documents with the actual version increment.
/// Combinations other than a missing section or two disagreeing release
/// types are fine.
pub fn changelog_problem(
    version: &Version,
    changelog: ChangelogDiff,
    version_diff: VersionDiff,
) -> Option<Problem> {
    match (changelog, version_diff) {
        (ChangelogDiff::Missing, _) => Some(Problem::AddChangelogSection {
            version: version.clone(),
        }),
        (ChangelogDiff::Documented(documented), Some(actual)) => match documented.cmp(&actual) {
            Ordering::Less => Some(Problem::IncrementToMatchChangelog { documented }),
            Ordering::Greater => Some(Problem::DocumentChanges { actual }),
            Ordering::Equal => None,
        },
        (ChangelogDiff::Documented(_), None) | (ChangelogDiff::NoChangelog, _) => None,
    }
}

/// In-repo dependencies must be public and their ranges must have the
/// dependency's current version as lower bound.
pub fn dependency_problems(workspace: &Workspace, set: &WorkspaceSet) -> Vec<Problem> {
    let mut problems = vec![];
    for dependency in &workspace.dependencies {
        let Some(target) = set.get(&dependency.name) else {
            continue;
        };
        if target.private {
            problems.push(Problem::PrivateDependency {
                name: dependency.name.clone(),
                kind: dependency.kind,
            });
            continue;
        }
        let current = min_version(&dependency.range)
            .is_some_and(|min| precedence(&min, &target.version) == Ordering::Equal);
        if !current {
            problems.push(Problem::StaleDependencyRange {
                name: dependency.name.clone(),
                version: target.version.clone(),
            });
        }
    }
    problems
}

async fn check_workspace(
    workspace: &Workspace,
    set: &WorkspaceSet,
    options: &CheckOptions,
    cache: &mut DiffCache<'_>,
) -> Result<Vec<Problem>> {
    let mut problems = vec![];

    let version_diff = cache.version_diff(workspace).await;
    if cache.base().is_known() && version_diff.is_none() {
        problems.push(Problem::IncrementVersion);
    }

    if options.prerelease {
        if !workspace.is_prerelease() {
            problems.push(Problem::UsePrerelease);
        }
    } else {
        let changelog = cache.changelog_diff(workspace).await?;
        problems.extend(changelog_problem(
            &workspace.version,
            changelog,
            version_diff,
        ));
    }

    problems.extend(dependency_problems(workspace, set));

    if workspace.published {
        problems.push(Problem::AlreadyPublished);
    }
    Ok(problems)
}

/// Checks every workspace that is about to be released, in dependency
/// order, and returns all violations found.
pub async fn validate(
    set: &WorkspaceSet,
    options: &CheckOptions,
    cache: &mut DiffCache<'_>,
) -> Result<Vec<Violation>> {
    let mut violations = vec![];
    for workspace in set.iter().filter(|workspace| workspace.is_release_candidate()) {
        violations.extend(
            check_workspace(workspace, set, options, cache)
                .await?
                .into_iter()
                .map(|problem| Violation {
                    workspace: workspace.name.clone(),
                    problem,
                }),
        );
    }
    Ok(violations)
}

pub async fn run(args: CommandArgs) -> Result<()> {
    let session = Session::open(&args.workspace).await?;
    if !args.allow_dirty {
        ensure_committed(&session.git).await?;
    }

    let set = session.workspaces().await?;
    if !set.iter().any(Workspace::is_release_candidate) {
        info!("No modified or unpublished workspaces.");
        return Ok(());
    }

    let options = CheckOptions {
        prerelease: args.prerelease || session.config.prerelease,
    };
    let mut cache = DiffCache::new(&session.git, session.backend.source(), &session.base);
    let violations = validate(&set, &options, &mut cache).await?;
    if !violations.is_empty() {
        for violation in &violations {
            error!("{violation}");
        }
        return Err(ReleaseError::Violations {
            count: violations.len(),
        }
        .into());
    }

    info!("All modified or unpublished workspaces are ready for release.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            graph::sort_workspaces,
            types::{BaseRef, LocalDependency},
            utils::testing::{workspace, FakeSource, FakeVcs},
        },
        pretty_assertions::assert_eq,
        std::path::Path,
    };

    fn v(version: &str) -> Version {
        Version::parse(version).unwrap()
    }

    fn set(workspaces: Vec<Workspace>) -> WorkspaceSet {
        sort_workspaces(workspaces).unwrap()
    }

    fn problems_of(violations: &[Violation], name: &str) -> Vec<Problem> {
        violations
            .iter()
            .filter(|violation| violation.workspace == name)
            .map(|violation| violation.problem.clone())
            .collect()
    }

    #[test]
    fn test_changelog_problem() {
        let version = v("2.0.0");
        assert_eq!(
            changelog_problem(&version, ChangelogDiff::Missing, Some(ReleaseType::Major)),
            Some(Problem::AddChangelogSection { version: v("2.0.0") })
        );
        assert_eq!(
            changelog_problem(&version, ChangelogDiff::Missing, None),
            Some(Problem::AddChangelogSection { version: v("2.0.0") })
        );
        assert_eq!(
            changelog_problem(
                &version,
                ChangelogDiff::Documented(ReleaseType::Patch),
                Some(ReleaseType::Major)
            ),
            Some(Problem::IncrementToMatchChangelog {
                documented: ReleaseType::Patch
            })
        );
        assert_eq!(
            changelog_problem(
                &version,
                ChangelogDiff::Documented(ReleaseType::Major),
                Some(ReleaseType::Minor)
            ),
            Some(Problem::DocumentChanges {
                actual: ReleaseType::Minor
            })
        );
        assert_eq!(
            changelog_problem(
                &version,
                ChangelogDiff::Documented(ReleaseType::Minor),
                Some(ReleaseType::Minor)
            ),
            None
        );
        assert_eq!(
            changelog_problem(&version, ChangelogDiff::Documented(ReleaseType::Major), None),
            None
        );
        assert_eq!(
            changelog_problem(&version, ChangelogDiff::NoChangelog, Some(ReleaseType::Major)),
            None
        );
    }

    #[test]
    fn test_private_dependency() {
        let mut b = workspace("b", "2.0.0", &[]);
        b.private = true;
        let a = workspace("a", "1.0.0", &[("b", "^1.0.0")]);
        let set = set(vec![a, b]);

        let problems = dependency_problems(set.get("a").unwrap(), &set);
        assert_eq!(
            problems,
            vec![Problem::PrivateDependency {
                name: "b".to_string(),
                kind: DependencyKind::Normal,
            }]
        );
        assert_eq!(
            problems[0].to_string(),
            "Move the local private \"b\" dependency from dependencies to dev dependencies."
        );
    }

    #[test]
    fn test_dependency_range_must_track_current_version() {
        let set1 = set(vec![
            workspace("x", "1.0.0", &[("y", "^1.2.0")]),
            workspace("y", "1.2.0", &[]),
        ]);
        assert_eq!(dependency_problems(set1.get("x").unwrap(), &set1), vec![]);

        // satisfied, but not the lower bound
        let set2 = set(vec![
            workspace("x", "1.0.0", &[("y", "^1.2.0")]),
            workspace("y", "1.3.0", &[]),
        ]);
        assert_eq!(
            dependency_problems(set2.get("x").unwrap(), &set2),
            vec![Problem::StaleDependencyRange {
                name: "y".to_string(),
                version: v("1.3.0"),
            }]
        );

        let set3 = set(vec![
            workspace("x", "1.0.0", &[("y", "workspace:*")]),
            workspace("y", "1.3.0", &[]),
        ]);
        assert_eq!(dependency_problems(set3.get("x").unwrap(), &set3).len(), 1);
    }

    #[tokio::test]
    async fn test_validate_reports_everything() {
        let root_dir = tempfile::tempdir().unwrap();
        let root = root_dir.path();
        std::fs::create_dir_all(root.join("packages/a")).unwrap();
        std::fs::write(
            root.join("packages/a/CHANGELOG.md"),
            "## 1.1.0\n### Breaking Changes\n- removed\n",
        )
        .unwrap();
        std::fs::create_dir_all(root.join("packages/b")).unwrap();
        std::fs::write(root.join("packages/b/CHANGELOG.md"), "## 0.9.0\n- old\n").unwrap();

        let vcs = FakeVcs::default()
            .with_file("v1", "packages/a/package.json", r#"{"version":"1.0.0"}"#)
            .with_file("v1", "packages/b/package.json", r#"{"version":"1.0.0"}"#)
            .with_file("v1", "packages/c/package.json", r#"{"version":"3.0.0"}"#);
        let source = FakeSource::new(root, vec![]);
        let base = BaseRef::AtRef("v1".to_string());

        let a = workspace("a", "1.1.0", &[("b", "^0.9.0")]);
        let mut b = workspace("b", "1.0.0", &[]);
        b.published = true;
        let mut c = workspace("c", "3.0.0", &[]);
        c.modified = false;
        c.published = true;
        let mut d = workspace("d", "0.1.0", &[]);
        d.private = true;
        let set = set(vec![a, b, c, d]);

        let mut cache = DiffCache::new(&vcs, &source, &base);
        let violations = validate(&set, &CheckOptions::default(), &mut cache)
            .await
            .unwrap();

        assert_eq!(
            problems_of(&violations, "a"),
            vec![
                Problem::DocumentChanges {
                    actual: ReleaseType::Minor
                },
                Problem::StaleDependencyRange {
                    name: "b".to_string(),
                    version: v("1.0.0"),
                },
            ]
        );
        assert_eq!(
            problems_of(&violations, "b"),
            vec![
                Problem::IncrementVersion,
                Problem::AddChangelogSection { version: v("1.0.0") },
                Problem::AlreadyPublished,
            ]
        );
        // unmodified and published, or private: not checked
        assert_eq!(problems_of(&violations, "c"), vec![]);
        assert_eq!(problems_of(&violations, "d"), vec![]);
        // dependency order
        assert_eq!(violations[0].workspace, "b");
        assert_eq!(violations[0].to_string(), "b: Increment the version.");

        // same inputs, same answer
        let mut cache = DiffCache::new(&vcs, &source, &base);
        let again = validate(&set, &CheckOptions::default(), &mut cache)
            .await
            .unwrap();
        assert_eq!(again, violations);
    }

    #[tokio::test]
    async fn test_validate_without_base() {
        let vcs = FakeVcs::default();
        let source = FakeSource::new(Path::new("/nonexistent"), vec![]);
        let base = BaseRef::NoBase;
        let set = set(vec![workspace("a", "1.0.0", &[])]);

        let mut cache = DiffCache::new(&vcs, &source, &base);
        let violations = validate(&set, &CheckOptions::default(), &mut cache)
            .await
            .unwrap();
        assert_eq!(violations, vec![]);
    }

    #[tokio::test]
    async fn test_validate_prerelease_mode() {
        let root_dir = tempfile::tempdir().unwrap();
        let root = root_dir.path();
        std::fs::create_dir_all(root.join("packages/a")).unwrap();
        std::fs::write(root.join("packages/a/CHANGELOG.md"), "# Changelog\n").unwrap();

        let vcs = FakeVcs::default();
        let source = FakeSource::new(root, vec![]);
        let base = BaseRef::NoBase;
        let mut peer = workspace("b", "2.0.0-beta.0", &[]);
        peer.dependencies.push(LocalDependency {
            name: "a".to_string(),
            range: "^1.0.0".to_string(),
            kind: DependencyKind::Peer,
        });
        let set = set(vec![workspace("a", "1.0.0", &[]), peer]);
        let options = CheckOptions { prerelease: true };

        let mut cache = DiffCache::new(&vcs, &source, &base);
        let violations = validate(&set, &options, &mut cache).await.unwrap();
        // no changelog complaints for a, despite the missing section
        assert_eq!(
            violations,
            vec![Violation {
                workspace: "a".to_string(),
                problem: Problem::UsePrerelease,
            }]
        );
    }
}
