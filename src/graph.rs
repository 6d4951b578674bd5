//! Builds the workspace set and orders it so every workspace comes after
//! the in-repo workspaces it depends on.

use {
    crate::{
        error::WorkspaceError,
        types::{BaseRef, LocalDependency, Workspace, WorkspaceManifest, WorkspaceSet},
        utils::{Registry, Vcs},
    },
    anyhow::{Context, Result},
    log::debug,
    semver::Version,
    std::{
        cmp::Reverse,
        collections::{BTreeSet, BinaryHeap, HashMap, HashSet},
    },
};

/// Parses every manifest and looks up its modified/published status.
///
/// Fails before any status query if a version does not parse. The result is
/// in enumeration order; see [`sort_workspaces`] for dependency order.
pub async fn build_workspaces(
    manifests: Vec<WorkspaceManifest>,
    base: &BaseRef,
    vcs: &dyn Vcs,
    registry: &dyn Registry,
) -> Result<Vec<Workspace>> {
    let names: HashSet<String> = manifests
        .iter()
        .map(|manifest| manifest.name.clone())
        .collect();

    let mut parsed = Vec::with_capacity(manifests.len());
    for manifest in manifests {
        let version =
            Version::parse(manifest.version.trim()).map_err(|_| WorkspaceError::InvalidVersion {
                name: manifest.name.clone(),
                version: manifest.version.clone(),
            })?;
        parsed.push((manifest, version));
    }

    let mut unsorted = Vec::with_capacity(parsed.len());
    for (manifest, version) in parsed {
        let modified = match base {
            BaseRef::NoBase => true,
            BaseRef::AtRef(reference) => vcs
                .is_path_modified(reference, &manifest.location)
                .await
                .with_context(|| format!("failed to check whether {} changed", manifest.name))?,
        };
        let published = if manifest.private {
            false
        } else {
            registry
                .exists(&manifest.name, &version)
                .await
                .with_context(|| {
                    format!("failed to query the registry for {}@{version}", manifest.name)
                })?
        };

        let mut dependencies: Vec<LocalDependency> = manifest
            .dependencies
            .into_iter()
            .filter(|dependency| names.contains(&dependency.name))
            .map(|dependency| LocalDependency {
                name: dependency.name,
                range: dependency.range,
                kind: dependency.kind,
            })
            .collect();
        dependencies.sort_by_key(|dependency| dependency.kind);

        debug!(
            "{}@{version} at {}: modified={modified} published={published}",
            manifest.name, manifest.location
        );
        unsorted.push(Workspace {
            location: manifest.location,
            name: manifest.name,
            version,
            private: manifest.private,
            modified,
            published,
            dependencies,
        });
    }
    Ok(unsorted)
}

/// Orders workspaces topologically.
///
/// When several workspaces are ready at once, the one enumerated first is
/// placed first, so the order is reproducible for a given input.
pub fn sort_workspaces(unsorted: Vec<Workspace>) -> Result<WorkspaceSet, WorkspaceError> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(unsorted.len());
    for (i, workspace) in unsorted.iter().enumerate() {
        if index.insert(workspace.name.as_str(), i).is_some() {
            return Err(WorkspaceError::DuplicateName {
                name: workspace.name.clone(),
            });
        }
    }

    let mut in_degree = vec![0usize; unsorted.len()];
    let mut dependents: Vec<Vec<usize>> = vec![vec![]; unsorted.len()];
    for (i, workspace) in unsorted.iter().enumerate() {
        // a name may appear under several dependency kinds
        let dependencies: BTreeSet<usize> = workspace
            .dependencies
            .iter()
            .filter_map(|dependency| index.get(dependency.name.as_str()).copied())
            .collect();
        in_degree[i] = dependencies.len();
        for dependency in dependencies {
            dependents[dependency].push(i);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(i, _)| Reverse(i))
        .collect();
    let mut order = Vec::with_capacity(unsorted.len());
    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if order.len() < unsorted.len() {
        return Err(WorkspaceError::DependencyCycle {
            names: unsorted
                .iter()
                .zip(&in_degree)
                .filter(|(_, &degree)| degree > 0)
                .map(|(workspace, _)| workspace.name.clone())
                .collect(),
        });
    }

    let mut slots: Vec<Option<Workspace>> = unsorted.into_iter().map(Some).collect();
    Ok(WorkspaceSet::from_sorted(
        order.into_iter().filter_map(|i| slots[i].take()).collect(),
    ))
}

/// Enumerated manifests to a sorted workspace set.
pub async fn load_workspaces(
    manifests: Vec<WorkspaceManifest>,
    base: &BaseRef,
    vcs: &dyn Vcs,
    registry: &dyn Registry,
) -> Result<WorkspaceSet> {
    let unsorted = build_workspaces(manifests, base, vcs, registry).await?;
    Ok(sort_workspaces(unsorted)?)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            types::{DeclaredDependency, DependencyKind},
            utils::testing::{manifest, workspace, FakeRegistry, FakeVcs},
        },
        pretty_assertions::assert_eq,
    };

    fn names(set: &WorkspaceSet) -> Vec<&str> {
        set.names().collect()
    }

    fn assert_topological(set: &WorkspaceSet) {
        let position: HashMap<&str, usize> =
            set.names().enumerate().map(|(i, name)| (name, i)).collect();
        for workspace in set {
            for dependency in &workspace.dependencies {
                assert!(
                    position[dependency.name.as_str()] < position[workspace.name.as_str()],
                    "{} placed before its dependency {}",
                    workspace.name,
                    dependency.name
                );
            }
        }
    }

    #[test]
    fn test_sort_places_dependencies_first() {
        let set = sort_workspaces(vec![
            workspace("app", "1.0.0", &[("core", "^1.0.0"), ("util", "^1.0.0")]),
            workspace("util", "1.0.0", &[("core", "^1.0.0")]),
            workspace("core", "1.0.0", &[]),
        ])
        .unwrap();
        assert_eq!(names(&set), vec!["core", "util", "app"]);
        assert_topological(&set);
    }

    #[test]
    fn test_sort_first_eligible_tie_break() {
        // a waits for c; once c is placed, a is ahead of b in enumeration order
        let set = sort_workspaces(vec![
            workspace("a", "1.0.0", &[("c", "^1.0.0")]),
            workspace("c", "1.0.0", &[]),
            workspace("b", "1.0.0", &[]),
        ])
        .unwrap();
        assert_eq!(names(&set), vec!["c", "a", "b"]);

        let set = sort_workspaces(vec![
            workspace("x", "1.0.0", &[]),
            workspace("y", "1.0.0", &[]),
            workspace("z", "1.0.0", &[]),
        ])
        .unwrap();
        assert_eq!(names(&set), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_sort_wide_graph_is_topological() {
        let mut unsorted = vec![];
        for i in (0..20).rev() {
            let deps: Vec<(String, &str)> = (0..i)
                .filter(|j| (i + j) % 3 == 0)
                .map(|j| (format!("w{j}"), "^1.0.0"))
                .collect();
            let deps: Vec<(&str, &str)> =
                deps.iter().map(|(name, range)| (name.as_str(), *range)).collect();
            unsorted.push(workspace(&format!("w{i}"), "1.0.0", &deps));
        }
        let set = sort_workspaces(unsorted).unwrap();
        assert_eq!(set.len(), 20);
        assert_topological(&set);
    }

    #[test]
    fn test_sort_detects_cycle() {
        let err = sort_workspaces(vec![
            workspace("leaf", "1.0.0", &[]),
            workspace("a", "1.0.0", &[("b", "^1.0.0")]),
            workspace("b", "1.0.0", &[("c", "^1.0.0")]),
            workspace("c", "1.0.0", &[("a", "^1.0.0")]),
            workspace("top", "1.0.0", &[("a", "^1.0.0"), ("leaf", "^1.0.0")]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            WorkspaceError::DependencyCycle {
                names: vec![
                    "a".to_string(),
                    "b".to_string(),
                    "c".to_string(),
                    "top".to_string()
                ],
            }
        );
    }

    #[test]
    fn test_sort_self_dependency_is_a_cycle() {
        let err = sort_workspaces(vec![workspace("a", "1.0.0", &[("a", "^1.0.0")])]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Dependency cycle detected (a)."
        );
    }

    #[test]
    fn test_sort_duplicate_dependency_kinds() {
        let mut app = workspace("app", "1.0.0", &[("core", "^1.0.0")]);
        app.dependencies.push(LocalDependency {
            name: "core".to_string(),
            range: "^1.0.0".to_string(),
            kind: DependencyKind::Peer,
        });
        let set = sort_workspaces(vec![app, workspace("core", "1.0.0", &[])]).unwrap();
        assert_eq!(names(&set), vec!["core", "app"]);
    }

    #[test]
    fn test_sort_rejects_duplicate_names() {
        let err = sort_workspaces(vec![
            workspace("a", "1.0.0", &[]),
            workspace("a", "2.0.0", &[]),
        ])
        .unwrap_err();
        assert_eq!(err, WorkspaceError::DuplicateName { name: "a".to_string() });
    }

    #[tokio::test]
    async fn test_build_filters_and_queries() {
        let mut private = manifest("tools", "0.1.0", &[]);
        private.private = true;
        let mut app = manifest("app", "1.1.0", &[("core", "^1.0.0"), ("lodash", "^4.0.0")]);
        app.dependencies
            .insert(0, DeclaredDependency::new("tools", "^0.1.0", DependencyKind::Peer));

        let vcs = FakeVcs::default().with_modified("packages/app");
        let registry = FakeRegistry::default().with_published("core", "1.0.0");
        let base = BaseRef::AtRef("v1".to_string());

        let unsorted = build_workspaces(
            vec![app, manifest("core", "1.0.0", &[]), private],
            &base,
            &vcs,
            &registry,
        )
        .await
        .unwrap();

        assert_eq!(unsorted.len(), 3);
        let app = &unsorted[0];
        assert!(app.modified);
        assert!(!app.published);
        assert_eq!(
            app.dependencies,
            vec![
                LocalDependency {
                    name: "core".to_string(),
                    range: "^1.0.0".to_string(),
                    kind: DependencyKind::Normal,
                },
                LocalDependency {
                    name: "tools".to_string(),
                    range: "^0.1.0".to_string(),
                    kind: DependencyKind::Peer,
                },
            ]
        );
        let core = &unsorted[1];
        assert!(!core.modified);
        assert!(core.published);
        let tools = &unsorted[2];
        assert!(!tools.published);
        // private workspaces are never looked up
        assert_eq!(
            *registry.queries.lock().unwrap(),
            vec!["app@1.1.0".to_string(), "core@1.0.0".to_string()]
        );
    }

    #[tokio::test]
    async fn test_build_without_base_marks_everything_modified() {
        let vcs = FakeVcs::default();
        let registry = FakeRegistry::default();
        let set = load_workspaces(
            vec![
                manifest("b", "1.0.0", &[("a", "^1.0.0")]),
                manifest("a", "1.0.0", &[]),
            ],
            &BaseRef::NoBase,
            &vcs,
            &registry,
        )
        .await
        .unwrap();
        assert_eq!(names(&set), vec!["a", "b"]);
        assert!(set.iter().all(|workspace| workspace.modified));
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_version() {
        let vcs = FakeVcs::default();
        let registry = FakeRegistry::default();
        let err = build_workspaces(
            vec![manifest("a", "1.0.0", &[]), manifest("b", "1.0", &[])],
            &BaseRef::NoBase,
            &vcs,
            &registry,
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<WorkspaceError>(),
            Some(&WorkspaceError::InvalidVersion {
                name: "b".to_string(),
                version: "1.0".to_string(),
            })
        );
        // nothing was queried before the failure
        assert!(registry.queries.lock().unwrap().is_empty());
    }
}
