use {
    semver::Version,
    std::{collections::HashMap, fmt},
};

/// Location sentinel used for the repository root workspace.
pub const ROOT_LOCATION: &str = ".";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DependencyKind {
    Normal,
    Optional,
    Peer,
    Build,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DependencyKind::Normal => "dependencies",
            DependencyKind::Optional => "optional dependencies",
            DependencyKind::Peer => "peer dependencies",
            DependencyKind::Build => "build dependencies",
        })
    }
}

/// A dependency exactly as a manifest declares it, before filtering to
/// in-repo names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub name: String,
    pub range: String,
    pub kind: DependencyKind,
}

impl DeclaredDependency {
    pub fn new(name: impl Into<String>, range: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            name: name.into(),
            range: range.into(),
            kind,
        }
    }
}

/// Raw workspace entry as reported by an ecosystem backend.
///
/// Only entries with both a name and a version are ever turned into a
/// [`Workspace`]; the version is still an unparsed string at this point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceManifest {
    pub location: String,
    pub name: String,
    pub version: String,
    pub private: bool,
    pub dependencies: Vec<DeclaredDependency>,
}

/// A dependency on another workspace of the same repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDependency {
    pub name: String,
    pub range: String,
    pub kind: DependencyKind,
}

/// One publishable unit of the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub location: String,
    pub name: String,
    pub version: Version,
    pub private: bool,
    pub modified: bool,
    pub published: bool,
    /// In-repo dependencies only, ordered by kind and then declaration order.
    pub dependencies: Vec<LocalDependency>,
}

impl Workspace {
    /// Non-private workspaces that changed, or whose version is not on the
    /// registry yet, are the ones being released.
    pub fn is_release_candidate(&self) -> bool {
        !self.private && (self.modified || !self.published)
    }

    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }

    /// Joins a file name onto this workspace's location.
    pub fn path_of(&self, file_name: &str) -> String {
        join_location(&self.location, file_name)
    }
}

pub fn join_location(location: &str, file_name: &str) -> String {
    let location = location.trim_end_matches('/');
    if location.is_empty() || location == ROOT_LOCATION {
        file_name.to_string()
    } else {
        format!("{location}/{file_name}")
    }
}

/// Workspaces in topological order, addressable by name.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceSet {
    ordered: Vec<Workspace>,
    index: HashMap<String, usize>,
}

impl WorkspaceSet {
    /// Callers are expected to pass workspaces that are already sorted and
    /// uniquely named; see [`crate::graph::sort_workspaces`].
    pub(crate) fn from_sorted(ordered: Vec<Workspace>) -> Self {
        let index = ordered
            .iter()
            .enumerate()
            .map(|(i, workspace)| (workspace.name.clone(), i))
            .collect();
        Self { ordered, index }
    }

    pub fn get(&self, name: &str) -> Option<&Workspace> {
        self.index.get(name).map(|&i| &self.ordered[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Workspace> {
        self.ordered.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(|workspace| workspace.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

impl<'a> IntoIterator for &'a WorkspaceSet {
    type Item = &'a Workspace;
    type IntoIter = std::slice::Iter<'a, Workspace>;

    fn into_iter(self) -> Self::IntoIter {
        self.ordered.iter()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, pretty_assertions::assert_eq};

    #[test]
    fn test_join_location() {
        assert_eq!(join_location(".", "CHANGELOG.md"), "CHANGELOG.md");
        assert_eq!(join_location("", "Cargo.toml"), "Cargo.toml");
        assert_eq!(join_location("crates/a", "Cargo.toml"), "crates/a/Cargo.toml");
        assert_eq!(join_location("packages/b/", "package.json"), "packages/b/package.json");
    }
}
