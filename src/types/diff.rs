use std::fmt;

/// The semantic-version bump category, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReleaseType {
    Patch,
    Minor,
    Major,
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReleaseType::Patch => "patch",
            ReleaseType::Minor => "minor",
            ReleaseType::Major => "major",
        })
    }
}

/// `None` when the version did not increase, or no comparison was possible.
pub type VersionDiff = Option<ReleaseType>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangelogDiff {
    /// The workspace has no `CHANGELOG.md` at all.
    NoChangelog,
    /// The changelog exists but has no section for the version.
    Missing,
    /// The release type implied by the version's section.
    Documented(ReleaseType),
}

/// The comparison point for detecting what changed since the last release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseRef {
    NoBase,
    AtRef(String),
}

impl BaseRef {
    pub fn from_option(reference: Option<String>) -> Self {
        match reference {
            Some(reference) if !reference.trim().is_empty() => BaseRef::AtRef(reference),
            _ => BaseRef::NoBase,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, BaseRef::AtRef(_))
    }
}

impl fmt::Display for BaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseRef::NoBase => f.write_str("<none>"),
            BaseRef::AtRef(reference) => f.write_str(reference),
        }
    }
}
