use {semver::Version, std::fmt};

/// Options forwarded to a registry publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
    pub prerelease: bool,
    pub dry_run: bool,
    /// Distribution channel, e.g. an npm dist-tag.
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Private,
    Published,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::Private => "private",
            SkipReason::Published => "published",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseStep {
    Skipped {
        name: String,
        version: Version,
        reason: SkipReason,
    },
    Published {
        name: String,
        version: Version,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    NothingToRelease,
    Released {
        tag: Option<String>,
        steps: Vec<ReleaseStep>,
    },
}
