//! Changelog section lookup and release-type classification.
//!
//! This is a heuristic over Markdown prose: a version's section is found by
//! its heading, and its sub-headings decide the release type it documents.

use {
    crate::{
        types::{workspace::join_location, ChangelogDiff, ReleaseType},
        utils::read_optional_lossy,
    },
    anyhow::Result,
    regex::Regex,
    semver::Version,
    std::{path::Path, sync::LazyLock},
};

pub const CHANGELOG_FILE: &str = "CHANGELOG.md";

/// Sub-heading patterns, most severe first. A section matching none of them
/// documents a patch release.
const SEVERITY_PATTERNS: &[(ReleaseType, &str)] = &[
    (ReleaseType::Major, r"(?im)^#+.*\b(?:breaking|major)\b"),
    (
        ReleaseType::Minor,
        r"(?im)^#+.*\b(?:features?|enhancements?|minor)\b",
    ),
];

static SEVERITY_RULES: LazyLock<Vec<(ReleaseType, Regex)>> = LazyLock::new(|| {
    SEVERITY_PATTERNS
        .iter()
        .filter_map(|(release_type, pattern)| {
            Regex::new(pattern).ok().map(|rx| (*release_type, rx))
        })
        .collect()
});

fn heading_depth(line: &str) -> usize {
    line.chars().take_while(|&c| c == '#').count()
}

fn version_heading(version: &Version) -> Option<Regex> {
    Regex::new(&format!(
        r"(?i)^(#+)[\t ]*(?:v(?:ersion:?[\t ]+)?)?{}[\t ]*$",
        regex::escape(&version.to_string())
    ))
    .ok()
}

/// Content of the first section whose heading names `version`, up to the
/// next heading of equal or shallower depth. Blank sections count as absent.
pub fn find_section(text: &str, version: &Version) -> Option<String> {
    let heading = version_heading(version)?;
    let mut lines = text.lines();
    let depth = lines.by_ref().find_map(|line| {
        heading
            .captures(line)
            .and_then(|captures| captures.get(1))
            .map(|hashes| hashes.as_str().len())
    })?;
    let section = lines
        .take_while(|line| {
            let line_depth = heading_depth(line);
            line_depth == 0 || line_depth > depth
        })
        .collect::<Vec<_>>()
        .join("\n");
    let section = section.trim();
    (!section.is_empty()).then(|| section.to_string())
}

/// Release type implied by a section's sub-headings.
pub fn classify_section(section: &str) -> ReleaseType {
    SEVERITY_RULES
        .iter()
        .find(|(_, rx)| rx.is_match(section))
        .map_or(ReleaseType::Patch, |(release_type, _)| *release_type)
}

/// Classifies a changelog's text for `version`; `None` text means the file
/// does not exist.
pub fn classify_changelog(text: Option<&str>, version: &Version) -> ChangelogDiff {
    let Some(text) = text else {
        return ChangelogDiff::NoChangelog;
    };
    match find_section(text, version) {
        Some(section) => ChangelogDiff::Documented(classify_section(&section)),
        None => ChangelogDiff::Missing,
    }
}

/// Reads `CHANGELOG.md` of the workspace at `location` (relative to `root`)
/// and classifies its section for `version`. Bytes that are not UTF-8 are
/// replaced rather than rejected.
pub async fn get_changelog_diff(
    root: &Path,
    location: &str,
    version: &Version,
) -> Result<ChangelogDiff> {
    let path = root.join(join_location(location, CHANGELOG_FILE));
    let text = read_optional_lossy(&path).await?;
    Ok(classify_changelog(text.as_deref(), version))
}
