//! Version comparison helpers and the version diff engine.
//!
//! Comparison semantics come from the `semver` crate. The only pieces built
//! here are the release-type classification of an increase and the lowest
//! version a dependency range admits.

use {
    crate::{
        types::{BaseRef, ReleaseType, VersionDiff, Workspace},
        utils::{Vcs, WorkspaceSource},
    },
    log::debug,
    semver::{Comparator, Op, Prerelease, Version, VersionReq},
    std::cmp::Ordering,
};

/// Orders two versions by semver precedence, ignoring build metadata.
pub fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

/// Classifies the increase from `previous` to `current`.
///
/// Returns `None` when `current` is not strictly greater. Otherwise a major
/// or pre-major change is `Major`, a minor or pre-minor change is `Minor`,
/// and anything else (patch, pre-patch, prerelease) is `Patch`.
pub fn classify_increase(previous: &Version, current: &Version) -> VersionDiff {
    if precedence(current, previous) != Ordering::Greater {
        return None;
    }
    let (high, low) = (current, previous);

    // leaving a prerelease for its own release
    if !low.pre.is_empty() && high.pre.is_empty() {
        if low.minor == 0 && low.patch == 0 {
            return Some(ReleaseType::Major);
        }
        if (low.major, low.minor, low.patch) == (high.major, high.minor, high.patch) {
            if low.patch == 0 {
                return Some(ReleaseType::Minor);
            }
            return Some(ReleaseType::Patch);
        }
    }

    Some(if high.major != low.major {
        ReleaseType::Major
    } else if high.minor != low.minor {
        ReleaseType::Minor
    } else {
        ReleaseType::Patch
    })
}

/// Compares a workspace's current version with the one its manifest declared
/// at the base reference. A missing or unreadable historical version counts
/// as `0.0.0`.
pub async fn get_version_diff(
    vcs: &dyn Vcs,
    source: &dyn WorkspaceSource,
    base: &BaseRef,
    workspace: &Workspace,
) -> VersionDiff {
    let BaseRef::AtRef(reference) = base else {
        return None;
    };
    let previous = source
        .version_at_ref(vcs, reference, &workspace.location)
        .await
        .unwrap_or_else(|| Version::new(0, 0, 0));
    let diff = classify_increase(&previous, &workspace.version);
    debug!(
        "{}: {previous} -> {} at {reference}: {}",
        workspace.name,
        workspace.version,
        diff.map_or_else(|| "no increase".to_string(), |diff| diff.to_string()),
    );
    diff
}

/// Parses a dependency range into its `||` alternatives.
///
/// Accepts Cargo requirement syntax as well as the npm forms: whitespace
/// separated comparators, hyphen ranges (`1.0.0 - 2.0.0`), `x` wildcards and
/// the empty range.
pub fn parse_range(range: &str) -> Option<Vec<VersionReq>> {
    range
        .split("||")
        .map(|alternative| VersionReq::parse(&normalize_alternative(alternative)?).ok())
        .collect()
}

fn normalize_alternative(alternative: &str) -> Option<String> {
    let alternative = alternative.trim();
    if alternative.is_empty() {
        return Some("*".to_string());
    }
    if let Some((low, high)) = alternative.split_once(" - ") {
        let (low, high) = (low.trim(), high.trim());
        if low.is_empty() || high.is_empty() || low.contains(' ') || high.contains(' ') {
            return None;
        }
        return Some(format!(">={low}, <={high}"));
    }

    // glue operators to their versions: ">= 1.0.0" is one comparator
    let mut comparators: Vec<String> = vec![];
    let mut pending_op = String::new();
    for token in alternative
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
    {
        if token.chars().all(|c| "<>=~^".contains(c)) {
            pending_op.push_str(token);
            continue;
        }
        let token = token.strip_prefix('v').unwrap_or(token);
        comparators.push(format!("{}{token}", std::mem::take(&mut pending_op)));
    }
    if !pending_op.is_empty() {
        return None;
    }
    Some(comparators.join(", "))
}

/// Lowest version a comparator admits, `None` for upper-bound-only ones.
fn comparator_floor(comparator: &Comparator) -> Option<Version> {
    let major = comparator.major;
    let minor = comparator.minor.unwrap_or(0);
    let patch = comparator.patch.unwrap_or(0);
    match comparator.op {
        // an exclusive bound at u64::MAX has no floor
        Op::Greater => Some(match (comparator.minor, comparator.patch) {
            (None, _) => Version::new(major.checked_add(1)?, 0, 0),
            (Some(minor), None) => Version::new(major, minor.checked_add(1)?, 0),
            (Some(minor), Some(patch)) if comparator.pre.is_empty() => {
                Version::new(major, minor, patch.checked_add(1)?)
            }
            (Some(minor), Some(patch)) => {
                let mut version = Version::new(major, minor, patch);
                version.pre = Prerelease::new(&format!("{}.0", comparator.pre)).ok()?;
                version
            }
        }),
        Op::Less | Op::LessEq => None,
        _ => {
            let mut version = Version::new(major, minor, patch);
            version.pre = comparator.pre.clone();
            Some(version)
        }
    }
}

fn min_version_of(req: &VersionReq) -> Option<Version> {
    let zero = Version::new(0, 0, 0);
    if req.matches(&zero) {
        return Some(zero);
    }
    let candidate = req
        .comparators
        .iter()
        .filter_map(comparator_floor)
        .max_by(precedence)
        .unwrap_or(zero);
    req.matches(&candidate).then_some(candidate)
}

/// The lowest version that satisfies `range`, if the range parses and can be
/// satisfied at all.
pub fn min_version(range: &str) -> Option<Version> {
    parse_range(range)?
        .iter()
        .filter_map(min_version_of)
        .min_by(precedence)
}
