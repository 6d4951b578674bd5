use {
    super::{spawn::Spawn, Vcs},
    crate::types::BaseRef,
    anyhow::{Context, Result},
    async_trait::async_trait,
    ignore::gitignore::{Gitignore, GitignoreBuilder},
    log::debug,
    std::path::{Path, PathBuf},
};

/// Files that never make a workspace count as modified.
pub const DEFAULT_IGNORE_MODIFIED: &[&str] = &[".npmrc", "CHANGELOG.md"];

/// Files that may be left uncommitted.
pub const DEFAULT_IGNORE_UNCOMMITTED: &[&str] = &[".npmrc"];

const CI_USER_NAME: &str = "release-gate";
const CI_USER_EMAIL: &str = "release-gate@users.noreply.github.com";

/// The `git` CLI, run from the project root.
pub struct Git {
    root: PathBuf,
    ignore_modified: Gitignore,
    ignore_uncommitted: Gitignore,
}

impl Git {
    pub fn new<S: AsRef<str>>(
        root: &Path,
        ignore_modified: &[S],
        ignore_uncommitted: &[S],
    ) -> Result<Self> {
        Ok(Self {
            root: root.to_path_buf(),
            ignore_modified: build_matcher(root, ignore_modified)
                .context("invalid ignore-modified pattern")?,
            ignore_uncommitted: build_matcher(root, ignore_uncommitted)
                .context("invalid ignore-uncommitted pattern")?,
        })
    }

    pub fn with_defaults(root: &Path) -> Result<Self> {
        Self::new(root, DEFAULT_IGNORE_MODIFIED, DEFAULT_IGNORE_UNCOMMITTED)
    }

    fn git<I, S>(&self, args: I) -> Spawn
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Spawn::new("git", args)
            .current_dir(&self.root)
            .env("GIT_TERMINAL_PROMPT", "0")
    }

    async fn ensure_identity(&self) -> Result<()> {
        if self.git(["config", "user.name"]).wait().await? {
            return Ok(());
        }
        debug!("no git identity configured, using {CI_USER_NAME}");
        self.git(["config", "user.name", CI_USER_NAME])
            .assert_success()
            .wait()
            .await?;
        self.git(["config", "user.email", CI_USER_EMAIL])
            .assert_success()
            .wait()
            .await?;
        Ok(())
    }
}

fn build_matcher<S: AsRef<str>>(root: &Path, patterns: &[S]) -> Result<Gitignore> {
    let mut builder = GitignoreBuilder::new(root);
    for pattern in patterns {
        builder.add_line(None, pattern.as_ref())?;
    }
    Ok(builder.build()?)
}

fn is_ignored(matcher: &Gitignore, path: &str) -> bool {
    matcher.matched(Path::new(path), false).is_ignore()
}

/// Extracts the path from a `git status --porcelain` line.
fn porcelain_path(line: &str) -> Option<&str> {
    let path = line.get(3..)?;
    let path = path.rsplit_once(" -> ").map_or(path, |(_, to)| to);
    Some(path.trim_matches('"'))
}

#[async_trait]
impl Vcs for Git {
    async fn file_at_ref(&self, reference: &str, path: &str) -> Result<Option<String>> {
        let captured = self
            .git(["show".to_string(), format!("{reference}:./{path}")])
            .output()
            .await?;
        Ok(captured.success.then_some(captured.stdout))
    }

    async fn is_path_modified(&self, reference: &str, path: &str) -> Result<bool> {
        let changed = self
            .git(["diff", "--name-only", reference, "--", path])
            .assert_success()
            .lines()
            .await?;
        let untracked = self
            .git(["ls-files", "--others", "--exclude-standard", "--", path])
            .assert_success()
            .lines()
            .await?;
        Ok(changed
            .iter()
            .chain(untracked.iter())
            .any(|file| !is_ignored(&self.ignore_modified, file)))
    }

    async fn describe_latest_tag(&self) -> Result<Option<String>> {
        let captured = self
            .git(["describe", "--abbrev=0", "--first-parent"])
            .output()
            .await?;
        let tag = captured.stdout.trim();
        Ok((captured.success && !tag.is_empty()).then(|| tag.to_string()))
    }

    async fn uncommitted(&self) -> Result<Vec<String>> {
        let lines = self
            .git(["status", "--porcelain"])
            .assert_success()
            .lines()
            .await?;
        Ok(lines
            .iter()
            .filter_map(|line| porcelain_path(line))
            .filter(|file| !is_ignored(&self.ignore_uncommitted, file))
            .map(str::to_string)
            .collect())
    }

    async fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        self.ensure_identity().await?;
        self.git(["tag", "-a", name, "-m", message])
            .assert_success()
            .wait()
            .await?;
        Ok(())
    }

    async fn push_tag(&self, name: &str) -> Result<()> {
        self.git([
            "push".to_string(),
            "--no-verify".to_string(),
            "origin".to_string(),
            format!("refs/tags/{name}"),
        ])
        .assert_success()
        .wait()
        .await?;
        Ok(())
    }

    async fn prepare_history(&self, base: &BaseRef) -> Result<()> {
        if !self.git(["fetch", "--unshallow"]).wait().await? {
            debug!("git fetch --unshallow failed, assuming a complete clone");
        }
        let BaseRef::AtRef(reference) = base else {
            return Ok(());
        };
        let resolvable = self
            .git([
                "rev-parse".to_string(),
                "--verify".to_string(),
                "--quiet".to_string(),
                format!("{reference}^{{commit}}"),
            ])
            .wait()
            .await?;
        if !resolvable {
            debug!("fetching base reference {reference} from origin");
            if !self
                .git([
                    "fetch".to_string(),
                    "--no-tags".to_string(),
                    "origin".to_string(),
                    format!("{reference}:{reference}"),
                ])
                .wait()
                .await?
            {
                debug!("could not fetch {reference}, it must exist locally");
            }
        }
        Ok(())
    }
}
