use {
    crate::utils::{
        git::{DEFAULT_IGNORE_MODIFIED, DEFAULT_IGNORE_UNCOMMITTED},
        read_optional,
    },
    anyhow::{anyhow, bail, Context, Result},
    std::path::Path,
    toml_edit::{DocumentMut, Item},
};

pub const CONFIG_FILE: &str = "release-gate.toml";

/// Project settings from `release-gate.toml`. Command line flags take
/// precedence over everything here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Require prerelease identifiers on every released version.
    pub prerelease: bool,
    /// Publish channel override, e.g. an npm dist-tag.
    pub channel: Option<String>,
    /// Create and push a release tag.
    pub tag: bool,
    pub ignore_modified: Vec<String>,
    pub ignore_uncommitted: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prerelease: false,
            channel: None,
            tag: true,
            ignore_modified: DEFAULT_IGNORE_MODIFIED
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignore_uncommitted: DEFAULT_IGNORE_UNCOMMITTED
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

fn as_bool(key: &str, item: &Item) -> Result<bool> {
    item.as_bool()
        .ok_or_else(|| anyhow!("`{key}` must be a boolean"))
}

fn as_string_list(key: &str, item: &Item) -> Result<Vec<String>> {
    let array = item
        .as_array()
        .ok_or_else(|| anyhow!("`{key}` must be an array of strings"))?;
    array
        .iter()
        .map(|value| {
            value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| anyhow!("`{key}` must be an array of strings"))
        })
        .collect()
}

impl Config {
    pub fn parse(content: &str) -> Result<Self> {
        let doc = content.parse::<DocumentMut>()?;
        let mut config = Config::default();
        for (key, item) in doc.as_table().iter() {
            match key {
                "prerelease" => config.prerelease = as_bool(key, item)?,
                "tag" => config.tag = as_bool(key, item)?,
                "channel" => {
                    let channel = item
                        .as_str()
                        .ok_or_else(|| anyhow!("`channel` must be a string"))?;
                    config.channel = Some(channel.to_string()).filter(|c| !c.is_empty());
                }
                "ignore-modified" => config.ignore_modified = as_string_list(key, item)?,
                "ignore-uncommitted" => config.ignore_uncommitted = as_string_list(key, item)?,
                _ => bail!("unknown key `{key}`"),
            }
        }
        Ok(config)
    }

    /// Loads `release-gate.toml` from `root`, falling back to defaults when
    /// there is none.
    pub async fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let Some(content) = read_optional(&path).await? else {
            return Ok(Config::default());
        };
        Config::parse(&content).with_context(|| format!("invalid {}", path.display()))
    }
}
