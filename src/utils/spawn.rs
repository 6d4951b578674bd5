use {
    crate::error::SpawnError,
    anyhow::{anyhow, Context, Result},
    log::debug,
    serde::de::DeserializeOwned,
    std::{
        path::{Path, PathBuf},
        process::Stdio,
    },
    tokio::process::Command,
};

/// Builder around a child process whose output is captured.
#[derive(Debug, Clone)]
pub struct Spawn {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env: Vec<(String, String)>,
    assert_success: bool,
}

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct Captured {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl Spawn {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            current_dir: None,
            env: vec![],
            assert_success: false,
        }
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// Turn a non-zero exit code into a [`SpawnError`].
    pub fn assert_success(mut self) -> Self {
        self.assert_success = true;
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub async fn output(self) -> Result<Captured> {
        let command_line = self.command_line();
        debug!("> {command_line}");

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }

        let output = command
            .output()
            .await
            .with_context(|| format!("failed to run `{command_line}`"))?;
        let captured = Captured {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if self.assert_success && !captured.success {
            return Err(SpawnError {
                command: command_line,
                exit_code: output.status.code().unwrap_or(1),
                output: captured.combined(),
                env: self.env,
            }
            .into());
        }

        Ok(captured)
    }

    /// Resolves to whether the process exited successfully.
    pub async fn wait(self) -> Result<bool> {
        Ok(self.output().await?.success)
    }

    /// Trimmed standard output.
    pub async fn text(self) -> Result<String> {
        Ok(self.output().await?.stdout.trim().to_string())
    }

    /// Non-empty lines of standard output.
    pub async fn lines(self) -> Result<Vec<String>> {
        Ok(self
            .output()
            .await?
            .stdout
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let command_line = self.command_line();
        let text = self.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| anyhow!("failed to parse output of `{command_line}` as JSON: {e}"))
    }
}

impl Captured {
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim_end();
        let stderr = self.stderr.trim_end();
        match (stdout.is_empty(), stderr.is_empty()) {
            (_, true) => stdout.to_string(),
            (true, false) => stderr.to_string(),
            (false, false) => format!("{stdout}\n{stderr}"),
        }
    }
}

fn quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,^~".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
