use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Result, anyhow};
use tracing::debug;

pub const TOKEN_GIT_CONFIG_KEY: &str = "github.apiKey";
pub const SCOPE_GIT_CONFIG_KEY: &str = "revwatch.orgRepo";

/// Trimmed value of an environment variable; blank counts as unset.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().as_deref().and_then(non_empty)
}

/// Reads `key` from the global git config; `None` when unset.
pub fn git_config_value(key: &str) -> Option<String> {
    let output = Command::new("git")
        .args(["config", "--get", "--global", key])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    non_empty(&String::from_utf8_lossy(&output.stdout))
}

/// Token stored in a plain file, e.g. `~/.pr-train`.
pub fn token_from_file(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    non_empty(&raw)
}

fn token_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pr-train"))
}

/// Token the GitHub CLI is logged in with, honouring `GH_HOST`.
fn token_from_gh_cli() -> Option<String> {
    let mut cmd = Command::new("gh");
    cmd.args(["auth", "token"]);
    if let Some(host) = env_value("GH_HOST") {
        cmd.args(["--hostname", host.as_str()]);
    }

    let output = match cmd.output() {
        Ok(output) => output,
        Err(e) => {
            debug!(error = %e, "gh CLI not available");
            return None;
        }
    };
    if !output.status.success() {
        debug!(status = %output.status, "`gh auth token` failed");
        return None;
    }
    non_empty(&String::from_utf8_lossy(&output.stdout))
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Resolve the GitHub token.
///
/// Priority:
/// 1) `GITHUB_TOKEN`
/// 2) `git config --global github.apiKey`
/// 3) `~/.pr-train`
/// 4) `gh auth token` (optionally with `GH_HOST`)
pub fn resolve_github_token() -> Result<String> {
    env_value("GITHUB_TOKEN")
        .or_else(|| git_config_value(TOKEN_GIT_CONFIG_KEY))
        .or_else(|| token_file_path().as_deref().and_then(token_from_file))
        .or_else(token_from_gh_cli)
        .ok_or_else(|| {
            anyhow!(
                "GitHub API token not found. Run \"git config --global {TOKEN_GIT_CONFIG_KEY} <token>\" \
                 or export GITHUB_TOKEN so revwatch can read your pull requests"
            )
        })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn token_file_is_trimmed() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "  ghp_secret  ").unwrap();
        assert_eq!(token_from_file(tmp.path()).as_deref(), Some("ghp_secret"));
    }

    #[test]
    fn blank_token_file_is_ignored() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "   ").unwrap();
        assert_eq!(token_from_file(tmp.path()), None);
    }

    #[test]
    fn env_value_is_trimmed_and_blank_is_unset() {
        // SAFETY: only this test touches these variables.
        unsafe {
            std::env::set_var("REVWATCH_TEST_TOKEN", "  ghp_env  ");
            std::env::set_var("REVWATCH_TEST_BLANK", "   ");
        }
        assert_eq!(env_value("REVWATCH_TEST_TOKEN").as_deref(), Some("ghp_env"));
        assert_eq!(env_value("REVWATCH_TEST_BLANK"), None);
        assert_eq!(env_value("REVWATCH_TEST_ABSENT"), None);
    }

    #[test]
    fn missing_token_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(token_from_file(&dir.path().join("absent")), None);
    }
}
