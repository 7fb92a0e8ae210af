//! Local git operations for `fix style`.
//!
//! Every command runs with a clean environment (no system or user config, no
//! terminal prompts) so behavior does not depend on the host. Commit identity
//! is passed per command with `-c` flags rather than written to `.git/config`.

pub mod style;

use std::path::Path;
use std::process::Output;

use thiserror::Error;

pub use style::{SpackStyleFixer, StyleFixOutcome, StyleFixRequest, StyleFixer};

/// Errors from git and `spack style` invocations.
#[derive(Debug, Error)]
pub enum GitError {
    /// A command exited with a status we don't accept.
    #[error("command failed: {command}\nstderr: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// The blocking task running the commands was cancelled or panicked.
    #[error("git task aborted: {0}")]
    Aborted(String),

    /// IO error, including a missing executable.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Identity used for creating commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    /// The author and committer name (git `user.name`).
    pub name: String,
    /// The author and committer email (git `user.email`).
    pub email: String,
}

/// Create a git Command with clean environment (no system/user config).
pub(crate) fn git_command(workdir: &Path) -> std::process::Command {
    let mut cmd = std::process::Command::new("git");
    cmd.current_dir(workdir);
    cmd.env("GIT_CONFIG_NOSYSTEM", "1");
    cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd
}

/// Create a git Command with `-c user.name=<name> -c user.email=<email>`
/// prepended, for commands that create commits.
pub(crate) fn git_commit_command(workdir: &Path, identity: &CommitIdentity) -> std::process::Command {
    let mut cmd = git_command(workdir);
    cmd.arg("-c");
    cmd.arg(format!("user.name={}", identity.name));
    cmd.arg("-c");
    cmd.arg(format!("user.email={}", identity.email));
    cmd
}

/// Run a git command in the given working directory.
///
/// Returns the command output on success, or [`GitError::CommandFailed`]
/// carrying stderr.
pub fn run_git_sync(workdir: &Path, args: &[&str]) -> GitResult<Output> {
    let output = git_command(workdir).args(args).output()?;

    if output.status.success() {
        Ok(output)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let command = format!("git {}", args.join(" "));
        Err(GitError::CommandFailed { command, stderr })
    }
}

/// Run a git command and return stdout as a string.
pub fn run_git_stdout(workdir: &Path, args: &[&str]) -> GitResult<String> {
    let output = run_git_sync(workdir, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Commit every tracked change as `identity`.
///
/// Returns `false` when git reports there is nothing to commit.
pub fn commit_all(workdir: &Path, identity: &CommitIdentity, message: &str) -> GitResult<bool> {
    let output = git_commit_command(workdir, identity)
        .args(["commit", "-a", "-m", message])
        .output()?;

    if output.status.success() {
        return Ok(true);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.contains("nothing to commit") || stdout.contains("no changes added to commit") {
        return Ok(false);
    }

    Err(GitError::CommandFailed {
        command: "git commit -a".to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Push `local` to `remote_branch` on `origin`.
///
/// A rejected or unreachable push is reported as `Ok(Err(stderr))` so the
/// caller can tell the user instead of failing the whole task.
pub fn push_branch(
    workdir: &Path,
    local: &str,
    remote_branch: &str,
) -> GitResult<Result<(), String>> {
    let refspec = format!("{local}:{remote_branch}");
    let output = git_command(workdir)
        .args(["push", "origin", &refspec])
        .output()?;

    if output.status.success() {
        Ok(Ok(()))
    } else {
        Ok(Err(String::from_utf8_lossy(&output.stderr).to_string()))
    }
}
