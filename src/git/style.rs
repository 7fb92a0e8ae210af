//! Runs `spack style --fix` on a pull request branch and pushes the result.

use std::path::Path;
use std::process::Command;

use async_trait::async_trait;
use tracing::{debug, error, info};

use super::{CommitIdentity, GitError, GitResult, commit_all, push_branch, run_git_sync};

/// Local branch the pull request head is fetched into.
const WORKING_BRANCH: &str = "spackbot-style-check-working-branch";

/// Everything needed to fix one pull request branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleFixRequest {
    /// Remote the branch lives on, usually the author's fork.
    pub fork_url: String,
    /// Branch name on the fork.
    pub branch: String,
    /// Author of the style commit.
    pub identity: CommitIdentity,
    pub commit_message: String,
}

/// What happened after `spack style --fix` ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleFixOutcome {
    /// The fix produced a commit and it was pushed.
    Pushed { style_output: String },
    /// The branch was already clean, nothing was committed.
    NothingToCommit { style_output: String },
    /// A commit was made but the fork refused the push.
    PushRejected { style_output: String, details: String },
}

impl StyleFixOutcome {
    /// Combined stdout and stderr of `spack style`.
    pub fn style_output(&self) -> &str {
        match self {
            StyleFixOutcome::Pushed { style_output }
            | StyleFixOutcome::NothingToCommit { style_output }
            | StyleFixOutcome::PushRejected { style_output, .. } => style_output,
        }
    }
}

/// Fixes style on a pull request branch.
#[async_trait]
pub trait StyleFixer: Send + Sync {
    async fn fix(&self, request: StyleFixRequest) -> GitResult<StyleFixOutcome>;
}

/// [`StyleFixer`] that clones spack into a temporary directory and shells
/// out to git and `spack style`. `upstream` is the repository whose
/// `bin/spack` does the fixing.
#[derive(Debug, Clone)]
pub struct SpackStyleFixer {
    upstream: String,
}

impl SpackStyleFixer {
    pub fn new(upstream: impl Into<String>) -> Self {
        SpackStyleFixer {
            upstream: upstream.into(),
        }
    }
}

#[async_trait]
impl StyleFixer for SpackStyleFixer {
    async fn fix(&self, request: StyleFixRequest) -> GitResult<StyleFixOutcome> {
        let upstream = self.upstream.clone();
        tokio::task::spawn_blocking(move || {
            let workspace = tempfile::tempdir()?;
            fix_in(workspace.path(), &upstream, &request)
        })
        .await
        .map_err(|e| GitError::Aborted(e.to_string()))?
    }
}

/// Builds `spack --color never style --fix --root <root>`.
fn spack_style_command(spack: &Path, root: &Path) -> Command {
    let mut cmd = Command::new(spack);
    cmd.current_dir(root);
    cmd.args(["--color", "never", "style", "--fix", "--root"]);
    cmd.arg(root);
    cmd
}

/// Runs the whole fix inside `workspace`.
fn fix_in(workspace: &Path, upstream: &str, request: &StyleFixRequest) -> GitResult<StyleFixOutcome> {
    info!(
        fork = %request.fork_url,
        branch = %request.branch,
        author = %request.identity.name,
        "Fixing style"
    );

    // A fresh develop checkout provides the `spack` that does the fixing.
    run_git_sync(workspace, &["clone", upstream, "spack-develop"])?;
    run_git_sync(workspace, &["clone", "spack-develop", "spack"])?;

    let checkout = workspace.join("spack");
    run_git_sync(&checkout, &["remote", "add", "upstream", upstream])?;
    run_git_sync(&checkout, &["remote", "set-url", "origin", &request.fork_url])?;
    let refspec = format!("{}:{WORKING_BRANCH}", request.branch);
    run_git_sync(&checkout, &["fetch", "origin", &refspec])?;
    run_git_sync(&checkout, &["checkout", WORKING_BRANCH])?;

    let spack = workspace.join("spack-develop").join("bin").join("spack");
    let output = spack_style_command(&spack, &checkout).output()?;
    let style_output = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    debug!(status = ?output.status.code(), output = %style_output, "spack style");

    // Exit 1 means style issues remain that `--fix` could not repair.
    if !matches!(output.status.code(), Some(0) | Some(1)) {
        return Err(GitError::CommandFailed {
            command: "spack style --fix".to_string(),
            stderr: style_output,
        });
    }

    if !commit_all(&checkout, &request.identity, &request.commit_message)? {
        info!("Style fix made no changes");
        return Ok(StyleFixOutcome::NothingToCommit { style_output });
    }

    match push_branch(&checkout, WORKING_BRANCH, &request.branch)? {
        Ok(()) => {
            info!(branch = %request.branch, "Pushed style fixes");
            Ok(StyleFixOutcome::Pushed { style_output })
        }
        Err(details) => {
            error!(branch = %request.branch, details = %details, "Unable to push to branch");
            Ok(StyleFixOutcome::PushRejected {
                style_output,
                details,
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::git::run_git_stdout;
    use crate::git::tests::create_test_repo;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// A stand-in for spack whose `bin/spack` runs `script`, plus a bare
    /// fork carrying a `feature` branch.
    fn fake_spack(root: &Path, script: &str) -> (PathBuf, PathBuf) {
        let upstream = create_test_repo(&root.join("upstream"));
        let bin = upstream.join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let spack = bin.join("spack");
        std::fs::write(&spack, script).unwrap();
        std::fs::set_permissions(&spack, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(upstream.join("style.txt"), "unstyled\n").unwrap();
        run_git_sync(&upstream, &["add", "."]).unwrap();
        run_git_sync(&upstream, &["commit", "-m", "Add spack"]).unwrap();
        run_git_sync(&upstream, &["branch", "feature"]).unwrap();

        let fork = root.join("fork.git");
        run_git_sync(
            root,
            &["clone", "--bare", upstream.to_str().unwrap(), fork.to_str().unwrap()],
        )
        .unwrap();
        (upstream, fork)
    }

    fn request(fork: &Path) -> StyleFixRequest {
        StyleFixRequest {
            fork_url: fork.to_str().unwrap().to_string(),
            branch: "feature".to_string(),
            identity: CommitIdentity {
                name: "vsoch".to_string(),
                email: "vsoch@example.com".to_string(),
            },
            commit_message: "[spackbot] updating style on behalf of vsoch".to_string(),
        }
    }

    const FIXING_SCRIPT: &str = "#!/bin/sh\n\
        for root; do :; done\n\
        echo styled > \"$root/style.txt\"\n\
        echo '==> Running style checks'\n";

    const CLEAN_SCRIPT: &str = "#!/bin/sh\necho '==> style checks passed'\n";

    #[test]
    fn style_command_arguments() {
        let cmd = spack_style_command(Path::new("/w/spack-develop/bin/spack"), Path::new("/w/spack"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(
            args,
            vec!["--color", "never", "style", "--fix", "--root", "/w/spack"]
        );
    }

    #[test]
    fn fixes_are_committed_as_author_and_pushed() {
        let temp_dir = TempDir::new().unwrap();
        let (upstream, fork) = fake_spack(temp_dir.path(), FIXING_SCRIPT);
        let workspace = temp_dir.path().join("workspace");
        std::fs::create_dir_all(&workspace).unwrap();

        let outcome = fix_in(&workspace, upstream.to_str().unwrap(), &request(&fork)).unwrap();

        assert_eq!(
            outcome,
            StyleFixOutcome::Pushed {
                style_output: "==> Running style checks\n".to_string()
            }
        );
        assert_eq!(
            run_git_stdout(&fork, &["log", "-1", "--format=%an <%ae>|%s", "feature"]).unwrap(),
            "vsoch <vsoch@example.com>|[spackbot] updating style on behalf of vsoch"
        );
        assert_eq!(
            run_git_stdout(&fork, &["show", "feature:style.txt"]).unwrap(),
            "styled"
        );
    }

    #[test]
    fn clean_branch_has_nothing_to_commit() {
        let temp_dir = TempDir::new().unwrap();
        let (upstream, fork) = fake_spack(temp_dir.path(), CLEAN_SCRIPT);
        let workspace = temp_dir.path().join("workspace");
        std::fs::create_dir_all(&workspace).unwrap();
        let before = run_git_stdout(&fork, &["rev-parse", "feature"]).unwrap();

        let outcome = fix_in(&workspace, upstream.to_str().unwrap(), &request(&fork)).unwrap();

        assert!(matches!(outcome, StyleFixOutcome::NothingToCommit { .. }));
        assert_eq!(run_git_stdout(&fork, &["rev-parse", "feature"]).unwrap(), before);
    }

    #[test]
    fn refused_push_is_an_outcome() {
        let temp_dir = TempDir::new().unwrap();
        let (upstream, fork) = fake_spack(temp_dir.path(), FIXING_SCRIPT);
        // Reject every ref update on the fork.
        let hooks = fork.join("hooks");
        std::fs::create_dir_all(&hooks).unwrap();
        let hook = hooks.join("pre-receive");
        std::fs::write(&hook, "#!/bin/sh\necho 'maintainers cannot modify' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).unwrap();
        let workspace = temp_dir.path().join("workspace");
        std::fs::create_dir_all(&workspace).unwrap();

        let outcome = fix_in(&workspace, upstream.to_str().unwrap(), &request(&fork)).unwrap();

        match outcome {
            StyleFixOutcome::PushRejected { details, .. } => {
                assert!(details.contains("maintainers cannot modify"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn missing_branch_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let (upstream, fork) = fake_spack(temp_dir.path(), CLEAN_SCRIPT);
        let workspace = temp_dir.path().join("workspace");
        std::fs::create_dir_all(&workspace).unwrap();
        let mut request = request(&fork);
        request.branch = "gone".to_string();

        assert!(matches!(
            fix_in(&workspace, upstream.to_str().unwrap(), &request),
            Err(GitError::CommandFailed { .. })
        ));
    }

    #[tokio::test]
    async fn fixer_runs_in_its_own_workspace() {
        let temp_dir = TempDir::new().unwrap();
        let (upstream, fork) = fake_spack(temp_dir.path(), FIXING_SCRIPT);

        let outcome = SpackStyleFixer::new(upstream.to_str().unwrap())
            .fix(request(&fork))
            .await
            .unwrap();

        assert!(matches!(outcome, StyleFixOutcome::Pushed { .. }));
    }
}
