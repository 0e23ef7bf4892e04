//! Subprocess execution: the underlying git binary, with a wall-clock
//! timeout and an optional authentication helper.
//!
//! The timeout/output-capture shape is the async counterpart of
//! `crates/skilllite-sandbox/src/common.rs::wait_with_timeout` — spawn the
//! child with piped stdout/stderr, drain both concurrently so a chatty
//! subprocess can't deadlock on a full pipe, and race the wait against a
//! deadline.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::config::DispatcherConfig;

/// Outcome of a subprocess invocation, already collapsed to the
/// dispatcher's exit-code/stdout/stderr shape.
pub struct Outcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// A per-invocation `GIT_ASKPASS` helper script. The file is created with
/// owner-only execute permission on construction and removed on every exit
/// path via `Drop` — the same "cleanup lives in a guard, not a try/finally"
/// shape as `skilllite-core`'s `config::loader::ScopedEnvGuard`, generalized
/// from an environment variable to a temporary file.
pub struct AskpassGuard {
    path: PathBuf,
}

impl AskpassGuard {
    pub fn install(token: &str) -> std::io::Result<Self> {
        let path = std::env::temp_dir().join(format!("yolo-cage-askpass-{}.sh", uuid::Uuid::new_v4()));
        std::fs::write(&path, format!("#!/bin/bash\necho {token}\n"))?;
        set_owner_executable(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Drop for AskpassGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn set_owner_executable(path: &PathBuf) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn set_owner_executable(_path: &PathBuf) -> std::io::Result<()> {
    Ok(())
}

fn base_env(cmd: &mut Command, config: &DispatcherConfig) {
    cmd.env("GIT_AUTHOR_NAME", &config.git_user_name)
        .env("GIT_AUTHOR_EMAIL", &config.git_user_email)
        .env("GIT_COMMITTER_NAME", &config.git_user_name)
        .env("GIT_COMMITTER_EMAIL", &config.git_user_email)
        .env("GIT_TERMINAL_PROMPT", "0");
}

/// Run `git <argv>` in `cwd` without injecting any authentication helper.
pub async fn run_git(argv: &[String], cwd: &str, config: &DispatcherConfig) -> Outcome {
    let mut cmd = Command::new("git");
    cmd.args(argv).current_dir(cwd);
    base_env(&mut cmd, config);
    run_with_timeout(cmd, config.tool_timeout).await
}

/// Run `git <argv>` with the injected access token available through
/// `GIT_ASKPASS`, scoped to this single invocation. If no token is
/// configured, remote operations rely on whatever ambient credentials the
/// container already has.
pub async fn run_git_with_auth(argv: &[String], cwd: &str, config: &DispatcherConfig) -> Outcome {
    let mut cmd = Command::new("git");
    cmd.args(argv).current_dir(cwd);
    base_env(&mut cmd, config);

    let _guard = match &config.access_token {
        Some(token) => match AskpassGuard::install(token) {
            Ok(guard) => {
                cmd.env("GIT_ASKPASS", guard.path());
                Some(guard)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install askpass helper");
                None
            }
        },
        None => None,
    };

    run_with_timeout(cmd, config.tool_timeout).await
}

/// `git rev-parse --abbrev-ref HEAD` in `cwd`, bounded by a short timeout.
/// Returns `None` on any failure — callers treat that as "branch unknown",
/// which never equals the assigned branch and so fails guards closed.
pub async fn probe_current_branch(cwd: &str, config: &DispatcherConfig) -> Option<String> {
    let mut cmd = Command::new("git");
    cmd.args(["rev-parse", "--abbrev-ref", "HEAD"]).current_dir(cwd);
    base_env(&mut cmd, config);
    let outcome = run_with_timeout(cmd, config.branch_probe_timeout).await;
    if outcome.exit_code == 0 {
        let branch = outcome.stdout.trim();
        if branch.is_empty() {
            None
        } else {
            Some(branch.to_string())
        }
    } else {
        None
    }
}

pub(crate) async fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Outcome {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return Outcome {
                exit_code: 1,
                stdout: String::new(),
                stderr: format!("yolo-cage: failed to execute git: {e}"),
            }
        }
    };

    let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr was piped");
    let stdout_task = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = stdout_pipe.read_to_string(&mut buf).await;
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = stderr_pipe.read_to_string(&mut buf).await;
        buf
    });

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => Outcome {
            exit_code: status.code().unwrap_or(1),
            stdout: stdout_task.await.unwrap_or_default(),
            stderr: stderr_task.await.unwrap_or_default(),
        },
        Ok(Err(e)) => {
            stdout_task.abort();
            stderr_task.abort();
            Outcome {
                exit_code: 1,
                stdout: String::new(),
                stderr: format!("yolo-cage: failed to execute git: {e}"),
            }
        }
        Err(_) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            stdout_task.abort();
            stderr_task.abort();
            Outcome {
                exit_code: 1,
                stdout: String::new(),
                stderr: "yolo-cage: git command timed out\n".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn askpass_guard_writes_owner_only_executable_file_and_removes_it_on_drop() {
        let path = {
            let guard = AskpassGuard::install("s3cr3t-token").unwrap();
            let path = guard.path().clone();
            assert!(path.exists());
            let contents = std::fs::read_to_string(&path).unwrap();
            assert_eq!(contents, "#!/bin/bash\necho s3cr3t-token\n");
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mode = std::fs::metadata(&path).unwrap().permissions().mode();
                assert_eq!(mode & 0o777, 0o700);
            }
            path
        };
        assert!(!path.exists(), "askpass file must be removed on drop");
    }

    #[tokio::test]
    async fn run_with_timeout_reports_timeout_as_exit_code_one() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let outcome = run_with_timeout(cmd, Duration::from_millis(50)).await;
        assert_eq!(outcome.exit_code, 1);
        assert!(outcome.stderr.contains("timed out"));
    }

    #[tokio::test]
    async fn run_with_timeout_reports_launch_failure() {
        let cmd = Command::new("this-binary-does-not-exist-cage");
        let outcome = run_with_timeout(cmd, Duration::from_secs(5)).await;
        assert_eq!(outcome.exit_code, 1);
        assert!(outcome.stderr.contains("failed to execute git"));
    }
}
