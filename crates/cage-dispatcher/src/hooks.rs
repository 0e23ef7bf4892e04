//! Pre-push hook execution.
//!
//! Hooks are configured as a list of shell command lines (see
//! `config::DispatcherConfig::hooks`, default a TruffleHog secret scan) and
//! run in order before a push is allowed out. The first non-zero exit,
//! timeout, or launch failure stops the chain and fails the push closed.

use std::time::Duration;

use tokio::process::Command;

use crate::exec;

/// Result of running the configured hook chain once.
pub struct HookResult {
    pub passed: bool,
    pub output: String,
}

/// Run every hook in `hooks`, in `cwd`, each bounded by `timeout`. Stops at
/// the first failure; `output` accumulates everything run so far so a
/// denial message can show what actually failed.
pub async fn run_all(hooks: &[String], cwd: &str, timeout: Duration) -> HookResult {
    let mut output = String::new();

    for hook in hooks {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(hook).current_dir(cwd);

        let outcome = exec::run_with_timeout(cmd, timeout).await;
        output.push_str(&format!("$ {hook}\n"));
        output.push_str(&outcome.stdout);
        output.push_str(&outcome.stderr);

        if outcome.exit_code != 0 {
            return HookResult { passed: false, output };
        }
    }

    HookResult { passed: true, output }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_hook_list_passes_trivially() {
        let result = run_all(&[], "/tmp", Duration::from_secs(5)).await;
        assert!(result.passed);
        assert!(result.output.is_empty());
    }

    #[tokio::test]
    async fn first_failing_hook_stops_the_chain() {
        let hooks = vec!["exit 1".to_string(), "echo should-not-run".to_string()];
        let result = run_all(&hooks, "/tmp", Duration::from_secs(5)).await;
        assert!(!result.passed);
        assert!(!result.output.contains("should-not-run"));
    }

    #[tokio::test]
    async fn all_hooks_passing_runs_every_one() {
        let hooks = vec!["echo first".to_string(), "echo second".to_string()];
        let result = run_all(&hooks, "/tmp", Duration::from_secs(5)).await;
        assert!(result.passed);
        assert!(result.output.contains("first"));
        assert!(result.output.contains("second"));
    }
}
