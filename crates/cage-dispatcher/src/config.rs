//! Dispatcher configuration, loaded once at startup from the environment.
//!
//! Grounded in `crates/skilllite-sandbox/src/runner.rs`'s
//! `ResourceLimits::from_env` / `SandboxLevel::from_env_or_cli`: resolve
//! every knob once, behind small `env_*` helpers, and hand callers an
//! immutable value rather than re-reading the environment per request.

use std::time::Duration;

use cage_core::env::{env_optional, env_or, env_u64};

const DEFAULT_AGENT_WORKSPACE: &str = "/home/dev/workspace";

const DEFAULT_PRE_PUSH_HOOK: &str =
    "trufflehog git file://. --since-commit HEAD~10 --fail --no-update";

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Fixed mount point the agent sees for its workspace.
    pub agent_root: String,
    /// Base directory for the dispatcher's per-branch working trees.
    pub workspace_root: String,
    pub git_user_name: String,
    pub git_user_email: String,
    pub access_token: Option<String>,
    pub version: String,
    pub hooks: Vec<String>,
    /// Loaded and validated, but not injected anywhere in the classified
    /// flow — see DESIGN.md's resolution of the commit-footer open
    /// question. Empty disables it (no consumer exists today either way).
    pub commit_footer: String,
    pub tool_timeout: Duration,
    pub hook_timeout: Duration,
    pub branch_probe_timeout: Duration,
}

impl DispatcherConfig {
    pub fn from_env() -> Self {
        let version = env_or("YOLO_CAGE_VERSION", &[], || "0.2.0".to_string());
        let hooks = env_optional("PRE_PUSH_HOOKS", &[])
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
            .unwrap_or_else(|| vec![DEFAULT_PRE_PUSH_HOOK.to_string()]);
        let default_footer = format!("Built autonomously using yolo-cage v{version}");

        Self {
            agent_root: env_or("AGENT_WORKSPACE", &[], || DEFAULT_AGENT_WORKSPACE.to_string()),
            workspace_root: env_or("WORKSPACE_ROOT", &[], || "/workspaces".to_string()),
            git_user_name: env_or("GIT_USER_NAME", &[], || "yolo-cage".to_string()),
            git_user_email: env_or("GIT_USER_EMAIL", &[], || "yolo-cage@localhost".to_string()),
            access_token: env_optional("GITHUB_PAT", &["ACCESS_TOKEN"]),
            version,
            hooks,
            commit_footer: env_or("COMMIT_FOOTER", &[], || default_footer),
            tool_timeout: Duration::from_secs(env_u64("GIT_TOOL_TIMEOUT_SECS", &[], 300)),
            hook_timeout: Duration::from_secs(env_u64("GIT_HOOK_TIMEOUT_SECS", &[], 120)),
            branch_probe_timeout: Duration::from_secs(env_u64(
                "GIT_BRANCH_PROBE_TIMEOUT_SECS",
                &[],
                10,
            )),
        }
    }
}
