//! Path translation between the agent's workspace view and the dispatcher's
//! on-disk layout.
//!
//! The agent always sees a fixed mount point (`agent_root`); the dispatcher
//! keeps one working tree per branch under `workspace_root/branch`. This is
//! the only trust boundary standing between a crafted `cwd` and writing
//! outside the caller's assigned tree, so normalization happens here and
//! nowhere else — callers must not canonicalize (which follows symlinks)
//! before calling in.

use crate::error::PathError;

/// Collapse `.` segments and redundant separators the way POSIX `normpath`
/// does, without touching the filesystem (no symlink resolution, the path
/// need not exist). A leading `..` that cannot be resolved against anything
/// is preserved, so callers can still detect a residual traversal attempt.
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut stack: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if matches!(stack.last(), Some(&last) if last != "..") {
                    stack.pop();
                } else if !absolute {
                    stack.push("..");
                }
                // An absolute path simply drops a leading "..": there is
                // nothing above the root to traverse to.
            }
            other => stack.push(other),
        }
    }

    let joined = stack.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Translate an agent-visible working directory into the dispatcher's
/// on-disk working directory for `branch`.
///
/// `agent_root` is the fixed mount point the agent sees (e.g.
/// `/home/dev/workspace`); `workspace_root` is the dispatcher's base
/// directory for per-branch trees (e.g. `/workspaces`).
pub fn translate_cwd(
    agent_cwd: &str,
    branch: &str,
    agent_root: &str,
    workspace_root: &str,
) -> Result<String, PathError> {
    let normalized = normalize(agent_cwd);
    let branch_root = format!("{workspace_root}/{branch}");

    if normalized == agent_root {
        return Ok(branch_root);
    }

    let prefix = format!("{agent_root}/");
    if let Some(relative) = normalized.strip_prefix(&prefix) {
        if relative.split('/').any(|seg| seg == "..") {
            return Err(PathError::Traversal(agent_cwd.to_string()));
        }
        return Ok(format!("{branch_root}/{relative}"));
    }

    Err(PathError::OutsideAgentRoot {
        path: agent_cwd.to_string(),
        agent_root: agent_root.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGENT_ROOT: &str = "/home/dev/workspace";
    const WORKSPACE_ROOT: &str = "/workspaces";

    #[test]
    fn root_maps_to_branch_root() {
        let out = translate_cwd(AGENT_ROOT, "feature-x", AGENT_ROOT, WORKSPACE_ROOT).unwrap();
        assert_eq!(out, "/workspaces/feature-x");
    }

    #[test]
    fn subdirectory_is_preserved_relative_to_branch_root() {
        let out = translate_cwd(
            &format!("{AGENT_ROOT}/src/lib"),
            "feature-x",
            AGENT_ROOT,
            WORKSPACE_ROOT,
        )
        .unwrap();
        assert_eq!(out, "/workspaces/feature-x/src/lib");
    }

    #[test]
    fn redundant_separators_and_dot_segments_are_collapsed() {
        let out = translate_cwd(
            "/home/dev/workspace//./src/./lib",
            "feature-x",
            AGENT_ROOT,
            WORKSPACE_ROOT,
        )
        .unwrap();
        assert_eq!(out, "/workspaces/feature-x/src/lib");
    }

    #[test]
    fn outside_agent_root_is_rejected() {
        let err = translate_cwd("/etc/passwd", "feature-x", AGENT_ROOT, WORKSPACE_ROOT)
            .expect_err("must reject paths outside the agent root");
        assert!(matches!(err, PathError::OutsideAgentRoot { .. }));
    }

    #[test]
    fn traversal_within_agent_root_is_rejected() {
        let err = translate_cwd(
            "/home/dev/workspace/../../../etc",
            "feature-x",
            AGENT_ROOT,
            WORKSPACE_ROOT,
        )
        .expect_err("must reject traversal");
        assert!(matches!(err, PathError::OutsideAgentRoot { .. }));
    }

    #[test]
    fn sneaky_traversal_that_still_normalizes_under_root_is_rejected() {
        // "workspace/foo/../../etc" normalizes to "/home/dev/etc", which is
        // outside the agent root and must still be rejected.
        let err = translate_cwd(
            "/home/dev/workspace/foo/../../etc",
            "feature-x",
            AGENT_ROOT,
            WORKSPACE_ROOT,
        )
        .expect_err("must reject traversal that escapes the agent root");
        assert!(matches!(err, PathError::OutsideAgentRoot { .. }));
    }

    #[test]
    fn translate_is_idempotent_under_normalization() {
        let raw = "/home/dev/workspace//src/.//lib";
        let direct = translate_cwd(raw, "feature-x", AGENT_ROOT, WORKSPACE_ROOT).unwrap();
        let pre_normalized = translate_cwd(
            &normalize(raw),
            "feature-x",
            AGENT_ROOT,
            WORKSPACE_ROOT,
        )
        .unwrap();
        assert_eq!(direct, pre_normalized);
    }
}
