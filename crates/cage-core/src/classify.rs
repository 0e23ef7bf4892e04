//! Git subcommand classification.
//!
//! Pure, total function from argv to a [`Category`]. Tables ported from the
//! dispatcher's original `ALLOWLIST_*` / `DENYLIST_WITH_MESSAGE` sets.

/// Disposition assigned to a classified git invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Local,
    Branch,
    Merge,
    RemoteRead,
    RemoteWrite,
    Denied,
    Unknown,
}

const LOCAL: &[&str] = &[
    "add", "rm", "status", "log", "diff", "show", "stash", "reset", "restore", "rev-parse",
    "ls-files", "blame", "shortlog", "describe", "tag",
];

const BRANCH: &[&str] = &["branch", "checkout", "switch"];

const MERGE: &[&str] = &["merge", "rebase", "cherry-pick"];

const REMOTE_READ: &[&str] = &["fetch", "pull"];

const REMOTE_WRITE: &[&str] = &["push"];

const DENIED: &[(&str, &str)] = &[
    ("remote", "yolo-cage: remote management is not permitted"),
    (
        "clone",
        "yolo-cage: clone is not permitted; use the provided workspace",
    ),
    ("submodule", "yolo-cage: submodules are not supported"),
    (
        "credential",
        "yolo-cage: credential management is not permitted",
    ),
    (
        "config",
        "yolo-cage: direct git configuration is not permitted.\n\
         User identity and settings are managed via deployment configuration.",
    ),
];

/// The first argv token not beginning with `-`: the subcommand.
pub fn subcommand(argv: &[String]) -> Option<&str> {
    argv.iter()
        .find(|tok| !tok.starts_with('-'))
        .map(|s| s.as_str())
}

/// Classify a git invocation. Total: every argv maps to exactly one
/// category, and [`Category::Denied`] always carries a non-empty message.
pub fn classify(argv: &[String]) -> (Category, Option<&'static str>) {
    let Some(cmd) = subcommand(argv) else {
        return (Category::Unknown, None);
    };

    if let Some((_, message)) = DENIED.iter().find(|(name, _)| *name == cmd) {
        return (Category::Denied, Some(message));
    }
    if LOCAL.contains(&cmd) {
        return (Category::Local, None);
    }
    if BRANCH.contains(&cmd) {
        return (Category::Branch, None);
    }
    if MERGE.contains(&cmd) {
        return (Category::Merge, None);
    }
    if REMOTE_READ.contains(&cmd) {
        return (Category::RemoteRead, None);
    }
    if REMOTE_WRITE.contains(&cmd) {
        return (Category::RemoteWrite, None);
    }

    (Category::Unknown, None)
}
