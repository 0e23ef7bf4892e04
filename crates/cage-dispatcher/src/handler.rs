//! HTTP surface of the Git Dispatcher.
//!
//! Shaped after `crates/skilllite-swarm/src/handler.rs`: a small `AppState`
//! threaded through every route via axum's `State` extractor, caller
//! identity read off `ConnectInfo<SocketAddr>` rather than the request
//! body, and a plain-text response for the one endpoint whose payload is
//! meant to be printed verbatim by a thin client shim.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use cage_core::classify::{classify, Category};
use cage_core::path_validation::translate_cwd;

use crate::config::DispatcherConfig;
use crate::{exec, hooks};

const EXIT_CODE_HEADER: &str = "X-Yolo-Cage-Exit-Code";

/// Build the full dispatcher router over `state`. Shared by `main` and the
/// `tower::ServiceExt::oneshot`-driven tests below.
pub fn router(state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/health", get(health))
        .route("/register", post(register).delete(deregister))
        .route("/registry", get(list_registry))
        .route("/git", post(handle_git))
        .with_state(state)
}

#[derive(Clone)]
pub struct AppState {
    pub registry: cage_core::Registry,
    pub config: Arc<DispatcherConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GitRequest {
    pub args: Vec<String>,
    pub cwd: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Debug, Deserialize)]
pub struct RegisterQuery {
    pub branch: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub status: &'static str,
    pub ip: String,
    pub branch: String,
}

pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<RegisterQuery>,
) -> Json<RegisterResponse> {
    let ip = addr.ip().to_string();
    state.registry.put(&ip, &query.branch);
    tracing::info!(ip = %ip, branch = %query.branch, "registered pod");
    Json(RegisterResponse {
        status: "registered",
        ip,
        branch: query.branch,
    })
}

#[derive(Debug, Serialize)]
pub struct DeregisterResponse {
    pub status: &'static str,
    pub ip: String,
}

pub async fn deregister(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Json<DeregisterResponse> {
    let ip = addr.ip().to_string();
    let status = match state.registry.delete(&ip) {
        Some(branch) => {
            tracing::info!(ip = %ip, branch = %branch, "deregistered pod");
            "deregistered"
        }
        None => "not_found",
    };
    Json(DeregisterResponse { status, ip })
}

#[derive(Debug, Serialize)]
pub struct RegistryResponse {
    pub registry: std::collections::HashMap<String, String>,
}

pub async fn list_registry(State(state): State<AppState>) -> Json<RegistryResponse> {
    Json(RegistryResponse {
        registry: state.registry.list(),
    })
}

/// One completed `/git` disposition: the body the shim should print and
/// the out-of-band exit code it should report to its own caller.
struct GitReply {
    body: String,
    exit_code: i32,
}

impl GitReply {
    fn denial(body: impl Into<String>) -> Self {
        Self { body: body.into(), exit_code: 1 }
    }
}

impl IntoResponse for GitReply {
    fn into_response(self) -> axum::response::Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            EXIT_CODE_HEADER,
            HeaderValue::from_str(&self.exit_code.to_string()).expect("exit code is ASCII digits"),
        );
        (StatusCode::OK, headers, self.body).into_response()
    }
}

pub async fn handle_git(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<GitRequest>,
) -> axum::response::Response {
    let caller = addr.ip().to_string();

    // Step 1: identify. This is the only path that uses HTTP status to
    // signal policy failure.
    let Some(assigned_branch) = state.registry.lookup(&caller) else {
        tracing::warn!(caller = %caller, "unregistered caller attempted git operation");
        return (
            StatusCode::FORBIDDEN,
            "yolo-cage: pod not registered. Contact cluster admin.",
        )
            .into_response();
    };

    tracing::info!(caller = %caller, branch = %assigned_branch, args = ?req.args, "git request");

    // Step 2: classify.
    let (category, deny_message) = classify(&req.args);

    // Step 3: translate cwd.
    let server_cwd = match translate_cwd(
        &req.cwd,
        &assigned_branch,
        &state.config.agent_root,
        &state.config.workspace_root,
    ) {
        Ok(path) => path,
        Err(err) => {
            tracing::warn!(caller = %caller, error = %err, "path translation denied");
            return GitReply::denial(format!("yolo-cage: {err}\n")).into_response();
        }
    };

    // Step 4: terminal categories.
    match category {
        Category::Denied => {
            let message = deny_message.expect("Denied always carries a message");
            return GitReply::denial(format!("{message}\n")).into_response();
        }
        Category::Unknown => {
            return GitReply::denial("yolo-cage: unrecognized or disallowed git operation\n")
                .into_response();
        }
        _ => {}
    }

    // Step 5: branch-switch informational notice (not a denial).
    let mut message_prefix = String::new();
    if category == Category::Branch {
        if let Some(target) = checkout_target(&req.args) {
            if target != assigned_branch {
                message_prefix = format!(
                    "yolo-cage: you are now viewing branch '{target}'.\n\
                     Your assigned branch is '{assigned_branch}'.\n\
                     Commits and pushes to other branches are not permitted.\n\n"
                );
            }
        }
    }

    // Step 6: merge guard.
    if category == Category::Merge {
        let current = exec::probe_current_branch(&server_cwd, &state.config).await;
        if current.as_deref() != Some(assigned_branch.as_str()) {
            let subcommand = cage_core::classify::subcommand(&req.args).unwrap_or("merge");
            return GitReply::denial(format!(
                "yolo-cage: you can only {subcommand} while on your assigned branch '{assigned_branch}'.\n\
                 Run 'git checkout {assigned_branch}' first.\n"
            ))
            .into_response();
        }
    }

    // Step 7: push guard.
    if category == Category::RemoteWrite {
        let current = exec::probe_current_branch(&server_cwd, &state.config).await;
        if current.as_deref() != Some(assigned_branch.as_str()) {
            let current_label = current.as_deref().unwrap_or("unknown");
            return GitReply::denial(format!(
                "yolo-cage: you can only push from your assigned branch '{assigned_branch}'.\n\
                 Current branch is '{current_label}'.\n"
            ))
            .into_response();
        }

        if offending_refspec(&req.args, &assigned_branch).is_some() {
            return GitReply::denial(format!(
                "yolo-cage: you can only push to branch '{assigned_branch}'\n"
            ))
            .into_response();
        }

        // Step 8: pre-push hooks.
        let hook_result =
            hooks::run_all(&state.config.hooks, &server_cwd, state.config.hook_timeout).await;
        if !hook_result.passed {
            return GitReply::denial(format!(
                "yolo-cage: push rejected by pre-push hooks\n\n{}",
                hook_result.output
            ))
            .into_response();
        }
        if !hook_result.output.is_empty() {
            tracing::info!(caller = %caller, "pre-push hooks passed");
        }
    }

    // Step 9: execute.
    let outcome = if matches!(category, Category::RemoteRead | Category::RemoteWrite) {
        exec::run_git_with_auth(&req.args, &server_cwd, &state.config).await
    } else {
        exec::run_git(&req.args, &server_cwd, &state.config).await
    };

    // Step 10: reply.
    GitReply {
        body: format!("{message_prefix}{}{}", outcome.stdout, outcome.stderr),
        exit_code: outcome.exit_code,
    }
    .into_response()
}

/// First positional argument after a `checkout`/`switch` token, if any.
fn checkout_target(args: &[String]) -> Option<&str> {
    args.iter().enumerate().find_map(|(i, tok)| {
        if tok == "checkout" || tok == "switch" {
            args.get(i + 1).map(|s| s.as_str()).filter(|next| !next.starts_with('-'))
        } else {
            None
        }
    })
}

/// Every argv token containing a `:` and not beginning with `-`, read as a
/// `local:remote` refspec. Returns the remote half of the first one whose
/// remote is non-empty and does not equal `assigned_branch` — every
/// qualifying token must be checked, not just the first, since a push can
/// carry several refspecs in one invocation.
fn offending_refspec<'a>(args: &'a [String], assigned_branch: &str) -> Option<&'a str> {
    args.iter()
        .filter(|tok| !tok.starts_with('-') && tok.contains(':'))
        .find_map(|tok| {
            let (_, remote) = tok.split_once(':').expect("filtered on contains ':'");
            (!remote.is_empty() && remote != assigned_branch).then_some(remote)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn checkout_target_skips_flags() {
        assert_eq!(
            checkout_target(&argv(&["checkout", "-b", "feature-y"])),
            None
        );
        assert_eq!(checkout_target(&argv(&["checkout", "feature-y"])), Some("feature-y"));
        assert_eq!(checkout_target(&argv(&["switch", "main"])), Some("main"));
        assert_eq!(checkout_target(&argv(&["status"])), None);
    }

    #[test]
    fn offending_refspec_reads_remote_half() {
        assert_eq!(
            offending_refspec(&argv(&["push", "origin", "HEAD:main"]), "feature-x"),
            Some("main")
        );
        assert_eq!(
            offending_refspec(&argv(&["push", "origin", "feature-x"]), "feature-x"),
            None
        );
        assert_eq!(
            offending_refspec(&argv(&["push", "origin", "HEAD:"]), "feature-x"),
            None
        );
        assert_eq!(
            offending_refspec(&argv(&["push", "origin", "HEAD:feature-x"]), "feature-x"),
            None
        );
    }

    #[test]
    fn every_qualifying_token_is_checked_not_just_the_first() {
        // A matching first refspec must not short-circuit a mismatching
        // second one — every qualifying token is a potential push target.
        assert_eq!(
            offending_refspec(
                &argv(&["push", "origin", "feature-x:feature-x", "evil:other-branch"]),
                "feature-x"
            ),
            Some("other-branch")
        );
    }

    #[test]
    fn force_with_lease_value_is_treated_as_refspec_like_by_design() {
        // Preserves the original dispatcher's behavior: any token with a
        // `:` not starting with `-` is read as a refspec, so
        // `--force-with-lease=ref:sha` is excluded only because it starts
        // with `-`, while a bare `ref:sha` positional would match.
        assert_eq!(
            offending_refspec(&argv(&["push", "--force-with-lease=ref:sha", "origin"]), "feature-x"),
            None
        );
    }
}
