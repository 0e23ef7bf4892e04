mod config;
mod detector;
mod policy;

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::BodyExt;
use hudsucker::certificate_authority::RcgenAuthority;
use hudsucker::rustls::crypto::aws_lc_rs;
use hudsucker::{Body, HttpContext, HttpHandler, Proxy, RequestOrResponse};
use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

use cage_core::audit::{AuditEntry, AuditLogger};
use config::ProxyConfig;
use detector::DetectorClient;

const BLOCKED_API_BODY: &str = "Blocked: this GitHub API operation is not permitted in yolo-cage";
const BLOCKED_DOMAIN_BODY: &str = "Blocked: destination is on blocklist";
const BLOCKED_SECRETS_BODY: &str = "Blocked: request body contains potential secrets";
const BLOCKED_SECRETS_URL_BODY: &str = "Blocked: URL contains potential secrets";

/// The `hudsucker::HttpHandler` implementation that runs the Egress Policy
/// Proxy's policy engine (§4.6) over every intercepted request. One clone
/// per connection; all shared state lives behind `Arc`.
#[derive(Clone)]
struct CageHandler {
    detector: Arc<DetectorClient>,
    audit: Arc<AuditLogger>,
}

impl CageHandler {
    fn blocked(body: &'static str) -> Response<Body> {
        Response::builder()
            .status(StatusCode::FORBIDDEN)
            .header("content-type", "text/plain")
            .body(Body::from(Bytes::from_static(body.as_bytes())))
            .expect("static blocked response is well-formed")
    }

    fn record(
        &self,
        method: &str,
        url: &str,
        host: &str,
        blocked: bool,
        reason: Option<String>,
        detected_secrets: Option<Vec<String>>,
        request_size: usize,
    ) {
        let entry = AuditEntry::new(method, url, host, blocked, reason, detected_secrets, request_size);
        self.audit.record(&entry);
    }
}

#[async_trait]
impl HttpHandler for CageHandler {
    async fn handle_request(&mut self, _ctx: &HttpContext, req: http::Request<Body>) -> RequestOrResponse {
        let method = req.method().to_string();
        let uri = req.uri().clone();
        let url = uri.to_string();
        let host = uri.host().unwrap_or_default().to_string();
        let path = uri.path().to_string();

        // Every audit entry records the real body size regardless of which
        // check (if any) fires, so the body is collected up front rather
        // than only when a scan needs it.
        let (parts, body) = req.into_parts();
        let body_bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(_) => Bytes::new(),
        };
        let request_size = body_bytes.len();

        // Step 1: API policy.
        if let Some(reason) = policy::check_api_policy(&host, &method, &path) {
            self.record(&method, &url, &host, true, Some(reason), None, request_size);
            return RequestOrResponse::Response(CageHandler::blocked(BLOCKED_API_BODY));
        }

        // Step 2: host blocklist.
        if let Some(reason) = policy::check_host_blocklist(&host) {
            self.record(&method, &url, &host, true, Some(reason), None, request_size);
            return RequestOrResponse::Response(CageHandler::blocked(BLOCKED_DOMAIN_BODY));
        }

        // Step 3: body scan.
        if request_size >= policy::MIN_BODY_SCAN_LEN {
            let text = String::from_utf8_lossy(&body_bytes);
            let result = self.detector.scan(&text).await;
            if result.detected {
                self.record(
                    &method,
                    &url,
                    &host,
                    true,
                    Some("secrets_detected".to_string()),
                    Some(result.scanners),
                    request_size,
                );
                return RequestOrResponse::Response(CageHandler::blocked(BLOCKED_SECRETS_BODY));
            }
        }

        // Step 4: URL scan.
        if url.len() > policy::URL_SCAN_THRESHOLD {
            let result = self.detector.scan(&url).await;
            if result.detected {
                self.record(
                    &method,
                    &url,
                    &host,
                    true,
                    Some("secrets_in_url".to_string()),
                    Some(result.scanners),
                    request_size,
                );
                return RequestOrResponse::Response(CageHandler::blocked(BLOCKED_SECRETS_URL_BODY));
            }
        }

        // Step 5: allow.
        self.record(&method, &url, &host, false, None, None, request_size);
        let rebuilt = http::Request::from_parts(parts, Body::from(body_bytes));
        RequestOrResponse::Request(rebuilt)
    }

    async fn handle_response(&mut self, _ctx: &HttpContext, res: Response<Body>) -> Response<Body> {
        res
    }
}

/// Generate a fresh, process-local CA for TLS interception. There is no
/// provisioning story for a persisted CA (the spec makes no claim of
/// attestable identity — see spec.md §1 Non-goals); agents trusting this
/// proxy are expected to trust whatever CA the pod's egress proxy presents
/// at boot, the same way the sandbox's own TLS termination is out of scope
/// per spec.md §1.
fn build_ca() -> anyhow::Result<RcgenAuthority> {
    let key_pair = KeyPair::generate()?;
    let mut params = CertificateParams::new(vec!["yolo-cage egress proxy CA".to_string()])?;
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let cert = params.self_signed(&key_pair)?;

    let private_key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
    let ca_cert = CertificateDer::from(cert.der().to_vec());

    RcgenAuthority::new(private_key, ca_cert, 1_000, aws_lc_rs::default_provider())
        .map_err(|e| anyhow::anyhow!("failed to build egress proxy CA: {e}"))
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let json = std::env::var("CAGE_LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(filter));

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ProxyConfig::from_env();
    tracing::info!(bind = %config.bind_addr, detector_url = %config.detector_url, "starting yolo-cage egress proxy");

    let detector = Arc::new(DetectorClient::new(config.detector_url.clone(), config.detector_token.clone()));
    let audit = Arc::new(AuditLogger::new(config.log_file.clone()));
    let handler = CageHandler { detector, audit };

    let addr: SocketAddr = config.bind_addr.parse()?;
    let ca = build_ca()?;

    let proxy = Proxy::builder()
        .with_addr(addr)
        .with_rustls_client(aws_lc_rs::default_provider())
        .with_ca(ca)
        .with_http_handler(handler)
        .build()?;

    tracing::info!(%addr, "egress proxy listening");
    proxy.start(shutdown_signal()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ca_builds_successfully() {
        build_ca().expect("CA generation must succeed");
    }

    #[test]
    fn blocked_response_bodies_match_expected_literals() {
        let resp = CageHandler::blocked(BLOCKED_API_BODY);
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
