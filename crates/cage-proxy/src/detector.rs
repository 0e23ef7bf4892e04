//! Client for the remote secret-detection service.
//!
//! Modeled as a small state machine with states `{Unknown, Available,
//! Unavailable}`, echoing `network_proxy.rs`'s use of shared,
//! concurrently-read mutable state (there an `Arc<RwLock<ProxyConfig>>`,
//! here an `AtomicBool`-guarded availability flag) — reads are frequent
//! (one per scan), transitions rare (one per health re-probe).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a scan: whether secrets were found, and which named
/// scanners flagged the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub detected: bool,
    pub scanners: Vec<String>,
}

impl ScanResult {
    fn clean() -> Self {
        Self { detected: false, scanners: Vec::new() }
    }

    /// The fail-closed result used when the detector cannot be reached.
    pub fn scanner_unavailable() -> Self {
        Self { detected: true, scanners: vec!["scanner_unavailable".to_string()] }
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    is_valid: bool,
    scanners: std::collections::HashMap<String, f64>,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    prompt: &'a str,
}

pub struct DetectorClient {
    base_url: String,
    bearer_token: String,
    http: reqwest::Client,
    /// `None` until the first probe; `Some(true)` / `Some(false)`
    /// thereafter. Encodes the {Unknown, Available, Unavailable} machine
    /// as an availability bit plus an "has probed at all" bit.
    available: AtomicBool,
    probed: AtomicBool,
}

impl DetectorClient {
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: bearer_token.into(),
            http: reqwest::Client::new(),
            available: AtomicBool::new(false),
            probed: AtomicBool::new(false),
        }
    }

    /// `GET <base_url>/healthz`; available iff the response status is 200.
    async fn probe(&self) -> bool {
        let ok = match self
            .http
            .get(format!("{}/healthz", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        };
        self.available.store(ok, Ordering::SeqCst);
        self.probed.store(true, Ordering::SeqCst);
        ok
    }

    /// Scan `text`. If the client is not currently known available, this
    /// re-probes first; a failed re-probe is the fail-closed edge: the
    /// scan reports a positive detection (`scanner_unavailable`) rather
    /// than silently allowing the request through. This mirrors
    /// `secret_scanner.py`'s `_scan_for_secrets`, where the retry-then-deny
    /// logic lives in the scan call itself, not in its caller.
    pub async fn scan(&self, text: &str) -> ScanResult {
        if !self.probed.load(Ordering::SeqCst) || !self.available.load(Ordering::SeqCst) {
            if !self.probe().await {
                return ScanResult::scanner_unavailable();
            }
        }

        let request = AnalyzeRequest { prompt: text };
        let response = self
            .http
            .post(format!("{}/analyze/prompt", self.base_url))
            .bearer_auth(&self.bearer_token)
            .json(&request)
            .timeout(SCAN_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<AnalyzeResponse>().await {
                Ok(body) if !body.is_valid => {
                    let flagged = body
                        .scanners
                        .into_iter()
                        .filter(|(_, score)| *score < 1.0)
                        .map(|(name, _)| name)
                        .collect();
                    ScanResult { detected: true, scanners: flagged }
                }
                Ok(_) => ScanResult::clean(),
                Err(_) => ScanResult::clean(),
            },
            Ok(_) => ScanResult::clean(),
            Err(_) => {
                self.available.store(false, Ordering::SeqCst);
                ScanResult::clean()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_unavailable_flags_a_single_named_scanner() {
        let result = ScanResult::scanner_unavailable();
        assert!(result.detected);
        assert_eq!(result.scanners, vec!["scanner_unavailable".to_string()]);
    }

    #[tokio::test]
    async fn unreachable_detector_fails_closed_on_first_scan() {
        let client = DetectorClient::new("http://127.0.0.1:1", "token");
        let result = client.scan("some body text here").await;
        assert!(result.detected);
        assert_eq!(result.scanners, vec!["scanner_unavailable".to_string()]);
    }
}
