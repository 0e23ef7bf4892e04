//! Egress proxy configuration, loaded once at startup from the
//! environment. Grounded in the same `env_or` helper pattern as the
//! dispatcher's `config::DispatcherConfig`.

use cage_core::env::{env_optional, env_or};

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Base URL of the remote secret detector, e.g. `http://llm-guard:8000`.
    pub detector_url: String,
    pub detector_token: String,
    /// JSON-lines audit log path.
    pub log_file: String,
    /// Address the MITM listener binds to.
    pub bind_addr: String,
}

impl ProxyConfig {
    pub fn from_env() -> Self {
        Self {
            detector_url: env_or("LLM_GUARD_URL", &[], || "http://llm-guard:8000".to_string()),
            detector_token: env_optional("LLM_GUARD_TOKEN", &[])
                .unwrap_or_else(|| "internal-only".to_string()),
            log_file: env_or("LOG_FILE", &[], || "/var/log/proxy/requests.jsonl".to_string()),
            bind_addr: env_or("CAGE_PROXY_BIND", &[], || "0.0.0.0:8081".to_string()),
        }
    }
}
