use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::RecordId;

/// Resource server settings.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub data_file: Option<PathBuf>,
    pub session_ttl_hours: i64,
    pub allowed_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3001".to_string());
        let data_file = non_empty(lookup("DATA_FILE")).map(PathBuf::from);
        let session_ttl_hours = match non_empty(lookup("SESSION_TTL_HOURS")) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|e| anyhow::anyhow!("SESSION_TTL_HOURS must be an integer: {e}"))?,
            None => 24,
        };
        if session_ttl_hours <= 0 {
            anyhow::bail!("SESSION_TTL_HOURS must be positive");
        }
        let allowed_origin = non_empty(lookup("ALLOWED_ORIGIN"));

        Ok(Self {
            bind_addr,
            data_file,
            session_ttl_hours,
            allowed_origin,
        })
    }
}

/// Client core settings: where the resource API lives and where the device
/// cache is kept.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub cache_file: PathBuf,
    pub default_user_id: RecordId,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = non_empty(lookup("API_BASE_URL"))
            .unwrap_or_else(|| "http://localhost:3001/api".to_string())
            .trim_end_matches('/')
            .to_string();
        let cache_file = non_empty(lookup("CACHE_FILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".healthcare-cache.json"));
        let default_user_id = non_empty(lookup("DEFAULT_USER_ID"))
            .map(RecordId::new)
            .unwrap_or_else(RecordId::fallback_user);
        let timeout_secs = match non_empty(lookup("REQUEST_TIMEOUT_SECS")) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("REQUEST_TIMEOUT_SECS must be an integer: {e}"))?,
            None => 10,
        };

        Ok(Self {
            api_base_url,
            cache_file,
            default_user_id,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn server_defaults() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:3001");
        assert!(cfg.data_file.is_none());
        assert_eq!(cfg.session_ttl_hours, 24);
        assert!(cfg.allowed_origin.is_none());
    }

    #[test]
    fn server_rejects_bad_ttl() {
        assert!(Config::from_lookup(lookup(&[("SESSION_TTL_HOURS", "soon")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SESSION_TTL_HOURS", "0")])).is_err());
    }

    #[test]
    fn client_overrides() {
        let cfg = ClientConfig::from_lookup(lookup(&[
            ("API_BASE_URL", "http://example.test/api/"),
            ("CACHE_FILE", "/tmp/cache.json"),
            ("DEFAULT_USER_ID", "7"),
            ("REQUEST_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_base_url, "http://example.test/api");
        assert_eq!(cfg.cache_file, PathBuf::from("/tmp/cache.json"));
        assert_eq!(cfg.default_user_id, RecordId::from("7"));
        assert_eq!(cfg.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn client_defaults_to_fallback_user() {
        let cfg = ClientConfig::from_lookup(lookup(&[("DEFAULT_USER_ID", "")])).unwrap();
        assert_eq!(cfg.default_user_id, RecordId::fallback_user());
        assert_eq!(cfg.api_base_url, "http://localhost:3001/api");
    }
}
