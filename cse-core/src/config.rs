//! Layered CSE configuration (§6 "CSE configuration", §A.3 of SPEC_FULL.md).
//!
//! Resolution order (lowest to highest priority), mirroring the teacher's
//! `R2eConfig`:
//! 1. `cse.yaml` (base)
//! 2. `cse-{profile}.yaml` (profile override)
//! 3. `.env` / `.env.{profile}` (loaded into process environment, never
//!    overwriting an already-set variable)
//! 4. Environment variables (`CSE_*`)
//!
//! Profile is `CSE_PROFILE` env var, else the `profile` argument, else `dev`.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Load(String),
    Missing(&'static str),
    Invalid { key: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "config load error: {msg}"),
            ConfigError::Missing(key) => write!(f, "missing required config key: {key}"),
            ConfigError::Invalid { key, reason } => {
                write!(f, "invalid config value for '{key}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Raw key/value bag loaded from YAML, merged across files and env vars.
#[derive(Debug, Clone, Default)]
struct RawValues(HashMap<String, String>);

impl RawValues {
    fn merge_yaml(&mut self, path: &Path) -> Result<(), ConfigError> {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Ok(()); // absent config files are not an error
        };
        let doc: serde_yaml::Value = serde_yaml::from_str(&contents)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        flatten_yaml("", &doc, &mut self.0);
        Ok(())
    }

    fn merge_env(&mut self, prefix: &str) {
        for (k, v) in std::env::vars() {
            if let Some(rest) = k.strip_prefix(prefix) {
                let key = rest.to_lowercase().replace('_', ".");
                self.0.insert(key, v);
            }
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }
}

fn flatten_yaml(prefix: &str, value: &serde_yaml::Value, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => format!("{other:?}"),
                };
                let full_key = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_yaml(&full_key, v, out);
            }
        }
        serde_yaml::Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        serde_yaml::Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        serde_yaml::Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        serde_yaml::Value::Null => {}
        serde_yaml::Value::Sequence(seq) => {
            let joined = seq
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        serde_yaml::Value::Tagged(t) => flatten_yaml(prefix, &t.value, out),
    }
}

/// Release versions the CSE advertises support for (`rvi`, §6).
pub const SUPPORTED_RELEASE_VERSIONS: &[&str] = &["3", "4", "5"];

/// Typed, validated CSE configuration (§6).
#[derive(Debug, Clone)]
pub struct CseConfig {
    pub cse_id: String,
    pub cse_rn: String,
    pub cse_csi: String,
    pub supported_release_versions: Vec<String>,
    pub default_serialization: String,
    pub default_request_expiration: Duration,
    pub default_resource_expiration: Duration,
    pub max_request_history: usize,
    pub polling_channel_timeout: Duration,
    pub notification_timeout: Duration,
    /// Whether to wire an `Announcer`/remote forwarder at startup (§4.5).
    /// Off by default: a single-node deployment has no remote CSEs to
    /// announce to or forward toward.
    pub announce_enabled: bool,
    /// `CSE-ID -> point of access` for remote CSEs this instance can reach
    /// (§4.5, §9's `RemoteCseDirectory`), e.g. `cse.remote.mn1=http://mn1:8080`.
    pub remote_cse_points_of_access: HashMap<String, String>,
}

impl Default for CseConfig {
    fn default() -> Self {
        Self {
            cse_id: "id-in".to_string(),
            cse_rn: "cse-in".to_string(),
            cse_csi: "/id-in".to_string(),
            supported_release_versions: SUPPORTED_RELEASE_VERSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_serialization: "json".to_string(),
            default_request_expiration: Duration::from_secs(60),
            default_resource_expiration: Duration::from_secs(60 * 60 * 24 * 365),
            max_request_history: 100,
            polling_channel_timeout: Duration::from_secs(30),
            notification_timeout: Duration::from_secs(10),
            announce_enabled: false,
            remote_cse_points_of_access: HashMap::new(),
        }
    }
}

impl CseConfig {
    /// Load configuration for the given default profile, applying the
    /// teacher's layered resolution order.
    pub fn load(default_profile: &str) -> Result<Self, ConfigError> {
        let profile =
            std::env::var("CSE_PROFILE").unwrap_or_else(|_| default_profile.to_string());

        let mut raw = RawValues::default();
        raw.merge_yaml(Path::new("cse.yaml"))?;
        raw.merge_yaml(Path::new(&format!("cse-{profile}.yaml")))?;

        let _ = dotenvy::dotenv();
        let _ = dotenvy::from_filename(format!(".env.{profile}"));

        raw.merge_env("CSE_");

        let mut cfg = CseConfig::default();
        if let Some(v) = raw.get("cse.id") {
            cfg.cse_id = v.to_string();
        }
        if let Some(v) = raw.get("cse.rn") {
            cfg.cse_rn = v.to_string();
        }
        if let Some(v) = raw.get("cse.csi") {
            cfg.cse_csi = v.to_string();
        }
        if let Some(v) = raw.get("cse.supported.release.versions") {
            cfg.supported_release_versions =
                v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(v) = raw.get("cse.default.serialization") {
            cfg.default_serialization = v.to_string();
        }
        if let Some(v) = raw.get("cse.default.request.expiration.secs") {
            cfg.default_request_expiration = parse_secs("cse.default.request.expiration.secs", v)?;
        }
        if let Some(v) = raw.get("cse.default.resource.expiration.secs") {
            cfg.default_resource_expiration =
                parse_secs("cse.default.resource.expiration.secs", v)?;
        }
        if let Some(v) = raw.get("cse.max.request.history") {
            cfg.max_request_history = v.parse().map_err(|_| ConfigError::Invalid {
                key: "cse.max.request.history",
                reason: "expected an integer".to_string(),
            })?;
        }
        if let Some(v) = raw.get("cse.polling.channel.timeout.secs") {
            cfg.polling_channel_timeout = parse_secs("cse.polling.channel.timeout.secs", v)?;
        }
        if let Some(v) = raw.get("cse.notification.timeout.secs") {
            cfg.notification_timeout = parse_secs("cse.notification.timeout.secs", v)?;
        }
        if let Some(v) = raw.get("cse.announce.enabled") {
            cfg.announce_enabled = v == "true" || v == "1";
        }
        for (key, value) in raw.0.iter() {
            if let Some(cse_id) = key.strip_prefix("cse.remote.") {
                cfg.remote_cse_points_of_access.insert(cse_id.to_string(), value.clone());
            }
        }

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cse_id.is_empty() {
            return Err(ConfigError::Missing("cse.id"));
        }
        if self.cse_rn.is_empty() {
            return Err(ConfigError::Missing("cse.rn"));
        }
        if self.supported_release_versions.is_empty() {
            return Err(ConfigError::Invalid {
                key: "cse.supported.release.versions",
                reason: "must list at least one release version".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_secs(key: &'static str, v: &str) -> Result<Duration, ConfigError> {
    v.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::Invalid {
            key,
            reason: "expected a non-negative integer number of seconds".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_is_valid() {
        let cfg = CseConfig::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    #[serial]
    fn load_falls_back_to_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let prev = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        std::env::remove_var("CSE_PROFILE");
        let cfg = CseConfig::load("dev").unwrap();
        std::env::set_current_dir(prev).unwrap();
        assert_eq!(cfg.cse_rn, "cse-in");
    }

    #[test]
    #[serial]
    fn load_reads_yaml_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("cse.yaml"),
            "cse:\n  rn: my-cse\n  id: id-my\n",
        )
        .unwrap();
        let prev = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        std::env::remove_var("CSE_PROFILE");
        let cfg = CseConfig::load("dev").unwrap();
        std::env::set_current_dir(prev).unwrap();
        assert_eq!(cfg.cse_rn, "my-cse");
        assert_eq!(cfg.cse_id, "id-my");
    }
}
