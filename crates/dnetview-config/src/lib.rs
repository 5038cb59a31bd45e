//! Configuration for the dnetview monitor.
//!
//! One TOML file lists the nodes to watch and the poll timings. It is
//! layered with `figment` (built-in defaults, then the file, then
//! `DNETVIEW_*` environment variables) and translated into a validated
//! `dnetview_core::MonitorConfig`.

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use dnetview_core::{CoreError, MonitorConfig, NodeConfig, NodeKind, StalePolicy};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Seconds between round starts.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Per-node fetch deadline in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Drop an unreachable node's last-known sessions after this many
    /// failed rounds in a row. Absent: keep them forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_stale_after: Option<u32>,

    /// Monitored nodes, in display order.
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            clear_stale_after: None,
            nodes: Vec::new(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    dnetview_core::DEFAULT_POLL_INTERVAL.as_secs()
}
fn default_fetch_timeout_secs() -> u64 {
    dnetview_core::DEFAULT_FETCH_TIMEOUT.as_secs()
}

/// One `[[nodes]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NodeEntry {
    /// Unique, user-assigned name.
    pub id: String,

    /// Display title; defaults to `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default)]
    pub kind: NodeKind,

    /// JSON-RPC endpoint, e.g. "http://127.0.0.1:26660".
    pub endpoint: String,
}

impl Config {
    /// A starter configuration with one local node.
    pub fn example() -> Self {
        Self {
            nodes: vec![NodeEntry {
                id: "local".into(),
                title: Some("local node".into()),
                kind: NodeKind::Normal,
                endpoint: "http://127.0.0.1:26660".into(),
            }],
            ..Self::default()
        }
    }

    /// Validate and translate into the core's runtime configuration.
    pub fn into_monitor_config(self) -> Result<MonitorConfig, ConfigError> {
        let nodes = self
            .nodes
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| entry.into_node_config(idx))
            .collect::<Result<Vec<_>, _>>()?;

        let stale_policy = match self.clear_stale_after {
            None => StalePolicy::RetainForever,
            Some(n) => StalePolicy::ClearAfter(NonZeroU32::new(n).ok_or_else(|| {
                ConfigError::Validation {
                    field: "clear_stale_after".into(),
                    reason: "must be at least 1 (omit it to keep stale data forever)".into(),
                }
            })?),
        };

        let config = MonitorConfig {
            nodes,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            stale_policy,
        };
        config.validate()?;
        Ok(config)
    }
}

impl NodeEntry {
    fn into_node_config(self, idx: usize) -> Result<NodeConfig, ConfigError> {
        let field = format!("nodes[{idx}].endpoint");
        let endpoint: Url = self.endpoint.parse().map_err(|e| ConfigError::Validation {
            field: field.clone(),
            reason: format!("invalid URL '{}': {e}", self.endpoint),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field,
                reason: format!("expected an http(s) URL, got '{}'", self.endpoint),
            });
        }
        if self.id.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: format!("nodes[{idx}].id"),
                reason: "must not be empty".into(),
            });
        }

        let mut node = NodeConfig::new(self.id, endpoint).with_kind(self.kind);
        if let Some(title) = self.title {
            node = node.with_title(title);
        }
        Ok(node)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "dnetview", "dnetview").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("dnetview");
    p
}

// ── Config loading ──────────────────────────────────────────────────

fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DNETVIEW_"))
}

/// Load from the platform config path. A missing file yields the
/// defaults, which have no nodes.
pub fn load_config() -> Result<Config, ConfigError> {
    Ok(figment_for(&config_path()).extract()?)
}

/// Load from an explicit path, which must exist.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(figment_for(path).extract()?)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`, creating parents.
pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    use super::*;

    fn write_toml(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_full_file() {
        let file = write_toml(
            r#"
poll_interval_secs = 3
fetch_timeout_secs = 1
clear_stale_after = 10

[[nodes]]
id = "darkirc"
title = "darkirc node"
endpoint = "http://127.0.0.1:26660"

[[nodes]]
id = "seed"
kind = "lilith"
endpoint = "https://10.0.0.2:18927/"
"#,
        );

        let cfg = load_config_from(file.path()).unwrap();
        assert_eq!(cfg.poll_interval_secs, 3);
        assert_eq!(cfg.clear_stale_after, Some(10));
        assert_eq!(cfg.nodes.len(), 2);
        assert_eq!(cfg.nodes[1].kind, NodeKind::Lilith);

        let monitor = cfg.into_monitor_config().unwrap();
        assert_eq!(monitor.poll_interval, Duration::from_secs(3));
        assert_eq!(monitor.fetch_timeout, Duration::from_secs(1));
        assert_eq!(
            monitor.stale_policy,
            StalePolicy::ClearAfter(NonZeroU32::new(10).unwrap())
        );
        assert_eq!(monitor.nodes[0].title, "darkirc node");
        assert_eq!(monitor.nodes[0].kind, NodeKind::Normal);
        // Title falls back to the id.
        assert_eq!(monitor.nodes[1].title, "seed");
        assert_eq!(monitor.nodes[1].endpoint.port(), Some(18927));
    }

    #[test]
    fn timings_default_when_omitted() {
        let file = write_toml(
            r#"
[[nodes]]
id = "a"
endpoint = "http://127.0.0.1:1"
"#,
        );
        let monitor = load_config_from(file.path())
            .unwrap()
            .into_monitor_config()
            .unwrap();
        assert_eq!(monitor.poll_interval, dnetview_core::DEFAULT_POLL_INTERVAL);
        assert_eq!(monitor.fetch_timeout, dnetview_core::DEFAULT_FETCH_TIMEOUT);
        assert_eq!(monitor.stale_policy, StalePolicy::RetainForever);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn unknown_node_kind_is_rejected() {
        let file = write_toml(
            r#"
[[nodes]]
id = "a"
kind = "relay"
endpoint = "http://127.0.0.1:1"
"#,
        );
        assert!(matches!(
            load_config_from(file.path()).unwrap_err(),
            ConfigError::Figment(_)
        ));
    }

    #[test]
    fn empty_node_set_is_fatal() {
        let err = Config::default().into_monitor_config().unwrap_err();
        assert!(matches!(err, ConfigError::Core(CoreError::NoNodes)));
    }

    #[test]
    fn duplicate_ids_are_fatal() {
        let mut cfg = Config::example();
        cfg.nodes.push(cfg.nodes[0].clone());
        let err = cfg.into_monitor_config().unwrap_err();
        assert!(matches!(err, ConfigError::Core(CoreError::DuplicateNode { .. })));
    }

    #[test]
    fn bad_endpoint_names_the_field() {
        let mut cfg = Config::example();
        cfg.nodes.push(NodeEntry {
            id: "b".into(),
            title: None,
            kind: NodeKind::Normal,
            endpoint: "tcp://127.0.0.1:1".into(),
        });
        match cfg.into_monitor_config().unwrap_err() {
            ConfigError::Validation { field, .. } => assert_eq!(field, "nodes[1].endpoint"),
            other => panic!("expected validation error, got {other:?}"),
        }

        let mut cfg = Config::example();
        cfg.nodes[0].endpoint = "not a url".into();
        assert!(matches!(
            cfg.into_monitor_config().unwrap_err(),
            ConfigError::Validation { .. }
        ));
    }

    #[test]
    fn zero_timings_are_rejected() {
        let mut cfg = Config::example();
        cfg.poll_interval_secs = 0;
        assert!(matches!(
            cfg.into_monitor_config().unwrap_err(),
            ConfigError::Core(CoreError::Config { .. })
        ));

        let mut cfg = Config::example();
        cfg.clear_stale_after = Some(0);
        assert!(matches!(
            cfg.into_monitor_config().unwrap_err(),
            ConfigError::Validation { ref field, .. } if field == "clear_stale_after"
        ));
    }

    #[test]
    fn saved_example_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        save_config_to(&path, &Config::example()).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded, Config::example());
    }
}
