use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::probe::ProbeMethod;
use crate::transport::CurlOptions;

/// HTTP transport settings (`[http]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent sent with every request. None = curl's default.
    #[serde(default)]
    pub user_agent: Option<String>,
    pub connect_timeout_secs: u64,
    /// Abort a transfer whose throughput stays below this (bytes/s) ...
    pub low_speed_limit: u32,
    /// ... for this many seconds.
    pub low_speed_time_secs: u64,
    pub follow_redirects: bool,
    /// Extra request headers, e.g. `Cookie` or `Authorization`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let curl = CurlOptions::default();
        Self {
            user_agent: curl.user_agent,
            connect_timeout_secs: curl.connect_timeout.as_secs(),
            low_speed_limit: curl.low_speed_limit,
            low_speed_time_secs: curl.low_speed_time.as_secs(),
            follow_redirects: curl.follow_redirects,
            headers: BTreeMap::new(),
        }
    }
}

impl HttpConfig {
    pub fn curl_options(&self) -> CurlOptions {
        CurlOptions {
            user_agent: self.user_agent.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            low_speed_limit: self.low_speed_limit,
            low_speed_time: Duration::from_secs(self.low_speed_time_secs),
            follow_redirects: self.follow_redirects,
            headers: self
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Global configuration loaded from `~/.config/pdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdlConfig {
    /// Default number of concurrent range workers.
    pub workers: usize,
    /// Bytes read from the network per step (also the cancellation granularity).
    pub chunk_size: usize,
    /// Request used to probe length and range support: "get" (default) or "head".
    #[serde(default)]
    pub probe_method: ProbeMethod,
    /// Fail instead of falling back when `Accept-Ranges` names a unit other than bytes.
    #[serde(default)]
    pub strict_range_unit: bool,
    /// Keep the incomplete destination file after a failed download.
    #[serde(default)]
    pub keep_partial: bool,
    /// Directory for derived filenames. None = current directory.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for PdlConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            chunk_size: 32 * 1024,
            probe_method: ProbeMethod::Get,
            strict_range_unit: false,
            keep_partial: false,
            download_dir: None,
            http: HttpConfig::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("pdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<PdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = PdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

pub fn load_from(path: &Path) -> Result<PdlConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: PdlConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = PdlConfig::default();
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.chunk_size, 32 * 1024);
        assert_eq!(cfg.probe_method, ProbeMethod::Get);
        assert!(!cfg.strict_range_unit);
        assert!(!cfg.keep_partial);
        assert!(cfg.http.follow_redirects);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = PdlConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: PdlConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.workers, cfg.workers);
        assert_eq!(parsed.chunk_size, cfg.chunk_size);
        assert_eq!(parsed.http.user_agent, cfg.http.user_agent);
        assert_eq!(parsed.http.low_speed_limit, cfg.http.low_speed_limit);
    }

    #[test]
    fn config_toml_minimal_uses_defaults() {
        let toml = r#"
            workers = 8
            chunk_size = 4096
        "#;
        let cfg: PdlConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.workers, 8);
        assert_eq!(cfg.chunk_size, 4096);
        assert_eq!(cfg.probe_method, ProbeMethod::Get);
        assert!(cfg.download_dir.is_none());
        assert_eq!(cfg.http.connect_timeout_secs, 30);
    }

    #[test]
    fn config_toml_full() {
        let toml = r#"
            workers = 2
            chunk_size = 65536
            probe_method = "head"
            strict_range_unit = true
            keep_partial = true
            download_dir = "/srv/downloads"

            [http]
            user_agent = "Mozilla/5.0"
            connect_timeout_secs = 5
            low_speed_limit = 10
            low_speed_time_secs = 20
            follow_redirects = false

            [http.headers]
            Cookie = "session=abc"
        "#;
        let cfg: PdlConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.probe_method, ProbeMethod::Head);
        assert!(cfg.strict_range_unit);
        assert!(cfg.keep_partial);
        assert_eq!(cfg.download_dir.as_deref(), Some(Path::new("/srv/downloads")));

        let curl = cfg.http.curl_options();
        assert_eq!(curl.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(curl.connect_timeout, Duration::from_secs(5));
        assert_eq!(curl.low_speed_time, Duration::from_secs(20));
        assert!(!curl.follow_redirects);
        assert_eq!(
            curl.headers,
            vec![("Cookie".to_string(), "session=abc".to_string())]
        );
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "workers = 16\nchunk_size = 1024\n").unwrap();
        let cfg = load_from(&path).unwrap();
        assert_eq!(cfg.workers, 16);
    }
}
