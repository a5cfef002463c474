//! Uploader configuration.
//!
//! Read from `~/.config/romen/uploader.json`; command-line flags override
//! whatever the file says.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use romen_protocol::DEFAULT_SERVER_URL;
use romen_upload_queue::{DEFAULT_POLL_INTERVAL, QueueConfig};

/// On-disk shape of `uploader.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UploaderConfigFile {
    #[serde(default)]
    server_url: String,
    #[serde(default)]
    poll_interval_ms: u64,
    #[serde(default)]
    max_poll_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploaderConfig {
    /// Base URL of the ingestion server.
    pub server_url: String,

    /// Wait before each job status request.
    pub poll_interval: Duration,

    /// Give up on jobs still running after this long. `None` waits forever.
    pub max_poll: Option<Duration>,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll: None,
        }
    }
}

/// Values given on the command line. `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub max_poll_secs: Option<u64>,
}

impl UploaderConfig {
    /// Loads `path`, or the default location when `path` is `None`.
    ///
    /// A missing file yields the defaults; a malformed one is logged and
    /// ignored.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        let mut config = UploaderConfig::default();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(config);
        }

        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<UploaderConfigFile>(&content) {
            Ok(file) => config.merge_file(file),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to parse uploader config, using defaults"
            ),
        }
        Ok(config)
    }

    fn merge_file(&mut self, file: UploaderConfigFile) {
        if !file.server_url.is_empty() {
            self.server_url = file.server_url;
        }
        if file.poll_interval_ms > 0 {
            self.poll_interval = Duration::from_millis(file.poll_interval_ms);
        }
        if file.max_poll_secs > 0 {
            self.max_poll = Some(Duration::from_secs(file.max_poll_secs));
        }
    }

    /// Applies command-line overrides. A zero `max_poll_secs` removes the cap.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.server_url {
            self.server_url = url;
        }
        if let Some(ms) = overrides.poll_interval_ms.filter(|ms| *ms > 0) {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = overrides.max_poll_secs {
            self.max_poll = (secs > 0).then(|| Duration::from_secs(secs));
        }
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            poll_interval: self.poll_interval,
            max_poll_duration: self.max_poll,
            ..QueueConfig::default()
        }
    }
}

fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("romen").join("uploader.json"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME")
            .map_err(|_| anyhow::anyhow!("HOME is not set; pass --config"))?;
        Ok(PathBuf::from(home).join(".config"))
    }
}
