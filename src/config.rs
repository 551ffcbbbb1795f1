use serde::{Deserialize, Serialize};
use anyhow::Result;
use std::{fs, path::{Path, PathBuf}, time::Duration};

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub timeouts: TimeoutConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Empty means `<data dir>/mailrelay/accounts.json`.
    pub accounts_file: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_secs: u64,
    pub io_secs: u64,
    pub send_secs: u64,
    pub request_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { listen: "127.0.0.1:8080".to_string() }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { connect_secs: 10, io_secs: 30, send_secs: 30, request_secs: 60 }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs.max(1))
    }

    pub fn io(&self) -> Duration {
        Duration::from_secs(self.io_secs.max(1))
    }

    pub fn send(&self) -> Duration {
        Duration::from_secs(self.send_secs.max(1))
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs.max(1))
    }
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        if let Ok(p) = std::env::var("MAILRELAY_CONFIG") {
            return Ok(PathBuf::from(p));
        }
        let dir = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("no config dir"))?;
        Ok(dir.join("mailrelay").join("config.toml"))
    }

    pub fn load_or_create() -> Result<(Self, bool, PathBuf)> {
        let path = Self::path()?;
        let (cfg, created) = Self::load_or_create_at(&path)?;
        Ok((cfg, created, path))
    }

    pub fn load_or_create_at(path: &Path) -> Result<(Self, bool)> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, DEFAULT_CONFIG)?;
            let cfg: Self = toml::from_str(DEFAULT_CONFIG)?;
            return Ok((cfg, true));
        }

        let data = fs::read_to_string(path)?;
        let cfg = toml::from_str(&data)?;
        Ok((cfg, false))
    }

    /// Where the account list lives. Relative paths hang off the config file's directory.
    pub fn accounts_path(&self, config_path: &Path) -> Result<PathBuf> {
        if self.storage.accounts_file.is_empty() {
            let dir = dirs::data_dir().ok_or_else(|| anyhow::anyhow!("no data dir"))?;
            return Ok(dir.join("mailrelay").join("accounts.json"));
        }

        let p = PathBuf::from(&self.storage.accounts_file);
        if p.is_absolute() {
            return Ok(p);
        }
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        Ok(base.join(p))
    }
}

const DEFAULT_CONFIG: &str = r#"
[server]
# where the web pages are served
listen = "127.0.0.1:8080"

[storage]
# empty: <data dir>/mailrelay/accounts.json
accounts_file = ""

[timeouts]
connect_secs = 10
io_secs = 30
send_secs = 30
request_secs = 60
"#;
