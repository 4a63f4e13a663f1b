use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use config::Config;

/// Runtime configuration for asntriage.
pub struct TriageConfig {
    /// Path to the bulk ASN database (MMDB file).
    pub mmdb_path: Option<String>,

    /// Directory holding asntriage's data, including the record store.
    pub data_dir: String,
}

const EMPTY_CONFIG: &str = r#"### asntriage configuration file

### path to the bulk ASN database (MaxMind MMDB format)
# mmdb_path = "/var/lib/asntriage/GeoLite2-ASN.mmdb"

### directory for asntriage's data (record store lives in <data_dir>/db)
# data_dir = "~/.asntriage"
"#;

impl Default for TriageConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        Self {
            mmdb_path: None,
            data_dir: format!("{}/.asntriage", home_dir),
        }
    }
}

impl TriageConfig {
    /// Create and initialize a new configuration.
    ///
    /// Reads the TOML file at `path` when given, otherwise
    /// `$HOME/.asntriage/asntriage.toml` (created with a commented template
    /// on first run); `ASNTRIAGE_*` environment variables override file
    /// values.
    pub fn new(path: &Option<String>) -> Result<TriageConfig> {
        let mut builder = Config::builder();

        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not find home directory"))?
            .to_str()
            .ok_or_else(|| anyhow!("Could not convert home directory path to string"))?
            .to_owned();

        let triage_dir = format!("{}/.asntriage", home_dir.as_str());

        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                std::fs::create_dir_all(triage_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create asntriage directory: {}", e))?;
                let p = format!("{}/asntriage.toml", triage_dir.as_str());
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // Environment overrides, e.g. ASNTRIAGE_MMDB_PATH=/tmp/asn.mmdb
        builder = builder.add_source(config::Environment::with_prefix("ASNTRIAGE"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        let mmdb_path = config.get("mmdb_path").cloned();

        let data_dir = match config.get("data_dir") {
            Some(p) => p.trim_end_matches('/').to_string(),
            None => {
                let dir = format!("{}/.asntriage", home_dir.as_str());
                std::fs::create_dir_all(dir.as_str())
                    .map_err(|e| anyhow!("Unable to create data directory: {}", e))?;
                dir
            }
        };

        Ok(TriageConfig {
            mmdb_path,
            data_dir,
        })
    }

    /// The configured bulk database path; both commands require one.
    pub fn require_mmdb_path(&self) -> Result<&str> {
        self.mmdb_path.as_deref().ok_or_else(|| {
            anyhow!("mmdb_path is not configured (set it in the config file or ASNTRIAGE_MMDB_PATH)")
        })
    }

    /// Root directory of the record store.
    pub fn store_root(&self) -> PathBuf {
        PathBuf::from(self.data_dir.trim_end_matches('/')).join("db")
    }
}
