//! TOML-based configuration for Prism.
//!
//! Supports a config file (prism.toml) with environment variable
//! expansion.
//!
//! Example configuration:
//! ```toml
//! [datasources.sales]
//! url = "http://olap.example.com/xmla"
//! catalog = "Adventure Works"
//! provider = "sqlserver"
//! username = "reader"
//! password = "${OLAP_PASSWORD}"
//!
//! [datasources.finance]
//! url = "https://bw.example.com/sap/bc/xmla"
//! catalog = "FIN"
//! provider = "sap"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::CubeType;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Data source not found: {0}")]
    DataSourceNotFound(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Named OLAP data sources.
    pub datasources: HashMap<String, DataSourceSettings>,
}

/// One data source as written in the config file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DataSourceSettings {
    /// XMLA endpoint URL (supports ${ENV_VAR} expansion).
    pub url: String,

    /// Catalog to scope discovery and execution to.
    pub catalog: String,

    /// Provider family: sqlserver, mondrian, essbase, sap.
    pub provider: String,

    /// Static credential, used when no per-principal credential
    /// resolver is injected.
    pub username: Option<String>,
    pub password: Option<String>,
}

/// A resolved data source, env vars expanded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSource {
    pub name: String,
    pub url: String,
    pub catalog: String,
    pub cube_type: CubeType,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Settings {
    /// Load settings from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `PRISM_CONFIG`
    /// 2. `./prism.toml`
    /// 3. `~/.config/prism/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("PRISM_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("prism.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("prism").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Resolve a named data source, expanding environment variables.
    pub fn datasource(&self, name: &str) -> Result<DataSource, SettingsError> {
        let raw = self
            .datasources
            .get(name)
            .ok_or_else(|| SettingsError::DataSourceNotFound(name.to_string()))?;

        Ok(DataSource {
            name: name.to_string(),
            url: expand_env_vars(&raw.url)?,
            catalog: expand_env_vars(&raw.catalog)?,
            cube_type: CubeType::from_provider(&raw.provider),
            username: raw
                .username
                .as_deref()
                .map(expand_env_vars)
                .transpose()?,
            password: raw
                .password
                .as_deref()
                .map(expand_env_vars)
                .transpose()?,
        })
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' {
            if chars.peek() == Some(&'{') {
                chars.next(); // consume '{'
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch == '}' {
                        chars.next(); // consume '}'
                        break;
                    }
                    var_name.push(ch);
                    chars.next();
                }
                let value = env::var(&var_name)
                    .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                result.push_str(&value);
            } else {
                // $VAR (ends at non-alphanumeric/underscore)
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        var_name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if var_name.is_empty() {
                    result.push('$');
                } else {
                    let value = env::var(&var_name)
                        .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                    result.push_str(&value);
                }
            }
        } else {
            result.push(c);
        }
    }

    Ok(result)
}
