//! Configuration file loading.
//!
//! ```toml
//! [model]
//! src = ["sql"]
//! dst = "model"
//! driver = "postgres"
//! module = "github.com/acme/app"
//! db_package = "github.com/acme/app/pkg/db"
//! format_command = ["gofmt"]
//!
//! [types]
//! UUID = "string"
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::backend::Driver;
use crate::error::{GenError, GenResult};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "DDLGEN_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG: &str = "ddlgen.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    /// SQL type -> Go type overrides.
    #[serde(default)]
    pub types: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub src: Vec<PathBuf>,
    pub dst: Option<PathBuf>,
    pub driver: Option<Driver>,
    pub force: bool,
    /// Go module path, instead of reading `go.mod`.
    pub module: Option<String>,
    /// Import path of the array column package.
    pub db_package: Option<String>,
    pub template_dir: Option<PathBuf>,
    pub format_command: Vec<String>,
}

impl Config {
    pub fn from_toml(content: &str) -> GenResult<Self> {
        toml::from_str(content).map_err(|e| GenError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> GenResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| GenError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content).map_err(|e| GenError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the first config found.
    ///
    /// Order: `explicit`, then `$DDLGEN_CONFIG`, then `./ddlgen.toml`, then
    /// `<config dir>/ddlgen/config.toml`. An explicit path that does not
    /// exist is an error; no file at all yields the defaults.
    pub fn load(explicit: Option<&Path>) -> GenResult<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));
        if let Some(path) = explicit {
            return Self::from_file(&path);
        }

        for path in Self::candidates() {
            if path.is_file() {
                tracing::debug!("Loading config from {}", path.display());
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("ddlgen").join("config.toml"));
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml(
            r#"
[model]
src = ["sql", "extra/sql"]
dst = "model"
driver = "mongodb"
force = true
module = "github.com/acme/app"
format_command = ["gofmt", "-s"]

[types]
UUID = "string"
"#,
        )
        .unwrap();
        assert_eq!(config.model.src, vec![PathBuf::from("sql"), PathBuf::from("extra/sql")]);
        assert_eq!(config.model.driver, Some(Driver::Mongodb));
        assert!(config.model.force);
        assert_eq!(config.model.module.as_deref(), Some("github.com/acme/app"));
        assert_eq!(config.model.format_command, vec!["gofmt", "-s"]);
        assert_eq!(config.types.get("UUID").map(String::as_str), Some("string"));
        assert_eq!(config.model.db_package, None);
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Config::from_toml("[model]\ndriver = \"oracle\"\n"),
            Err(GenError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml("[model]\nunknown = 1\n"),
            Err(GenError::Config(_))
        ));
    }

    #[test]
    fn test_load_explicit_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("gen.toml");
        fs::write(&path, "[model]\ndst = \"out\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.model.dst, Some(PathBuf::from("out")));

        let missing = tmp.path().join("missing.toml");
        assert!(matches!(Config::load(Some(&missing)), Err(GenError::Config(_))));
    }
}
