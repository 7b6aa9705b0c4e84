//! Runtime configuration. Values come from, in order of precedence: command
//! line flags (or their environment variables), an optional TOML file, and
//! built-in defaults rooted in `~/.orchestra-manager`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use directories::BaseDirs;
use serde::Deserialize;

use crate::storage::DEFAULT_BUCKET;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".orchestra-manager";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "catalog.sqlite";
/// Directory that holds the buckets.
const STORAGE_DIR_NAME: &str = "storage";
const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_FILE_NAME: &str = "orchestra-manager.log";
const DEFAULT_ACCOUNT: &str = "local";

#[derive(Parser, Debug, Default)]
#[command(version, about = "Terminal sheet-music library for orchestras")]
pub struct CliArgs {
    /// Path to a TOML config file. Defaults to `<data dir>/config.toml`.
    #[arg(long, env = "ORCHESTRA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the database, stored files and the log.
    #[arg(long, env = "ORCHESTRA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Account the catalog is scoped to.
    #[arg(long, env = "ORCHESTRA_ACCOUNT")]
    pub account: Option<String>,

    /// Log filter directive, e.g. `info` or `orchestra_sheet_music=debug`.
    #[arg(long, env = "ORCHESTRA_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Optional settings read from `config.toml`.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub data_dir: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub bucket_root: Option<PathBuf>,
    pub bucket_name: Option<String>,
    pub account: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// Fully resolved settings used to wire up the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub bucket_root: PathBuf,
    pub bucket_name: String,
    pub account: String,
    /// Explicit filter directive. `None` defers to `RUST_LOG`, then `info`.
    pub log_level: Option<String>,
    pub log_file: PathBuf,
}

impl AppConfig {
    pub fn resolve(args: &CliArgs) -> Result<Self> {
        let base_dir = match &args.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };

        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => {
                let candidate = base_dir.join(CONFIG_FILE_NAME);
                if candidate.exists() {
                    FileConfig::load(&candidate)?
                } else {
                    FileConfig::default()
                }
            }
        };

        let data_dir = match (&args.data_dir, file.data_dir) {
            (Some(dir), _) => dir.clone(),
            (None, Some(dir)) => dir,
            (None, None) => base_dir,
        };

        Ok(Self {
            database_path: file
                .database_path
                .unwrap_or_else(|| data_dir.join(DB_FILE_NAME)),
            bucket_root: file
                .bucket_root
                .unwrap_or_else(|| data_dir.join(STORAGE_DIR_NAME)),
            bucket_name: file
                .bucket_name
                .unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            account: args
                .account
                .clone()
                .or(file.account)
                .unwrap_or_else(|| DEFAULT_ACCOUNT.to_string()),
            log_level: args.log_level.clone().or(file.log_level),
            log_file: file
                .log_file
                .unwrap_or_else(|| data_dir.join(LOG_FILE_NAME)),
            data_dir,
        })
    }
}

/// Resolve the default data directory inside the user's home.
fn default_data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_live_under_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let args = CliArgs {
            data_dir: Some(dir.path().to_path_buf()),
            ..CliArgs::default()
        };

        let config = AppConfig::resolve(&args).unwrap();
        assert_eq!(config.database_path, dir.path().join("catalog.sqlite"));
        assert_eq!(config.bucket_root, dir.path().join("storage"));
        assert_eq!(config.bucket_name, "sheet-music");
        assert_eq!(config.account, "local");
        assert_eq!(config.log_level, None);
        assert_eq!(config.log_file, dir.path().join("orchestra-manager.log"));
    }

    #[test]
    fn file_values_apply_and_flags_win() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "account = \"winds\"\nlog_level = \"debug\"\nbucket_name = \"scores\"\n",
        )
        .unwrap();

        let args = CliArgs {
            data_dir: Some(dir.path().to_path_buf()),
            log_level: Some("warn".to_string()),
            ..CliArgs::default()
        };

        let config = AppConfig::resolve(&args).unwrap();
        assert_eq!(config.account, "winds");
        assert_eq!(config.bucket_name, "scores");
        assert_eq!(config.log_level.as_deref(), Some("warn"));
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let args = CliArgs {
            config: Some(dir.path().join("missing.toml")),
            data_dir: Some(dir.path().to_path_buf()),
            ..CliArgs::default()
        };
        assert!(AppConfig::resolve(&args).is_err());
    }

    #[test]
    fn parses_command_line_flags() {
        let args = CliArgs::parse_from([
            "orchestra-sheet-music",
            "--data-dir",
            "/tmp/orchestra",
            "--account",
            "percussion",
        ]);
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/orchestra")));
        assert_eq!(args.account.as_deref(), Some("percussion"));
    }
}
