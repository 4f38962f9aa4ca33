use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use larder_core::models::SessionId;
use larder_core::resolve::SortMode;

/// Optional settings read from `config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    sort_mode: Option<SortMode>,
    session: Option<SessionId>,
}

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub sort_mode: SortMode,
    pub session: Option<SessionId>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "larder").context("Could not determine home directory")?;
        Self::from_dirs(proj_dirs.data_dir(), proj_dirs.config_dir())
    }

    pub fn from_dirs(data_dir: &Path, config_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let file = read_file_config(&config_dir.join("config.toml"))?;

        Ok(Config {
            db_path: data_dir.join("larder.db"),
            data_dir: data_dir.to_path_buf(),
            sort_mode: file.sort_mode.unwrap_or_default(),
            session: file.session,
        })
    }

    /// Load the API key from disk, or generate a new one.
    ///
    /// Returns `(key, newly_created)` where `newly_created` is true when a
    /// fresh key was just generated (first run).
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");

        if path.exists() {
            let key = std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok((key, false));
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &key).context("Failed to write API key file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set API key file permissions")?;
        }
        log::info!("generated API key at {}", path.display());
        Ok((key, true))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_dirs(&dir.path().join("data"), &dir.path().join("conf")).unwrap();
        assert_eq!(config.sort_mode, SortMode::StoreOrder);
        assert!(config.session.is_none());
        assert!(config.data_dir.is_dir());
        assert_eq!(config.db_path, dir.path().join("data").join("larder.db"));
    }

    #[test]
    fn test_reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("conf");
        std::fs::create_dir_all(&conf).unwrap();
        std::fs::write(
            conf.join("config.toml"),
            "sort_mode = \"alphabetical\"\nsession = 4\n",
        )
        .unwrap();

        let config = Config::from_dirs(&dir.path().join("data"), &conf).unwrap();
        assert_eq!(config.sort_mode, SortMode::Alphabetical);
        assert_eq!(config.session, Some(SessionId(4)));
    }

    #[test]
    fn test_malformed_config_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("conf");
        std::fs::create_dir_all(&conf).unwrap();
        std::fs::write(conf.join("config.toml"), "sort_mode = \"sideways\"\n").unwrap();

        let err = Config::from_dirs(&dir.path().join("data"), &conf)
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("Invalid config file"));
    }

    #[test]
    fn test_api_key_is_generated_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_dirs(dir.path(), dir.path()).unwrap();
        let (key, created) = config.load_or_create_api_key().unwrap();
        assert!(created);
        assert_eq!(key.len(), 64);

        let (again, created) = config.load_or_create_api_key().unwrap();
        assert!(!created);
        assert_eq!(again, key);
    }
}
