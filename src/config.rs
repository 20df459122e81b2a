use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV: &str = "CARDFRAME_CONFIG";
pub const MEDIA_DIR_ENV: &str = "CARDFRAME_MEDIA_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Origin component of minted `blob:` handles.
    pub handle_origin: String,
    /// Id of the form whose submissions are relayed to the host.
    pub form_id: String,
    /// Tag of the elements chained by the playback controller.
    pub media_tag: String,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            handle_origin: "null".to_string(),
            form_id: "mainform".to_string(),
            media_tag: "audio".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub media_dir: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            media_dir: default_media_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub frame: FrameConfig,
    pub host: HostConfig,
}

impl Config {
    /// Load from `config_path`, falling back to defaults when no path is
    /// given or the file does not exist.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                Ok(serde_yaml::from_str(&contents)?)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
    }
}

fn default_media_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(MEDIA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(dirs) = ProjectDirs::from("org", "Flashback", "CardFrame") {
        let mut data_dir = dirs.data_dir().to_path_buf();
        data_dir.push("media");
        data_dir
    } else {
        PathBuf::from("media")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_default() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.frame.form_id, "mainform");
        assert_eq!(config.frame.handle_origin, "null");
        assert_eq!(config.frame.media_tag, "audio");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load(Some(PathBuf::from("/nonexistent/cardframe.yaml"))).unwrap();
        assert_eq!(config.frame.form_id, "mainform");
    }

    #[test]
    fn loads_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "frame:\n  form_id: answers\nhost:\n  media_dir: /srv/media"
        )
        .unwrap();
        let config = Config::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.frame.form_id, "answers");
        assert_eq!(config.frame.handle_origin, "null");
        assert_eq!(config.host.media_dir, PathBuf::from("/srv/media"));
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "frame: [unclosed").unwrap();
        assert!(matches!(
            Config::load(Some(file.path().to_path_buf())),
            Err(ConfigError::Yaml(_))
        ));
    }
}
