use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Read the config file. A missing file yields the defaults.
pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = read_config(&tmp.path().join("tasktree.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.sync.push_updates);
        assert_eq!(config.display.indent, 2);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tasktree.toml");
        fs::write(&path, "[display]\nshow_ids = true\n").unwrap();
        let config = read_config(&path).unwrap();
        assert!(config.display.show_ids);
        assert!(config.display.show_completed);
        assert!(config.sync.push_updates);
    }

    #[test]
    fn full_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tasktree.toml");
        fs::write(
            &path,
            r#"
[sync]
push_updates = false

[display]
show_ids = true
show_completed = false
indent = 4
"#,
        )
        .unwrap();
        let config = read_config(&path).unwrap();
        assert!(!config.sync.push_updates);
        assert!(!config.display.show_completed);
        assert_eq!(config.display.indent, 4);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tasktree.toml");
        fs::write(&path, "[display\nindent = ").unwrap();
        assert!(matches!(
            read_config(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
