//! Project configuration
//!
//! Loadable from TOML:
//!
//! ```toml
//! project_folder = "."
//! meta_dir_template = ".{}s"
//! meta_timeout_ms = 1000
//! templates_dir = "templates"
//! home_notebook_ext = "ipynb"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors while loading or saving configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read or written
    #[error("io error on config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`ProjectConfig`]
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Config could not be rendered as TOML
    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A setting holds an unusable value
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Settings of one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project root; a path to a file means that file's directory
    pub project_folder: PathBuf,
    /// Meta sub-folder name, `{}` is replaced by the kind's short type
    pub meta_dir_template: String,
    /// Staleness window of record stores, in milliseconds
    pub meta_timeout_ms: u64,
    /// Templates folder, relative to the project folder
    pub templates_dir: PathBuf,
    /// Extension of notebook files
    pub home_notebook_ext: String,
}

impl ProjectConfig {
    /// Default configuration rooted at `project_folder`
    #[must_use]
    pub fn new(project_folder: impl Into<PathBuf>) -> Self {
        Self {
            project_folder: project_folder.into(),
            ..Self::default()
        }
    }

    /// With meta folder template
    #[inline]
    #[must_use]
    pub fn with_meta_dir_template(mut self, template: impl Into<String>) -> Self {
        self.meta_dir_template = template.into();
        self
    }

    /// With record staleness window
    #[inline]
    #[must_use]
    pub fn with_meta_timeout(mut self, timeout: Duration) -> Self {
        self.meta_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With templates folder
    #[inline]
    #[must_use]
    pub fn with_templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.templates_dir = dir.into();
        self
    }

    /// With notebook extension
    #[inline]
    #[must_use]
    pub fn with_notebook_ext(mut self, ext: impl Into<String>) -> Self {
        self.home_notebook_ext = ext.into();
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// `ConfigError::Parse` for invalid TOML, `Invalid` for bad values.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// A relative `project_folder` is taken relative to the file's directory.
    ///
    /// # Errors
    /// IO, parse or validation errors.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text, path)?;
        if config.project_folder.is_relative() {
            if let Some(dir) = path.parent() {
                config.project_folder = dir.join(&config.project_folder);
            }
        }
        tracing::debug!(config = %path.display(), project = %config.project_folder.display(), "loaded config");
        Ok(config)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// `ConfigError::Serialize` if rendering fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check values that cannot be expressed in the type
    ///
    /// # Errors
    /// `ConfigError::Invalid` describing the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.meta_dir_template.matches("{}").count() != 1 {
            return Err(ConfigError::Invalid {
                key: "meta_dir_template",
                reason: format!("'{}' must contain exactly one '{{}}'", self.meta_dir_template),
            });
        }
        if self.home_notebook_ext.is_empty() {
            return Err(ConfigError::Invalid {
                key: "home_notebook_ext",
                reason: "must not be empty".to_owned(),
            });
        }
        Ok(())
    }

    /// Project folder with the file-means-its-directory rule applied
    #[must_use]
    pub fn resolved_project_folder(&self) -> PathBuf {
        if self.project_folder.is_file() {
            self.project_folder
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        } else {
            self.project_folder.clone()
        }
    }

    /// Record staleness window
    #[inline]
    #[must_use]
    pub fn meta_timeout(&self) -> Duration {
        Duration::from_millis(self.meta_timeout_ms)
    }

    /// Meta folder name for a short type, e.g. `.wps`
    #[must_use]
    pub fn meta_dir_name(&self, short_type: &str) -> String {
        self.meta_dir_template.replacen("{}", short_type, 1)
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_folder: PathBuf::from("."),
            meta_dir_template: ".{}s".to_owned(),
            meta_timeout_ms: 1000,
            templates_dir: PathBuf::from("templates"),
            home_notebook_ext: "ipynb".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = ProjectConfig::new("/data/project");
        assert_eq!(config.meta_dir_name("wp"), ".wps");
        assert_eq!(config.meta_timeout(), Duration::from_secs(1));
        assert_eq!(config.templates_dir, PathBuf::from("templates"));
        assert_eq!(config.home_notebook_ext, "ipynb");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = ProjectConfig::from_toml_str(
            "project_folder = \"/srv/lab\"\nmeta_timeout_ms = 250\n",
            Path::new("strata.toml"),
        )
        .unwrap();
        assert_eq!(config.project_folder, PathBuf::from("/srv/lab"));
        assert_eq!(config.meta_timeout(), Duration::from_millis(250));
        assert_eq!(config.meta_dir_template, ".{}s");
    }

    #[test]
    fn rejects_template_without_placeholder() {
        let err = ProjectConfig::from_toml_str("meta_dir_template = \".meta\"", Path::new("x.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "meta_dir_template", .. }));
    }

    #[test]
    fn file_relative_project_folder() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("strata.toml");
        fs::write(&path, "project_folder = \"lab\"\n").unwrap();
        let config = ProjectConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.project_folder, dir.path().join("lab"));
    }

    #[test]
    fn file_path_means_its_directory() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("project.py");
        fs::write(&script, "").unwrap();
        assert_eq!(ProjectConfig::new(&script).resolved_project_folder(), dir.path());
        assert_eq!(ProjectConfig::new(dir.path()).resolved_project_folder(), dir.path());
    }

    #[test]
    fn toml_round_trip_keeps_settings() {
        let config = ProjectConfig::new("/srv/lab").with_meta_dir_template("_{}_meta");
        let text = config.to_toml_string().unwrap();
        assert_eq!(ProjectConfig::from_toml_str(&text, Path::new("t.toml")).unwrap(), config);
    }
}
