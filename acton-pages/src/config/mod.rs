//! Engine settings
//!
//! Later layers override earlier ones:
//!
//! - built-in defaults
//! - `/etc/acton-pages/{service}/config.toml`
//! - `~/.config/acton-pages/{service}/config.toml`
//! - `./config.toml`
//! - `ACTON_*` environment variables, `__` separating nested keys
//!
//! # Example
//!
//! ```toml
//! # config.toml
//! [pages]
//! definitions_path = "./pages.toml"
//!
//! [composer]
//! reuse_forms = true
//! load_options = true
//!
//! [registry]
//! seed_sample_data = true
//!
//! [toolbar]
//! show_copy = true
//!
//! [observability]
//! log_format = "json"
//! filter = "acton_pages=debug"
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use acton_pages::config::ActonPagesConfig;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = ActonPagesConfig::load_for_service("my-app")?;
//! let reuse = config.composer.reuse_forms;
//! # Ok(())
//! # }
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::forms::ToolbarVisibility;

/// Where page, grid and detail definitions come from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagesSettings {
    /// TOML file with `[[pages]]`, `[[grids]]` and `[[details]]` tables
    pub definitions_path: Option<PathBuf>,
}

/// Form composer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerSettings {
    /// Reuse the current form when the `(type, view)` key is unchanged
    pub reuse_forms: bool,

    /// Fill select options from data providers when a form is built
    pub load_options: bool,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            reuse_forms: true,
            load_options: true,
        }
    }
}

/// Entity type registry settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Run every initializer's sample data through its data service at startup
    pub seed_sample_data: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty in debug builds, JSON in release builds
    #[default]
    Auto,
    /// Human-readable multi-line output
    Pretty,
    /// One JSON object per event
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Output format
    pub log_format: LogFormat,

    /// Filter directives used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Auto,
            filter: "info,acton_pages=debug".to_string(),
        }
    }
}

/// Complete acton-pages configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActonPagesConfig {
    /// Definition source
    #[serde(default)]
    pub pages: PagesSettings,

    /// Form composer settings
    #[serde(default)]
    pub composer: ComposerSettings,

    /// Registry settings
    #[serde(default)]
    pub registry: RegistrySettings,

    /// Default toolbar visibility for types whose page behavior sets none
    #[serde(default)]
    pub toolbar: ToolbarVisibility,

    /// Logging settings
    #[serde(default)]
    pub observability: ObservabilitySettings,
}

impl ActonPagesConfig {
    /// Merge every layer for `service_name`, see the module docs for order
    ///
    /// # Errors
    ///
    /// Fails when a present file does not parse or a value has the wrong type.
    pub fn load_for_service(service_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::new().merge(Toml::string(&toml::to_string(&Self::default())?));

        let system_config = PathBuf::from("/etc/acton-pages")
            .join(service_name)
            .join("config.toml");
        if system_config.exists() {
            figment = figment.merge(Toml::file(&system_config));
        }

        let user_config = Self::recommended_path(service_name);
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }

        let local_config = PathBuf::from("./config.toml");
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }

        figment = figment.merge(Env::prefixed("ACTON_").split("__").lowercase(true));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Defaults, then `path` if it exists, then the environment
    ///
    /// # Errors
    ///
    /// Fails on invalid TOML or a mistyped value.
    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        let config = Figment::new()
            .merge(Toml::string(&toml::to_string(&Self::default())?))
            .merge(Toml::file(path))
            .merge(Env::prefixed("ACTON_").split("__").lowercase(true))
            .extract()?;

        Ok(config)
    }

    /// Per-user config file of `service_name`
    ///
    /// ```rust
    /// use acton_pages::config::ActonPagesConfig;
    ///
    /// let path = ActonPagesConfig::recommended_path("my-app");
    /// assert!(path.ends_with("config.toml"));
    /// ```
    #[must_use]
    pub fn recommended_path(service_name: &str) -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from("./config.toml"),
            |config_dir| {
                config_dir
                    .join("acton-pages")
                    .join(service_name)
                    .join("config.toml")
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ActonPagesConfig::default();
        assert!(config.composer.reuse_forms);
        assert!(config.composer.load_options);
        assert!(!config.registry.seed_sample_data);
        assert!(config.pages.definitions_path.is_none());
        assert_eq!(config.toolbar, ToolbarVisibility::default());
        assert_eq!(config.observability.log_format, LogFormat::Auto);
    }

    #[test]
    fn test_recommended_path() {
        let path = ActonPagesConfig::recommended_path("test-app");
        let path = path.to_str().unwrap();
        assert!(path.contains("test-app"));
        assert!(path.ends_with("config.toml"));
    }

    #[test]
    fn test_load_from_nonexistent_file() {
        let config = ActonPagesConfig::load_from("/nonexistent/path/config.toml").unwrap();
        assert!(config.composer.reuse_forms);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[pages]
definitions_path = "/srv/pages.toml"

[composer]
reuse_forms = false

[registry]
seed_sample_data = true

[toolbar]
show_delete = false
show_report = true

[observability]
log_format = "json"
"#
        )
        .unwrap();

        let config = ActonPagesConfig::load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(
            config.pages.definitions_path,
            Some(PathBuf::from("/srv/pages.toml"))
        );
        assert!(!config.composer.reuse_forms);
        assert!(config.composer.load_options);
        assert!(config.registry.seed_sample_data);
        assert!(!config.toolbar.show_delete);
        assert!(config.toolbar.show_report);
        assert!(config.toolbar.show_new);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_load_rejects_wrong_types() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[composer]\nreuse_forms = \"sometimes\"").unwrap();
        assert!(ActonPagesConfig::load_from(file.path().to_str().unwrap()).is_err());
    }
}
