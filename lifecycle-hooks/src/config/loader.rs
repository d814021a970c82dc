//! Layered settings loading.
//!
//! Layers are merged in the order they are added, later layers winning key by
//! key: the built-in defaults first, then at most one project file and one
//! user config file, then the environment.

use super::{DEFAULT_CONFIG_FILES, ENV_PREFIX, Result, SettingsError, models::*, validation};
use figment::{
    Figment, Provider,
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
};
use std::path::Path;

/// File extensions probed in the user config directory, in order.
const USER_CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Builds a [`LifecycleConfig`] out of defaults, files and the environment.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    figment: Figment,
}

impl ConfigLoader {
    /// Start from [`LifecycleConfig::default`].
    pub fn new() -> Self {
        Self {
            figment: Figment::from(Serialized::defaults(LifecycleConfig::default())),
        }
    }

    fn layer(&mut self, provider: impl Provider) -> &mut Self {
        self.figment = std::mem::take(&mut self.figment).merge(provider);
        self
    }

    /// Add a settings file; its format is taken from the extension.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(SettingsError::FileLoadError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        Ok(match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => self.layer(Toml::file(path)),
            Some("yaml" | "yml") => self.layer(Yaml::file(path)),
            Some("json") => self.layer(Json::file(path)),
            _ => {
                return Err(SettingsError::FileLoadError(format!(
                    "Unsupported file format: {}",
                    path.display()
                )));
            }
        })
    }

    /// Add the first project file found in the working directory, then the
    /// first `config.*` file found in the user config directory.
    pub fn load_default_files(&mut self) -> &mut Self {
        self.load_first(DEFAULT_CONFIG_FILES.iter().map(Path::new));

        if let Some(dirs) =
            directories::ProjectDirs::from("org", "lifecycle-hooks", "lifecycle-hooks")
        {
            let candidates: Vec<_> = USER_CONFIG_EXTENSIONS
                .iter()
                .map(|ext| dirs.config_dir().join(format!("config.{ext}")))
                .collect();
            self.load_first(candidates.iter().map(|path| path.as_path()));
        }

        self
    }

    fn load_first<'a>(&mut self, candidates: impl IntoIterator<Item = &'a Path>) {
        for path in candidates {
            if path.is_file() && self.load_file(path).is_ok() {
                break;
            }
        }
    }

    /// Add `LIFECYCLE_HOOKS_*` variables.
    ///
    /// Keys such as `clear_related_cache` hold single underscores, so a
    /// double underscore separates a section from its key:
    /// `LIFECYCLE_HOOKS_DISPATCH__CLEAR_RELATED_CACHE=false`.
    pub fn load_env(&mut self) -> &mut Self {
        self.layer(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Merge the layers and validate the result.
    pub fn extract(&self) -> Result<LifecycleConfig> {
        let config: LifecycleConfig = self
            .figment
            .extract()
            .map_err(|e| SettingsError::ParseError(e.to_string()))?;

        validation::validate_config(&config)?;

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
