//! Configuration file wrangling
// (c) 2024 Ross Younger

use super::{BASE_CONFIG_FILENAME, Configuration};

use anyhow::Result;
use figment::{
    Figment, Provider,
    providers::{Env, Format as _, Toml},
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of environment variables that set configuration options
pub const ENV_PREFIX: &str = "NEWTP_";

/// Location of the system-wide configuration file
fn system_config_path() -> PathBuf {
    Path::new("/etc").join(BASE_CONFIG_FILENAME)
}

/// Location of the user's configuration file, if the platform has one
fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(BASE_CONFIG_FILENAME))
}

/// Processes and merges all possible configuration sources.
///
/// To see which configuration files apply, run `newtp --config-files`.
#[derive(Debug, Clone)]
pub struct Manager {
    /// Configuration data
    pub(super) data: Figment,
}

impl Manager {
    /// Constructor
    pub(super) fn new(apply_env: bool, apply_config_files: bool) -> Self {
        let mut new1 = Self {
            data: Figment::new(),
        };
        if apply_config_files {
            // N.B. This may leave data in a fused-error state, if a config file isn't parseable.
            new1.add_config("system", Some(system_config_path()));
            new1.add_config("user", user_config_path());
        }
        if apply_env {
            new1.merge_provider(Env::prefixed(ENV_PREFIX));
        }
        new1
    }

    /// General constructor for production use
    ///
    /// Initialises this structure, reading the system and user configuration files
    /// and the environment.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(true, true)
    }

    /// Testing/internal constructor, does not read files from system or apply environment.
    /// DOES apply system default.
    #[must_use]
    #[cfg(test)]
    pub(crate) fn without_files() -> Self {
        let mut new1 = Self::new(false, false);
        new1.apply_system_default();
        new1
    }

    fn add_config(&mut self, what: &str, path: Option<PathBuf>) {
        let Some(path) = path else {
            debug!("could not determine {what} configuration file path");
            return;
        };
        if !path.exists() {
            debug!("{what} configuration file {path:?} not present");
            return;
        }
        self.merge_toml_file(path);
    }

    /// Returns the list of configuration files we read.
    ///
    /// This is a function of platform and the current user.
    #[must_use]
    pub fn config_files() -> Vec<String> {
        std::iter::once(system_config_path())
            .chain(user_config_path())
            .map(|p| p.as_os_str().to_string_lossy().to_string())
            .collect()
    }

    /// Merges in a data set, which is some sort of [figment::Provider](https://docs.rs/figment/latest/figment/trait.Provider.html).
    /// This uses figment's `merge` operation, which prefers to _replace_ existing items.
    pub fn merge_provider<T>(&mut self, provider: T)
    where
        T: Provider,
    {
        let f = std::mem::take(&mut self.data);
        // in the error case, this leaves the provider in a fused state
        self.data = f.merge(provider);
    }

    /// Merges in a TOML configuration file
    pub fn merge_toml_file<F: AsRef<Path>>(&mut self, file: F) {
        debug!("reading {:?}", file.as_ref());
        self.merge_provider(Toml::file(file.as_ref()));
    }

    /// Applies the system default settings, at a lower priority than everything else
    pub fn apply_system_default(&mut self) {
        let f = std::mem::take(&mut self.data);
        self.data = f.join(super::SystemDefault {});
    }

    /// Attempts to extract a particular struct from the data.
    ///
    /// Within newtp, `T` is usually [Configuration], but it isn't intrinsically required to be.
    /// (This is useful for unit testing.)
    pub fn get<'de, T>(&self) -> Result<T>
    where
        T: Deserialize<'de>,
    {
        Ok(self.data.extract_lossy::<T>()?)
    }

    /// Extracts the [`Configuration`] and checks it is in range.
    pub fn validated(&self) -> Result<Configuration> {
        let config = self.get::<Configuration>()?;
        config.validate()?;
        Ok(config)
    }
}
