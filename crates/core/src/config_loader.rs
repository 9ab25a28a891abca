use crate::config::{AppConfig, ConfigError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

/// Prefix for environment overrides, e.g. `EXTENDED_HTTP__MAX_ATTEMPTS=5`.
pub const ENV_PREFIX: &str = "EXTENDED_";

/// Legacy variable holding the warehouse API key.
pub const DUNE_API_KEY_ENV: &str = "DUNE_API_KEY";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Builds the layered figment: defaults, then the TOML file, then env.
    ///
    /// A missing TOML file is not an error; defaults apply.
    #[must_use]
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(
                Env::raw()
                    .only(&[DUNE_API_KEY_ENV])
                    .map(|_| "warehouse.api_key".into()),
            )
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads and validates configuration from `path` plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration sources cannot be parsed or the
    /// merged configuration fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
        let config: AppConfig = Self::figment(path)
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        config.validate()?;
        tracing::debug!(
            chains = config.chains.len(),
            output_dir = %config.collector.output_dir.display(),
            "Configuration loaded"
        );

        Ok(config)
    }
}
