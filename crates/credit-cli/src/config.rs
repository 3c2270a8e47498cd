use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use credit_core::ScoringConfig;

/// Load the scoring configuration.
///
/// Built-in defaults are overridden, in order, by `config/default`,
/// `config/local`, an explicit file and finally environment variables
/// (`CREDIT__WEIGHTS__BOT_VELOCITY_THRESHOLD`, etc.).
pub fn load(explicit: Option<&Path>) -> Result<ScoringConfig, ConfigError> {
    let mut builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name("config/local").required(false));

    if let Some(path) = explicit {
        builder = builder.add_source(File::from(path).required(true));
    }

    let config = builder
        // Using double underscore as separator to handle nested keys with underscores
        .add_source(
            Environment::with_prefix("CREDIT")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}
