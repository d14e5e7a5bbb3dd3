mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{BridgeSettings, LoggingSettings, Settings};

/// Loads the configuration from `config/default` and `ROSBRIDGE__*` environment
/// variables, merged over the default values.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("ROSBRIDGE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    let default = Settings::default();

    Ok(Settings {
        bridge: match partial.bridge {
            Some(bridge) => bridge.merge_over(default.bridge),
            None => default.bridge,
        },
        logging: match partial.logging {
            Some(logging) => logging.merge_over(default.logging),
            None => default.logging,
        },
    })
}

#[cfg(test)]
mod tests;
