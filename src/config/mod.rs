use config::{Config, Environment, File, Source};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "kvstore.toml";
pub const ENV_PREFIX: &str = "KVSTORE";
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Default, Deserialize)]
pub struct StoreConfig {
    pub initial_capacity: Option<usize>,
}

/// One `[[seed]]` entry. Keys live in values rather than table names, which
/// the config crate lowercases.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    /// Records loaded into the store at construction.
    #[serde(default)]
    pub seed: Vec<SeedEntry>,
}

/// Loads `kvstore.toml` if present, then `KVSTORE_*` environment overrides.
pub fn load_config() -> Result<AppConfig, config::ConfigError> {
    load_config_from(File::with_name(CONFIG_FILE).required(false))
}

pub fn load_config_from<S>(source: S) -> Result<AppConfig, config::ConfigError>
where
    S: Source + Send + Sync + 'static,
{
    let mut config: AppConfig = Config::builder()
        .add_source(source)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    set_defaults(&mut config);

    Ok(config)
}

pub fn set_defaults(config: &mut AppConfig) {
    if config.store.initial_capacity.is_none() {
        config.store.initial_capacity = Some(DEFAULT_CAPACITY);
    }
}
