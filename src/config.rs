use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, de};
use serde_json::{Map, Value};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENVIRONMENT: &str = "Production";
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:5000";

/// Top-level sections that environment variables may override, e.g.
/// `FileSearchOptions__ExamplesDirectoryPath=/srv/files`.
const OVERRIDABLE_SECTIONS: [&str; 2] = ["FileSearchOptions", "Server"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppConfig {
    pub file_search_options: FileSearchOptions,
    #[serde(default)]
    pub server: ServerOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileSearchOptions {
    pub examples_directory_path: PathBuf,
    #[serde(default, deserialize_with = "number_or_string")]
    pub max_concurrent_probes: Option<usize>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub search_timeout_secs: Option<u64>,
}

impl FileSearchOptions {
    pub fn search_timeout(&self) -> Option<Duration> {
        self.search_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerOptions {
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        ServerOptions {
            address: default_address(),
        }
    }
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString<T> {
    Number(T),
    Text(String),
}

/// Numeric settings come as JSON numbers from files and as strings from
/// environment variables. An empty string means unset.
fn number_or_string<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Option::<NumberOrString<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(NumberOrString::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid number {text:?}: {e}"))),
    }
}

impl AppConfig {
    /// Loads `.env`, then `appsettings.json` and `appsettings.<environment>.json`
    /// from `config_dir`, then applies environment variable overrides.
    ///
    /// The environment name falls back to `APP_ENVIRONMENT`, then `Production`.
    pub fn load(config_dir: &Path, environment: Option<&str>) -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        let environment = environment
            .map(str::to_string)
            .or_else(|| env::var("APP_ENVIRONMENT").ok())
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());
        Self::load_with_vars(config_dir, &environment, env::vars())
    }

    /// Same as [`AppConfig::load`] with an explicit environment name and variable set.
    pub fn load_with_vars<I>(config_dir: &Path, environment: &str, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut merged = Value::Object(Map::new());
        for name in [
            "appsettings.json".to_string(),
            format!("appsettings.{environment}.json"),
        ] {
            if let Some(layer) = read_layer(&config_dir.join(name))? {
                merge_layer(&mut merged, layer);
            }
        }
        apply_env_overrides(&mut merged, vars);
        Self::from_value(merged)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).context("Invalid configuration")
    }
}

fn read_layer(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    tracing::info!("loaded config layer: {}", path.display());
    Ok(Some(value))
}

/// Deep-merges `layer` into `base`. Objects merge key by key, anything else replaces.
pub fn merge_layer(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge_layer(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

/// Applies `Section__Key=value` variables on top of the merged files. Values are
/// always strings; numeric fields parse them during deserialization.
pub fn apply_env_overrides<I>(base: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, raw) in vars {
        let segments: Vec<&str> = key.split("__").collect();
        if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
            continue;
        }
        if !OVERRIDABLE_SECTIONS.contains(&segments[0]) {
            continue;
        }

        let mut overlay = Value::String(raw);
        for segment in segments.iter().rev() {
            let mut object = Map::new();
            object.insert(segment.to_string(), overlay);
            overlay = Value::Object(object);
        }
        merge_layer(base, overlay);
    }
}
