use std::{env, fs, path::Path, path::PathBuf};

use directories::BaseDirs;
use lazy_static::lazy_static;
use serde::Deserialize;

use crate::core::CleaningConfig;

const CONFIG: &str = include_str!("../.config/config.json5");

/// Short alias for the service location, checked after the config file
pub const API_BASE_ENV: &str = "SURVEYPREP_API_BASE";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct PreviewConfig {
    /// Rows the CLI prints from a preview
    pub max_rows: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { max_rows: 20 }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub config_dir: PathBuf,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref DATA_FOLDER: Option<PathBuf> =
        env::var(format!("{}_DATA", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref CONFIG_FOLDER: Option<PathBuf> =
        env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
}

impl Config {
    /// Load embedded defaults, then the user file, then the environment.
    ///
    /// With no explicit path the home config is used, and written from the
    /// embedded defaults the first time.
    pub fn from_path(config_path: Option<&PathBuf>) -> Result<Self, config::ConfigError> {
        let selected_path = if let Some(p) = config_path {
            expand_tilde(p)
        } else {
            let home_cfg = default_home_config_path();
            if !home_cfg.exists() {
                if let Some(parent) = home_cfg.parent() {
                    let _ = fs::create_dir_all(parent);
                }
                let _ = fs::write(&home_cfg, CONFIG);
            }
            home_cfg
        };
        Self::load(Some(&selected_path), env::var(API_BASE_ENV).ok())
    }

    /// Embedded defaults only, no file or environment layers
    pub fn embedded() -> Result<Self, config::ConfigError> {
        json5::from_str(CONFIG).map_err(|e| config::ConfigError::Foreign(Box::new(e)))
    }

    fn load(
        file: Option<&Path>,
        api_base_override: Option<String>,
    ) -> Result<Self, config::ConfigError> {
        let data_dir = get_data_dir();
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.to_string_lossy().to_string())?
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?
            .add_source(config::File::from_str(CONFIG, config::FileFormat::Json5));

        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path.to_owned())
                    .format(config::FileFormat::Json5)
                    .required(true),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&PROJECT_NAME)
                .prefix_separator("__")
                .separator("__"),
        );

        if let Some(base) = api_base_override.filter(|b| !b.trim().is_empty()) {
            builder = builder.set_override("api.base_url", base)?;
        }

        builder.build()?.try_deserialize()
    }
}

fn expand_tilde(path: &PathBuf) -> PathBuf {
    if let Some(s) = path.to_str() {
        if s.starts_with("~") {
            if let Some(base) = BaseDirs::new() {
                return PathBuf::from(s.replacen("~", base.home_dir().to_str().unwrap_or(""), 1));
            }
        }
    }
    path.clone()
}

fn default_home_config_path() -> PathBuf {
    if let Some(base) = BaseDirs::new() {
        return base.home_dir().join(".surveyprep-config.json5");
    }
    PathBuf::from(".surveyprep-config.json5")
}

pub fn get_data_dir() -> PathBuf {
    if let Some(s) = DATA_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Some(s) = CONFIG_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".config")
    }
}
