use crate::path_guard::PathValidator;
use crate::rename::{RenameOptions, DEFAULT_MAX_COLLISION_ATTEMPTS};
use crate::template::{DEFAULT_DATE_FORMAT, DEFAULT_TEMPLATE, DEFAULT_TIME_FORMAT};
use crate::tour::TourOptions;
use crate::ToolError;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Authorized root for every path argument. Defaults to the working
    /// directory of the server process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    pub template: String,
    pub date_format: String,
    pub time_format: String,
    pub thumbnail_size: u32,
    pub max_collision_attempts: usize,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: None,
            template: DEFAULT_TEMPLATE.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            thumbnail_size: TourOptions::default().thumbnail_size,
            max_collision_attempts: DEFAULT_MAX_COLLISION_ATTEMPTS,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn validator(&self) -> Result<PathValidator, ToolError> {
        match &self.root {
            Some(root) => PathValidator::new(root),
            None => PathValidator::from_current_dir(),
        }
    }

    /// Rename defaults before per-call arguments are applied.
    pub fn rename_options(&self) -> RenameOptions {
        RenameOptions {
            template: self.template.clone(),
            date_format: self.date_format.clone(),
            time_format: self.time_format.clone(),
            max_collision_attempts: self.max_collision_attempts,
            ..RenameOptions::default()
        }
    }

    pub fn tour_options(&self) -> TourOptions {
        TourOptions {
            thumbnail_size: self.thumbnail_size,
            ..TourOptions::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "exif-tour", "exif-tour")
        .context("could not determine the OS config directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    load_config_from(&paths.config_path)
}

/// Missing file means defaults; a present but malformed file is an error.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config = toml::from_str::<AppConfig>(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(config)
}
