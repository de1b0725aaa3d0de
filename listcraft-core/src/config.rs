//! Configuration for the template service

use crate::error::{TemplateError, TemplateResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration, usually read from `listcraft.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListcraftConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub rewrite: RewriteConfig,
}

impl ListcraftConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> TemplateResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> TemplateResult<Self> {
        toml::from_str(content).map_err(|e| TemplateError::Parse(format!("invalid configuration: {}", e)))
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Where templates live on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Base directory for every template path below
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Directory (relative to `root`) holding `{marketplace}/{category}.xlsx`
    #[serde(default = "default_listing_dir")]
    pub listing_dir: PathBuf,
    /// Stock update template (relative to `root`)
    #[serde(default = "default_stock_file")]
    pub stock_file: PathBuf,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            listing_dir: default_listing_dir(),
            stock_file: default_stock_file(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_listing_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_stock_file() -> PathBuf {
    PathBuf::from("stok").join("stok_guncelleme.xlsx")
}

/// Rewrite engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Placeholder embedded (quoted) in template formulas
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
    /// Mark the workbook for full recalculation when formulas change
    #[serde(default = "default_full_calc_on_load")]
    pub full_calc_on_load: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            sentinel: default_sentinel(),
            full_calc_on_load: default_full_calc_on_load(),
        }
    }
}

fn default_sentinel() -> String {
    "ZDX".to_string()
}

fn default_full_calc_on_load() -> bool {
    true
}
