//! Template lookup on disk

use crate::config::TemplatesConfig;
use crate::error::{TemplateError, TemplateResult};
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// A single path component: no separators, reserved characters or control characters
static SAFE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[^/\\:*?"<>|\x00-\x1F]+$"#).expect("valid regex"));

/// Identifies which template a request needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateKey {
    /// `{listing_dir}/{marketplace}/{category}.xlsx`
    Listing { marketplace: String, category: String },
    /// The single stock update template
    Stock,
}

impl TemplateKey {
    pub fn listing(marketplace: impl Into<String>, category: impl Into<String>) -> Self {
        TemplateKey::Listing {
            marketplace: marketplace.into(),
            category: category.into(),
        }
    }

    /// File name offered to the client for a rewritten copy of this template
    pub fn download_name(&self, prefix: &str, timestamp_ms: i64) -> String {
        match self {
            TemplateKey::Listing {
                marketplace,
                category,
            } => format!(
                "{}-{}-{}-{}.xlsx",
                sanitize_filename_component(marketplace),
                sanitize_filename_component(category),
                sanitize_filename_component(prefix),
                timestamp_ms
            ),
            TemplateKey::Stock => format!(
                "stok_guncelleme_{}_{}.xlsx",
                sanitize_filename_component(prefix),
                timestamp_ms
            ),
        }
    }
}

/// Strip characters that cannot appear inside a quoted `Content-Disposition` filename
pub fn sanitize_filename_component(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '"' | '\\' | '/'))
        .collect()
}

/// Resolves and reads templates below a configured root
#[derive(Debug, Clone)]
pub struct TemplateStore {
    config: TemplatesConfig,
}

impl TemplateStore {
    pub fn new(config: TemplatesConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Location of the template relative to the root, split into (directory, file name)
    fn relative_location(&self, key: &TemplateKey) -> TemplateResult<(PathBuf, String)> {
        match key {
            TemplateKey::Listing {
                marketplace,
                category,
            } => {
                check_segment("pazaryeri", marketplace)?;
                check_segment("kategori", category)?;
                Ok((
                    self.config.listing_dir.join(marketplace),
                    format!("{}.xlsx", category),
                ))
            }
            TemplateKey::Stock => {
                let stock = &self.config.stock_file;
                let directory = stock.parent().map(Path::to_path_buf).unwrap_or_default();
                let name = stock
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Ok((directory, name))
            }
        }
    }

    /// Absolute (root-joined) path of a template
    pub fn resolve(&self, key: &TemplateKey) -> TemplateResult<PathBuf> {
        let (directory, name) = self.relative_location(key)?;
        Ok(self.config.root.join(directory).join(name))
    }

    /// Read a template fresh from disk
    pub async fn load(&self, key: &TemplateKey) -> TemplateResult<Vec<u8>> {
        let (directory, name) = self.relative_location(key)?;
        let path = self.config.root.join(&directory).join(&name);

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                tracing::debug!(path = %path.display(), size = bytes.len(), "template loaded");
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(TemplateError::NotFound {
                name,
                location: directory,
            }),
            Err(source) => Err(TemplateError::Io { path, source }),
        }
    }
}

fn check_segment(field: &'static str, value: &str) -> TemplateResult<()> {
    if value == "." || value == ".." || !SAFE_SEGMENT.is_match(value) {
        return Err(TemplateError::InvalidKey {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
