//! listcraft-core: rewriting of marketplace listing spreadsheet templates
//!
//! Templates are XLSX workbooks whose first worksheet carries formulas in
//! columns A and B built around a quoted placeholder (`"ZDX"`). A rewrite
//! swaps the placeholder for a caller's barcode prefix and, for listing
//! templates, writes the brand name into column C of every data row.
//!
//! ```no_run
//! use listcraft_core::{RewriteMode, TemplateRewriter};
//!
//! # fn main() -> Result<(), listcraft_core::TemplateError> {
//! let template = std::fs::read("templates/trendyol/elbise.xlsx").unwrap();
//! let mode = RewriteMode::ListingTemplate { brand_name: "Acme".to_string() };
//! let output = TemplateRewriter::default().rewrite(&template, &mode, "ABC")?;
//! # let _ = output;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod reader;
pub mod templates;
pub mod writer;

pub use config::{ListcraftConfig, RewriteConfig, ServerConfig, TemplatesConfig};
pub use error::{TemplateError, TemplateResult};
pub use reader::{CellContent, Worksheet, read_first_worksheet};
pub use templates::{TemplateKey, TemplateStore};
pub use writer::{RewriteMode, RewritePlan, TemplateRewriter, rewrite_template};

/// Content type of every generated workbook
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
