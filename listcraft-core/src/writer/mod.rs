// ! Writer module: the template rewrite engine

mod package;
mod plan;
mod sheet_writer;

pub use package::{remove_content_type, remove_relationship_to, set_full_calc_on_load};
pub use plan::{CellEdit, RewriteMode, RewritePlan, RowEdits, Substitution};
pub use sheet_writer::apply_plan;

use crate::config::RewriteConfig;
use crate::error::TemplateResult;
use crate::reader::{self, WORKBOOK_PART, WORKBOOK_RELS_PART, xml_parser};
use std::collections::BTreeMap;
use tracing::debug;

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const CALC_CHAIN_PART: &str = "xl/calcChain.xml";

/// Rewrites template workbooks: sentinel substitution in columns A/B and,
/// in listing mode, the brand name in column C of the first worksheet
#[derive(Debug, Clone, Default)]
pub struct TemplateRewriter {
    config: RewriteConfig,
}

impl TemplateRewriter {
    pub fn new(config: RewriteConfig) -> Self {
        Self { config }
    }

    /// Rewriter looking for a different placeholder
    pub fn with_sentinel(sentinel: impl Into<String>) -> Self {
        Self::new(RewriteConfig {
            sentinel: sentinel.into(),
            ..RewriteConfig::default()
        })
    }

    pub fn sentinel(&self) -> &str {
        &self.config.sentinel
    }

    /// Compute the edits `rewrite` would make, without producing output
    pub fn plan(&self, template: &[u8], mode: &RewriteMode, prefix: &str) -> TemplateResult<RewritePlan> {
        let sheet = reader::read_first_worksheet(template)?;
        let substitution = Substitution::new(&self.config.sentinel, prefix);
        Ok(RewritePlan::build(&sheet, mode, &substitution))
    }

    /// Rewrite `template` and return the bytes of the new workbook
    pub fn rewrite(&self, template: &[u8], mode: &RewriteMode, prefix: &str) -> TemplateResult<Vec<u8>> {
        let mut archive = reader::open_package(template)?;
        let sheet_path = reader::first_worksheet_path(&mut archive)?;
        let sheet_xml = reader::read_part(&mut archive, &sheet_path)?;
        let sheet = xml_parser::parse_worksheet(&sheet_path, &sheet_xml)?;

        let substitution = Substitution::new(&self.config.sentinel, prefix);
        let plan = RewritePlan::build(&sheet, mode, &substitution);
        debug!(
            mode = mode.name(),
            sheet = %sheet_path,
            rows = sheet.rows.len(),
            formulas = plan.formula_edits(),
            texts = plan.text_edits(),
            "rewrite planned"
        );

        if plan.is_empty() {
            return Ok(template.to_vec());
        }

        let mut replacements = BTreeMap::new();
        replacements.insert(sheet_path, apply_plan(&sheet_xml, &plan)?);

        if self.config.full_calc_on_load && plan.formula_edits() > 0 {
            let workbook_xml = reader::read_part(&mut archive, WORKBOOK_PART)?;
            replacements.insert(
                WORKBOOK_PART.to_string(),
                set_full_calc_on_load(&workbook_xml)?.into_bytes(),
            );
        }

        // A chain entry for a cell that no longer has a formula makes Excel repair the file
        let mut removed = Vec::new();
        if plan.overwrites_formulas() && archive.index_for_name(CALC_CHAIN_PART).is_some() {
            let content_types = reader::read_part(&mut archive, CONTENT_TYPES_PART)?;
            replacements.insert(
                CONTENT_TYPES_PART.to_string(),
                remove_content_type(&content_types, CALC_CHAIN_PART)?.into_bytes(),
            );
            let rels_xml = reader::read_part(&mut archive, WORKBOOK_RELS_PART)?;
            replacements.insert(
                WORKBOOK_RELS_PART.to_string(),
                remove_relationship_to(&rels_xml, CALC_CHAIN_PART)?.into_bytes(),
            );
            removed.push(CALC_CHAIN_PART);
            debug!("calculation chain dropped");
        }

        package::rebuild(&mut archive, &replacements, &removed)
    }
}

/// Rewrite a template with the default configuration
pub fn rewrite_template(template: &[u8], mode: &RewriteMode, prefix: &str) -> TemplateResult<Vec<u8>> {
    TemplateRewriter::default().rewrite(template, mode, prefix)
}
