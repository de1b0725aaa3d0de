//! XLSX package reader for template workbooks

use crate::error::{TemplateError, TemplateResult};
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

pub mod address;
pub mod workbook;
pub mod xml_parser;

pub use address::{
    COLUMN_A, COLUMN_B, COLUMN_C, cell_ref, column_index, column_name, parse_cell_ref,
};
pub use workbook::{Cell, CellContent, Row, Worksheet};

pub(crate) const WORKBOOK_PART: &str = "xl/workbook.xml";
pub(crate) const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// Open template bytes as a zip archive
pub fn open_package(bytes: &[u8]) -> TemplateResult<ZipArchive<Cursor<&[u8]>>> {
    ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| TemplateError::Parse(format!("not an XLSX package: {}", e)))
}

/// Read a UTF-8 part from the archive
pub fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> TemplateResult<String> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| TemplateError::Parse(format!("missing part '{}': {}", name, e)))?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| TemplateError::Parse(format!("unreadable part '{}': {}", name, e)))?;
    Ok(content)
}

/// Part name of the first worksheet in workbook order
pub fn first_worksheet_path<R: Read + Seek>(archive: &mut ZipArchive<R>) -> TemplateResult<String> {
    let workbook_xml = read_part(archive, WORKBOOK_PART)?;
    let rels_xml = read_part(archive, WORKBOOK_RELS_PART)?;
    let id = xml_parser::first_sheet_relationship(&workbook_xml)?;
    xml_parser::resolve_relationship(&rels_xml, &id)
}

/// Parse the first worksheet of a template
pub fn read_first_worksheet(bytes: &[u8]) -> TemplateResult<Worksheet> {
    let mut archive = open_package(bytes)?;
    let path = first_worksheet_path(&mut archive)?;
    let sheet_xml = read_part(&mut archive, &path)?;
    xml_parser::parse_worksheet(&path, &sheet_xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_zip_bytes() {
        let err = read_first_worksheet(b"PK but not really a zip").unwrap_err();
        assert!(matches!(err, TemplateError::Parse(_)));
        assert!(err.to_string().contains("not an XLSX package"));
    }
}
