//! XML parsing utilities for locating and reading the first worksheet of an XLSX package

use super::address::GridCursor;
use super::workbook::{Cell, CellContent, Row, Worksheet};
use crate::error::{TemplateError, TemplateResult};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Read the value of an attribute by its local name (prefix ignored)
pub(crate) fn attribute(e: &BytesStart<'_>, local_name: &[u8]) -> TemplateResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(TemplateError::parse)?;
        if attr.key.local_name().as_ref() == local_name {
            let value = attr.unescape_value().map_err(TemplateError::parse)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Relationship id (`r:id`) of the first `<sheet>` declared in `xl/workbook.xml`
pub fn first_sheet_relationship(workbook_xml: &str) -> TemplateResult<String> {
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                // The relationship attribute is the only namespaced `id` on <sheet>
                for attr in e.attributes() {
                    let attr = attr.map_err(TemplateError::parse)?;
                    if attr.key.local_name().as_ref() == b"id" && attr.key.prefix().is_some() {
                        let value = attr.unescape_value().map_err(TemplateError::parse)?;
                        return Ok(value.into_owned());
                    }
                }
                return Err(TemplateError::Parse(
                    "first <sheet> has no relationship id".to_string(),
                ));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TemplateError::Parse(format!(
                    "workbook.xml error at position {}: {}",
                    reader.error_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    Err(TemplateError::Parse(
        "workbook declares no worksheets".to_string(),
    ))
}

/// Resolve a relationship id to a part name using `xl/_rels/workbook.xml.rels`
pub fn resolve_relationship(rels_xml: &str, id: &str) -> TemplateResult<String> {
    let mut reader = Reader::from_str(rels_xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if attribute(&e, b"Id")?.as_deref() == Some(id) {
                    let target = attribute(&e, b"Target")?.ok_or_else(|| {
                        TemplateError::Parse(format!("relationship '{}' has no target", id))
                    })?;
                    return Ok(part_name(&target));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TemplateError::Parse(format!(
                    "workbook relationships error at position {}: {}",
                    reader.error_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    Err(TemplateError::Parse(format!(
        "relationship '{}' not found",
        id
    )))
}

/// Targets are relative to `xl/` unless absolute within the package
pub(crate) fn part_name(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

#[derive(Default)]
enum Capture {
    #[default]
    None,
    Formula,
    Value,
    Inline,
}

/// Parse worksheet XML into rows and cells
pub fn parse_worksheet(path: &str, sheet_xml: &str) -> TemplateResult<Worksheet> {
    let mut reader = Reader::from_str(sheet_xml);
    let mut buf = Vec::new();

    let mut cursor = GridCursor::new();
    let mut rows: Vec<Row> = Vec::new();
    let mut current: Option<Cell> = None;
    let mut capture = Capture::None;
    let mut text = String::new();
    let mut shared_index: Option<u32> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    let number = cursor.enter_row(attribute(&e, b"r")?.as_deref());
                    rows.push(Row::new(number));
                }
                b"c" => {
                    let column = cursor.enter_cell(attribute(&e, b"r")?.as_deref());
                    current = Some(Cell {
                        column,
                        content: CellContent::Blank,
                    });
                }
                b"f" if current.is_some() => {
                    capture = Capture::Formula;
                    text.clear();
                    shared_index = shared_formula_index(&e)?;
                }
                b"v" if current.is_some() => {
                    capture = Capture::Value;
                    text.clear();
                }
                b"is" if current.is_some() => {
                    capture = Capture::Inline;
                    text.clear();
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => {
                    let number = cursor.enter_row(attribute(&e, b"r")?.as_deref());
                    rows.push(Row::new(number));
                }
                b"c" => {
                    let column = cursor.enter_cell(attribute(&e, b"r")?.as_deref());
                    push_cell(
                        &mut rows,
                        Cell {
                            column,
                            content: CellContent::Blank,
                        },
                    )?;
                }
                b"f" => {
                    if let (Some(cell), Some(index)) = (current.as_mut(), shared_formula_index(&e)?)
                    {
                        cell.content = CellContent::SharedFormula { index };
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) if !matches!(capture, Capture::None) => {
                let unescaped = e.unescape().map_err(TemplateError::parse)?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(e)) if !matches!(capture, Capture::None) => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"f" => {
                    if let Some(cell) = current.as_mut() {
                        cell.content = match shared_index {
                            Some(index) if text.is_empty() => CellContent::SharedFormula { index },
                            _ => CellContent::Formula(std::mem::take(&mut text)),
                        };
                    }
                    capture = Capture::None;
                }
                b"v" => {
                    if let Some(cell) = current.as_mut() {
                        // A cached result never replaces the formula that produced it
                        if cell.content.is_empty() {
                            cell.content = CellContent::Value(std::mem::take(&mut text));
                        }
                    }
                    capture = Capture::None;
                }
                b"is" => {
                    if let Some(cell) = current.as_mut() {
                        cell.content = CellContent::Value(std::mem::take(&mut text));
                    }
                    capture = Capture::None;
                }
                b"c" => {
                    if let Some(cell) = current.take() {
                        push_cell(&mut rows, cell)?;
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TemplateError::Parse(format!(
                    "{} error at position {}: {}",
                    path,
                    reader.error_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(Worksheet {
        path: path.to_string(),
        rows,
    })
}

fn shared_formula_index(e: &BytesStart<'_>) -> TemplateResult<Option<u32>> {
    if attribute(e, b"t")?.as_deref() != Some("shared") {
        return Ok(None);
    }
    Ok(attribute(e, b"si")?.and_then(|si| si.parse().ok()))
}

fn push_cell(rows: &mut [Row], cell: Cell) -> TemplateResult<()> {
    match rows.last_mut() {
        Some(row) => {
            row.cells.push(cell);
            Ok(())
        }
        None => Err(TemplateError::Parse(
            "cell found outside of a <row>".to_string(),
        )),
    }
}
