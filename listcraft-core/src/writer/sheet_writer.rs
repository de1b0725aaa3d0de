//! Streams worksheet XML and applies a rewrite plan
//!
//! Every event not touched by the plan is written back exactly as read.

use super::plan::{CellEdit, RewritePlan, RowEdits};
use crate::error::{TemplateError, TemplateResult};
use crate::reader::address::{GridCursor, cell_ref, parse_cell_ref};
use crate::reader::xml_parser::attribute;
use quick_xml::escape::partial_escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeSet;

/// Cell attributes that make no sense once the value becomes a plain string
const DROPPED_TEXT_CELL_ATTRS: [&[u8]; 2] = [b"cm", b"vm"];

#[derive(Default)]
struct RowState<'p> {
    edits: Option<&'p RowEdits>,
    written: BTreeSet<u32>,
    /// Namespace prefix used by the sheet's elements, e.g. `x:`
    prefix: String,
}

#[derive(Default, Clone, Copy)]
enum Skip {
    #[default]
    Nothing,
    /// Original content of a cell being replaced wholesale
    Cell,
    /// Original text of a formula being replaced
    FormulaText,
    /// Stale cached value of a rewritten formula
    CachedValue,
}

struct SheetRewriter<'p> {
    plan: &'p RewritePlan,
    writer: Writer<Vec<u8>>,
    cursor: GridCursor,
    row: RowState<'p>,
    skip: Skip,
    pending_formula: Option<&'p str>,
}

/// Apply `plan` to the worksheet XML and return the new XML bytes
pub fn apply_plan(sheet_xml: &str, plan: &RewritePlan) -> TemplateResult<Vec<u8>> {
    let mut reader = Reader::from_str(sheet_xml);
    let mut buf = Vec::new();
    let mut rewriter = SheetRewriter {
        plan,
        writer: Writer::new(Vec::with_capacity(sheet_xml.len() + 256)),
        cursor: GridCursor::new(),
        row: RowState::default(),
        skip: Skip::Nothing,
        pending_formula: None,
    };

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            TemplateError::Parse(format!(
                "worksheet error at position {}: {}",
                reader.error_position(),
                e
            ))
        })?;
        if let Event::Eof = event {
            break;
        }
        rewriter.handle(event)?;
        buf.clear();
    }

    Ok(rewriter.writer.into_inner())
}

impl<'p> SheetRewriter<'p> {
    fn handle(&mut self, event: Event<'_>) -> TemplateResult<()> {
        match self.skip {
            Skip::Cell => {
                if matches!(&event, Event::End(e) if e.local_name().as_ref() == b"c") {
                    self.skip = Skip::Nothing;
                }
                return Ok(());
            }
            Skip::FormulaText => {
                if let Event::End(_) = &event {
                    self.write(event)?;
                    self.skip = Skip::Nothing;
                }
                return Ok(());
            }
            Skip::CachedValue => {
                if let Event::End(_) = &event {
                    self.skip = Skip::Nothing;
                }
                return Ok(());
            }
            Skip::Nothing => {}
        }

        match event {
            Event::Start(e) if e.local_name().as_ref() == b"row" => self.start_row(e),
            Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                self.cursor.enter_row(attribute(&e, b"r")?.as_deref());
                self.write(Event::Empty(e))
            }
            Event::End(e) if e.local_name().as_ref() == b"row" => {
                self.flush_inserts(u32::MAX)?;
                self.row = RowState::default();
                self.write(Event::End(e))
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => self.start_cell(e, false),
            Event::Empty(e) if e.local_name().as_ref() == b"c" => self.start_cell(e, true),
            Event::End(e) if e.local_name().as_ref() == b"c" => {
                self.pending_formula = None;
                self.write(Event::End(e))
            }
            Event::Start(e) if e.local_name().as_ref() == b"f" => match self.pending_formula {
                Some(formula) => {
                    self.write(Event::Start(e))?;
                    self.write(Event::Text(BytesText::from_escaped(partial_escape(formula))))?;
                    self.skip = Skip::FormulaText;
                    Ok(())
                }
                None => self.write(Event::Start(e)),
            },
            Event::Start(e) if e.local_name().as_ref() == b"v" && self.pending_formula.is_some() => {
                self.skip = Skip::CachedValue;
                Ok(())
            }
            Event::Empty(e) if e.local_name().as_ref() == b"v" && self.pending_formula.is_some() => {
                Ok(())
            }
            Event::Start(e) if e.local_name().as_ref() == b"dimension" => {
                let widened = widen_dimension(&e, self.plan)?;
                self.write(Event::Start(widened))
            }
            Event::Empty(e) if e.local_name().as_ref() == b"dimension" => {
                let widened = widen_dimension(&e, self.plan)?;
                self.write(Event::Empty(widened))
            }
            other => self.write(other),
        }
    }

    fn write(&mut self, event: Event<'_>) -> TemplateResult<()> {
        write_event(&mut self.writer, event)
    }

    fn start_row(&mut self, e: BytesStart<'_>) -> TemplateResult<()> {
        let number = self.cursor.enter_row(attribute(&e, b"r")?.as_deref());
        let edits = self.plan.row(number);
        self.row = RowState {
            edits,
            written: BTreeSet::new(),
            prefix: element_prefix(&e),
        };

        let widest = edits.and_then(|edits| edits.inserted_columns().map(|(column, _)| column).max());
        match widest {
            Some(column) => {
                let widened = widen_row_spans(&e, column)?;
                self.write(Event::Start(widened))
            }
            None => self.write(Event::Start(e)),
        }
    }

    fn start_cell(&mut self, e: BytesStart<'_>, is_empty: bool) -> TemplateResult<()> {
        let column = self.cursor.enter_cell(attribute(&e, b"r")?.as_deref());
        self.flush_inserts(column)?;

        match self.row.edits.and_then(|edits| edits.get(column)) {
            Some(CellEdit::WriteText { value, .. }) => {
                let row = self.cursor.row();
                write_text_cell(&mut self.writer, Some(&e), &self.row.prefix, row, column, value)?;
                self.row.written.insert(column);
                if !is_empty {
                    self.skip = Skip::Cell;
                }
                Ok(())
            }
            Some(CellEdit::ReplaceFormula(formula)) if !is_empty => {
                self.pending_formula = Some(formula.as_str());
                self.write(Event::Start(e))
            }
            _ if is_empty => self.write(Event::Empty(e)),
            _ => self.write(Event::Start(e)),
        }
    }

    /// Write inserted cells whose column lies before `before`
    fn flush_inserts(&mut self, before: u32) -> TemplateResult<()> {
        let Some(edits) = self.row.edits else {
            return Ok(());
        };
        let row = self.cursor.row();
        for (column, value) in edits.inserted_columns() {
            if column >= before || self.row.written.contains(&column) {
                continue;
            }
            write_text_cell(&mut self.writer, None, &self.row.prefix, row, column, value)?;
            self.row.written.insert(column);
        }
        Ok(())
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> TemplateResult<()> {
    writer
        .write_event(event)
        .map_err(TemplateError::serialization)
}

fn element_prefix(e: &BytesStart<'_>) -> String {
    e.name()
        .prefix()
        .map(|p| format!("{}:", String::from_utf8_lossy(p.as_ref())))
        .unwrap_or_default()
}

/// Write `<c t="inlineStr"><is><t>value</t></is></c>`, keeping the original
/// cell's attributes (style, reference) when there is one
fn write_text_cell(
    writer: &mut Writer<Vec<u8>>,
    original: Option<&BytesStart<'_>>,
    prefix: &str,
    row: u32,
    column: u32,
    value: &str,
) -> TemplateResult<()> {
    let cell_name = format!("{}c", prefix);
    let mut start = BytesStart::new(cell_name.as_str());

    match original {
        Some(e) => {
            let mut has_type = false;
            for attr in e.attributes() {
                let attr = attr.map_err(TemplateError::parse)?;
                let key = attr.key.local_name();
                if key.as_ref() == b"t" {
                    start.push_attribute(("t", "inlineStr"));
                    has_type = true;
                } else if !DROPPED_TEXT_CELL_ATTRS.contains(&key.as_ref()) {
                    start.push_attribute(attr);
                }
            }
            if !has_type {
                start.push_attribute(("t", "inlineStr"));
            }
        }
        None => {
            start.push_attribute(("r", cell_ref(row, column).as_str()));
            start.push_attribute(("t", "inlineStr"));
        }
    }

    let is_name = format!("{}is", prefix);
    let t_name = format!("{}t", prefix);
    let mut t_start = BytesStart::new(t_name.as_str());
    if value.starts_with(char::is_whitespace) || value.ends_with(char::is_whitespace) {
        t_start.push_attribute(("xml:space", "preserve"));
    }

    write_event(writer, Event::Start(start))?;
    write_event(writer, Event::Start(BytesStart::new(is_name.as_str())))?;
    write_event(writer, Event::Start(t_start))?;
    write_event(writer, Event::Text(BytesText::new(value)))?;
    write_event(writer, Event::End(BytesEnd::new(t_name.as_str())))?;
    write_event(writer, Event::End(BytesEnd::new(is_name.as_str())))?;
    write_event(writer, Event::End(BytesEnd::new(cell_name.as_str())))?;
    Ok(())
}

/// Copy `e` with attribute `name` replaced by `value`, or appended if absent
fn with_attribute(e: &BytesStart<'_>, name: &[u8], value: &str) -> TemplateResult<BytesStart<'static>> {
    let mut copy = e.to_owned();
    copy.clear_attributes();
    let mut replaced = false;
    for attr in e.attributes() {
        let attr = attr.map_err(TemplateError::parse)?;
        if attr.key.as_ref() == name {
            copy.push_attribute(Attribute {
                key: attr.key,
                value: value.as_bytes().into(),
            });
            replaced = true;
        } else {
            copy.push_attribute(attr);
        }
    }
    if !replaced {
        copy.push_attribute(Attribute {
            key: quick_xml::name::QName(name),
            value: value.as_bytes().into(),
        });
    }
    Ok(copy.into_owned())
}

/// Widen a row's `spans` hint (`"first:last"`) to include `column`
fn widen_row_spans(e: &BytesStart<'_>, column: u32) -> TemplateResult<BytesStart<'static>> {
    let Some(spans) = attribute(e, b"spans")? else {
        return Ok(e.to_owned().into_owned());
    };
    with_attribute(e, b"spans", &widen_spans(&spans, column))
}

pub(crate) fn widen_spans(spans: &str, column: u32) -> String {
    let parsed = spans
        .split_once(':')
        .and_then(|(first, last)| Some((first.parse::<u32>().ok()?, last.parse::<u32>().ok()?)));
    match parsed {
        Some((first, last)) => format!("{}:{}", first.min(column), last.max(column)),
        None => spans.to_string(),
    }
}

/// Widen `<dimension ref>` so it covers any column receiving new cells
fn widen_dimension(e: &BytesStart<'_>, plan: &RewritePlan) -> TemplateResult<BytesStart<'static>> {
    let (Some(column), Some(reference)) = (plan.max_inserted_column(), attribute(e, b"ref")?) else {
        return Ok(e.to_owned().into_owned());
    };
    match widen_range(&reference, column) {
        Some(widened) if widened != reference => with_attribute(e, b"ref", &widened),
        _ => Ok(e.to_owned().into_owned()),
    }
}

pub(crate) fn widen_range(reference: &str, column: u32) -> Option<String> {
    let (first, last) = reference.split_once(':').unwrap_or((reference, reference));
    let (first_row, first_col) = parse_cell_ref(first)?;
    let (last_row, last_col) = parse_cell_ref(last)?;
    Some(format!(
        "{}:{}",
        cell_ref(first_row, first_col.min(column)),
        cell_ref(last_row, last_col.max(column))
    ))
}
