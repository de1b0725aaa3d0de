//! Package-level rewriting: copy untouched parts, replace rewritten ones

use crate::error::{TemplateError, TemplateResult};
use crate::reader::xml_parser::{attribute, part_name};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// `CT_Workbook` children that follow `calcPr`
const AFTER_CALC_PR: [&[u8]; 9] = [
    b"oleSize",
    b"customWorkbookViews",
    b"pivotCaches",
    b"smartTagPr",
    b"smartTagTypes",
    b"webPublishing",
    b"fileRecoveryPr",
    b"webPublishObjects",
    b"extLst",
];

/// Rebuild the archive, replacing the parts named in `replacements` and
/// leaving out the ones in `removed`.
///
/// Untouched entries are raw-copied so their compressed bytes do not change.
pub fn rebuild<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    replacements: &BTreeMap<String, Vec<u8>>,
    removed: &[&str],
) -> TemplateResult<Vec<u8>> {
    let mut zip_writer = ZipWriter::new(Cursor::new(Vec::new()));
    // Fixed timestamp keeps output deterministic for identical input
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for i in 0..archive.len() {
        let file = archive.by_index_raw(i).map_err(TemplateError::parse)?;
        let name = file.name().to_string();
        if removed.contains(&name.as_str()) {
            continue;
        }

        match replacements.get(&name) {
            Some(content) => {
                zip_writer
                    .start_file(name.as_str(), options)
                    .map_err(TemplateError::serialization)?;
                zip_writer
                    .write_all(content)
                    .map_err(TemplateError::serialization)?;
            }
            None => zip_writer
                .raw_copy_file(file)
                .map_err(TemplateError::serialization)?,
        }
    }

    let cursor = zip_writer.finish().map_err(TemplateError::serialization)?;
    Ok(cursor.into_inner())
}

/// Ask spreadsheet applications to recalculate every formula when the workbook opens.
///
/// Sets `fullCalcOnLoad="1"` on an existing `<calcPr>`, or inserts one at its schema position.
pub fn set_full_calc_on_load(workbook_xml: &str) -> TemplateResult<String> {
    let mut reader = Reader::from_str(workbook_xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut prefix = String::new();
    let mut done = false;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            TemplateError::Parse(format!(
                "workbook.xml error at position {}: {}",
                reader.error_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) if depth == 0 && e.local_name().as_ref() == b"workbook" => {
                prefix = e
                    .name()
                    .prefix()
                    .map(|p| format!("{}:", String::from_utf8_lossy(p.as_ref())))
                    .unwrap_or_default();
                depth += 1;
                write_event(&mut writer, Event::Start(e))?;
            }
            Event::Start(e) if depth == 1 && e.local_name().as_ref() == b"calcPr" && !done => {
                done = true;
                depth += 1;
                write_event(&mut writer, Event::Start(with_full_calc(&e)?))?;
            }
            Event::Empty(e) if depth == 1 && e.local_name().as_ref() == b"calcPr" && !done => {
                done = true;
                write_event(&mut writer, Event::Empty(with_full_calc(&e)?))?;
            }
            Event::Start(e) if depth == 1 => {
                if !done && AFTER_CALC_PR.contains(&e.local_name().as_ref()) {
                    write_calc_pr(&mut writer, &prefix)?;
                    done = true;
                }
                depth += 1;
                write_event(&mut writer, Event::Start(e))?;
            }
            Event::Empty(e) if depth == 1 => {
                if !done && AFTER_CALC_PR.contains(&e.local_name().as_ref()) {
                    write_calc_pr(&mut writer, &prefix)?;
                    done = true;
                }
                write_event(&mut writer, Event::Empty(e))?;
            }
            Event::Start(e) => {
                depth += 1;
                write_event(&mut writer, Event::Start(e))?;
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                if depth == 0 && !done {
                    write_calc_pr(&mut writer, &prefix)?;
                    done = true;
                }
                write_event(&mut writer, Event::End(e))?;
            }
            Event::Eof => break,
            other => write_event(&mut writer, other)?,
        }
        buf.clear();
    }

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).map_err(TemplateError::serialization)
}

/// Remove the `[Content_Types].xml` override declaring `part`
pub fn remove_content_type(content_types_xml: &str, part: &str) -> TemplateResult<String> {
    let declared = format!("/{}", part);
    drop_elements(content_types_xml, b"Override", |e| {
        Ok(attribute(e, b"PartName")?.as_deref() == Some(declared.as_str()))
    })
}

/// Remove relationships from `xl/_rels/workbook.xml.rels` that point at `part`
pub fn remove_relationship_to(rels_xml: &str, part: &str) -> TemplateResult<String> {
    drop_elements(rels_xml, b"Relationship", |e| {
        Ok(attribute(e, b"Target")?.is_some_and(|target| part_name(&target) == part))
    })
}

/// Copy `xml`, leaving out every `local_name` element for which `should_drop` holds
fn drop_elements(
    xml: &str,
    local_name: &[u8],
    should_drop: impl Fn(&BytesStart<'_>) -> TemplateResult<bool>,
) -> TemplateResult<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    // Depth inside a dropped element that has content
    let mut skipping = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            TemplateError::Parse(format!(
                "package XML error at position {}: {}",
                reader.error_position(),
                e
            ))
        })?;

        match event {
            Event::Eof => break,
            Event::Start(_) if skipping > 0 => skipping += 1,
            Event::End(_) if skipping > 0 => skipping -= 1,
            _ if skipping > 0 => {}
            Event::Start(e) if e.local_name().as_ref() == local_name && should_drop(&e)? => skipping = 1,
            Event::Empty(e) if e.local_name().as_ref() == local_name && should_drop(&e)? => {}
            other => write_event(&mut writer, other)?,
        }
        buf.clear();
    }

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).map_err(TemplateError::serialization)
}

fn write_event(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> TemplateResult<()> {
    writer
        .write_event(event)
        .map_err(TemplateError::serialization)
}

fn write_calc_pr(writer: &mut Writer<Cursor<Vec<u8>>>, prefix: &str) -> TemplateResult<()> {
    let name = format!("{}calcPr", prefix);
    let mut calc_pr = BytesStart::new(name.as_str());
    calc_pr.push_attribute(("fullCalcOnLoad", "1"));
    write_event(writer, Event::Empty(calc_pr))
}

fn with_full_calc(e: &BytesStart<'_>) -> TemplateResult<BytesStart<'static>> {
    let mut copy = e.to_owned();
    copy.clear_attributes();
    for attr in e.attributes() {
        let attr = attr.map_err(TemplateError::parse)?;
        if attr.key.as_ref() != b"fullCalcOnLoad" {
            copy.push_attribute(attr);
        }
    }
    copy.push_attribute(("fullCalcOnLoad", "1"));
    Ok(copy.into_owned())
}
