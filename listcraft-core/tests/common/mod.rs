#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const SHEET_PATH: &str = "xl/worksheets/sheet1.xml";

/// Listing template fixture:
/// - row 1: header (with a sentinel formula that must survive)
/// - row 2: A/B sentinel formulas, C with an old brand, D literal
/// - row 3: literal SKU in A, formula in B, no C cell
/// - row 4: style-only cell, counts as empty
/// - row 5: sentinel twice in A, a cell after C
pub const LISTING_ROWS: &str = concat!(
    r#"<row r="1" spans="1:3"><c r="A1" t="str"><f>"ZDX"&amp;"-başlık"</f><v>ZDX-başlık</v></c><c r="B1" t="inlineStr"><is><t>Barkod</t></is></c><c r="C1" t="inlineStr"><is><t>Marka</t></is></c></row>"#,
    r#"<row r="2" spans="1:4"><c r="A2" s="1" t="str"><f>"ZDX"&amp;K2&amp;Y2</f><v>ZDX1</v></c><c r="B2" t="str"><f>"ZDX"&amp;K2</f><v>ZDX</v></c><c r="C2" s="2" t="inlineStr"><is><t>Eski Marka</t></is></c><c r="D2"><v>10</v></c></row>"#,
    r#"<row r="3" spans="1:2"><c r="A3"><v>12345</v></c><c r="B3" t="str"><f>"ZDX"&amp;K3</f><v>ZDX</v></c></row>"#,
    r#"<row r="4"><c r="C4" s="2"/></row>"#,
    r#"<row r="5" spans="1:5"><c r="A5" t="str"><f>"ZDX"&amp;"-"&amp;"ZDX"</f></c><c r="E5"><v>1</v></c></row>"#,
);

pub fn sheet_xml(rows: &str, dimension: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><dimension ref="{}"/><sheetData>{}</sheetData></worksheet>"#,
        dimension, rows
    )
}

/// Build an in-memory XLSX with one worksheet holding `rows`
pub fn build_xlsx(rows: &str) -> Vec<u8> {
    build_xlsx_with(&sheet_xml(rows, "A1:E5"), "")
}

/// Build an in-memory XLSX from complete sheet XML; `workbook_tail` is
/// inserted after `</sheets>` in workbook.xml
pub fn build_xlsx_with(sheet: &str, workbook_tail: &str) -> Vec<u8> {
    build_package(sheet, workbook_tail, None)
}

/// Like `build_xlsx_with`, plus `xl/calcChain.xml` with its content type and relationship
pub fn build_xlsx_with_calc_chain(sheet: &str, calc_chain: &str) -> Vec<u8> {
    build_package(sheet, "", Some(calc_chain))
}

fn build_package(sheet: &str, workbook_tail: &str, calc_chain: Option<&str>) -> Vec<u8> {
    let (chain_override, chain_rel) = match calc_chain {
        Some(_) => (
            r#"<Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/>"#,
            r#"<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain" Target="calcChain.xml"/>"#,
        ),
        None => ("", ""),
    };
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut parts: Vec<(&str, String)> = vec![
        (
            "[Content_Types].xml",
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>{}</Types>"#,
                chain_override
            ),
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
                .to_string(),
        ),
        (
            "xl/workbook.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Ürünler" sheetId="1" r:id="rId1"/></sheets>{}</workbook>"#,
                workbook_tail
            ),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>{}</Relationships>"#,
                chain_rel
            ),
        ),
        (
            "xl/styles.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="0"/><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="1"><fill><patternFill patternType="none"/></fill></fills><borders count="1"><border/></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs></styleSheet>"#
                .to_string(),
        ),
        (SHEET_PATH, sheet.to_string()),
    ];
    if let Some(chain) = calc_chain {
        parts.push(("xl/calcChain.xml", chain.to_string()));
    }

    for (name, content) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

/// Read one part of an XLSX as text
pub fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

/// Every part of an XLSX as (name, content), in archive order
pub fn all_parts(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            file.read_to_end(&mut content).unwrap();
            (file.name().to_string(), content)
        })
        .collect()
}

/// Raw XML of one `<row>` element
pub fn row_xml(sheet: &str, row: u32) -> String {
    let open = format!(r#"<row r="{}""#, row);
    let start = sheet.find(&open).unwrap();
    let end = start + sheet[start..].find("</row>").unwrap() + "</row>".len();
    sheet[start..end].to_string()
}

/// Raw XML of one `<c>` element, whether empty or not
pub fn cell_xml(sheet: &str, reference: &str) -> Option<String> {
    let open = format!(r#"<c r="{}""#, reference);
    let start = sheet.find(&open)?;
    let rest = &sheet[start..];
    let tag_end = rest.find('>')?;
    if rest[..tag_end].ends_with('/') {
        return Some(rest[..=tag_end].to_string());
    }
    let end = rest.find("</c>")? + "</c>".len();
    Some(rest[..end].to_string())
}
