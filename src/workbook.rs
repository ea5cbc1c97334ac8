//! Single-sheet Office Open XML writer. Reports are laid out as a
//! [`ReportGrid`] upstream; this module owns how that becomes an .xlsx
//! container (a zip of XML parts with inline strings).

use std::io::{Cursor, Write};

use anyhow::Context;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::report::{CellStyle, CellValue, ReportGrid};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

// Style ids line up with CellStyle: 0 default, 1 bold header, 2 adverse
// (dark red text on a light red fill).
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="3"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font><font><sz val="11"/><color rgb="FF9C0006"/><name val="Calibri"/></font></fonts><fills count="3"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill><fill><patternFill patternType="solid"><fgColor rgb="FFFFC7CE"/><bgColor indexed="64"/></patternFill></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/><xf numFmtId="0" fontId="2" fillId="2" borderId="0" xfId="0" applyFont="1" applyFill="1"/></cellXfs></styleSheet>"#;

/// Renders the grid as xlsx bytes.
pub fn write_workbook(grid: &ReportGrid) -> anyhow::Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", opts)
        .context("failed to start content types entry")?;
    zip.write_all(CONTENT_TYPES.as_bytes())
        .context("failed to write content types entry")?;

    zip.start_file("_rels/.rels", opts)
        .context("failed to start package relationships entry")?;
    zip.write_all(ROOT_RELS.as_bytes())
        .context("failed to write package relationships entry")?;

    zip.start_file("xl/workbook.xml", opts)
        .context("failed to start workbook entry")?;
    zip.write_all(workbook_xml(&grid.sheet_name).as_bytes())
        .context("failed to write workbook entry")?;

    zip.start_file("xl/_rels/workbook.xml.rels", opts)
        .context("failed to start workbook relationships entry")?;
    zip.write_all(WORKBOOK_RELS.as_bytes())
        .context("failed to write workbook relationships entry")?;

    zip.start_file("xl/styles.xml", opts)
        .context("failed to start styles entry")?;
    zip.write_all(STYLES.as_bytes())
        .context("failed to write styles entry")?;

    zip.start_file("xl/worksheets/sheet1.xml", opts)
        .context("failed to start worksheet entry")?;
    zip.write_all(sheet_xml(grid).as_bytes())
        .context("failed to write worksheet entry")?;

    let cursor = zip.finish().context("failed to finalize workbook")?;
    Ok(cursor.into_inner())
}

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<sheets><sheet name="{name}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
        ),
        name = xml_escape(sheet_name)
    )
}

fn sheet_xml(grid: &ReportGrid) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    );

    if !grid.column_widths.is_empty() {
        out.push_str("<cols>");
        for (i, width) in grid.column_widths.iter().enumerate() {
            out.push_str(&format!(
                r#"<col min="{n}" max="{n}" width="{width}" customWidth="1"/>"#,
                n = i + 1
            ));
        }
        out.push_str("</cols>");
    }

    out.push_str("<sheetData>");
    for (row_idx, row) in grid.rows.iter().enumerate() {
        out.push_str(&format!(r#"<row r="{}">"#, row_idx + 1));
        for (col_idx, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_ref(col_idx), row_idx + 1);
            let style = match cell.style {
                CellStyle::Default => String::new(),
                CellStyle::Header => r#" s="1""#.to_string(),
                CellStyle::Adverse => r#" s="2""#.to_string(),
            };
            match &cell.value {
                CellValue::Empty => {}
                CellValue::Text(text) => {
                    out.push_str(&format!(
                        r#"<c r="{reference}"{style} t="inlineStr"><is><t>{}</t></is></c>"#,
                        xml_escape(text)
                    ));
                }
                CellValue::Int(value) => {
                    out.push_str(&format!(r#"<c r="{reference}"{style}><v>{value}</v></c>"#));
                }
            }
        }
        out.push_str("</row>");
    }
    out.push_str("</sheetData>");

    if !grid.merges.is_empty() {
        out.push_str(&format!(r#"<mergeCells count="{}">"#, grid.merges.len()));
        for merge in &grid.merges {
            out.push_str(&format!(
                r#"<mergeCell ref="{}{row}:{}{row}"/>"#,
                column_ref(merge.col_start),
                column_ref(merge.col_end),
                row = merge.row + 1
            ));
        }
        out.push_str("</mergeCells>");
    }

    out.push_str("</worksheet>");
    out
}

/// Zero-based column index to its A1-style letters.
fn column_ref(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
