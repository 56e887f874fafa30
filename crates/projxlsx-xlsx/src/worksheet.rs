//! Worksheet part (`xl/worksheets/sheet1.xml`)
//!
//! Reading collects `sheetData/row/c` into [`Row`]s. Writing never rebuilds
//! the document: [`splice_rows`] streams the existing worksheet through and
//! swaps the data rows, so columns, views and other template markup survive.

use std::collections::BTreeMap;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::cell::{column_name, Cell, CellKind, CellRef};
use crate::layout::{FIRST_DATA_ROW, HEADER_ROW, LAST_COLUMN, SPANS};
use crate::row::Row;
use crate::{attribute, XlsxError, XlsxResult};

/// Rows of a worksheet, ordered by row number
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetData {
    rows: BTreeMap<u32, Row>,
}

/// Cell being read
struct PendingCell {
    reference: CellRef,
    kind: CellKind,
    value: Option<String>,
}

impl SheetData {
    pub fn parse(xml: &str) -> XlsxResult<Self> {
        let mut reader = Reader::from_str(xml);

        let mut sheet = Self::default();
        let mut in_sheet_data = false;
        let mut row: Option<Row> = None;
        let mut last_row = 0u32;
        let mut cell: Option<PendingCell> = None;
        let mut in_value = false;

        loop {
            match reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"sheetData" => in_sheet_data = true,
                    b"row" if in_sheet_data => {
                        last_row = row_number(&e, last_row)?;
                        row = Some(Row::new(last_row));
                    }
                    b"c" => {
                        if let Some(row) = &row {
                            cell = Some(start_cell(&e, row)?);
                        }
                    }
                    // `v`, or the text of an inline string
                    b"v" | b"t" => in_value = cell.is_some(),
                    _ => {}
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"row" if in_sheet_data => {
                        last_row = row_number(&e, last_row)?;
                        sheet.insert(Row::new(last_row))?;
                    }
                    b"c" => {
                        if let Some(row) = row.as_mut() {
                            let empty = start_cell(&e, row)?;
                            row.insert(empty.finish());
                        }
                    }
                    _ => {}
                },
                Event::Text(t) if in_value => {
                    if let Some(cell) = cell.as_mut() {
                        cell.value
                            .get_or_insert_with(String::new)
                            .push_str(&t.unescape()?);
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"v" | b"t" => in_value = false,
                    b"c" => {
                        if let (Some(row), Some(cell)) = (row.as_mut(), cell.take()) {
                            row.insert(cell.finish());
                        }
                    }
                    b"row" => {
                        if let Some(row) = row.take() {
                            sheet.insert(row)?;
                        }
                    }
                    b"sheetData" => in_sheet_data = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        debug!(rows = sheet.rows.len(), "parsed worksheet");
        Ok(sheet)
    }

    fn insert(&mut self, row: Row) -> XlsxResult<()> {
        let number = row.number;
        if self.rows.insert(number, row).is_some() {
            return Err(XlsxError::MalformedSheet(format!("duplicate row {number}")));
        }
        Ok(())
    }

    pub fn row(&self, number: u32) -> Option<&Row> {
        self.rows.get(&number)
    }

    /// All rows, header included, in ascending row order
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    /// Rows below the header that hold at least one cell
    pub fn data_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows
            .range(FIRST_DATA_ROW..)
            .map(|(_, row)| row)
            .filter(|row| !row.is_empty())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl PendingCell {
    fn finish(self) -> Cell {
        Cell {
            reference: self.reference,
            kind: self.kind,
            value: self.value,
        }
    }
}

fn row_number(element: &BytesStart<'_>, previous: u32) -> XlsxResult<u32> {
    match attribute(element, b"r")? {
        Some(r) => match r.trim().parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(XlsxError::MalformedSheet(format!("invalid row number '{r}'"))),
        },
        None => Ok(previous + 1),
    }
}

fn start_cell(element: &BytesStart<'_>, row: &Row) -> XlsxResult<PendingCell> {
    let reference = match attribute(element, b"r")? {
        Some(r) => {
            let reference: CellRef = r.parse()?;
            if reference.row != row.number {
                return Err(XlsxError::MalformedSheet(format!(
                    "cell {reference} is inside row {}",
                    row.number
                )));
            }
            reference
        }
        None => {
            let column = row
                .cells()
                .last()
                .map_or(0, |previous| previous.reference.column_index() + 1);
            CellRef::new(column_name(column), row.number)
        }
    };

    let type_marker = attribute(element, b"t")?;
    let style_marker = attribute(element, b"s")?;
    Ok(PendingCell {
        reference,
        kind: CellKind::from_markers(type_marker.as_deref(), style_marker.as_deref()),
        value: None,
    })
}

// ============================================================================
// Writing
// ============================================================================

/// Replace the data rows of `worksheet` with `rows`.
///
/// The header row and everything outside `sheetData` are copied unchanged;
/// the `dimension` reference is updated to cover the new rows.
pub fn splice_rows(worksheet: &str, rows: &[Row]) -> XlsxResult<String> {
    let mut reader = Reader::from_str(worksheet);
    let mut writer = Writer::new(Vec::with_capacity(worksheet.len() + rows.len() * 512));

    let last_row = rows.iter().map(|r| r.number).max().unwrap_or(HEADER_ROW);
    let dimension = format!("A{HEADER_ROW}:{LAST_COLUMN}{last_row}");

    let mut in_sheet_data = false;
    let mut found_sheet_data = false;
    let mut template_row = 0u32;
    // nesting depth of a template row being dropped
    let mut skipping = 0usize;

    loop {
        let event = reader.read_event()?;
        if skipping > 0 {
            match event {
                Event::Start(_) => skipping += 1,
                Event::End(_) => skipping -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) if e.local_name().as_ref() == b"sheetData" => {
                in_sheet_data = true;
                found_sheet_data = true;
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"sheetData" => {
                found_sheet_data = true;
                writer.write_event(Event::Start(e.borrow()))?;
                write_rows(&mut writer, rows)?;
                writer.write_event(Event::End(e.to_end()))?;
            }
            Event::End(e) if e.local_name().as_ref() == b"sheetData" => {
                in_sheet_data = false;
                write_rows(&mut writer, rows)?;
                writer.write_event(Event::End(e))?;
            }
            Event::Start(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                template_row = row_number(&e, template_row)?;
                if template_row > HEADER_ROW {
                    skipping = 1;
                } else {
                    writer.write_event(Event::Start(e))?;
                }
            }
            Event::Empty(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                template_row = row_number(&e, template_row)?;
                if template_row <= HEADER_ROW {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"dimension" => {
                writer.write_event(Event::Start(with_ref(&e, &dimension)?))?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"dimension" => {
                writer.write_event(Event::Empty(with_ref(&e, &dimension)?))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    if !found_sheet_data {
        return Err(XlsxError::MalformedSheet("no sheetData element".into()));
    }

    debug!(rows = rows.len(), dimension = %dimension, "spliced worksheet rows");
    String::from_utf8(writer.into_inner())
        .map_err(|e| XlsxError::MalformedSheet(e.to_string()))
}

fn with_ref(element: &BytesStart<'_>, reference: &str) -> XlsxResult<BytesStart<'static>> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut updated = BytesStart::new(name);
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() != b"ref" {
            updated.push_attribute(attr);
        }
    }
    updated.push_attribute(("ref", reference));
    Ok(updated.into_owned())
}

fn write_rows(writer: &mut Writer<Vec<u8>>, rows: &[Row]) -> XlsxResult<()> {
    for row in rows {
        let number = row.number.to_string();
        writer.write_event(Event::Start(
            BytesStart::new("row").with_attributes([("r", number.as_str()), ("spans", SPANS)]),
        ))?;
        for cell in row.cells() {
            write_cell(writer, cell)?;
        }
        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }
    Ok(())
}

fn write_cell(writer: &mut Writer<Vec<u8>>, cell: &Cell) -> XlsxResult<()> {
    let reference = cell.reference.to_string();
    let mut c = BytesStart::new("c");
    c.push_attribute(("r", reference.as_str()));
    if let Some(style) = cell.kind.style_marker() {
        c.push_attribute(("s", style));
    }
    if let Some(marker) = cell.kind.type_marker() {
        c.push_attribute(("t", marker));
    }

    match &cell.value {
        Some(value) => {
            writer.write_event(Event::Start(c))?;
            writer.write_event(Event::Start(BytesStart::new("v")))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new("v")))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
        None => writer.write_event(Event::Empty(c))?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:M3"/><sheetViews><sheetView workbookViewId="0"/></sheetViews><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c></row><row r="2"><c r="A2"><v>1</v></c><c r="D2" s="2"><v>45292</v></c></row><row r="3"><c r="H3" t="b"><v>1</v></c></row></sheetData><pageMargins left="0.7"/></worksheet>"#;

    #[test]
    fn parse_rows_and_cells() {
        let sheet = SheetData::parse(SHEET).unwrap();
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.data_rows().map(|r| r.number).collect::<Vec<_>>(), [2, 3]);

        let row = sheet.row(2).unwrap();
        let start = row.cell("D").unwrap();
        assert_eq!(start.kind, CellKind::Date);
        assert_eq!(start.value.as_deref(), Some("45292"));
        assert_eq!(sheet.row(3).unwrap().cell("H").unwrap().kind, CellKind::Boolean);
    }

    #[test]
    fn parse_infers_missing_references() {
        let xml = r#"<worksheet><sheetData><row><c><v>a</v></c></row><row><c><v>1</v></c><c t="b"><v>0</v></c></row></sheetData></worksheet>"#;
        let sheet = SheetData::parse(xml).unwrap();
        let row = sheet.row(2).unwrap();
        assert_eq!(row.cell("A").unwrap().value.as_deref(), Some("1"));
        assert_eq!(row.cell("B").unwrap().reference, CellRef::new("B", 2));
    }

    #[test]
    fn parse_inline_strings_and_empty_cells() {
        let xml = r#"<worksheet><sheetData><row r="2"><c r="C2" t="inlineStr"><is><t>Inline</t></is></c><c r="M2" s="3"/></row></sheetData></worksheet>"#;
        let sheet = SheetData::parse(xml).unwrap();
        let row = sheet.row(2).unwrap();
        assert_eq!(row.cell("C").unwrap().kind, CellKind::Plain);
        assert_eq!(row.cell("C").unwrap().value.as_deref(), Some("Inline"));
        assert_eq!(row.cell("M").unwrap().value, None);
    }

    #[test]
    fn parse_rejects_duplicate_rows() {
        let xml = r#"<worksheet><sheetData><row r="2"/><row r="2"/></sheetData></worksheet>"#;
        assert!(matches!(SheetData::parse(xml), Err(XlsxError::MalformedSheet(_))));
    }

    #[test]
    fn parse_rejects_misplaced_cell() {
        let xml = r#"<worksheet><sheetData><row r="2"><c r="A3"><v>1</v></c></row></sheetData></worksheet>"#;
        assert!(matches!(SheetData::parse(xml), Err(XlsxError::MalformedSheet(_))));
    }

    #[test]
    fn empty_rows_are_not_data() {
        let xml = r#"<worksheet><sheetData><row r="1"/><row r="2"/><row r="3"><c r="A3"><v>1</v></c></row></sheetData></worksheet>"#;
        let sheet = SheetData::parse(xml).unwrap();
        assert_eq!(sheet.data_rows().map(|r| r.number).collect::<Vec<_>>(), [3]);
    }

    fn data_row(number: u32) -> Row {
        let mut row = Row::new(number);
        row.insert(Cell::plain(CellRef::new("A", number), (number - 1).to_string()));
        row.insert(Cell::boolean(CellRef::new("H", number), true));
        row
    }

    #[test]
    fn splice_replaces_data_rows() {
        let out = splice_rows(SHEET, &[data_row(2)]).unwrap();

        assert!(out.contains(r#"<dimension ref="A1:M2"/>"#));
        assert!(out.contains(r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>"#));
        assert!(out.contains(
            r#"<row r="2" spans="1:13"><c r="A2"><v>1</v></c><c r="H2" t="b"><v>1</v></c></row></sheetData>"#
        ));
        assert!(!out.contains("45292"));
        assert!(out.contains("<sheetViews>"));
        assert!(out.contains(r#"<pageMargins left="0.7"/>"#));

        let reread = SheetData::parse(&out).unwrap();
        assert_eq!(reread.row(2), Some(&data_row(2)));
        assert_eq!(reread.row(3), None);
    }

    #[test]
    fn splice_into_empty_sheet_data() {
        let xml = r#"<worksheet><dimension ref="A1"/><sheetData/></worksheet>"#;
        let out = splice_rows(xml, &[data_row(2), data_row(3)]).unwrap();
        assert!(out.contains(r#"<dimension ref="A1:M3"/>"#));
        assert_eq!(SheetData::parse(&out).unwrap().data_rows().count(), 2);
    }

    #[test]
    fn splice_without_rows_keeps_header() {
        let out = splice_rows(SHEET, &[]).unwrap();
        assert!(out.contains(r#"<dimension ref="A1:M1"/>"#));
        assert_eq!(SheetData::parse(&out).unwrap().len(), 1);
    }

    #[test]
    fn splice_requires_sheet_data() {
        let err = splice_rows("<worksheet/>", &[]).unwrap_err();
        assert!(matches!(err, XlsxError::MalformedSheet(_)));
    }
}
