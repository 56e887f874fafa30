//! Built-in workbook used when no template file is given

use crate::cell::{Cell, CellRef};
use crate::layout::{Field, HEADER_ROW};
use crate::package::{XlsxPackage, SHARED_STRINGS_PART, SHEET_PART};
use crate::row::Row;
use crate::shared_strings::SharedStringTable;
use crate::worksheet::splice_rows;
use crate::XlsxResult;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Tasks" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#;

// cellXfs: 0 general, 1 bold header, 2 date, 3 decimal, 4 percent
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="5"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="2" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="9" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

const BLANK_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1"/><sheetViews><sheetView workbookViewId="0"><pane ySplit="1" topLeftCell="A2" activePane="bottomLeft" state="frozen"/></sheetView></sheetViews><sheetFormatPr defaultRowHeight="15"/><cols><col min="1" max="2" width="8" customWidth="1"/><col min="3" max="3" width="32" customWidth="1"/><col min="4" max="13" width="13" customWidth="1"/></cols><sheetData/><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#;

/// Assemble the built-in package
pub fn package() -> XlsxResult<XlsxPackage> {
    let mut strings = SharedStringTable::new();
    let mut header = Row::new(HEADER_ROW);
    for field in Field::ALL {
        let reference = CellRef::new(field.column(), HEADER_ROW);
        if let Some(cell) = Cell::text(reference, Some(field.header()), &mut strings) {
            header.insert(cell);
        }
    }

    let sheet = splice_rows(BLANK_SHEET, &[header])?;

    let mut package = XlsxPackage::new();
    package.set_part("[Content_Types].xml", CONTENT_TYPES);
    package.set_part("_rels/.rels", ROOT_RELS);
    package.set_part("xl/workbook.xml", WORKBOOK);
    package.set_part("xl/_rels/workbook.xml.rels", WORKBOOK_RELS);
    package.set_part("xl/styles.xml", STYLES);
    package.set_part(SHEET_PART, sheet);
    package.set_part(SHARED_STRINGS_PART, strings.to_xml()?);
    Ok(package)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worksheet::SheetData;
    use pretty_assertions::assert_eq;

    #[test]
    fn template_has_header_row_only() {
        let package = package().unwrap();
        let sheet = SheetData::parse(package.part_str(SHEET_PART).unwrap()).unwrap();
        let strings =
            SharedStringTable::parse(package.part_str(SHARED_STRINGS_PART).unwrap()).unwrap();

        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.data_rows().count(), 0);

        let header = sheet.row(HEADER_ROW).unwrap();
        let titles: Vec<String> = Field::ALL
            .iter()
            .map(|&f| header.text(f, &strings).unwrap())
            .collect();
        let expected: Vec<&str> = Field::ALL.iter().map(|f| f.header()).collect();
        assert_eq!(titles, expected);
        assert_eq!(strings.unique_count(), 13);
    }

    #[test]
    fn template_declares_styles() {
        let package = package().unwrap();
        let styles = package.part_str("xl/styles.xml").unwrap();
        assert!(styles.contains(r#"<cellXfs count="5">"#));
        assert!(package.part_str(SHEET_PART).unwrap().contains(r#"<dimension ref="A1:M1"/>"#));
    }
}
