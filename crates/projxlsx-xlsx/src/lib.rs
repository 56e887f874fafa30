//! # projxlsx-xlsx
//!
//! Converts task lists to and from a fixed-layout xlsx worksheet.
//!
//! This crate provides:
//! - Shared string table with deduplicating `intern` and `resolve`
//! - Cell codec for numbers, dates (spreadsheet epoch), booleans, percents and shared strings
//! - Row mapper for the thirteen-column task layout
//! - Two-pass import (predecessors are row-positional and resolved last)
//! - Package access for the worksheet and shared-strings parts
//!
//! ## Layout
//!
//! | Col | Field | Encoding |
//! |-----|-------|----------|
//! | A | index label | plain |
//! | B | indentation | integer |
//! | C | name | shared string |
//! | D | start | date (`s="2"`) |
//! | E | effort (hours) | decimal (`s="3"`) |
//! | F | duration (days) | decimal (`s="3"`) |
//! | G | finish | date (`s="2"`) |
//! | H | milestone | boolean (`t="b"`) |
//! | I | completed | boolean (`t="b"`) |
//! | J | completion | percent (`s="4"`) |
//! | K | predecessors | shared string |
//! | L | assignments | shared string |
//! | M | cost | decimal (`s="3"`) |
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use projxlsx_core::{TaskList, TaskRecord};
//! use projxlsx_engine::CalendarEngine;
//! use projxlsx_xlsx::{export_workbook, import_workbook, XlsxPackage};
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let mut list = TaskList::new("Demo");
//! list.push(TaskRecord::new(day(1), day(5)).name("Design"));
//! list.push(TaskRecord::new(day(8), day(12)).name("Build").depends_on(0));
//!
//! let engine = CalendarEngine::new();
//! let bytes = export_workbook(&list, &engine, &XlsxPackage::template()?)?;
//! let imported = import_workbook(&bytes, &engine)?;
//! assert_eq!(imported.tasks, list.tasks);
//! # Ok::<(), projxlsx_xlsx::XlsxError>(())
//! ```

pub mod cell;
pub mod convert;
pub mod layout;
pub mod package;
pub mod row;
pub mod shared_strings;
mod template;
pub mod worksheet;

pub use cell::{Cell, CellKind, CellRef};
pub use convert::{export_rows, export_workbook, import_package, import_tasks, import_workbook};
pub use layout::Field;
pub use package::{XlsxPackage, SHARED_STRINGS_PART, SHEET_PART};
pub use row::{Row, RowMapper};
pub use shared_strings::SharedStringTable;
pub use worksheet::SheetData;

use projxlsx_core::EngineError;
use quick_xml::events::BytesStart;
use thiserror::Error;

/// SpreadsheetML main namespace
pub const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

pub type XlsxResult<T> = Result<T, XlsxError>;

/// Worksheet conversion error
#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("Missing package part: {0}")]
    MissingPart(String),

    #[error("Malformed cell {cell}: {message}")]
    MalformedCell { cell: String, message: String },

    #[error("Shared string index {index} out of range (table has {len} entries)")]
    StringIndexOutOfRange { index: usize, len: usize },

    #[error("Malformed worksheet: {0}")]
    MalformedSheet(String),

    #[error("Malformed package: {0}")]
    MalformedPackage(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Read an attribute by local name, unescaped
pub(crate) fn attribute(element: &BytesStart<'_>, name: &[u8]) -> XlsxResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
