//! Cell codec
//!
//! A cell is addressed as `column ++ row` (`"D7"`) and carries at most one
//! type marker (`t`) and one style marker (`s`). The combinations used by the
//! task layout form the closed set [`CellKind`]:
//!
//! | Kind | `t` | `s` | Raw value |
//! |------|-----|-----|-----------|
//! | Plain | - | - | literal text or integer |
//! | Decimal | - | `3` | decimal literal |
//! | Date | - | `2` | days since 1899-12-30 |
//! | Percent | - | `4` | fraction (0.5 = 50%) |
//! | SharedString | `s` | - | shared string index |
//! | Boolean | `b` | - | `1` / `0` |

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::shared_strings::SharedStringTable;
use crate::{XlsxError, XlsxResult};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Largest serial a spreadsheet accepts (9999-12-31)
const MAX_SERIAL: f64 = 2_958_465.0;

/// The spreadsheet epoch, 1899-12-30 00:00
pub fn spreadsheet_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("1899-12-30 is a valid date")
}

/// Days (with fraction) between the epoch and `value`
pub fn date_to_serial(value: NaiveDateTime) -> f64 {
    (value - spreadsheet_epoch()).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Date for a day count relative to the epoch, `None` outside the spreadsheet range
pub fn serial_to_date(days: f64) -> Option<NaiveDateTime> {
    if !days.is_finite() || days.abs() > MAX_SERIAL {
        return None;
    }
    let millis = (days * MILLIS_PER_DAY).round() as i64;
    spreadsheet_epoch().checked_add_signed(Duration::milliseconds(millis))
}

/// Culture-invariant number text
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // avoids "-0"
        "0".to_string()
    } else {
        value.to_string()
    }
}

// ============================================================================
// Kinds and addresses
// ============================================================================

/// Type/style combination of a cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellKind {
    Plain,
    Decimal,
    Date,
    Percent,
    SharedString,
    Boolean,
}

impl CellKind {
    /// Value of the `t` attribute
    pub fn type_marker(self) -> Option<&'static str> {
        match self {
            CellKind::SharedString => Some("s"),
            CellKind::Boolean => Some("b"),
            CellKind::Plain | CellKind::Decimal | CellKind::Date | CellKind::Percent => None,
        }
    }

    /// Value of the `s` attribute
    pub fn style_marker(self) -> Option<&'static str> {
        match self {
            CellKind::Date => Some("2"),
            CellKind::Decimal => Some("3"),
            CellKind::Percent => Some("4"),
            CellKind::Plain | CellKind::SharedString | CellKind::Boolean => None,
        }
    }

    /// Classify a cell read from a worksheet. The type marker wins over the
    /// style; unknown markers read as plain.
    pub fn from_markers(type_marker: Option<&str>, style_marker: Option<&str>) -> Self {
        match type_marker {
            Some("s") => CellKind::SharedString,
            Some("b") => CellKind::Boolean,
            _ => match style_marker {
                Some("2") => CellKind::Date,
                Some("3") => CellKind::Decimal,
                Some("4") => CellKind::Percent,
                _ => CellKind::Plain,
            },
        }
    }
}

/// Cell address, e.g. `C12`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellRef {
    /// Column letters (`A`, `M`, `AA`, ...)
    pub column: String,
    /// 1-based row number
    pub row: u32,
}

impl CellRef {
    pub fn new(column: impl Into<String>, row: u32) -> Self {
        Self {
            column: column.into(),
            row,
        }
    }

    /// 0-based column index
    pub fn column_index(&self) -> u32 {
        column_index(&self.column)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

impl FromStr for CellRef {
    type Err = XlsxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || XlsxError::MalformedSheet(format!("invalid cell reference '{s}'"));

        let split = s
            .find(|c: char| !c.is_ascii_alphabetic())
            .ok_or_else(invalid)?;
        let (column, row) = s.split_at(split);
        if column.is_empty() {
            return Err(invalid());
        }
        let row: u32 = row.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }
        Ok(Self::new(column.to_ascii_uppercase(), row))
    }
}

/// 0-based index of column letters (`A` = 0, `AA` = 26)
pub fn column_index(column: &str) -> u32 {
    column
        .bytes()
        .fold(0u32, |acc, b| {
            let digit = u32::from(b.to_ascii_uppercase().saturating_sub(b'A')) + 1;
            acc.saturating_mul(26).saturating_add(digit)
        })
        .saturating_sub(1)
}

/// Column letters for a 0-based index
pub fn column_name(index: u32) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

// ============================================================================
// Cell
// ============================================================================

/// One `c` element
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub reference: CellRef,
    pub kind: CellKind,
    /// Content of the `v` element, `None` when absent
    pub value: Option<String>,
}

impl Cell {
    pub fn new(reference: CellRef, kind: CellKind, value: impl Into<String>) -> Self {
        Self {
            reference,
            kind,
            value: Some(value.into()),
        }
    }

    /// Untyped literal
    pub fn plain(reference: CellRef, value: impl Into<String>) -> Self {
        Self::new(reference, CellKind::Plain, value)
    }

    pub fn integer(reference: CellRef, value: i64) -> Self {
        Self::new(reference, CellKind::Plain, value.to_string())
    }

    pub fn decimal(reference: CellRef, value: f64) -> Self {
        Self::new(reference, CellKind::Decimal, format_number(value))
    }

    /// `value` is a fraction: 0.5 renders as 50%
    pub fn percent(reference: CellRef, value: f64) -> Self {
        Self::new(reference, CellKind::Percent, format_number(value))
    }

    pub fn boolean(reference: CellRef, value: bool) -> Self {
        Self::new(reference, CellKind::Boolean, if value { "1" } else { "0" })
    }

    pub fn date(reference: CellRef, value: NaiveDateTime) -> Self {
        Self::new(reference, CellKind::Date, format_number(date_to_serial(value)))
    }

    pub fn shared_string(reference: CellRef, index: usize) -> Self {
        Self::new(reference, CellKind::SharedString, index.to_string())
    }

    /// Intern `text` and reference it; empty or absent text produces no cell
    pub fn text(reference: CellRef, text: Option<&str>, strings: &mut SharedStringTable) -> Option<Self> {
        match text {
            Some(text) if !text.is_empty() => {
                Some(Self::shared_string(reference, strings.intern(text)))
            }
            _ => None,
        }
    }

    /// Textual value: shared strings are resolved, everything else is raw.
    /// `None` when the cell has no `v`.
    pub fn resolved_value(&self, strings: &SharedStringTable) -> XlsxResult<Option<String>> {
        let Some(raw) = self.value.as_deref() else {
            return Ok(None);
        };
        if self.kind != CellKind::SharedString {
            return Ok(Some(raw.to_string()));
        }
        let index: usize = raw
            .trim()
            .parse()
            .map_err(|_| self.malformed(format!("invalid shared string index '{raw}'")))?;
        strings.resolve(index).map(|s| Some(s.to_string()))
    }

    fn malformed(&self, message: String) -> XlsxError {
        XlsxError::MalformedCell {
            cell: self.reference.to_string(),
            message,
        }
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Text field; a missing cell reads as empty
pub fn decode_text(cell: Option<&Cell>, strings: &SharedStringTable) -> XlsxResult<String> {
    let Some(cell) = cell else {
        return Ok(String::new());
    };
    match cell.resolved_value(strings)? {
        Some(text) => Ok(text),
        None if cell.kind == CellKind::SharedString => {
            Err(cell.malformed("shared string cell has no value".into()))
        }
        None => Ok(String::new()),
    }
}

/// Decimal field; a missing cell reads as 0
pub fn decode_number(cell: Option<&Cell>, strings: &SharedStringTable) -> XlsxResult<f64> {
    decode_typed(cell, strings, 0.0, "a number", parse_number)
}

/// Non-negative integer field; a missing cell reads as 0
pub fn decode_unsigned(cell: Option<&Cell>, strings: &SharedStringTable) -> XlsxResult<u32> {
    decode_typed(cell, strings, 0, "a non-negative integer", |s| s.parse().ok())
}

/// Boolean field: `true` / `1` (any case) are true, anything else false
pub fn decode_bool(cell: Option<&Cell>, strings: &SharedStringTable) -> XlsxResult<bool> {
    decode_typed(cell, strings, false, "a boolean", |s| {
        Some(s.eq_ignore_ascii_case("true") || s == "1")
    })
}

/// Date field; a missing cell reads as the epoch
pub fn decode_date(cell: Option<&Cell>, strings: &SharedStringTable) -> XlsxResult<NaiveDateTime> {
    decode_typed(cell, strings, spreadsheet_epoch(), "a date serial", |s| {
        parse_number(s).and_then(serial_to_date)
    })
}

fn decode_typed<T>(
    cell: Option<&Cell>,
    strings: &SharedStringTable,
    missing: T,
    expected: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> XlsxResult<T> {
    let Some(cell) = cell else {
        return Ok(missing);
    };
    let raw = cell
        .resolved_value(strings)?
        .ok_or_else(|| cell.malformed(format!("expected {expected}, found no value")))?;
    parse(raw.trim()).ok_or_else(|| cell.malformed(format!("expected {expected}, found '{raw}'")))
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}
