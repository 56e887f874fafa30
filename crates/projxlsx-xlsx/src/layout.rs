//! Fixed thirteen-column task layout

use crate::cell::CellKind;

/// Worksheet row holding the column titles
pub const HEADER_ROW: u32 = 1;

/// First worksheet row holding a task
pub const FIRST_DATA_ROW: u32 = 2;

/// `spans` attribute for layout rows
pub const SPANS: &str = "1:13";

/// Last column of the layout
pub const LAST_COLUMN: &str = "M";

/// One column of the task layout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    IndexLabel,
    Indentation,
    Name,
    Start,
    Effort,
    Duration,
    Finish,
    Milestone,
    Completed,
    Completion,
    Predecessors,
    Assignments,
    Cost,
}

impl Field {
    /// All fields in column order
    pub const ALL: [Field; 13] = [
        Field::IndexLabel,
        Field::Indentation,
        Field::Name,
        Field::Start,
        Field::Effort,
        Field::Duration,
        Field::Finish,
        Field::Milestone,
        Field::Completed,
        Field::Completion,
        Field::Predecessors,
        Field::Assignments,
        Field::Cost,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Field::IndexLabel => "A",
            Field::Indentation => "B",
            Field::Name => "C",
            Field::Start => "D",
            Field::Effort => "E",
            Field::Duration => "F",
            Field::Finish => "G",
            Field::Milestone => "H",
            Field::Completed => "I",
            Field::Completion => "J",
            Field::Predecessors => "K",
            Field::Assignments => "L",
            Field::Cost => "M",
        }
    }

    /// 0-based column index
    pub fn index(self) -> u32 {
        self as u32
    }

    /// Encoding used when the field is written
    pub fn kind(self) -> CellKind {
        match self {
            Field::IndexLabel | Field::Indentation => CellKind::Plain,
            Field::Name | Field::Predecessors | Field::Assignments => CellKind::SharedString,
            Field::Start | Field::Finish => CellKind::Date,
            Field::Effort | Field::Duration | Field::Cost => CellKind::Decimal,
            Field::Milestone | Field::Completed => CellKind::Boolean,
            Field::Completion => CellKind::Percent,
        }
    }

    /// Column title in the header row
    pub fn header(self) -> &'static str {
        match self {
            Field::IndexLabel => "ID",
            Field::Indentation => "Indent",
            Field::Name => "Name",
            Field::Start => "Start",
            Field::Effort => "Effort (h)",
            Field::Duration => "Duration (d)",
            Field::Finish => "Finish",
            Field::Milestone => "Milestone",
            Field::Completed => "Done",
            Field::Completion => "Complete",
            Field::Predecessors => "Predecessors",
            Field::Assignments => "Resources",
            Field::Cost => "Cost",
        }
    }
}
