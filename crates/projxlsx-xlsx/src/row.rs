//! Row mapper: one task record to one worksheet row and back

use std::collections::BTreeMap;

use projxlsx_core::{ScheduleEngine, TaskRecord};

use crate::cell::{
    decode_bool, decode_date, decode_number, decode_text, decode_unsigned, Cell, CellRef,
};
use crate::layout::{Field, FIRST_DATA_ROW};
use crate::shared_strings::SharedStringTable;
use crate::XlsxResult;

/// A sparse worksheet row keyed by 0-based column index
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    /// 1-based row number
    pub number: u32,
    cells: BTreeMap<u32, Cell>,
}

impl Row {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            cells: BTreeMap::new(),
        }
    }

    /// Insert a cell, replacing any cell already in its column
    pub fn insert(&mut self, cell: Cell) -> Option<Cell> {
        self.cells.insert(cell.reference.column_index(), cell)
    }

    /// Cell by column letters
    pub fn cell(&self, column: &str) -> Option<&Cell> {
        self.cells.get(&crate::cell::column_index(column))
    }

    pub fn field(&self, field: Field) -> Option<&Cell> {
        self.cells.get(&field.index())
    }

    /// Cells in column order
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Decode a text field; a missing cell reads as empty
    pub fn text(&self, field: Field, strings: &SharedStringTable) -> XlsxResult<String> {
        decode_text(self.field(field), strings)
    }

    fn reference(&self, field: Field) -> CellRef {
        CellRef::new(field.column(), self.number)
    }
}

/// Worksheet row number of a 0-based list position
pub fn row_number(position: usize) -> u32 {
    position as u32 + FIRST_DATA_ROW
}

/// Maps task records to rows, asking the engine for every derived value
pub struct RowMapper<'e, E: ScheduleEngine + ?Sized> {
    engine: &'e E,
}

impl<'e, E: ScheduleEngine + ?Sized> RowMapper<'e, E> {
    pub fn new(engine: &'e E) -> Self {
        Self { engine }
    }

    /// Build the row for `tasks[position]`.
    ///
    /// Empty name, predecessor and assignment text produce no cell.
    pub fn export_row(
        &self,
        tasks: &[TaskRecord],
        position: usize,
        strings: &mut SharedStringTable,
    ) -> Row {
        let task = &tasks[position];
        let engine = self.engine;
        let mut row = Row::new(row_number(position));

        let label = engine.index_label(tasks, position);
        let name = task.name.as_deref();
        let predecessors = engine.predecessors_text(tasks, position);
        let assignments = engine.assignments_text(task);

        let cells = [
            Some(Cell::plain(row.reference(Field::IndexLabel), label)),
            Some(Cell::integer(
                row.reference(Field::Indentation),
                i64::from(task.indentation),
            )),
            Cell::text(row.reference(Field::Name), name, strings),
            Some(Cell::date(row.reference(Field::Start), task.start)),
            Some(Cell::decimal(row.reference(Field::Effort), engine.effort_hours(task))),
            Some(Cell::decimal(row.reference(Field::Duration), engine.duration_days(task))),
            Some(Cell::date(row.reference(Field::Finish), task.finish)),
            Some(Cell::boolean(row.reference(Field::Milestone), task.milestone)),
            Some(Cell::boolean(row.reference(Field::Completed), engine.is_completed(task))),
            Some(Cell::percent(
                row.reference(Field::Completion),
                engine.completion_fraction(task),
            )),
            Cell::text(row.reference(Field::Predecessors), Some(&predecessors), strings),
            Cell::text(row.reference(Field::Assignments), Some(&assignments), strings),
            Some(Cell::decimal(row.reference(Field::Cost), engine.cost(task))),
        ];

        for cell in cells.into_iter().flatten() {
            row.insert(cell);
        }
        row
    }

    /// Build a task record from a row, leaving predecessors empty.
    ///
    /// Index label, effort, duration and the done flag are engine outputs and
    /// are not read back.
    pub fn import_row(&self, row: &Row, strings: &SharedStringTable) -> XlsxResult<TaskRecord> {
        let start = decode_date(row.field(Field::Start), strings)?;
        let finish = decode_date(row.field(Field::Finish), strings)?;

        let mut task = TaskRecord::new(start, finish);
        task.indentation = decode_unsigned(row.field(Field::Indentation), strings)?;
        task.name = Some(row.text(Field::Name, strings)?).filter(|name| !name.is_empty());
        task.milestone = decode_bool(row.field(Field::Milestone), strings)?;
        task.execution_cost = decode_number(row.field(Field::Cost), strings)?;

        let completion = decode_number(row.field(Field::Completion), strings)?;
        self.engine.set_completion(&mut task, completion);

        let assignments = row.text(Field::Assignments, strings)?;
        self.engine.set_assignments(&mut task, &assignments)?;

        Ok(task)
    }
}
