//! Document assembly (export) and two-pass import
//!
//! Export walks the task list once, one row per task from row 2 on, and
//! writes the new worksheet and shared strings back into a copy of the
//! template. Import builds every task record first and resolves predecessor
//! text in a second pass, since predecessor text names rows that may come
//! later in the sheet.

use std::collections::HashMap;

use projxlsx_core::{ScheduleEngine, TaskList, TaskRecord};
use tracing::{debug, info};

use crate::layout::Field;
use crate::package::{XlsxPackage, SHARED_STRINGS_PART, SHEET_PART};
use crate::row::{Row, RowMapper};
use crate::shared_strings::SharedStringTable;
use crate::worksheet::{splice_rows, SheetData};
use crate::XlsxResult;

/// Build one row per task, interning text into `strings`
pub fn export_rows<E: ScheduleEngine + ?Sized>(
    engine: &E,
    tasks: &[TaskRecord],
    strings: &mut SharedStringTable,
) -> Vec<Row> {
    let mapper = RowMapper::new(engine);
    (0..tasks.len())
        .map(|position| mapper.export_row(tasks, position, strings))
        .collect()
}

/// Rebuild the row-ordered task records of a worksheet
pub fn import_tasks<E: ScheduleEngine + ?Sized>(
    engine: &E,
    sheet: &SheetData,
    strings: &SharedStringTable,
) -> XlsxResult<Vec<TaskRecord>> {
    let mapper = RowMapper::new(engine);

    // Pass 1: every record, indexed by row number
    let mut tasks = Vec::new();
    let mut positions: HashMap<u32, usize> = HashMap::new();
    for row in sheet.data_rows() {
        positions.insert(row.number, tasks.len());
        tasks.push(mapper.import_row(row, strings)?);
    }

    // Pass 2: predecessor text against the complete list
    for row in sheet.data_rows() {
        let position = positions[&row.number];
        let text = row.text(Field::Predecessors, strings)?;
        let links = engine.resolve_predecessors(position, &text, &tasks)?;
        tasks[position].predecessors = links;
    }

    debug!(tasks = tasks.len(), "resolved task rows");
    Ok(tasks)
}

/// Write `list` into a copy of `template`, returning the xlsx bytes.
///
/// The template must contain the worksheet and shared-strings parts. Its
/// header row is kept and its data rows are replaced.
pub fn export_workbook<E: ScheduleEngine + ?Sized>(
    list: &TaskList,
    engine: &E,
    template: &XlsxPackage,
) -> XlsxResult<Vec<u8>> {
    let sheet_xml = template.part_str(SHEET_PART)?;
    let mut strings = SharedStringTable::parse(template.part_str(SHARED_STRINGS_PART)?)?;

    let rows = export_rows(engine, &list.tasks, &mut strings);
    let sheet = splice_rows(sheet_xml, &rows)?;
    let strings_xml = strings.to_xml()?;

    let mut package = template.clone();
    package.set_part(SHEET_PART, sheet);
    package.set_part(SHARED_STRINGS_PART, strings_xml);

    info!(
        tasks = list.len(),
        count = strings.count(),
        unique_count = strings.unique_count(),
        "exported workbook"
    );
    package.to_bytes()
}

/// Read the task list stored in a package
pub fn import_package<E: ScheduleEngine + ?Sized>(
    package: &XlsxPackage,
    engine: &E,
) -> XlsxResult<TaskList> {
    let sheet = SheetData::parse(package.part_str(SHEET_PART)?)?;
    let strings = SharedStringTable::parse(package.part_str(SHARED_STRINGS_PART)?)?;

    let list = TaskList {
        name: String::new(),
        tasks: import_tasks(engine, &sheet, &strings)?,
    };

    info!(tasks = list.len(), "imported workbook");
    Ok(list)
}

/// Read the task list stored in xlsx bytes
pub fn import_workbook<E: ScheduleEngine + ?Sized>(
    bytes: &[u8],
    engine: &E,
) -> XlsxResult<TaskList> {
    import_package(&XlsxPackage::from_bytes(bytes)?, engine)
}
