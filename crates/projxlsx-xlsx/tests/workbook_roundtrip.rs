//! Whole-workbook conversions through the public API

use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use projxlsx_core::{DependencyType, PredecessorLink, TaskList, TaskRecord};
use projxlsx_engine::CalendarEngine;
use projxlsx_xlsx::{
    export_workbook, import_workbook, Field, SharedStringTable, SheetData, XlsxPackage,
    SHARED_STRINGS_PART, SHEET_PART,
};

fn at(month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, month, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn release_plan() -> TaskList {
    let mut list = TaskList::new("");
    list.push(TaskRecord::new(at(5, 6, 9), at(5, 10, 17)).name("Release 2.0"));
    list.push(
        TaskRecord::new(at(5, 6, 9), at(5, 8, 17))
            .name("Specification")
            .indent(1)
            .complete(1.0)
            .assign("Ana", 1.0),
    );
    list.push(
        TaskRecord::new(at(5, 8, 9), at(5, 10, 17))
            .name("Implementation")
            .indent(1)
            .complete(0.3)
            .with_predecessor(
                PredecessorLink::new(1)
                    .dep_type(DependencyType::StartToStart)
                    .lag(2),
            )
            .assign("Ana", 0.5)
            .assign("Ben", 1.0)
            .cost(250.0),
    );
    list.push(
        TaskRecord::new(at(5, 10, 17), at(5, 10, 17))
            .name("Go live")
            .indent(1)
            .milestone()
            .with_predecessor(PredecessorLink::new(2).dep_type(DependencyType::FinishToFinish)),
    );
    list
}

#[test]
fn release_plan_round_trip() {
    let engine = CalendarEngine::new();
    let list = release_plan();

    let bytes = export_workbook(&list, &engine, &XlsxPackage::template().unwrap()).unwrap();
    let imported = import_workbook(&bytes, &engine).unwrap();

    assert_eq!(imported, list);
}

#[test]
fn derived_columns_come_from_the_engine() {
    let engine = CalendarEngine::new().rate("Ben", 20.0).hours_per_day(6.0);
    let bytes =
        export_workbook(&release_plan(), &engine, &XlsxPackage::template().unwrap()).unwrap();

    let package = XlsxPackage::from_bytes(&bytes).unwrap();
    let sheet = SheetData::parse(package.part_str(SHEET_PART).unwrap()).unwrap();
    let strings = SharedStringTable::parse(package.part_str(SHARED_STRINGS_PART).unwrap()).unwrap();

    // Implementation: Wed 8 to Fri 10 May, 3 working days
    let row = sheet.row(4).unwrap();
    let raw = |field: Field| row.field(field).and_then(|c| c.value.clone()).unwrap();
    assert_eq!(raw(Field::IndexLabel), "3");
    assert_eq!(raw(Field::Duration), "3");
    assert_eq!(raw(Field::Effort), "27");
    assert_eq!(raw(Field::Cost), "610");
    assert_eq!(raw(Field::Completed), "0");
    assert_eq!(row.text(Field::Predecessors, &strings).unwrap(), "2SS+2d");
    assert_eq!(row.text(Field::Assignments, &strings).unwrap(), "Ana [50%], Ben");

    // Go live
    let row = sheet.row(5).unwrap();
    assert_eq!(row.text(Field::Predecessors, &strings).unwrap(), "3FF");
    assert_eq!(row.field(Field::Duration).and_then(|c| c.value.as_deref()), Some("0"));
    assert!(row.field(Field::Assignments).is_none());
}

#[test]
fn custom_template_parts_are_preserved() {
    let engine = CalendarEngine::new();
    let mut template = XlsxPackage::template().unwrap();
    template.set_part("docProps/app.xml", "<Properties/>");

    let bytes = export_workbook(&release_plan(), &engine, &template).unwrap();
    let package = XlsxPackage::from_bytes(&bytes).unwrap();

    assert_eq!(package.part_str("docProps/app.xml").unwrap(), "<Properties/>");
    assert_eq!(
        package.part_names().collect::<Vec<_>>(),
        template.part_names().collect::<Vec<_>>()
    );
    assert!(package
        .part_str(SHEET_PART)
        .unwrap()
        .contains(r#"<dimension ref="A1:M5"/>"#));
}

#[test]
fn repeated_names_share_one_entry() {
    let engine = CalendarEngine::new();
    let mut list = TaskList::new("");
    for day in 1..=3 {
        list.push(TaskRecord::new(at(7, day, 9), at(7, day, 17)).name("Standup"));
    }

    let bytes = export_workbook(&list, &engine, &XlsxPackage::template().unwrap()).unwrap();
    let package = XlsxPackage::from_bytes(&bytes).unwrap();
    let strings = SharedStringTable::parse(package.part_str(SHARED_STRINGS_PART).unwrap()).unwrap();

    assert_eq!(strings.unique_count(), 14);
    assert_eq!(strings.count(), 16);
}

#[test]
fn resource_names_with_commas_survive() {
    let engine = CalendarEngine::new();
    let mut list = TaskList::new("");
    list.push(
        TaskRecord::new(at(6, 3, 9), at(6, 4, 17))
            .name("Audit")
            .assign("Smith, John", 1.0)
            .assign("Doe; Jane", 0.5),
    );

    let bytes = export_workbook(&list, &engine, &XlsxPackage::template().unwrap()).unwrap();
    let imported = import_workbook(&bytes, &engine).unwrap();

    assert_eq!(imported.tasks[0].assignments, list.tasks[0].assignments);
}
