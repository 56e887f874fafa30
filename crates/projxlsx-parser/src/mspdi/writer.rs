//! Project XML (MSPDI subset) serializer
//!
//! Task UIDs are 1-based list positions; resource UIDs are assigned to the
//! distinct assignment names in first-use order.

use std::collections::HashMap;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use projxlsx_core::{TaskList, TaskRecord};

use super::{link_code, DATE_TIME_FORMAT, LAG_UNITS_PER_DAY, NAMESPACE};
use crate::ParseError;

type XmlWriter = Writer<Vec<u8>>;

/// Serialize a task list to task-list XML
pub fn write_task_list(list: &TaskList) -> Result<String, ParseError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.write_event(Event::Start(
        BytesStart::new("Project").with_attributes([("xmlns", NAMESPACE)]),
    ))?;
    write_leaf(&mut writer, "Name", &list.name)?;

    writer.write_event(Event::Start(BytesStart::new("Tasks")))?;
    for (position, task) in list.tasks.iter().enumerate() {
        write_task(&mut writer, position, task)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Tasks")))?;

    let mut resource_uids: HashMap<&str, usize> = HashMap::new();
    let mut resource_names: Vec<&str> = Vec::new();
    for assignment in list.tasks.iter().flat_map(|t| &t.assignments) {
        resource_uids
            .entry(assignment.resource.as_str())
            .or_insert_with(|| {
                resource_names.push(assignment.resource.as_str());
                resource_names.len()
            });
    }

    writer.write_event(Event::Start(BytesStart::new("Resources")))?;
    for (i, name) in resource_names.iter().enumerate() {
        writer.write_event(Event::Start(BytesStart::new("Resource")))?;
        write_leaf(&mut writer, "UID", &(i + 1).to_string())?;
        write_leaf(&mut writer, "ID", &(i + 1).to_string())?;
        write_leaf(&mut writer, "Name", name)?;
        writer.write_event(Event::End(BytesEnd::new("Resource")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Resources")))?;

    writer.write_event(Event::Start(BytesStart::new("Assignments")))?;
    let mut assignment_uid = 0;
    for (position, task) in list.tasks.iter().enumerate() {
        for assignment in &task.assignments {
            assignment_uid += 1;
            writer.write_event(Event::Start(BytesStart::new("Assignment")))?;
            write_leaf(&mut writer, "UID", &assignment_uid.to_string())?;
            write_leaf(&mut writer, "TaskUID", &(position + 1).to_string())?;
            write_leaf(
                &mut writer,
                "ResourceUID",
                &resource_uids[assignment.resource.as_str()].to_string(),
            )?;
            write_leaf(&mut writer, "Units", &assignment.units.to_string())?;
            writer.write_event(Event::End(BytesEnd::new("Assignment")))?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new("Assignments")))?;

    writer.write_event(Event::End(BytesEnd::new("Project")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| ParseError::InvalidValue(e.to_string()))
}

fn write_task(writer: &mut XmlWriter, position: usize, task: &TaskRecord) -> Result<(), ParseError> {
    let uid = (position + 1).to_string();

    writer.write_event(Event::Start(BytesStart::new("Task")))?;
    write_leaf(writer, "UID", &uid)?;
    write_leaf(writer, "ID", &uid)?;
    if let Some(name) = &task.name {
        write_leaf(writer, "Name", name)?;
    }
    write_leaf(writer, "OutlineLevel", &(task.indentation + 1).to_string())?;
    write_leaf(writer, "Start", &task.start.format(DATE_TIME_FORMAT).to_string())?;
    write_leaf(writer, "Finish", &task.finish.format(DATE_TIME_FORMAT).to_string())?;
    write_leaf(writer, "Milestone", if task.milestone { "1" } else { "0" })?;
    write_leaf(
        writer,
        "PercentComplete",
        &((task.completion * 100.0).round() as i64).to_string(),
    )?;
    write_leaf(writer, "FixedCost", &task.execution_cost.to_string())?;

    for link in &task.predecessors {
        writer.write_event(Event::Start(BytesStart::new("PredecessorLink")))?;
        write_leaf(writer, "PredecessorUID", &(link.task + 1).to_string())?;
        write_leaf(writer, "Type", &link_code(link.dep_type).to_string())?;
        let lag = link.lag_days.checked_mul(LAG_UNITS_PER_DAY).ok_or_else(|| {
            ParseError::InvalidValue(format!(
                "task {} predecessor lag of {} days is out of range",
                position + 1,
                link.lag_days
            ))
        })?;
        write_leaf(writer, "LinkLag", &lag.to_string())?;
        writer.write_event(Event::End(BytesEnd::new("PredecessorLink")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Task")))?;
    Ok(())
}

fn write_leaf(writer: &mut XmlWriter, name: &str, value: &str) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_task_list;
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;
    use projxlsx_core::{DependencyType, PredecessorLink};

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn sample() -> TaskList {
        let mut list = TaskList::new("Release <1.0>");
        list.push(TaskRecord::new(at(4), at(8)).name("Plan & scope").complete(1.0).cost(75.0));
        list.push(
            TaskRecord::new(at(11), at(15))
                .name("Implement")
                .indent(1)
                .with_predecessor(PredecessorLink::new(0).dep_type(DependencyType::StartToStart).lag(1))
                .assign("Alice", 1.0)
                .assign("Bob", 0.5),
        );
        list.push(TaskRecord::new(at(15), at(15)).milestone().depends_on(1).assign("Alice", 1.0));
        list
    }

    #[test]
    fn escapes_text() {
        let xml = write_task_list(&sample()).unwrap();
        assert!(xml.contains("<Name>Release &lt;1.0&gt;</Name>"));
        assert!(xml.contains("<Name>Plan &amp; scope</Name>"));
    }

    #[test]
    fn resources_are_deduplicated() {
        let xml = write_task_list(&sample()).unwrap();
        assert_eq!(xml.matches("<Resource>").count(), 2);
        assert_eq!(xml.matches("<Assignment>").count(), 3);
    }

    #[test]
    fn oversized_lag_is_rejected() {
        let mut list = TaskList::new("Lag");
        list.push(TaskRecord::new(at(4), at(4)));
        list.push(
            TaskRecord::new(at(5), at(5))
                .with_predecessor(PredecessorLink::new(0).lag(i64::MAX / 100)),
        );

        let err = write_task_list(&list).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue(ref msg) if msg.contains("task 2")));
    }

    #[test]
    fn write_then_parse_preserves_tasks() {
        let list = sample();
        let parsed = parse_task_list(&write_task_list(&list).unwrap()).unwrap();
        assert_eq!(parsed, list);
    }
}
