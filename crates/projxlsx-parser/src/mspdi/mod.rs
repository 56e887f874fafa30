//! Project XML (MSPDI subset) reader
//!
//! Only the elements needed to describe a flat, outline-indented task list are
//! read; everything else in the document is skipped.
//!
//! | Element | Maps to |
//! |---------|---------|
//! | `Project/Name` | `TaskList::name` |
//! | `Task/OutlineLevel` | `indentation + 1` |
//! | `Task/PercentComplete` | `completion * 100` |
//! | `Task/FixedCost` | `execution_cost` |
//! | `PredecessorLink/Type` | 0 = FF, 1 = FS, 2 = SF, 3 = SS |
//! | `PredecessorLink/LinkLag` | tenths of a minute, 4800 per working day |
//! | `Assignment/Units` | allocation units |
//!
//! Task UID 0 is the project summary task and is not part of the list.

mod writer;

pub use writer::write_task_list;

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::events::Event;
use quick_xml::Reader;

use projxlsx_core::{AssignmentRef, DependencyType, PredecessorLink, TaskList, TaskRecord};

use crate::ParseError;

/// Default namespace of the dialect
pub const NAMESPACE: &str = "http://schemas.microsoft.com/project";

/// `LinkLag` units per working day (8 hours in tenths of a minute)
pub const LAG_UNITS_PER_DAY: i64 = 8 * 60 * 10;

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Default)]
struct RawTask {
    uid: i64,
    name: Option<String>,
    outline_level: u32,
    start: Option<String>,
    finish: Option<String>,
    milestone: bool,
    percent_complete: f64,
    fixed_cost: f64,
    links: Vec<RawLink>,
}

#[derive(Debug)]
struct RawLink {
    predecessor_uid: i64,
    link_type: i64,
    lag: i64,
}

impl Default for RawLink {
    fn default() -> Self {
        Self {
            predecessor_uid: 0,
            link_type: 1,
            lag: 0,
        }
    }
}

#[derive(Debug, Default)]
struct RawResource {
    uid: i64,
    name: String,
}

#[derive(Debug)]
struct RawAssignment {
    task_uid: i64,
    resource_uid: i64,
    units: f64,
}

impl Default for RawAssignment {
    fn default() -> Self {
        Self {
            task_uid: 0,
            resource_uid: 0,
            units: 1.0,
        }
    }
}

/// Collects raw element values while the reader walks the document
#[derive(Debug, Default)]
struct DocumentBuilder {
    name: String,
    tasks: Vec<RawTask>,
    resources: Vec<RawResource>,
    assignments: Vec<RawAssignment>,
    task: Option<RawTask>,
    link: Option<RawLink>,
    resource: Option<RawResource>,
    assignment: Option<RawAssignment>,
}

impl DocumentBuilder {
    fn start(&mut self, parent: Option<&str>, name: &str) {
        match (parent, name) {
            (Some("Tasks"), "Task") => self.task = Some(RawTask::default()),
            (Some("Task"), "PredecessorLink") => self.link = Some(RawLink::default()),
            (Some("Resources"), "Resource") => self.resource = Some(RawResource::default()),
            (Some("Assignments"), "Assignment") => {
                self.assignment = Some(RawAssignment::default())
            }
            _ => {}
        }
    }

    fn end(&mut self, parent: Option<&str>, name: &str, value: String) -> Result<(), ParseError> {
        match (parent, name) {
            (Some("Project"), "Name") => self.name = value,

            (Some("Tasks"), "Task") => {
                if let Some(task) = self.task.take() {
                    self.tasks.push(task);
                }
            }
            (Some("Task"), "PredecessorLink") => {
                if let (Some(task), Some(link)) = (self.task.as_mut(), self.link.take()) {
                    task.links.push(link);
                }
            }
            (Some("Task"), field) => {
                if let Some(task) = self.task.as_mut() {
                    match field {
                        "UID" => task.uid = parse_int(field, &value)?,
                        "Name" if !value.is_empty() => task.name = Some(value),
                        "OutlineLevel" => task.outline_level = parse_int(field, &value)? as u32,
                        "Start" => task.start = Some(value),
                        "Finish" => task.finish = Some(value),
                        "Milestone" => task.milestone = parse_flag(&value),
                        "PercentComplete" => task.percent_complete = parse_number(field, &value)?,
                        "FixedCost" => task.fixed_cost = parse_number(field, &value)?,
                        _ => {}
                    }
                }
            }
            (Some("PredecessorLink"), field) => {
                if let Some(link) = self.link.as_mut() {
                    match field {
                        "PredecessorUID" => link.predecessor_uid = parse_int(field, &value)?,
                        "Type" => link.link_type = parse_int(field, &value)?,
                        "LinkLag" => link.lag = parse_int(field, &value)?,
                        _ => {}
                    }
                }
            }

            (Some("Resources"), "Resource") => {
                if let Some(resource) = self.resource.take() {
                    self.resources.push(resource);
                }
            }
            (Some("Resource"), field) => {
                if let Some(resource) = self.resource.as_mut() {
                    match field {
                        "UID" => resource.uid = parse_int(field, &value)?,
                        "Name" => resource.name = value,
                        _ => {}
                    }
                }
            }

            (Some("Assignments"), "Assignment") => {
                if let Some(assignment) = self.assignment.take() {
                    self.assignments.push(assignment);
                }
            }
            (Some("Assignment"), field) => {
                if let Some(assignment) = self.assignment.as_mut() {
                    match field {
                        "TaskUID" => assignment.task_uid = parse_int(field, &value)?,
                        "ResourceUID" => assignment.resource_uid = parse_int(field, &value)?,
                        "Units" => assignment.units = parse_number(field, &value)?,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<TaskList, ParseError> {
        let raw_tasks: Vec<RawTask> = self.tasks.into_iter().filter(|t| t.uid != 0).collect();

        let positions: HashMap<i64, usize> = raw_tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.uid, i))
            .collect();

        let mut list = TaskList::new(self.name);
        for raw in &raw_tasks {
            let start = parse_date_time(raw.uid, "Start", raw.start.as_deref())?;
            let finish = parse_date_time(raw.uid, "Finish", raw.finish.as_deref())?;

            let mut task = TaskRecord::new(start, finish);
            task.name = raw.name.clone();
            task.indentation = raw.outline_level.saturating_sub(1);
            task.milestone = raw.milestone;
            task.completion = raw.percent_complete / 100.0;
            task.execution_cost = raw.fixed_cost;

            for link in &raw.links {
                let target = positions.get(&link.predecessor_uid).ok_or_else(|| {
                    ParseError::UnknownIdentifier(format!(
                        "predecessor UID {} on task UID {}",
                        link.predecessor_uid, raw.uid
                    ))
                })?;
                task.predecessors.push(
                    PredecessorLink::new(*target)
                        .dep_type(link_type(link.link_type)?)
                        .lag(link.lag / LAG_UNITS_PER_DAY),
                );
            }

            list.push(task);
        }

        let resources: HashMap<i64, &str> = self
            .resources
            .iter()
            .map(|r| (r.uid, r.name.as_str()))
            .collect();

        for assignment in &self.assignments {
            // Negative resource UIDs mark unassigned work
            if assignment.resource_uid < 0 {
                continue;
            }
            let position = positions.get(&assignment.task_uid).ok_or_else(|| {
                ParseError::UnknownIdentifier(format!("assignment task UID {}", assignment.task_uid))
            })?;
            let resource = resources.get(&assignment.resource_uid).ok_or_else(|| {
                ParseError::UnknownIdentifier(format!(
                    "assignment resource UID {}",
                    assignment.resource_uid
                ))
            })?;
            list.tasks[*position].assignments.push(AssignmentRef {
                resource: (*resource).to_string(),
                units: assignment.units,
            });
        }

        Ok(list)
    }
}

/// Parse a task-list XML document
pub fn parse_task_list(input: &str) -> Result<TaskList, ParseError> {
    let mut reader = Reader::from_str(input);
    reader.trim_text(true);

    let mut builder = DocumentBuilder::default();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| syntax_error(input, reader.buffer_position(), e.to_string()))?;

        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                builder.start(path.last().map(String::as_str), &name);
                path.push(name);
                text.clear();
            }
            Event::Text(t) => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| syntax_error(input, reader.buffer_position(), e.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(_) => {
                let Some(name) = path.pop() else {
                    return Err(syntax_error(
                        input,
                        reader.buffer_position(),
                        "unbalanced closing tag".into(),
                    ));
                };
                let value = std::mem::take(&mut text);
                builder.end(path.last().map(String::as_str), &name, value)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !path.is_empty() {
        return Err(syntax_error(
            input,
            input.len(),
            format!("unclosed element <{}>", path.join("/")),
        ));
    }

    builder.finish()
}

fn syntax_error(input: &str, offset: usize, message: String) -> ParseError {
    let mut end = offset.min(input.len());
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    let consumed = &input[..end];
    let line = consumed.matches('\n').count() + 1;
    let column = consumed.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    ParseError::Syntax {
        line,
        column,
        message,
    }
}

fn parse_int(field: &str, value: &str) -> Result<i64, ParseError> {
    value
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidValue(format!("{field}: '{value}'")))
}

fn parse_number(field: &str, value: &str) -> Result<f64, ParseError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ParseError::InvalidValue(format!("{field}: '{value}'")))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "1") || value.trim().eq_ignore_ascii_case("true")
}

fn parse_date_time(uid: i64, field: &str, value: Option<&str>) -> Result<NaiveDateTime, ParseError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ParseError::InvalidValue(format!("task UID {uid} has no {field}")))?;

    if let Ok(date_time) = NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT) {
        return Ok(date_time);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ParseError::InvalidValue(format!("task UID {uid} {field}: '{value}'")))
}

fn link_type(code: i64) -> Result<DependencyType, ParseError> {
    match code {
        0 => Ok(DependencyType::FinishToFinish),
        1 => Ok(DependencyType::FinishToStart),
        2 => Ok(DependencyType::StartToFinish),
        3 => Ok(DependencyType::StartToStart),
        other => Err(ParseError::InvalidValue(format!("PredecessorLink Type {other}"))),
    }
}

fn link_code(dep_type: DependencyType) -> i64 {
    match dep_type {
        DependencyType::FinishToFinish => 0,
        DependencyType::FinishToStart => 1,
        DependencyType::StartToFinish => 2,
        DependencyType::StartToStart => 3,
    }
}
