//! # projxlsx-core
//!
//! Core task-list model and engine traits for projxlsx.
//!
//! This crate provides:
//! - Domain types: `TaskList`, `TaskRecord`, `PredecessorLink`, `AssignmentRef`, `Calendar`
//! - The `ScheduleEngine` trait used by the spreadsheet codec for derived values
//! - Error types
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use projxlsx_core::{TaskList, TaskRecord};
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
//!
//! let mut list = TaskList::new("Website");
//! list.push(TaskRecord::new(day(1), day(5)).name("Design"));
//! list.push(
//!     TaskRecord::new(day(8), day(12))
//!         .name("Build")
//!         .depends_on(0)
//!         .assign("dev", 1.0),
//! );
//! assert_eq!(list.len(), 2);
//! ```

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Task List
// ============================================================================

/// An ordered list of tasks; list order is row order in the worksheet
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    /// Project name (carried by the task-list XML, not by the worksheet)
    pub name: String,
    /// Tasks in outline order
    pub tasks: Vec<TaskRecord>,
}

impl TaskList {
    /// Create an empty task list with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    /// Append a task, returning its position
    pub fn push(&mut self, task: TaskRecord) -> usize {
        self.tasks.push(task);
        self.tasks.len() - 1
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Get a task by its 0-based position
    pub fn get(&self, position: usize) -> Option<&TaskRecord> {
        self.tasks.get(position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TaskRecord> {
        self.tasks.iter()
    }
}

// ============================================================================
// Task
// ============================================================================

/// A single task row
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Outline depth (0 = top level)
    pub indentation: u32,
    /// Display name, if any
    pub name: Option<String>,
    /// Scheduled start
    pub start: NaiveDateTime,
    /// Scheduled finish
    pub finish: NaiveDateTime,
    /// Is this a milestone?
    pub milestone: bool,
    /// Completion fraction (0.0 - 1.0)
    pub completion: f64,
    /// Predecessors, as positions in the owning list
    pub predecessors: Vec<PredecessorLink>,
    /// Resource assignments
    pub assignments: Vec<AssignmentRef>,
    /// Fixed execution cost, excluding resource cost
    pub execution_cost: f64,
}

impl TaskRecord {
    /// Create an unnamed top-level task spanning `start..finish`
    pub fn new(start: NaiveDateTime, finish: NaiveDateTime) -> Self {
        Self {
            indentation: 0,
            name: None,
            start,
            finish,
            milestone: false,
            completion: 0.0,
            predecessors: Vec::new(),
            assignments: Vec::new(),
            execution_cost: 0.0,
        }
    }

    /// Set the task name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the outline depth
    pub fn indent(mut self, level: u32) -> Self {
        self.indentation = level;
        self
    }

    /// Mark as milestone (finish collapses onto start)
    pub fn milestone(mut self) -> Self {
        self.milestone = true;
        self.finish = self.start;
        self
    }

    /// Set the completion fraction
    pub fn complete(mut self, fraction: f64) -> Self {
        self.completion = fraction;
        self
    }

    /// Add a finish-to-start predecessor by list position
    pub fn depends_on(mut self, position: usize) -> Self {
        self.predecessors.push(PredecessorLink::new(position));
        self
    }

    /// Add a predecessor with full control over type and lag
    pub fn with_predecessor(mut self, link: PredecessorLink) -> Self {
        self.predecessors.push(link);
        self
    }

    /// Assign a resource with allocation units (1.0 = 100%)
    pub fn assign(mut self, resource: impl Into<String>, units: f64) -> Self {
        self.assignments.push(AssignmentRef {
            resource: resource.into(),
            units,
        });
        self
    }

    /// Set the fixed execution cost
    pub fn cost(mut self, cost: f64) -> Self {
        self.execution_cost = cost;
        self
    }

    /// Name as text, empty when unnamed
    pub fn name_str(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// Row-positional predecessor reference
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredecessorLink {
    /// 0-based position of the predecessor in the task list
    pub task: usize,
    /// Type of dependency
    pub dep_type: DependencyType,
    /// Lag in days (negative = lead)
    pub lag_days: i64,
}

impl PredecessorLink {
    pub fn new(task: usize) -> Self {
        Self {
            task,
            dep_type: DependencyType::FinishToStart,
            lag_days: 0,
        }
    }

    pub fn dep_type(mut self, dep_type: DependencyType) -> Self {
        self.dep_type = dep_type;
        self
    }

    pub fn lag(mut self, days: i64) -> Self {
        self.lag_days = days;
        self
    }
}

/// Types of task dependencies
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyType {
    /// Finish-to-Start: successor starts after predecessor finishes
    #[default]
    FinishToStart,
    /// Start-to-Start: successor starts when predecessor starts
    StartToStart,
    /// Finish-to-Finish: successor finishes when predecessor finishes
    FinishToFinish,
    /// Start-to-Finish: successor finishes when predecessor starts
    StartToFinish,
}

impl DependencyType {
    /// Short code (FS/SS/FF/SF)
    pub fn code(self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "FS",
            DependencyType::StartToStart => "SS",
            DependencyType::FinishToFinish => "FF",
            DependencyType::StartToFinish => "SF",
        }
    }

    /// Parse a short code, case-insensitive
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "FS" => Some(DependencyType::FinishToStart),
            "SS" => Some(DependencyType::StartToStart),
            "FF" => Some(DependencyType::FinishToFinish),
            "SF" => Some(DependencyType::StartToFinish),
            _ => None,
        }
    }
}

/// Reference to a resource with allocation units
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRef {
    /// Resource name
    pub resource: String,
    /// Allocation units (1.0 = 100%)
    pub units: f64,
}

// ============================================================================
// Calendar
// ============================================================================

/// Working time definitions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    /// Human-readable name
    pub name: String,
    /// Working hours per day
    pub working_hours: Vec<TimeRange>,
    /// Working days (0 = Sunday, 6 = Saturday)
    pub working_days: Vec<u8>,
    /// Holiday dates
    pub holidays: Vec<Holiday>,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            name: "Standard".into(),
            working_hours: vec![
                TimeRange { start: 8 * 60, end: 12 * 60 },
                TimeRange { start: 13 * 60, end: 17 * 60 },
            ],
            working_days: vec![1, 2, 3, 4, 5], // Mon-Fri
            holidays: Vec::new(),
        }
    }
}

impl Calendar {
    /// Calculate working hours per day
    pub fn hours_per_day(&self) -> f64 {
        self.working_hours.iter().map(|r| r.duration_hours()).sum()
    }

    /// Check if a date is a working day
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday().num_days_from_sunday() as u8;
        if !self.working_days.contains(&weekday) {
            return false;
        }
        if self.holidays.iter().any(|h| h.contains(date)) {
            return false;
        }
        true
    }

    /// Count working days in `first..=last` (0 when `last < first`)
    pub fn working_days_between(&self, first: NaiveDate, last: NaiveDate) -> u32 {
        first
            .iter_days()
            .take_while(|d| *d <= last)
            .filter(|d| self.is_working_day(*d))
            .count() as u32
    }

    /// Add a holiday range
    pub fn holiday(mut self, name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        self.holidays.push(Holiday {
            name: name.into(),
            start,
            end,
        });
        self
    }
}

/// Time range within a day (in minutes from midnight)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: u16, // Minutes from midnight
    pub end: u16,
}

impl TimeRange {
    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start) as f64 / 60.0
    }
}

/// Holiday definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Holiday {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Scheduling engine: computes derived task values and interprets
/// the display text written to and read back from the worksheet.
///
/// Positions are 0-based indices into the row-ordered task slice.
pub trait ScheduleEngine {
    /// Row label shown in the first column
    fn index_label(&self, tasks: &[TaskRecord], position: usize) -> String;

    /// Total work in hours
    fn effort_hours(&self, task: &TaskRecord) -> f64;

    /// Working duration in days
    fn duration_days(&self, task: &TaskRecord) -> f64;

    fn is_completed(&self, task: &TaskRecord) -> bool;

    fn completion_fraction(&self, task: &TaskRecord) -> f64;

    /// Display text for the task's predecessors, in terms of index labels
    fn predecessors_text(&self, tasks: &[TaskRecord], position: usize) -> String;

    fn assignments_text(&self, task: &TaskRecord) -> String;

    /// Total cost including resource cost
    fn cost(&self, task: &TaskRecord) -> f64;

    fn set_completion(&self, task: &mut TaskRecord, fraction: f64);

    /// Replace the task's assignments from display text
    fn set_assignments(&self, task: &mut TaskRecord, text: &str) -> Result<(), EngineError>;

    /// Interpret predecessor display text against the full row-ordered list
    fn resolve_predecessors(
        &self,
        position: usize,
        text: &str,
        tasks: &[TaskRecord],
    ) -> Result<Vec<PredecessorLink>, EngineError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Scheduling engine error
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("Invalid predecessor reference '{reference}' on task {task}")]
    InvalidPredecessorReference { task: usize, reference: String },

    #[error("Invalid assignment: {0}")]
    InvalidAssignment(String),
}

// ============================================================================
// Tests
// ============================================================================
