//! # projxlsx-engine
//!
//! Calendar-based implementation of [`ScheduleEngine`].
//!
//! This crate provides:
//! - Index labels (1-based row order)
//! - Working-day durations, effort and cost from a [`Calendar`] and resource rates
//! - The predecessor and assignment display-text grammar (see [`text`])
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use projxlsx_core::{ScheduleEngine, TaskRecord};
//! use projxlsx_engine::CalendarEngine;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let engine = CalendarEngine::new().rate("dev", 50.0);
//!
//! let task = TaskRecord::new(day(1), day(5)).assign("dev", 1.0);
//! assert_eq!(engine.duration_days(&task), 5.0);
//! assert_eq!(engine.effort_hours(&task), 40.0);
//! assert_eq!(engine.cost(&task), 2000.0);
//! ```

pub mod text;

use std::collections::HashMap;

use projxlsx_core::{Calendar, EngineError, PredecessorLink, ScheduleEngine, TaskRecord};

/// Scheduling engine driven by a working calendar
#[derive(Clone, Debug)]
pub struct CalendarEngine {
    /// Working days and holidays
    pub calendar: Calendar,
    /// Working hours per day
    pub hours_per_day: f64,
    /// Hourly rate per resource name
    pub rates: HashMap<String, f64>,
}

impl Default for CalendarEngine {
    fn default() -> Self {
        let calendar = Calendar::default();
        Self {
            hours_per_day: calendar.hours_per_day(),
            calendar,
            rates: HashMap::new(),
        }
    }
}

impl CalendarEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom calendar
    pub fn calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// Set working hours per day
    pub fn hours_per_day(mut self, hours: f64) -> Self {
        self.hours_per_day = hours;
        self
    }

    /// Set the hourly rate for a resource
    pub fn rate(mut self, resource: impl Into<String>, rate: f64) -> Self {
        self.rates.insert(resource.into(), rate);
        self
    }

    fn working_days(&self, task: &TaskRecord) -> f64 {
        if task.milestone {
            return 0.0;
        }
        self.calendar
            .working_days_between(task.start.date(), task.finish.date()) as f64
    }

    fn total_units(task: &TaskRecord) -> f64 {
        if task.assignments.is_empty() {
            1.0
        } else {
            task.assignments.iter().map(|a| a.units).sum()
        }
    }
}

impl ScheduleEngine for CalendarEngine {
    fn index_label(&self, _tasks: &[TaskRecord], position: usize) -> String {
        (position + 1).to_string()
    }

    fn effort_hours(&self, task: &TaskRecord) -> f64 {
        self.working_days(task) * self.hours_per_day * Self::total_units(task)
    }

    fn duration_days(&self, task: &TaskRecord) -> f64 {
        self.working_days(task)
    }

    fn is_completed(&self, task: &TaskRecord) -> bool {
        task.completion >= 1.0
    }

    fn completion_fraction(&self, task: &TaskRecord) -> f64 {
        task.completion.clamp(0.0, 1.0)
    }

    fn predecessors_text(&self, tasks: &[TaskRecord], position: usize) -> String {
        let Some(task) = tasks.get(position) else {
            return String::new();
        };
        task.predecessors
            .iter()
            .map(|link| text::format_predecessor(&self.index_label(tasks, link.task), link))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn assignments_text(&self, task: &TaskRecord) -> String {
        task.assignments
            .iter()
            .map(text::format_assignment)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn cost(&self, task: &TaskRecord) -> f64 {
        let hours = self.working_days(task) * self.hours_per_day;
        let resource_cost: f64 = task
            .assignments
            .iter()
            .map(|a| self.rates.get(&a.resource).copied().unwrap_or(0.0) * hours * a.units)
            .sum();
        task.execution_cost + resource_cost
    }

    fn set_completion(&self, task: &mut TaskRecord, fraction: f64) {
        task.completion = fraction.clamp(0.0, 1.0);
    }

    fn set_assignments(&self, task: &mut TaskRecord, text: &str) -> Result<(), EngineError> {
        task.assignments = text::parse_assignments(text)?;
        Ok(())
    }

    fn resolve_predecessors(
        &self,
        position: usize,
        text: &str,
        tasks: &[TaskRecord],
    ) -> Result<Vec<PredecessorLink>, EngineError> {
        let labels: HashMap<String, usize> = (0..tasks.len())
            .map(|i| (self.index_label(tasks, i), i))
            .collect();

        text::parse_predecessors(position, text)?
            .into_iter()
            .map(|item| match labels.get(&item.label) {
                Some(&target) if target != position => Ok(PredecessorLink {
                    task: target,
                    dep_type: item.dep_type,
                    lag_days: item.lag_days,
                }),
                _ => Err(EngineError::InvalidPredecessorReference {
                    task: position,
                    reference: item.label,
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;
    use projxlsx_core::DependencyType;

    fn at(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample_tasks() -> Vec<TaskRecord> {
        vec![
            TaskRecord::new(at(1, 1), at(1, 5)).name("Design"),
            TaskRecord::new(at(1, 8), at(1, 12))
                .name("Build")
                .depends_on(0)
                .assign("dev", 1.0)
                .assign("qa", 0.5),
            TaskRecord::new(at(1, 15), at(1, 15))
                .name("Ship")
                .milestone()
                .with_predecessor(PredecessorLink::new(1).dep_type(DependencyType::FinishToFinish).lag(2)),
        ]
    }

    #[test]
    fn index_labels_are_one_based() {
        let engine = CalendarEngine::new();
        let tasks = sample_tasks();
        assert_eq!(engine.index_label(&tasks, 0), "1");
        assert_eq!(engine.index_label(&tasks, 2), "3");
    }

    #[test]
    fn durations_follow_calendar() {
        let engine = CalendarEngine::new();
        let tasks = sample_tasks();
        assert_eq!(engine.duration_days(&tasks[0]), 5.0);
        assert_eq!(engine.duration_days(&tasks[2]), 0.0);

        // Friday to Monday spans two working days
        let weekend = TaskRecord::new(at(1, 5), at(1, 8));
        assert_eq!(engine.duration_days(&weekend), 2.0);
    }

    #[test]
    fn effort_scales_with_units() {
        let engine = CalendarEngine::new();
        let tasks = sample_tasks();
        assert_eq!(engine.effort_hours(&tasks[0]), 40.0);
        assert_eq!(engine.effort_hours(&tasks[1]), 60.0);

        let short_days = CalendarEngine::new().hours_per_day(6.0);
        assert_eq!(short_days.effort_hours(&tasks[0]), 30.0);
    }

    #[test]
    fn cost_adds_resource_rates() {
        let engine = CalendarEngine::new().rate("dev", 10.0).rate("qa", 20.0);
        let task = sample_tasks()[1].clone().cost(100.0);
        // 5 days * 8h: dev 40h * 10, qa 20h * 20
        assert_eq!(engine.cost(&task), 100.0 + 400.0 + 400.0);
        assert_eq!(CalendarEngine::new().cost(&task), 100.0);
    }

    #[test]
    fn completion_is_clamped() {
        let engine = CalendarEngine::new();
        let mut task = sample_tasks()[0].clone();
        engine.set_completion(&mut task, 1.5);
        assert_eq!(task.completion, 1.0);
        assert!(engine.is_completed(&task));

        engine.set_completion(&mut task, 0.4);
        assert_eq!(engine.completion_fraction(&task), 0.4);
        assert!(!engine.is_completed(&task));
    }

    #[test]
    fn display_text() {
        let engine = CalendarEngine::new();
        let tasks = sample_tasks();
        assert_eq!(engine.predecessors_text(&tasks, 0), "");
        assert_eq!(engine.predecessors_text(&tasks, 1), "1");
        assert_eq!(engine.predecessors_text(&tasks, 2), "2FF+2d");
        assert_eq!(engine.assignments_text(&tasks[1]), "dev, qa [50%]");
    }

    #[test]
    fn resolve_round_trips_display_text() {
        let engine = CalendarEngine::new();
        let tasks = sample_tasks();
        for position in 0..tasks.len() {
            let text = engine.predecessors_text(&tasks, position);
            let links = engine.resolve_predecessors(position, &text, &tasks).unwrap();
            assert_eq!(links, tasks[position].predecessors);
        }
    }

    #[test]
    fn resolve_forward_reference() {
        let engine = CalendarEngine::new();
        let tasks = sample_tasks();
        let links = engine.resolve_predecessors(0, "3", &tasks).unwrap();
        assert_eq!(links, vec![PredecessorLink::new(2)]);
    }

    #[test]
    fn resolve_rejects_unknown_and_self_references() {
        let engine = CalendarEngine::new();
        let tasks = sample_tasks();
        assert_eq!(
            engine.resolve_predecessors(0, "9", &tasks),
            Err(EngineError::InvalidPredecessorReference {
                task: 0,
                reference: "9".into()
            })
        );
        assert!(engine.resolve_predecessors(1, "2", &tasks).is_err());
    }

    #[test]
    fn set_assignments_replaces_existing() {
        let engine = CalendarEngine::new();
        let mut task = sample_tasks()[1].clone();
        engine.set_assignments(&mut task, "ops [25%]").unwrap();
        assert_eq!(task.assignments.len(), 1);
        assert_eq!(task.assignments[0].units, 0.25);

        engine.set_assignments(&mut task, "").unwrap();
        assert!(task.assignments.is_empty());
    }
}
