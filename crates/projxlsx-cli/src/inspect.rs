//! Plain-text task table

use projxlsx_core::{ScheduleEngine, TaskList};

/// Render one line per task, names indented by outline depth
pub fn render_table<E: ScheduleEngine + ?Sized>(list: &TaskList, engine: &E) -> String {
    let mut out = format!(
        "{:<4} {:<32} {:<10} {:<10} {:>6} {:>5} {:<14} {}\n",
        "ID", "Name", "Start", "Finish", "Days", "Done", "Predecessors", "Resources"
    );

    for (position, task) in list.tasks.iter().enumerate() {
        let name = format!(
            "{}{}{}",
            "  ".repeat(task.indentation as usize),
            task.name_str(),
            if task.milestone { " ◆" } else { "" }
        );
        out.push_str(&format!(
            "{:<4} {:<32} {:<10} {:<10} {:>6} {:>4}% {:<14} {}\n",
            engine.index_label(&list.tasks, position),
            name,
            task.start.format("%Y-%m-%d"),
            task.finish.format("%Y-%m-%d"),
            engine.duration_days(task),
            (engine.completion_fraction(task) * 100.0).round(),
            engine.predecessors_text(&list.tasks, position),
            engine.assignments_text(task),
        ));
    }

    out.push_str(&format!("{} task(s)\n", list.len()));
    out
}
