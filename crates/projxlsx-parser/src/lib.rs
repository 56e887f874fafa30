//! # projxlsx-parser
//!
//! Reader and writer for the task-list XML dialect (a subset of the
//! Microsoft Project XML interchange format).
//!
//! This crate provides:
//! - `Project/Tasks/Task` with outline level, dates, milestone flag,
//!   percent complete, fixed cost and predecessor links
//! - `Resources/Resource` and `Assignments/Assignment`
//! - Serialization of the same subset
//!
//! ## Example
//!
//! ```rust
//! use projxlsx_parser::{parse_task_list, write_task_list};
//!
//! let input = r#"
//! <Project xmlns="http://schemas.microsoft.com/project">
//!   <Name>Demo</Name>
//!   <Tasks>
//!     <Task>
//!       <UID>1</UID>
//!       <Name>Design</Name>
//!       <OutlineLevel>1</OutlineLevel>
//!       <Start>2024-01-01T08:00:00</Start>
//!       <Finish>2024-01-05T17:00:00</Finish>
//!     </Task>
//!   </Tasks>
//! </Project>
//! "#;
//!
//! let list = parse_task_list(input).unwrap();
//! assert_eq!(list.name, "Demo");
//! assert_eq!(list.tasks[0].name.as_deref(), Some("Design"));
//!
//! let xml = write_task_list(&list).unwrap();
//! assert!(xml.contains("<Name>Design</Name>"));
//! ```

pub mod mspdi;

use thiserror::Error;

pub use mspdi::{parse_task_list, write_task_list};

/// Parsing error
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("XML write error: {0}")]
    Write(#[from] quick_xml::Error),
}

/// Parse a task-list XML file from a path
pub fn parse_file(path: &std::path::Path) -> Result<projxlsx_core::TaskList, ParseError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ParseError::InvalidValue(e.to_string()))?;
    parse_task_list(&content)
}
