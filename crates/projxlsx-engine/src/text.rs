//! Display text for predecessors and assignments
//!
//! Both columns are free text in the worksheet, so the engine owns the grammar:
//!
//! ```text
//! predecessors := item ("," item)*
//! item         := label [type] [("+" | "-") digits "d"]
//! type         := "FS" | "SS" | "FF" | "SF"
//!
//! assignments  := entry ("," entry)*
//! entry        := (name | '"' quoted '"') ["[" number "%]"]
//! ```
//!
//! `;` is accepted as a separator on input. Finish-to-start is the default type
//! and is only written out when a lag is present. Resource names holding a
//! separator, a bracket, a quote or surrounding spaces are written quoted,
//! with `""` standing for a literal quote.

use projxlsx_core::{AssignmentRef, DependencyType, EngineError, PredecessorLink};

/// One parsed predecessor item, before its label is mapped to a position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredecessorItem {
    pub label: String,
    pub dep_type: DependencyType,
    pub lag_days: i64,
}

/// Format a predecessor item given the predecessor's label
pub fn format_predecessor(label: &str, link: &PredecessorLink) -> String {
    let mut out = label.to_string();
    if link.lag_days != 0 {
        out.push_str(link.dep_type.code());
        out.push_str(&format!("{:+}d", link.lag_days));
    } else if link.dep_type != DependencyType::FinishToStart {
        out.push_str(link.dep_type.code());
    }
    out
}

/// Split predecessor text into items; `task` is only used for error reporting
pub fn parse_predecessors(task: usize, text: &str) -> Result<Vec<PredecessorItem>, EngineError> {
    split_items(text)
        .map(|item| parse_predecessor_item(task, item))
        .collect()
}

fn parse_predecessor_item(task: usize, item: &str) -> Result<PredecessorItem, EngineError> {
    let invalid = || EngineError::InvalidPredecessorReference {
        task,
        reference: item.to_string(),
    };

    let label_end = item
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(item.len());
    let (label, mut rest) = item.split_at(label_end);
    if label.is_empty() {
        return Err(invalid());
    }

    let mut dep_type = DependencyType::FinishToStart;
    if rest.len() >= 2 && rest.is_char_boundary(2) {
        if let Some(parsed) = DependencyType::from_code(&rest[..2]) {
            dep_type = parsed;
            rest = &rest[2..];
        }
    }

    let mut lag_days = 0;
    if !rest.is_empty() {
        let digits = rest
            .strip_suffix(['d', 'D'])
            .ok_or_else(invalid)?
            .trim();
        if !digits.starts_with(['+', '-']) {
            return Err(invalid());
        }
        lag_days = digits.parse::<i64>().map_err(|_| invalid())?;
    }

    Ok(PredecessorItem {
        label: label.to_string(),
        dep_type,
        lag_days,
    })
}

/// Format one assignment entry
pub fn format_assignment(assignment: &AssignmentRef) -> String {
    let resource = format_resource(&assignment.resource);
    if assignment.units == 1.0 {
        resource
    } else {
        format!("{} [{}%]", resource, assignment.units * 100.0)
    }
}

fn format_resource(name: &str) -> String {
    if name.contains([',', ';', '[', ']', '"']) || name.trim() != name {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}

/// Parse assignment text into resource references
pub fn parse_assignments(text: &str) -> Result<Vec<AssignmentRef>, EngineError> {
    split_entries(text)
        .into_iter()
        .map(parse_assignment_entry)
        .collect()
}

fn parse_assignment_entry(entry: &str) -> Result<AssignmentRef, EngineError> {
    let invalid = || EngineError::InvalidAssignment(entry.to_string());

    let (resource, units) = if entry.starts_with('"') {
        let (name, rest) = parse_quoted(entry).ok_or_else(invalid)?;
        (name, parse_units(rest.trim()).ok_or_else(invalid)?)
    } else {
        match entry.find('[') {
            Some(open) => (
                entry[..open].trim().to_string(),
                parse_units(&entry[open..]).ok_or_else(invalid)?,
            ),
            None => (entry.to_string(), 1.0),
        }
    };

    if resource.is_empty() {
        return Err(invalid());
    }
    Ok(AssignmentRef { resource, units })
}

/// `"[" number "%]"` as units, or full units when `rest` is empty
fn parse_units(rest: &str) -> Option<f64> {
    if rest.is_empty() {
        return Some(1.0);
    }
    let percent: f64 = rest
        .strip_prefix('[')?
        .strip_suffix(']')?
        .trim()
        .strip_suffix('%')?
        .trim()
        .parse()
        .ok()?;
    (percent.is_finite() && percent >= 0.0).then_some(percent / 100.0)
}

/// Unquote a leading quoted name, returning it with the text after the closing quote
fn parse_quoted(entry: &str) -> Option<(String, &str)> {
    let body = entry.strip_prefix('"')?;
    let mut name = String::new();
    let mut chars = body.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '"' {
            name.push(c);
        } else if chars.next_if(|&(_, next)| next == '"').is_some() {
            name.push('"');
        } else {
            return Some((name, &body[i + 1..]));
        }
    }
    None
}

/// Split on separators outside quotes
fn split_entries(text: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' | ';' if !quoted => {
                entries.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(&text[start..]);
    entries
        .into_iter()
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn split_items(text: &str) -> impl Iterator<Item = &str> {
    text.split([',', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
}
