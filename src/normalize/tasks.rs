//! To-do items and adjuster meetings
//!
//! The to-do sheet has no fixed layout, so every cell of a row is scanned.
//! A row becomes a task when any cell mentions "to-do"/"todo", and a meeting
//! when any cell mentions "meeting"/"adjuster". One row can be both.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::sheets::Row;

lazy_static! {
    static ref TODO_LABEL: Regex = Regex::new(r"(?i)^\s*to-?do\b\s*[:\-]?\s*").unwrap();
    static ref TASK_PATTERN: Regex = Regex::new(r"(?i)^(.+?)\s+for\s+(.+?)\s+at\s+(.+)$").unwrap();
    static ref MEETING_PATTERN: Regex = Regex::new(r"(?i)meeting\s+with\s+(.+?)\s+on\s+(.+)$").unwrap();
}

/// Placeholder for parts a cell did not spell out.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: String,
    pub action: String,
    pub customer: String,
    pub address: String,

    /// Cell text the item was read from
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjusterMeeting {
    pub id: String,
    pub description: String,
    pub customer: String,
    pub date: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskBoard {
    pub tasks: Vec<TodoItem>,
    pub meetings: Vec<AdjusterMeeting>,
}

fn is_task_cell(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.contains("to-do") || lowered.contains("todo")
}

fn is_meeting_cell(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.contains("meeting") || lowered.contains("adjuster")
}

/// Strip a leading `To-Do:` label and surrounding whitespace.
pub fn clean_task_text(text: &str) -> String {
    TODO_LABEL.replace(text.trim(), "").trim().to_string()
}

/// Read one task cell into a [`TodoItem`].
pub fn parse_task(id: String, text: &str) -> TodoItem {
    let cleaned = clean_task_text(text);
    match TASK_PATTERN.captures(&cleaned) {
        Some(caps) => TodoItem {
            id,
            action: caps[1].trim().to_string(),
            customer: caps[2].trim().to_string(),
            address: caps[3].trim().to_string(),
            source: text.to_string(),
        },
        None => TodoItem {
            id,
            action: cleaned,
            customer: UNKNOWN.to_string(),
            address: UNKNOWN.to_string(),
            source: text.to_string(),
        },
    }
}

/// Read one meeting cell into an [`AdjusterMeeting`].
pub fn parse_meeting(id: String, text: &str) -> AdjusterMeeting {
    let cleaned = clean_task_text(text);
    match MEETING_PATTERN.captures(&cleaned) {
        Some(caps) => AdjusterMeeting {
            id,
            description: cleaned.clone(),
            customer: caps[1].trim().to_string(),
            date: caps[2].trim().to_string(),
            source: text.to_string(),
        },
        None => AdjusterMeeting {
            id,
            description: cleaned,
            customer: UNKNOWN.to_string(),
            date: UNKNOWN.to_string(),
            source: text.to_string(),
        },
    }
}

/// Scan rows for tasks and meetings.
///
/// The first matching cell of a row is used for each kind. Ids are
/// `todo-<n>` and `meeting-<n>`, numbered from 1 in sheet order.
pub fn normalize_tasks(rows: &[Row]) -> TaskBoard {
    let mut board = TaskBoard::default();

    for (index, row) in rows.iter().enumerate() {
        let task_cell = row.values().find(|v| is_task_cell(v));
        let meeting_cell = row.values().find(|v| is_meeting_cell(v));

        if let Some(text) = task_cell {
            let id = format!("todo-{}", board.tasks.len() + 1);
            board.tasks.push(parse_task(id, text));
        }
        if let Some(text) = meeting_cell {
            let id = format!("meeting-{}", board.meetings.len() + 1);
            board.meetings.push(parse_meeting(id, text));
        }
        if task_cell.is_none() && meeting_cell.is_none() {
            debug!("Row {} is neither a to-do nor a meeting", index + 1);
        }
    }

    board
}
