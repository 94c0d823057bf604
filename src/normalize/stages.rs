//! Process stages
//!
//! The process sheet is a single loose column of text: headers like
//! `Stage 2 - Inspection` followed by step lines. Each row's first non-empty
//! cell is tokenized into a [`StageLine`], then a small set of rules folds the
//! lines into stages.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::sheets::Row;

lazy_static! {
    static ref STAGE_HEADER: Regex =
        Regex::new(r"(?i)^\s*stage\s*(\d+)\s*[-–—:]\s*(.+?)\s*$").unwrap();
}

/// Title given to the stage opened by text that precedes any header.
pub const IMPLICIT_STAGE_TITLE: &str = "Getting Started";

/// Icon for stage numbers outside the table.
pub const FALLBACK_ICON: &str = "circle";

const STAGE_ICONS: [(u32, &str); 7] = [
    (1, "phone"),
    (2, "clipboard-check"),
    (3, "file-text"),
    (4, "users"),
    (5, "hammer"),
    (6, "dollar-sign"),
    (7, "check-circle"),
];

pub fn stage_icon(number: u32) -> &'static str {
    STAGE_ICONS
        .iter()
        .find(|(n, _)| *n == number)
        .map(|(_, icon)| *icon)
        .unwrap_or(FALLBACK_ICON)
}

/// One classified line of the process sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageLine {
    Header { number: u32, title: String },
    Text(String),
}

/// Classify one line of text.
pub fn classify_line(text: &str) -> StageLine {
    if let Some(caps) = STAGE_HEADER.captures(text) {
        if let Ok(number) = caps[1].parse::<u32>() {
            return StageLine::Header {
                number,
                title: caps[2].to_string(),
            };
        }
    }
    StageLine::Text(text.trim().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub number: u32,
    pub title: String,
    pub icon: String,
    pub steps: Vec<String>,

    /// Opened by leading text rather than a header line
    pub implicit: bool,
}

impl Stage {
    fn new(number: u32, title: String, implicit: bool) -> Self {
        Stage {
            number,
            icon: stage_icon(number).to_string(),
            title,
            steps: Vec::new(),
            implicit,
        }
    }
}

/// Stages in sheet order, plus text that fit no rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageOutline {
    pub stages: Vec<Stage>,
    pub unparsed: Vec<String>,
}

/// Fold process rows into stages.
///
/// Rules, in order, for each line:
/// 1. A header opens a new stage. If the only open stage is the implicit
///    Stage 1 and the header is also Stage 1, the header names it instead.
/// 2. Text while a stage is open becomes a step of that stage.
/// 3. Text before any stage opens the implicit Stage 1, unless it mentions
///    "stage", in which case it is kept in `unparsed`.
///
/// The first row's header labels are read as a line only when they form a
/// stage header; otherwise they are column names.
pub fn normalize_stages(rows: &[Row]) -> StageOutline {
    let mut outline = StageOutline::default();

    let header_line = rows
        .first()
        .and_then(|r| r.headers().map(str::trim).find(|h| !h.is_empty()))
        .map(classify_line)
        .filter(|line| matches!(line, StageLine::Header { .. }));

    let lines = header_line
        .into_iter()
        .chain(rows.iter().filter_map(|r| r.first_non_empty()).map(classify_line));

    for line in lines {
        match line {
            StageLine::Header { number, title } => {
                let adopt = matches!(
                    outline.stages.as_slice(),
                    [only] if only.implicit && only.number == 1 && number == 1
                );
                if adopt {
                    let stage = &mut outline.stages[0];
                    stage.title = title;
                    stage.implicit = false;
                } else {
                    outline.stages.push(Stage::new(number, title, false));
                }
            }
            StageLine::Text(text) => {
                if let Some(stage) = outline.stages.last_mut() {
                    stage.steps.push(text);
                } else if text.to_lowercase().contains("stage") {
                    debug!("Unparsed process line before any stage: {:?}", text);
                    outline.unparsed.push(text);
                } else {
                    let mut stage = Stage::new(1, IMPLICIT_STAGE_TITLE.to_string(), true);
                    stage.steps.push(text);
                    outline.stages.push(stage);
                }
            }
        }
    }

    outline
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(lines: &[&str]) -> Vec<Row> {
        lines.iter().map(|l| Row::from_pairs([("Process", *l)])).collect()
    }

    #[test]
    fn headers_segment_steps() {
        let outline = normalize_stages(&column(&[
            "Stage 1 - Setup",
            "do X",
            "do Y",
            "Stage 2 - Review",
            "do Z",
        ]));
        assert_eq!(outline.stages.len(), 2);
        assert_eq!(outline.stages[0].number, 1);
        assert_eq!(outline.stages[0].title, "Setup");
        assert_eq!(outline.stages[0].steps, vec!["do X", "do Y"]);
        assert_eq!(outline.stages[1].steps, vec!["do Z"]);
        assert!(outline.unparsed.is_empty());
    }

    #[test]
    fn first_non_empty_cell_is_used() {
        let rows = vec![
            Row::from_pairs([("A", ""), ("B", "Stage 3: Estimate")]),
            Row::from_pairs([("A", "  "), ("B", " Measure roof ")]),
        ];
        let outline = normalize_stages(&rows);
        assert_eq!(outline.stages[0].number, 3);
        assert_eq!(outline.stages[0].icon, "file-text");
        assert_eq!(outline.stages[0].steps, vec!["Measure roof"]);
    }

    #[test]
    fn header_label_can_be_first_stage() {
        let rows = vec![
            Row::from_pairs([("Stage 1 - Intake", "")]),
            Row::from_pairs([("Stage 1 - Intake", "Call homeowner")]),
        ];
        let outline = normalize_stages(&rows);
        assert_eq!(outline.stages.len(), 1);
        assert_eq!(outline.stages[0].title, "Intake");
        assert_eq!(outline.stages[0].steps, vec!["Call homeowner"]);
    }

    #[test]
    fn leading_text_opens_implicit_stage_one() {
        let outline = normalize_stages(&column(&[
            "Gather documents",
            "Stage 1 - Intake",
            "Sign contract",
        ]));
        assert_eq!(outline.stages.len(), 1);
        assert_eq!(outline.stages[0].title, "Intake");
        assert!(!outline.stages[0].implicit);
        assert_eq!(outline.stages[0].steps, vec!["Gather documents", "Sign contract"]);
    }

    #[test]
    fn leading_stage_text_is_unparsed() {
        let outline = normalize_stages(&column(&["Stage overview", "Stage 2 - Inspect", "look"]));
        assert_eq!(outline.unparsed, vec!["Stage overview"]);
        assert_eq!(outline.stages.len(), 1);
        assert_eq!(outline.stages[0].number, 2);
    }

    #[test]
    fn unknown_numbers_get_fallback_icon() {
        let outline = normalize_stages(&column(&["STAGE 12 — Archive"]));
        assert_eq!(outline.stages[0].icon, FALLBACK_ICON);
        assert_eq!(outline.stages[0].title, "Archive");
    }

    #[test]
    fn empty_input() {
        assert_eq!(normalize_stages(&[]), StageOutline::default());
    }

    #[test]
    fn classification() {
        assert_eq!(
            classify_line("stage 4 -   Negotiate "),
            StageLine::Header {
                number: 4,
                title: "Negotiate".to_string()
            }
        );
        assert_eq!(classify_line("Stage 4"), StageLine::Text("Stage 4".to_string()));
    }
}
