use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::domain::{DependencyTable, Document, Field, Section, SectionName, StatusView};

/// Sections that must be complete before planning is done.
const PLANNING: [SectionName; 4] = [
    SectionName::ProjectInfo,
    SectionName::ProductContext,
    SectionName::SystemPatterns,
    SectionName::Technologies,
];

/// Sections that must be complete before acting.
const ACTING: [SectionName; 3] = [
    SectionName::ProjectInfo,
    SectionName::ProductContext,
    SectionName::Technologies,
];

/// Sections covered by a review, in review order.
const REVIEWED: [SectionName; 6] = [
    SectionName::ProjectInfo,
    SectionName::ProductContext,
    SectionName::SystemPatterns,
    SectionName::Technologies,
    SectionName::Tasks,
    SectionName::Standards,
];

/// The working mode a report was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    /// Filling in the project context.
    Plan,
    /// Working on tasks.
    Act,
}

/// What still needs planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanReport {
    /// Always [`Mode::Plan`].
    pub mode: Mode,
    /// Planning sections that are not complete, in planning order.
    pub incomplete_sections: Vec<SectionName>,
    /// Sections that can be worked on now.
    pub ready_sections: Vec<SectionName>,
    /// Whether every planning section is complete.
    pub all_complete: bool,
}

impl PlanReport {
    /// Builds the planning report for `document`.
    #[must_use]
    pub fn new(document: &Document, dependencies: &DependencyTable) -> Self {
        let incomplete_sections: Vec<_> = PLANNING
            .into_iter()
            .filter(|&name| !is_complete(document, name))
            .collect();

        Self {
            mode: Mode::Plan,
            all_complete: incomplete_sections.is_empty(),
            incomplete_sections,
            ready_sections: dependencies.ready_sections(document),
        }
    }
}

/// Whether the project is ready for work, and where work stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActReport {
    /// Always [`Mode::Act`].
    pub mode: Mode,
    /// Whether the brief, product context and technologies are complete.
    pub all_ready: bool,
    /// The current task's active context, or empty.
    pub active_context: String,
    /// Progress notes from the task history, oldest first.
    pub progress: Vec<String>,
}

impl ActReport {
    /// Builds the acting report for `document`.
    #[must_use]
    pub fn new(document: &Document) -> Self {
        Self {
            mode: Mode::Act,
            all_ready: ACTING.into_iter().all(|name| is_complete(document, name)),
            active_context: document
                .current_task()
                .and_then(|current| current.active_context.as_ref())
                .map(Field::to_text)
                .unwrap_or_default(),
            progress: document
                .task_history()
                .filter_map(|record| record.progress.as_ref().map(Field::to_text))
                .collect(),
        }
    }
}

/// The action a review report asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    /// Review and refresh every section.
    #[serde(rename = "review_all")]
    ReviewAll,
}

/// A snapshot of every reviewed section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewReport {
    /// Always [`Action::ReviewAll`].
    pub action: Action,
    /// The sections to review, in order.
    pub sections: Vec<SectionName>,
    /// The state of each reviewed section.
    ///
    /// Tracked sections show their status text, or `Unknown`. `tasks` shows
    /// `Active`, `None` or `Unknown`.
    pub current_state: BTreeMap<SectionName, String>,
}

impl ReviewReport {
    /// Builds the review report for `document`.
    #[must_use]
    pub fn new(document: &Document) -> Self {
        let current_state = REVIEWED
            .into_iter()
            .map(|name| {
                let state = match name {
                    SectionName::Tasks => task_state(document).to_owned(),
                    _ => document
                        .status_view(name)
                        .status()
                        .map_or_else(|| "Unknown".to_owned(), ToString::to_string),
                };
                (name, state)
            })
            .collect();

        Self {
            action: Action::ReviewAll,
            sections: REVIEWED.to_vec(),
            current_state,
        }
    }
}

fn is_complete(document: &Document, name: SectionName) -> bool {
    matches!(document.status_view(name), StatusView::Status(status) if status.is_complete())
}

fn task_state(document: &Document) -> &'static str {
    match &document.tasks {
        None | Some(Section::Malformed(_)) => "Unknown",
        Some(Section::WellFormed(tasks)) => {
            let active = tasks
                .current
                .as_ref()
                .and_then(|current| serde_json::to_value(current).ok())
                .is_some_and(|value| !is_empty(&value));
            if active { "Active" } else { "None" }
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
