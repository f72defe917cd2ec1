//! The project-state document and its typed section payloads.
//!
//! Every section is optional and every field within a section is optional, so
//! that a partial or hand-edited document still loads. Keys that are not part
//! of the known shape are kept in flattened `extra` maps and written back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{
    Status,
    section::{Field, Section, SectionName, StatusView, Tracked, present},
};

/// The schema version recorded in new documents.
pub const VERSION: &str = "1.0.0";

/// The description recorded for a task completion when none is given.
pub const DEFAULT_TASK_DESCRIPTION: &str = "Task completed";

/// The status recorded on task history entries.
pub const TASK_COMPLETED: &str = "Completed";

/// The change history: an append-only sequence of change records.
pub type ChangeHistory = Vec<Section<Change>>;

/// The task history: an append-only sequence of completed task records.
pub type TaskHistory = Vec<Section<TaskRecord>>;

/// The root of the persisted project state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Timestamps and schema version.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Section<Metadata>>,

    /// The project brief.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub project_info: Option<Section<ProjectInfo>>,

    /// Why the project exists.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub product_context: Option<Section<TextSection>>,

    /// Architecture and design patterns.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub system_patterns: Option<Section<TextSection>>,

    /// The technical context.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Section<ListSection>>,

    /// The current task and task history.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Section<Tasks>>,

    /// Engineering standards.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub standards: Option<Section<ListSection>>,

    /// The change log.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub change_history: Option<Section<ChangeHistory>>,

    /// Top-level keys outside the known set.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Document bookkeeping.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// When the document was first created.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub created: Option<Field<DateTime<Utc>>>,
    /// When the document was last persisted.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Field<DateTime<Utc>>>,
    /// The schema version. Recorded, never inspected.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub version: Option<Field<String>>,
    /// Not present by default.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// Fields outside the known set.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    /// Fresh metadata for a document created at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created: Some(now.into()),
            last_updated: Some(now.into()),
            version: Some(VERSION.to_owned().into()),
            ..Self::default()
        }
    }
}

/// The project brief.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Project name.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name: Option<Field<String>>,
    /// One-line description.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Field<String>>,
    /// Markdown body.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub content: Option<Field<String>>,
    /// Completion status.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// Fields outside the known set.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A free-form markdown section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextSection {
    /// Markdown body.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub content: Option<Field<String>>,
    /// Completion status.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// Fields outside the known set.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A markdown section with an accompanying list of structured items.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListSection {
    /// Markdown body.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub content: Option<Field<String>>,
    /// Structured entries, in order.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub items: Option<Field<Vec<Map<String, Value>>>>,
    /// Completion status.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// Fields outside the known set.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The task section.
///
/// Has no `status` of its own by default, so it never takes part in readiness
/// unless a status is added by hand.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tasks {
    /// The task being worked on.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub current: Option<Section<CurrentTask>>,
    /// Completed tasks, oldest first.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub history: Option<Section<TaskHistory>>,
    /// Completion status. Not present by default.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// Fields outside the known set.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The task being worked on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTask {
    /// What the task is.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Field<String>>,
    /// Task status.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// Planned steps, in order.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub steps: Option<Field<Vec<String>>>,
    /// Free-form notes on what is being worked on right now.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub active_context: Option<Field<String>>,
    /// Raw text imported from `progress.md`.
    ///
    /// Nothing reads this back: the exported `progress.md` is built from the
    /// task history instead.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub progress: Option<Field<String>>,
    /// Fields outside the known set.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A completed task.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskRecord {
    /// When the task was recorded.
    ///
    /// Timestamps without an offset are kept as raw text.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Field<DateTime<Utc>>>,
    /// What was done.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Field<String>>,
    /// Progress notes.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub progress: Option<Field<String>>,
    /// Always `Completed` for records written by this crate.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub status: Option<Field<String>>,
    /// Fields outside the known set.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskRecord {
    /// A completion record stamped with `now`.
    #[must_use]
    pub fn completed(description: String, progress: String, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: Some(now.into()),
            description: Some(description.into()),
            progress: Some(progress.into()),
            status: Some(TASK_COMPLETED.to_owned().into()),
            extra: Map::new(),
        }
    }
}

/// An entry in the change log.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Change {
    /// When the change was logged.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Field<DateTime<Utc>>>,
    /// What changed.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Field<String>>,
    /// Arbitrary structured detail.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub details: Option<Field<Map<String, Value>>>,
    /// Fields outside the known set.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

macro_rules! tracked {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Tracked for $ty {
                fn status(&self) -> Option<&Status> {
                    self.status.as_ref()
                }

                fn status_slot(&mut self) -> &mut Option<Status> {
                    &mut self.status
                }
            }
        )*
    };
}

tracked!(Metadata, ProjectInfo, TextSection, ListSection, Tasks);

impl Document {
    /// The document written for a project that has no persisted state yet.
    #[must_use]
    pub fn initial(project_name: &str, now: DateTime<Utc>) -> Self {
        let text = || TextSection {
            content: Some(String::new().into()),
            status: Some(Status::Pending),
            extra: Map::new(),
        };
        let list = || ListSection {
            content: Some(String::new().into()),
            items: Some(Section::WellFormed(Vec::new())),
            status: Some(Status::Pending),
            extra: Map::new(),
        };

        Self {
            metadata: Some(Metadata::new(now).into()),
            project_info: Some(
                ProjectInfo {
                    name: Some(project_name.to_owned().into()),
                    description: Some(String::new().into()),
                    content: Some(String::new().into()),
                    status: Some(Status::NotStarted),
                    extra: Map::new(),
                }
                .into(),
            ),
            product_context: Some(text().into()),
            system_patterns: Some(text().into()),
            technologies: Some(list().into()),
            tasks: Some(
                Tasks {
                    current: Some(
                        CurrentTask {
                            description: Some(String::new().into()),
                            status: Some(Status::Pending),
                            steps: Some(Section::WellFormed(Vec::new())),
                            active_context: Some(String::new().into()),
                            progress: None,
                            extra: Map::new(),
                        }
                        .into(),
                    ),
                    history: Some(Section::WellFormed(Vec::new())),
                    status: None,
                    extra: Map::new(),
                }
                .into(),
            ),
            standards: Some(list().into()),
            change_history: Some(Section::WellFormed(Vec::new())),
            extra: Map::new(),
        }
    }

    /// Whether `name` is a key of the document.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        name.parse::<SectionName>().map_or_else(
            |_| self.extra.contains_key(name),
            |section| self.contains_section(section),
        )
    }

    /// Whether the known section is present.
    #[must_use]
    pub const fn contains_section(&self, name: SectionName) -> bool {
        match name {
            SectionName::Metadata => self.metadata.is_some(),
            SectionName::ProjectInfo => self.project_info.is_some(),
            SectionName::ProductContext => self.product_context.is_some(),
            SectionName::SystemPatterns => self.system_patterns.is_some(),
            SectionName::Technologies => self.technologies.is_some(),
            SectionName::Tasks => self.tasks.is_some(),
            SectionName::Standards => self.standards.is_some(),
            SectionName::ChangeHistory => self.change_history.is_some(),
        }
    }

    /// The raw value stored at `name`, or `None` if there is no such key.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        let Ok(section) = name.parse::<SectionName>() else {
            return self.extra.get(name).cloned();
        };
        match section {
            SectionName::Metadata => to_value(self.metadata.as_ref()),
            SectionName::ProjectInfo => to_value(self.project_info.as_ref()),
            SectionName::ProductContext => to_value(self.product_context.as_ref()),
            SectionName::SystemPatterns => to_value(self.system_patterns.as_ref()),
            SectionName::Technologies => to_value(self.technologies.as_ref()),
            SectionName::Tasks => to_value(self.tasks.as_ref()),
            SectionName::Standards => to_value(self.standards.as_ref()),
            SectionName::ChangeHistory => to_value(self.change_history.as_ref()),
        }
    }

    /// How the known section presents itself to status-driven logic.
    #[must_use]
    pub fn status_view(&self, name: SectionName) -> StatusView<'_> {
        match name {
            SectionName::Metadata => StatusView::of(self.metadata.as_ref()),
            SectionName::ProjectInfo => StatusView::of(self.project_info.as_ref()),
            SectionName::ProductContext => StatusView::of(self.product_context.as_ref()),
            SectionName::SystemPatterns => StatusView::of(self.system_patterns.as_ref()),
            SectionName::Technologies => StatusView::of(self.technologies.as_ref()),
            SectionName::Tasks => StatusView::of(self.tasks.as_ref()),
            SectionName::Standards => StatusView::of(self.standards.as_ref()),
            SectionName::ChangeHistory => {
                if self.change_history.is_some() {
                    StatusView::NotMapping
                } else {
                    StatusView::Absent
                }
            }
        }
    }

    /// The current task, if `tasks` and `tasks.current` are both well formed.
    #[must_use]
    pub fn current_task(&self) -> Option<&CurrentTask> {
        self.tasks
            .as_ref()
            .and_then(Section::well_formed)
            .and_then(|tasks| tasks.current.as_ref())
            .and_then(Section::well_formed)
    }

    /// Well-formed task history entries, oldest first.
    pub fn task_history(&self) -> impl Iterator<Item = &TaskRecord> {
        self.tasks
            .as_ref()
            .and_then(Section::well_formed)
            .and_then(|tasks| tasks.history.as_ref())
            .and_then(Section::well_formed)
            .into_iter()
            .flatten()
            .filter_map(Section::well_formed)
    }

    /// The change log, if present and well formed.
    #[must_use]
    pub fn change_history(&self) -> Option<&ChangeHistory> {
        self.change_history.as_ref().and_then(Section::well_formed)
    }

    /// Stamp `metadata.lastUpdated`, leaving every other metadata field as it
    /// was. The metadata section is recreated only if it is missing or is not
    /// a mapping.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        match self.metadata.as_mut().and_then(Section::well_formed_mut) {
            Some(metadata) => metadata.last_updated = Some(now.into()),
            None => self.metadata = Some(Metadata::new(now).into()),
        }
    }
}

fn to_value<T: Serialize>(section: Option<&T>) -> Option<Value> {
    section.and_then(|section| serde_json::to_value(section).ok())
}
