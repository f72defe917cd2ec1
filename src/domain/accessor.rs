//! Section mutation.
//!
//! These operations work on a bare [`Document`] and never touch the
//! filesystem; callers holding a [`crate::MemoryBank`] get persistence on top.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::domain::{
    Status,
    document::{Change, DEFAULT_TASK_DESCRIPTION, Document, ProjectInfo, TaskRecord, Tasks},
    section::{Section, SectionName, Tracked},
};

impl Document {
    /// Update the section called `name`.
    ///
    /// What is written depends on the section:
    ///
    /// - `projectInfo`: `content` is set, then every entry of `metadata` is
    ///   overlaid onto the section (so `name`, `description` and so on can be
    ///   overwritten).
    /// - `tasks`: `content` is ignored. `metadata["activeContext"]` is written
    ///   to `tasks.current.activeContext`, and `metadata["progress"]` appends a
    ///   completion record to `tasks.history`. Both may happen in one call.
    /// - any other mapping: `content` is set and `metadata` is ignored.
    /// - anything that is not a mapping: nothing is written.
    ///
    /// Afterwards, a section that is a mapping with a `status` field is marked
    /// [`Status::Complete`], whatever actually changed.
    ///
    /// Returns `false`, leaving the document untouched, only when `name` is
    /// not a key of the document.
    pub fn update(
        &mut self,
        name: &str,
        content: &str,
        metadata: &Map<String, Value>,
        now: DateTime<Utc>,
    ) -> bool {
        let Ok(section) = name.parse::<SectionName>() else {
            return self.update_extra(name, content);
        };
        if !self.contains_section(section) {
            return false;
        }

        match section {
            SectionName::ProjectInfo => {
                if let Some(info) = self.project_info.as_mut() {
                    update_project_info(info, content, metadata);
                    complete(info);
                }
            }
            SectionName::Tasks => {
                if let Some(tasks) = self.tasks.as_mut() {
                    if let Some(inner) = tasks.well_formed_mut() {
                        update_tasks(inner, metadata, now);
                    }
                    complete(tasks);
                }
            }
            SectionName::ProductContext => {
                write_section(self.product_context.as_mut(), |s| s.content = Some(content.to_owned().into()));
            }
            SectionName::SystemPatterns => {
                write_section(self.system_patterns.as_mut(), |s| s.content = Some(content.to_owned().into()));
            }
            SectionName::Technologies => {
                write_section(self.technologies.as_mut(), |s| s.content = Some(content.to_owned().into()));
            }
            SectionName::Standards => {
                write_section(self.standards.as_mut(), |s| s.content = Some(content.to_owned().into()));
            }
            SectionName::Metadata => write_section(self.metadata.as_mut(), |s| {
                s.extra.insert("content".to_owned(), Value::from(content));
            }),
            // a sequence, not a mapping
            SectionName::ChangeHistory => {}
        }

        true
    }

    /// Append an entry to the change log.
    ///
    /// A missing or malformed change log is replaced with an empty one first.
    pub fn log_change(
        &mut self,
        description: &str,
        details: Option<Map<String, Value>>,
        now: DateTime<Utc>,
    ) {
        let change = Section::WellFormed(Change {
            timestamp: Some(now.into()),
            description: Some(description.to_owned().into()),
            details: Some(details.unwrap_or_default().into()),
            extra: Map::new(),
        });

        match self.change_history.as_mut().and_then(Section::well_formed_mut) {
            Some(history) => history.push(change),
            None => {
                if self.change_history.is_some() {
                    tracing::debug!("Replacing malformed change history");
                }
                self.change_history = Some(Section::WellFormed(vec![change]));
            }
        }
    }

    fn update_extra(&mut self, name: &str, content: &str) -> bool {
        let Some(value) = self.extra.get_mut(name) else {
            return false;
        };
        if let Value::Object(fields) = value {
            fields.insert("content".to_owned(), Value::from(content));
            if fields.contains_key("status") {
                fields.insert("status".to_owned(), Value::from(Status::Complete));
            }
        }
        true
    }
}

fn update_project_info(
    section: &mut Section<ProjectInfo>,
    content: &str,
    metadata: &Map<String, Value>,
) {
    let Some(info) = section.well_formed_mut() else {
        return;
    };
    info.content = Some(content.to_owned().into());

    if metadata.is_empty() {
        return;
    }

    // Overlay on the JSON form so arbitrary keys land where a reload would put
    // them. A value of the wrong type is kept raw in its field.
    let Ok(Value::Object(mut fields)) = serde_json::to_value(&*info) else {
        return;
    };
    for (key, value) in metadata {
        fields.insert(key.clone(), value.clone());
    }
    *section = Section::from_value(Value::Object(fields));
}

fn update_tasks(tasks: &mut Tasks, metadata: &Map<String, Value>, now: DateTime<Utc>) {
    if let Some(active) = metadata.get("activeContext") {
        match tasks.current.as_mut().and_then(Section::well_formed_mut) {
            Some(current) => current.active_context = Some(text(active).into()),
            None => tracing::debug!("No well-formed current task to hold the active context"),
        }
    }

    if let Some(progress) = metadata.get("progress") {
        let description = metadata
            .get("description")
            .map_or_else(|| DEFAULT_TASK_DESCRIPTION.to_owned(), text);
        let record = Section::WellFormed(TaskRecord::completed(description, text(progress), now));

        match &mut tasks.history {
            None => tasks.history = Some(Section::WellFormed(vec![record])),
            Some(Section::WellFormed(history)) => history.push(record),
            Some(Section::Malformed(_)) => {
                tracing::debug!("Task history is malformed, not recording progress");
            }
        }
    }
}

/// Apply `write` to a well-formed section, then complete it.
fn write_section<T: Tracked>(section: Option<&mut Section<T>>, write: impl FnOnce(&mut T)) {
    if let Some(section) = section {
        if let Some(inner) = section.well_formed_mut() {
            write(inner);
        }
        complete(section);
    }
}

/// Mark a well-formed section with a `status` field as complete.
fn complete<T: Tracked>(section: &mut Section<T>) {
    if let Some(status) = section
        .well_formed_mut()
        .and_then(|inner| inner.status_slot().as_mut())
    {
        *status = Status::Complete;
    }
}

/// The text of a metadata value: strings as-is, anything else as JSON.
fn text(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_owned)
}
