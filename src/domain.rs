//! Domain models for the memory bank.
//!
//! This module contains the document and its sections, section statuses, the
//! fixed dependency table between sections, and configuration. Nothing here
//! touches the filesystem except [`Config`] loading.

mod accessor;

mod config;
pub use config::{Config, ConfigError};

/// Section completion dependencies.
pub mod dependencies;
pub use dependencies::{DEPENDENCIES, DependencyTable};

/// The persisted document and its typed sections.
pub mod document;
pub use document::{
    Change, CurrentTask, Document, ListSection, Metadata, ProjectInfo, TaskRecord, Tasks,
    TextSection,
};

/// Section names and the well-formed / malformed section wrapper.
pub mod section;
pub use section::{Field, Section, SectionName, StatusView, Tracked, UnknownSection};

mod status;
pub use status::Status;
