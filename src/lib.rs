//! Memory bank: hierarchical project state for humans and AI assistants
//!
//! The state of a project is a single JSON document split into named
//! sections. Sections carry a completion status and depend on each other
//! through a fixed table, and the human-facing sections are projected to
//! markdown files that can be edited and imported back.

pub mod domain;
pub use domain::{
    Config, DependencyTable, Document, Field, Section, SectionName, Status, StatusView,
};

/// Filesystem storage and markdown projection.
pub mod storage;
pub use storage::{MarkdownFile, MemoryBank, StoreError};

/// Plan, act and review reports over a document.
pub mod workflow;
pub use workflow::{ActReport, PlanReport, ReviewReport};
