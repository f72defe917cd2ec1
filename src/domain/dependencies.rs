//! Section completion dependencies.
//!
//! The table is a fixed, hand-authored DAG. Readiness is a single forward
//! check over it in declaration order; no scheduling beyond that is needed.

use crate::domain::{
    document::Document,
    section::{SectionName, StatusView},
};

/// The prerequisites of each section, in declaration order.
pub const DEPENDENCIES: &[(SectionName, &[SectionName])] = &[
    (SectionName::ProjectInfo, &[]),
    (SectionName::ProductContext, &[SectionName::ProjectInfo]),
    (SectionName::SystemPatterns, &[SectionName::ProjectInfo]),
    (SectionName::Standards, &[SectionName::SystemPatterns]),
    (SectionName::Technologies, &[SectionName::ProjectInfo]),
    (
        SectionName::Tasks,
        &[
            SectionName::ProductContext,
            SectionName::SystemPatterns,
            SectionName::Technologies,
        ],
    ),
    (SectionName::ChangeHistory, &[]),
];

/// A static section → prerequisites table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyTable {
    entries: &'static [(SectionName, &'static [SectionName])],
}

impl Default for DependencyTable {
    fn default() -> Self {
        Self {
            entries: DEPENDENCIES,
        }
    }
}

impl DependencyTable {
    /// The sections named in the table, in declaration order.
    pub fn sections(&self) -> impl Iterator<Item = SectionName> + '_ {
        self.entries.iter().map(|&(name, _)| name)
    }

    /// The prerequisites of `name`, or `None` if it is not in the table.
    #[must_use]
    pub fn prerequisites(&self, name: SectionName) -> Option<&'static [SectionName]> {
        self.entries
            .iter()
            .find(|&&(section, _)| section == name)
            .map(|&(_, prerequisites)| prerequisites)
    }

    /// Whether every prerequisite of `name` is complete.
    ///
    /// A prerequisite missing from the document is unsatisfied. One that is
    /// present but is not a mapping, or has no `status`, is skipped. Returns
    /// `false` for sections that are not in the table.
    #[must_use]
    pub fn dependencies_satisfied(&self, document: &Document, name: SectionName) -> bool {
        let Some(prerequisites) = self.prerequisites(name) else {
            return false;
        };

        prerequisites
            .iter()
            .all(|&prerequisite| match document.status_view(prerequisite) {
                StatusView::Absent => false,
                StatusView::NotMapping | StatusView::NoStatus => true,
                StatusView::Status(status) => status.is_complete(),
            })
    }

    /// The sections that can be worked on now.
    ///
    /// A section is ready when it is a mapping with a `status` that is not
    /// complete, and its prerequisites are satisfied.
    #[must_use]
    pub fn ready_sections(&self, document: &Document) -> Vec<SectionName> {
        self.sections()
            .filter(|&name| {
                document
                    .status_view(name)
                    .status()
                    .is_some_and(|status| !status.is_complete())
            })
            .filter(|&name| self.dependencies_satisfied(document, name))
            .collect()
    }
}
