use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::domain::Status;

/// A known top-level region of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionName {
    /// `metadata`: creation and update timestamps, schema version.
    Metadata,
    /// `projectInfo`: the project brief.
    ProjectInfo,
    /// `productContext`: why the project exists.
    ProductContext,
    /// `systemPatterns`: architecture and design patterns.
    SystemPatterns,
    /// `technologies`: the technical context.
    Technologies,
    /// `tasks`: the current task and the task history.
    Tasks,
    /// `standards`: engineering standards.
    Standards,
    /// `changeHistory`: the append-only change log.
    ChangeHistory,
}

impl SectionName {
    /// Every known section, in document order.
    pub const ALL: [Self; 8] = [
        Self::Metadata,
        Self::ProjectInfo,
        Self::ProductContext,
        Self::SystemPatterns,
        Self::Technologies,
        Self::Tasks,
        Self::Standards,
        Self::ChangeHistory,
    ];

    /// The document key of this section.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::ProjectInfo => "projectInfo",
            Self::ProductContext => "productContext",
            Self::SystemPatterns => "systemPatterns",
            Self::Technologies => "technologies",
            Self::Tasks => "tasks",
            Self::Standards => "standards",
            Self::ChangeHistory => "changeHistory",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The given name is not one of the known sections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown section '{0}'")]
pub struct UnknownSection(pub String);

impl FromStr for SectionName {
    type Err = UnknownSection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.key() == s)
            .ok_or_else(|| UnknownSection(s.to_owned()))
    }
}

impl TryFrom<&str> for SectionName {
    type Error = UnknownSection;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for SectionName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.key())
    }
}

/// A value as found in the document.
///
/// Values that fit the typed shape `T` are [`Section::WellFormed`]. Anything
/// else is kept verbatim as [`Section::Malformed`] and written back unchanged.
///
/// The section payloads read every known field as a [`Field`], so a section
/// is malformed only when it is not a JSON object at all. A mistyped field is
/// malformed on its own and does not affect the rest of the section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Section<T> {
    /// The value has the expected shape.
    WellFormed(T),
    /// The value could not be read as the expected shape.
    Malformed(Value),
}

impl<T> Section<T> {
    /// The typed payload, if the section is well formed.
    #[must_use]
    pub const fn well_formed(&self) -> Option<&T> {
        match self {
            Self::WellFormed(inner) => Some(inner),
            Self::Malformed(_) => None,
        }
    }

    /// The typed payload, mutably, if the section is well formed.
    pub const fn well_formed_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::WellFormed(inner) => Some(inner),
            Self::Malformed(_) => None,
        }
    }

    /// Whether the value could not be read as the expected shape.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

impl<T: DeserializeOwned> Section<T> {
    /// Classify a raw JSON value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        T::deserialize(&value).map_or(Self::Malformed(value), Self::WellFormed)
    }
}

impl Section<String> {
    /// The text of the value: a string as-is, anything else as JSON.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::WellFormed(text) => text.clone(),
            Self::Malformed(Value::String(text)) => text.clone(),
            Self::Malformed(value) => value.to_string(),
        }
    }
}

impl<T> From<T> for Section<T> {
    fn from(inner: T) -> Self {
        Self::WellFormed(inner)
    }
}

/// A field inside a section: typed when the stored value fits, raw otherwise.
pub type Field<T> = Section<T>;

/// The payload of a section that is a mapping with an optional `status` field.
pub trait Tracked {
    /// The section's status, if it has one.
    fn status(&self) -> Option<&Status>;

    /// The slot holding the section's status.
    fn status_slot(&mut self) -> &mut Option<Status>;
}

/// How a section presents itself to status-driven logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusView<'a> {
    /// The document has no such key.
    Absent,
    /// The section is present but is not a mapping.
    NotMapping,
    /// The section is a mapping without a `status` field.
    NoStatus,
    /// The section is a mapping with a `status` field.
    Status(&'a Status),
}

impl<'a> StatusView<'a> {
    /// Build the view of an optional tracked section.
    pub(crate) fn of<T: Tracked>(section: Option<&'a Section<T>>) -> Self {
        match section {
            None => Self::Absent,
            Some(Section::Malformed(_)) => Self::NotMapping,
            Some(Section::WellFormed(inner)) => inner.status().map_or(Self::NoStatus, Self::Status),
        }
    }

    /// The status, when the section carries one.
    #[must_use]
    pub const fn status(self) -> Option<&'a Status> {
        match self {
            Self::Status(status) => Some(status),
            _ => None,
        }
    }
}

/// Deserialize a present key as `Some`, even when its value is `null`.
///
/// Used together with `#[serde(default)]` so that only a missing key reads as
/// absent.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
