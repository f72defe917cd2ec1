use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Completion marker carried by a section.
///
/// The known values form the ordered set `Not Started`, `Pending`,
/// `In Progress`, `Complete`. Any other text found in a document is kept
/// verbatim as [`Status::Other`], and a value that is not text at all as
/// [`Status::NotText`], so that both survive a save. Neither counts as
/// complete.
///
/// There is no transition guard: any status may follow any other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Status {
    /// Work on the section has not begun.
    NotStarted,
    /// The section is waiting to be worked on.
    Pending,
    /// The section is being worked on.
    InProgress,
    /// The section is finished.
    Complete,
    /// A status text outside the known set.
    Other(String),
    /// A `status` value that is not a string (a number, `null`, ...).
    NotText(Value),
}

impl Status {
    /// The known statuses, in order.
    pub const KNOWN: [Self; 4] = [
        Self::NotStarted,
        Self::Pending,
        Self::InProgress,
        Self::Complete,
    ];

    /// The text stored in the document for this status, if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::NotStarted => Some("Not Started"),
            Self::Pending => Some("Pending"),
            Self::InProgress => Some("In Progress"),
            Self::Complete => Some("Complete"),
            Self::Other(text) => Some(text),
            Self::NotText(_) => None,
        }
    }

    /// Whether this is [`Status::Complete`].
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl From<String> for Status {
    fn from(text: String) -> Self {
        match text.as_str() {
            "Not Started" => Self::NotStarted,
            "Pending" => Self::Pending,
            "In Progress" => Self::InProgress,
            "Complete" => Self::Complete,
            _ => Self::Other(text),
        }
    }
}

impl From<Value> for Status {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::from(text),
            other => Self::NotText(other),
        }
    }
}

impl From<Status> for Value {
    fn from(status: Status) -> Self {
        match status {
            Status::Other(text) => Self::String(text),
            Status::NotText(value) => value,
            known => Self::from(known.as_str().unwrap_or_default()),
        }
    }
}

impl FromStr for Status {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotText(value) => write!(f, "{value}"),
            text => f.write_str(text.as_str().unwrap_or_default()),
        }
    }
}
