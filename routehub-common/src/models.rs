//! Domain records exchanged with the backend
//!
//! Status and priority values are closed enums. They are validated once,
//! when rows are decoded, so the rest of the code never compares strings.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Wire representation
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::InvalidInput(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        // Rows decode through `FromStr` so backend values and CLI/config
        // values follow the same rules
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_enum! {
    /// Lifecycle status of a company
    ParentStatus {
        Active => "active",
        Pending => "pending",
        Inactive => "inactive",
    }
}

string_enum! {
    /// Status of a company-service link
    AssociationStatus {
        Active => "active",
        Inactive => "inactive",
        Suspended => "suspended",
    }
}

string_enum! {
    /// Priority of a company-service link
    Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

/// Explicit status parameter for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter<S> {
    /// No status restriction
    #[default]
    Any,
    /// Only rows with exactly this status
    Only(S),
}

impl<S: Copy> StatusFilter<S> {
    pub fn status(&self) -> Option<S> {
        match self {
            StatusFilter::Any => None,
            StatusFilter::Only(s) => Some(*s),
        }
    }
}

impl<S: FromStr<Err = Error>> FromStr for StatusFilter<S> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("any") {
            Ok(StatusFilter::Any)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

impl<S: fmt::Display> fmt::Display for StatusFilter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::Any => f.write_str("any"),
            StatusFilter::Only(s) => s.fmt(f),
        }
    }
}

/// Opaque identifier as stored by the backend
///
/// The backend uses UUID strings for most tables but integer keys show up
/// in older exports, so both JSON strings and numbers are accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => RecordId(s),
            Raw::Int(n) => RecordId(n.to_string()),
        })
    }
}

/// Company record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parent {
    pub id: RecordId,
    #[serde(default)]
    pub name: Option<String>,
    /// Absent when the query did not select the column
    #[serde(default)]
    pub status: Option<ParentStatus>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

impl Parent {
    pub fn new(id: impl Into<RecordId>, status: ParentStatus) -> Self {
        Self {
            id: id.into(),
            name: None,
            status: Some(status),
            lat: None,
            lng: None,
        }
    }

    pub fn with_coordinates(mut self, lat: Option<f64>, lng: Option<f64>) -> Self {
        self.lat = lat;
        self.lng = lng;
        self
    }

    /// Name for log lines, falling back to the id
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }
}

/// Service type record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationType {
    pub id: RecordId,
    pub name: String,
}

/// Existing company-service link, reduced to its two references
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssociationRef {
    pub parent_id: RecordId,
    pub association_type_id: RecordId,
}

impl AssociationRef {
    pub fn new(parent_id: impl Into<RecordId>, association_type_id: impl Into<RecordId>) -> Self {
        Self {
            parent_id: parent_id.into(),
            association_type_id: association_type_id.into(),
        }
    }
}

/// Creation payload for one company-service link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAssociation {
    pub parent_id: RecordId,
    pub association_type_id: RecordId,
    pub priority: Priority,
    pub status: AssociationStatus,
}

impl NewAssociation {
    /// Default link created by reconciliation: medium priority, active
    pub fn default_for(parent_id: RecordId, association_type_id: RecordId) -> Self {
        Self {
            parent_id,
            association_type_id,
            priority: Priority::Medium,
            status: AssociationStatus::Active,
        }
    }
}
