//! Dataset kinds and field descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage type a field's values must conform to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Whole numbers. Integral decimals such as `3.0` conform.
    Int,
    Float,
    /// Free text. Never type-checked.
    Str,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of a GMNS file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    pub description: &'static str,
}

impl FieldSpec {
    pub(crate) const fn required(
        name: &'static str,
        field_type: FieldType,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            field_type,
            required: true,
            description,
        }
    }

    pub(crate) const fn optional(
        name: &'static str,
        field_type: FieldType,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            field_type,
            required: false,
            description,
        }
    }
}

/// The tabular inputs a network validation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Node,
    Link,
    Demand,
    ModeType,
    Settings,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 5] = [
        Self::Node,
        Self::Link,
        Self::Demand,
        Self::ModeType,
        Self::Settings,
    ];

    /// Short name used in result messages ("... in node file").
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Link => "link",
            Self::Demand => "demand",
            Self::ModeType => "mode_type",
            Self::Settings => "settings",
        }
    }

    /// Conventional file name in a working directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Node => "node.csv",
            Self::Link => "link.csv",
            Self::Demand => "demand.csv",
            Self::ModeType => "mode_type.csv",
            Self::Settings => "settings.csv",
        }
    }

    /// Primary key column, for kinds that have one.
    pub fn id_field(self) -> Option<&'static str> {
        match self {
            Self::Node => Some("node_id"),
            Self::Link => Some("link_id"),
            Self::Demand | Self::ModeType | Self::Settings => None,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
