/*!
 * Operation vocabulary and batch format.
 *
 * An operation is a named, parameterized mutation of the document tree (or an
 * export of it). The set of kinds is closed; an unrecognized name in a batch
 * is data, reported by the engine and skipped.
 *
 * Handlers live in their own modules:
 * - `change_heading`: literal heading text replacement
 * - `emphasize_text`: whole-word strong emphasis, optionally per row
 * - `generate_toc`: table of contents section
 * - `heading_numbering`: hierarchical heading numbers
 * - `convert_to_doc`: DOCX export
 * - `convert_to_mp3`: audio export through the speech subsystem
 */

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{CommandError, OperationError};

pub mod change_heading;
pub mod convert_to_doc;
pub mod convert_to_mp3;
pub mod emphasize_text;
pub mod engine;
pub mod generate_toc;
pub mod heading_numbering;

pub use engine::{ApplyOutcome, ArtifactKind, OperationEngine, OperationFailure};

/// Closed set of operation kinds the engine knows how to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    ChangeHeading,
    EmphasizeText,
    GenerateToc,
    AddHeadingNumbering,
    ConvertToDoc,
    ConvertToMp3,
}

impl OperationKind {
    /// Every kind, in the order they are presented to the model
    pub const ALL: [OperationKind; 6] = [
        Self::ChangeHeading,
        Self::EmphasizeText,
        Self::GenerateToc,
        Self::AddHeadingNumbering,
        Self::ConvertToDoc,
        Self::ConvertToMp3,
    ];

    /// Wire name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChangeHeading => "change_heading",
            Self::EmphasizeText => "emphasize_text",
            Self::GenerateToc => "generate_toc",
            Self::AddHeadingNumbering => "add_heading_numbering",
            Self::ConvertToDoc => "convert_to_doc",
            Self::ConvertToMp3 => "convert_to_mp3",
        }
    }

    /// Look up a kind by wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name.trim())
    }

    /// One-line description used when listing the vocabulary in prompts
    pub fn description(&self) -> &'static str {
        match self {
            Self::ChangeHeading => {
                "Change the text of a heading that matches a specific string. Parameters: \"match\" (text to find), \"newText\" (replacement). Can be used multiple times for different headings."
            }
            Self::EmphasizeText => {
                "Emphasize a whole word or phrase by making it bold. Parameters: \"text\", and optionally \"lineNumber\" to target only the line carrying that row marker."
            }
            Self::GenerateToc => "Insert or refresh a table of contents section. No parameters.",
            Self::AddHeadingNumbering => {
                "Prefix every heading with its hierarchical number (1, 1.1, 1.2, 2 ...). No parameters."
            }
            Self::ConvertToDoc => "Export the whole document as a Microsoft Word (.docx) file. No parameters.",
            Self::ConvertToMp3 => {
                "Export the document as spoken audio (.mp3), using the speaker_map front matter for multi-voice dialogue. No parameters."
            }
        }
    }

    /// Whether the kind produces a binary artifact instead of editing the tree
    pub fn is_export(&self) -> bool {
        matches!(self, Self::ConvertToDoc | Self::ConvertToMp3)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| anyhow::anyhow!("Unknown operation type: {}", s))
    }
}

/// One requested operation as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation name, matched against `OperationKind`
    #[serde(rename = "type", default)]
    pub op_type: String,

    /// Free-form parameter object
    #[serde(default)]
    pub parameters: Value,
}

impl Operation {
    /// Build an operation with a parameter object
    pub fn new(kind: OperationKind, parameters: Value) -> Self {
        Self {
            op_type: kind.name().to_string(),
            parameters,
        }
    }

    /// Build an operation without parameters
    pub fn bare(kind: OperationKind) -> Self {
        Self::new(kind, Value::Object(Default::default()))
    }

    /// Resolved kind, `None` for names outside the vocabulary
    pub fn kind(&self) -> Option<OperationKind> {
        OperationKind::from_name(&self.op_type)
    }
}

/// The `{ "operations": [...] }` document returned by the interpretation service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationBatch {
    pub operations: Vec<Operation>,
}

impl OperationBatch {
    /// Parse a batch, requiring an `operations` array.
    ///
    /// Entries are read leniently: a missing `type` becomes an empty name that
    /// the engine reports as unknown, and missing `parameters` become null.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let value: Value = serde_json::from_str(text.trim())
            .map_err(|e| CommandError::InvalidBatch(format!("not valid JSON: {}", e)))?;

        let entries = value
            .get("operations")
            .and_then(Value::as_array)
            .ok_or_else(|| CommandError::InvalidBatch("missing \"operations\" array".to_string()))?;

        let operations = entries
            .iter()
            .map(|entry| Operation {
                op_type: entry
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                parameters: entry.get("parameters").cloned().unwrap_or(Value::Null),
            })
            .collect();

        Ok(Self { operations })
    }
}

/// Read a required, non-empty string parameter under any of the given names
pub(crate) fn required_str(
    kind: OperationKind,
    parameters: &Value,
    names: &[&str],
) -> Result<String, OperationError> {
    optional_str(parameters, names).ok_or_else(|| OperationError::InvalidParameters {
        operation: kind.name().to_string(),
        message: format!("missing string parameter \"{}\"", names[0]),
    })
}

/// Read an optional string parameter under any of the given names
pub(crate) fn optional_str(parameters: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| parameters.get(*name))
        .find_map(|value| match value {
            Value::String(text) if !text.is_empty() => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
}
