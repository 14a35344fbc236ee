use serde::{Deserialize, Serialize};

use crate::core::{Document, Editor};

const DEFAULT_SCHEMA: &str = "plate";
const DEFAULT_VERSION: u32 = 1;

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_version() -> u32 {
    DEFAULT_VERSION
}

/// Versioned envelope for a serialized document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateValue {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub document: Document,
}

impl PlateValue {
    pub fn from_document(document: Document) -> Self {
        Self {
            schema: default_schema(),
            version: default_version(),
            document,
        }
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a value and rejects envelopes written for another schema or a
    /// newer version.
    pub fn from_json_str(s: &str) -> Result<Self, ValueError> {
        let value: Self = serde_json::from_str(s)?;
        if value.schema != DEFAULT_SCHEMA {
            return Err(ValueError::UnsupportedSchema(value.schema));
        }
        if value.version > DEFAULT_VERSION {
            return Err(ValueError::UnsupportedVersion(value.version));
        }
        Ok(value)
    }
}

impl From<&Editor> for PlateValue {
    fn from(editor: &Editor) -> Self {
        Self::from_document(editor.doc().clone())
    }
}

#[derive(Debug)]
pub enum ValueError {
    Json(serde_json::Error),
    UnsupportedSchema(String),
    UnsupportedVersion(u32),
}

impl From<serde_json::Error> for ValueError {
    fn from(value: serde_json::Error) -> Self {
        ValueError::Json(value)
    }
}

impl std::fmt::Display for ValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueError::Json(err) => write!(f, "invalid value json: {err}"),
            ValueError::UnsupportedSchema(schema) => write!(f, "unsupported schema: {schema}"),
            ValueError::UnsupportedVersion(version) => write!(f, "unsupported version: {version}"),
        }
    }
}

impl std::error::Error for ValueError {}
