//! Single-line status text

use std::fmt;

use crate::error::ImportError;
use crate::import::ImportOrigin;

/// Messages the viewer reports to the user
#[derive(Debug, Clone, PartialEq)]
pub enum StatusMessage {
    Importing { name: String },
    Loading { name: String, percent: Option<u32> },
    LoadFailed { name: String },
    InvalidModel { name: String },
    ManifestUnavailable,
    ManifestInvalid,
    ManifestEmpty,
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Importing { name } => write!(f, "Importing {name}..."),
            Self::Loading {
                name,
                percent: Some(percent),
            } => write!(f, "Loading {name}... {percent}%"),
            Self::Loading { name, percent: None } => write!(f, "Loading {name}..."),
            Self::LoadFailed { name } => write!(f, "Failed to load {name}"),
            Self::InvalidModel { name } => write!(f, "Invalid model {name}"),
            Self::ManifestUnavailable => write!(f, "Model manifest unavailable"),
            Self::ManifestInvalid => write!(f, "Model manifest is invalid"),
            Self::ManifestEmpty => write!(f, "Model manifest lists no models"),
        }
    }
}

impl StatusMessage {
    /// What to show when an import fails.
    ///
    /// A failed manifest entry ends manifest loading, so it is reported as a
    /// manifest problem rather than a single file.
    pub fn for_import_failure(origin: ImportOrigin, error: &ImportError, name: String) -> Self {
        match (origin, error) {
            (ImportOrigin::Manifest, _) => Self::ManifestInvalid,
            (_, ImportError::NoScene { .. } | ImportError::Parse { .. }) => Self::InvalidModel { name },
            (_, ImportError::Read { .. } | ImportError::Network(_)) => Self::LoadFailed { name },
        }
    }
}

/// The status line; empty when there is nothing to report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusLine {
    text: Option<String>,
}

impl StatusLine {
    pub fn set(&mut self, message: impl fmt::Display) {
        self.text = Some(message.to_string());
    }

    pub fn clear(&mut self) {
        self.text = None;
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none()
    }

    /// Text as shown on screen
    pub fn display(&self) -> String {
        match &self.text {
            Some(text) if !text.is_empty() => format!("• {text}"),
            _ => String::new(),
        }
    }
}
