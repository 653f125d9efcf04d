use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::layout::quality::Method;

/// Engine-level error type.
///
/// `ExtentTooSmall` and `ColumnOverfull` are candidate-level failures: every search
/// loop skips the candidate that raised them and tries the next one. The rest are
/// programmer or input errors and propagate unchanged.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Extent too small: {0}")]
    ExtentTooSmall(String),

    #[error("Column overfull: column {column} was assigned {assigned} cells but holds {capacity}")]
    ColumnOverfull {
        column: usize,
        assigned: usize,
        capacity: usize,
    },

    #[error("Incompatible qualities: cannot compare {left:?} with {right:?}")]
    IncompatibleQualities { left: Method, right: Method },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LayoutError {
    pub fn extent_too_small(what: impl Into<String>) -> Self {
        LayoutError::ExtentTooSmall(what.into())
    }

    /// True when the caller should move on to its next candidate layout.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LayoutError::ExtentTooSmall(_) | LayoutError::ColumnOverfull { .. }
        )
    }

    /// Stable identifier used when reporting a failure to the end user.
    pub fn code(&self) -> &'static str {
        match self {
            LayoutError::ExtentTooSmall(_) => "EXTENT_TOO_SMALL",
            LayoutError::ColumnOverfull { .. } => "COLUMN_OVERFULL",
            LayoutError::IncompatibleQualities { .. } => "INCOMPATIBLE_QUALITIES",
            LayoutError::InvalidDocument(_) => "INVALID_DOCUMENT",
            LayoutError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Non-fatal conditions that were resolved to a default during layout.
///
/// These never abort a layout; the context logs each distinct advisory once and
/// hands the collected list back with the layout report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    UnknownStyle { name: String, fallback: String },
    UnknownFont { family: String, fallback: String },
    MissingImage { reference: String },
    UndefinedAttribute { style: String, attribute: String },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::UnknownStyle { name, fallback } => {
                write!(f, "unknown style '{name}', using '{fallback}'")
            }
            Advisory::UnknownFont { family, fallback } => {
                write!(f, "unknown font family '{family}', using '{fallback}'")
            }
            Advisory::MissingImage { reference } => {
                write!(f, "image '{reference}' not found, using a placeholder")
            }
            Advisory::UndefinedAttribute { style, attribute } => {
                write!(f, "style '{style}' refers to undefined '{attribute}'")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_errors_are_recoverable() {
        assert!(LayoutError::extent_too_small("cell").is_recoverable());
        assert!(LayoutError::ColumnOverfull {
            column: 2,
            assigned: 3,
            capacity: 1
        }
        .is_recoverable());
    }

    #[test]
    fn test_programmer_errors_are_not_recoverable() {
        let err = LayoutError::IncompatibleQualities {
            left: Method::Table,
            right: Method::Columns,
        };
        assert!(!err.is_recoverable());
        assert_eq!(err.code(), "INCOMPATIBLE_QUALITIES");
        assert!(!LayoutError::InvalidDocument("x".into()).is_recoverable());
    }

    #[test]
    fn test_advisory_display_names_the_fallback() {
        let advisory = Advisory::UnknownStyle {
            name: "fancy".to_string(),
            fallback: "block".to_string(),
        };
        let text = advisory.to_string();
        assert!(text.contains("fancy") && text.contains("block"), "got {text}");
    }
}
