use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use crate::project::ProjectError;

// ── Load-time errors (fatal to session start) ────────────────────

/// The part catalog could not be loaded. Every downstream component needs the
/// catalog, so any of these aborts session start.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("cannot read catalog {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog is missing required column '{column}'")]
    MissingColumn { column: String },
    #[error("catalog row {line}: {message}")]
    InvalidRow { line: u64, message: String },
    #[error("malformed catalog data: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum PersonaLoadError {
    #[error("cannot read persona: {0}")]
    Read(#[from] ProjectError),
    #[error("invalid persona: {0}")]
    Invalid(String),
}

// ── Interpreter errors (recoverable) ─────────────────────────────

/// A failed exchange with the reasoning service: network error, timeout,
/// non-2xx status, or a provider envelope we could not read.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, TS)]
#[error("{message}")]
#[ts(export)]
pub struct TransportFailure {
    pub status: Option<u16>,
    pub body: String,
    pub message: String,
}

impl TransportFailure {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: String::new(),
            message: message.into(),
        }
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: body.into(),
            message: format!("API error {status}"),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::network(format!(
            "request timed out after {:.1}s",
            after.as_secs_f64()
        ))
    }
}

/// Structured error returned by the command interpreter. Serialized with a
/// `code` tag so a UI can match on it and re-prompt the user.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", content = "detail")]
pub enum InterpretError {
    #[error("No API key configured. Run `set-key` or set CAPFORGE_API_KEY.")]
    MissingCredential,
    #[error("Reasoning service request failed: {0}")]
    TransportFailure(TransportFailure),
    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String, raw: String },
}

impl InterpretError {
    pub(crate) fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        InterpretError::MalformedResponse {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

impl From<TransportFailure> for InterpretError {
    fn from(e: TransportFailure) -> Self {
        InterpretError::TransportFailure(e)
    }
}

// ── Compiler warnings (non-fatal) ────────────────────────────────

/// A per-action problem found while applying a plan. Warnings never abort the
/// plan; the affected field keeps its previous value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum PlanWarning {
    /// No catalog row matched a part reference.
    UnresolvedPart {
        part_type: Option<String>,
        name_contains: String,
    },
    /// The `(target, property)` pair is not on the allow-list.
    UnknownProperty { target: String, property: String },
    /// The value could not be coerced to the property's type.
    InvalidValue {
        target: String,
        property: String,
        value: String,
        reason: String,
    },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::UnresolvedPart {
                part_type: Some(part_type),
                name_contains,
            } => write!(
                f,
                "No {part_type} part matches \"{name_contains}\"; left unchanged"
            ),
            PlanWarning::UnresolvedPart {
                part_type: None,
                name_contains,
            } => write!(f, "No part matches \"{name_contains}\"; left unchanged"),
            PlanWarning::UnknownProperty { target, property } => {
                write!(f, "Unknown property {target}.{property}; ignored")
            }
            PlanWarning::InvalidValue {
                target,
                property,
                value,
                reason,
            } => write!(f, "Invalid value \"{value}\" for {target}.{property}: {reason}"),
        }
    }
}

// ── Application umbrella ─────────────────────────────────────────

/// Top-level error for the CLI and other callers that drive the whole pipeline.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Catalog(#[from] CatalogLoadError),
    #[error(transparent)]
    Persona(#[from] PersonaLoadError),
    #[error(transparent)]
    Interpret(#[from] InterpretError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error("{0}")]
    Validation(String),
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Validation(s)
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::Validation(s.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn interpret_errors_serialize_with_code_tag() {
        let json = serde_json::to_value(InterpretError::MissingCredential).unwrap();
        assert_eq!(json["code"], "MissingCredential");

        let json = serde_json::to_value(InterpretError::from(TransportFailure::http(
            503,
            "overloaded",
        )))
        .unwrap();
        assert_eq!(json["code"], "TransportFailure");
        assert_eq!(json["detail"]["status"], 503);
        assert_eq!(json["detail"]["body"], "overloaded");
    }

    #[test]
    fn timeout_failure_has_no_status() {
        let failure = TransportFailure::timeout(Duration::from_secs(30));
        assert_eq!(failure.status, None);
        assert!(failure.message.contains("30.0s"));
    }

    #[test]
    fn unresolved_part_warning_names_the_pair() {
        let warning = PlanWarning::UnresolvedPart {
            part_type: Some("Brim".to_string()),
            name_contains: "Flat".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "No Brim part matches \"Flat\"; left unchanged"
        );
    }
}
