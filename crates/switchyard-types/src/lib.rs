//! Shared error and configuration types for the Switchyard generator.
//!
//! This crate provides the foundational types used across all other Switchyard crates:
//! - `SwitchyardError` — unified error taxonomy
//! - `ErrorKind` — the coarse failure classes callers branch on
//! - `GeneratorConfig` — options threaded through every generation entry point

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified error type for all Switchyard subsystems.
#[derive(Debug, thiserror::Error)]
pub enum SwitchyardError {
    // === Graph Errors ===
    #[error("DOT parse error at line {line}, col {col}: {message}")]
    GraphParse {
        line: usize,
        col: usize,
        message: String,
        source_snippet: Option<String>,
    },

    #[error("Cannot derive state machine: {message}")]
    ModelDerivation { message: String },

    #[error("Name collision in {scope}: '{identifier}' is produced more than once")]
    NamingCollision { scope: String, identifier: String },

    #[error("'{identifier}' is not a valid identifier for {context}")]
    InvalidIdentifier { identifier: String, context: String },

    // === Merge Errors ===
    #[error("Ambiguous merge in {container}: {count} declarations match {what}")]
    MergeAmbiguity {
        container: String,
        what: String,
        count: usize,
    },

    #[error("Missing declaration: {what}")]
    MissingDeclaration { what: String },

    #[error("Cannot encode {what}: {reason}")]
    UnsupportedShape { what: String, reason: String },

    // === Document Errors ===
    #[error("Source parse error at line {line}, col {col}: {message}")]
    DocumentParse {
        line: usize,
        col: usize,
        message: String,
    },

    // === Host Errors ===
    #[error("Generation cancelled before commit")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Coarse failure classes. Every kind aborts the whole transform before commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    GraphParse,
    ModelDerivation,
    MergeAmbiguity,
    Document,
    Host,
}

impl SwitchyardError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SwitchyardError::GraphParse { .. } => ErrorKind::GraphParse,
            SwitchyardError::ModelDerivation { .. }
            | SwitchyardError::NamingCollision { .. }
            | SwitchyardError::InvalidIdentifier { .. } => ErrorKind::ModelDerivation,
            SwitchyardError::MergeAmbiguity { .. } => ErrorKind::MergeAmbiguity,
            SwitchyardError::MissingDeclaration { .. }
            | SwitchyardError::UnsupportedShape { .. }
            | SwitchyardError::DocumentParse { .. } => ErrorKind::Document,
            SwitchyardError::Cancelled
            | SwitchyardError::Config(_)
            | SwitchyardError::Io(_)
            | SwitchyardError::Json(_)
            | SwitchyardError::Other(_) => ErrorKind::Host,
        }
    }

    /// Returns `true` if the failure was raised by the user rather than the input.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SwitchyardError::Cancelled)
    }

    /// Every failure is raised before the host commits, so the target
    /// document is never partially written.
    pub fn leaves_document_unchanged(&self) -> bool {
        true
    }

    /// Process exit code for the command-line front end.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::GraphParse => 2,
            ErrorKind::ModelDerivation => 3,
            ErrorKind::MergeAmbiguity => 4,
            ErrorKind::Document => 5,
            ErrorKind::Host if self.is_cancellation() => 130,
            ErrorKind::Host => 1,
        }
    }
}

/// A convenience alias for `Result<T, SwitchyardError>`.
pub type Result<T> = std::result::Result<T, SwitchyardError>;

// ---------------------------------------------------------------------------
// GeneratorConfig — explicit options for every generation entry point
// ---------------------------------------------------------------------------

/// Options that shape generated declarations.
///
/// Passed by reference into every entry point; nothing in the generator reads
/// process-wide state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Emit the `match_with` family on every union.
    pub match_methods: bool,
    /// Place a header comment above a freshly generated state union.
    pub header_comment: bool,
    /// Spaces per indentation level in emitted source.
    pub indent_width: usize,
    /// Derives placed on a union enum when it is first created.
    pub union_derives: Vec<String>,
    /// Derives placed on newly created case structs.
    pub case_derives: Vec<String>,
    /// Derives placed on the transition result types.
    pub result_derives: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            match_methods: true,
            header_comment: true,
            indent_width: 4,
            union_derives: vec!["Debug".into(), "Clone".into()],
            case_derives: vec!["Debug".into(), "Clone".into(), "Default".into()],
            result_derives: vec![
                "Debug".into(),
                "Clone".into(),
                "PartialEq".into(),
                "Eq".into(),
            ],
        }
    }
}

impl GeneratorConfig {
    /// Read a configuration from a JSON file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the emitter cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.indent_width == 0 || self.indent_width > 16 {
            return Err(SwitchyardError::Config(format!(
                "indent_width must be between 1 and 16, got {}",
                self.indent_width
            )));
        }
        if !self.case_derives.iter().any(|d| d == "Default") {
            return Err(SwitchyardError::Config(
                "case_derives must include Default; transition placeholders construct cases with ::default()"
                    .into(),
            ));
        }
        if !self.union_derives.iter().any(|d| d == "Clone") {
            return Err(SwitchyardError::Config(
                "union_derives must include Clone; do_transition keeps a copy of the source state".into(),
            ));
        }
        for d in &self.union_derives {
            if matches!(d.as_str(), "PartialEq" | "Eq" | "Hash") {
                return Err(SwitchyardError::Config(format!(
                    "union_derives cannot include {d}; unions compare by case and implement it already"
                )));
            }
            if matches!(d.as_str(), "Debug" | "Clone") && !self.case_derives.contains(d) {
                return Err(SwitchyardError::Config(format!(
                    "union_derives includes {d} but case_derives does not"
                )));
            }
        }
        Ok(())
    }

    /// Render a derive list as an attribute line, e.g. `#[derive(Debug, Clone)]`.
    pub fn derive_attr(derives: &[String]) -> Option<String> {
        if derives.is_empty() {
            None
        } else {
            Some(format!("#[derive({})]", derives.join(", ")))
        }
    }
}
