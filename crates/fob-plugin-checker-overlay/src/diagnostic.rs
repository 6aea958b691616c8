//! Diagnostics reported by the type checker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Severity classification of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Message,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Message => "message",
        })
    }
}

/// One type-check or lint finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<u32>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            code: None,
            file: None,
            line: None,
            character: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn at(mut self, line: u32, character: u32) -> Self {
        self.line = Some(line);
        self.character = Some(character);
        self
    }

    pub fn is_error_severity(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// `file(line,character): severity CODE: message`, the tsc layout.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}", file.display())?;
            if let (Some(line), Some(character)) = (self.line, self.character) {
                write!(f, "({line},{character})")?;
            }
            f.write_str(": ")?;
        }
        write!(f, "{}", self.severity)?;
        if let Some(code) = &self.code {
            write!(f, " {code}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Results of one checking run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerReport {
    pub diagnostics: Vec<Diagnostic>,
    pub lints: Vec<Diagnostic>,
    pub elapsed: Duration,
}

impl CheckerReport {
    pub fn new(diagnostics: Vec<Diagnostic>, lints: Vec<Diagnostic>, elapsed: Duration) -> Self {
        Self {
            diagnostics,
            lints,
            elapsed,
        }
    }

    /// Diagnostics followed by lints.
    pub fn messages(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().chain(self.lints.iter())
    }

    /// Whether any diagnostic (and, if `include_lints`, any lint) is an error.
    pub fn has_errors(&self, include_lints: bool) -> bool {
        let mut diagnostics = self.diagnostics.iter();
        if diagnostics.any(Diagnostic::is_error_severity) {
            return true;
        }
        include_lints && self.lints.iter().any(Diagnostic::is_error_severity)
    }

    pub fn error_count(&self) -> usize {
        self.messages().filter(|d| d.is_error_severity()).count()
    }
}
