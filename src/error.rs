use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Error raised by the host runtime (a failed reload, typically).
pub type HostError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Processing phase during which a module's content turned out to be bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Analysis,
    Reload,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Analysis => "analysis",
            Phase::Reload => "reload",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Phase::Analysis => "Analysis",
            Phase::Reload => "Reload",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum LiveImportError {
    #[error("Syntax error in {origin} at line {line}, column {column}: {message}")]
    Syntax {
        origin: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("{message}")]
    RelativeImport { message: String },

    #[error("{0}")]
    Validation(String),

    #[error("{} of {module} failed: {source}", .phase.title())]
    Module {
        module: String,
        phase: Phase,
        #[source]
        source: HostError,
    },

    #[error("Name {name} referenced in registered import from {module} has disappeared")]
    VanishedAttribute { module: String, name: String },

    #[error("Cannot read modification time of {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Watcher error: {0}")]
    Watcher(String),
}

impl LiveImportError {
    /// Wrap `source` as a content error for `module` in the given phase.
    pub fn module(module: impl Into<String>, phase: Phase, source: impl Into<HostError>) -> Self {
        LiveImportError::Module {
            module: module.into(),
            phase,
            source: source.into(),
        }
    }

    /// The phase tag when this is a module-content error.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            LiveImportError::Module { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LiveImportError>;
