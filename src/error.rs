use std::path::PathBuf;

use thiserror::Error;

/// Run-level failure that ends the process with a specific exit code.
///
/// Exit codes:
/// - 2: configuration or input IO problem
/// - 3: no usable date-bearing data across all sources
/// - 4: output tables could not be written
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Why a single source could not contribute to the unified dataset.
///
/// None of these abort a run: the pipeline logs them, records them in the
/// source report, and continues with the remaining sources.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("source `{source_name}` not found at {}", path.display())]
    MissingSource { source_name: String, path: PathBuf },

    #[error("source `{source_name}`: no column matches role `{role}` (accepted: {accepted})")]
    SchemaMismatch {
        source_name: String,
        role: &'static str,
        accepted: String,
    },

    #[error("source `{source_name}`: failed to read {}: {message}", path.display())]
    Read {
        source_name: String,
        path: PathBuf,
        message: String,
    },

    #[error("source `{source_name}`: no usable rows after parsing")]
    Empty { source_name: String },
}

impl SourceError {
    /// Short machine-readable status used in the source report.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::MissingSource { .. } => "missing_source",
            SourceError::SchemaMismatch { .. } => "schema_mismatch",
            SourceError::Read { .. } => "read_error",
            SourceError::Empty { .. } => "empty",
        }
    }
}
