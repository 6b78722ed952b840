//! Failure taxonomy of the shader lifecycle.
//!
//! None of these are fatal. The pipeline logs them, drops the affected handle
//! and keeps accepting new source locations.

use thiserror::Error;

use crate::gl::StageKind;
use crate::loader::SourceLocation;

/// Source text could not be obtained.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("empty source location")]
    EmptyLocation,

    #[error("failed to read `{location}`: {source}")]
    Io {
        location: SourceLocation,
        #[source]
        source: std::io::Error,
    },

    #[error("loader for `{location}` stopped before delivering: {reason}")]
    Aborted { location: SourceLocation, reason: String },
}

/// A stage was rejected by the compiler.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    #[error("the context could not allocate a {kind} stage object")]
    Allocation { kind: StageKind },

    #[error("{kind} stage failed to compile: {log}")]
    Rejected {
        kind: StageKind,
        log: String,
        /// The offending source, kept for diagnostics.
        source_text: String,
    },
}

impl CompileError {
    pub fn kind(&self) -> StageKind {
        match self {
            CompileError::Allocation { kind } | CompileError::Rejected { kind, .. } => *kind,
        }
    }
}

/// A stage pair was rejected by the linker.
#[derive(Debug, Clone, Error)]
pub enum LinkError {
    #[error("the context could not allocate a program object")]
    Allocation,

    #[error("program failed to link: {log}")]
    Rejected { log: String },
}

/// Last failure observed by the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} source: {error}")]
    Fetch {
        stage: StageKind,
        #[source]
        error: FetchError,
    },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Link(#[from] LinkError),
}
