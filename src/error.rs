//! Error types for the audio analysis pipeline

use std::fmt;

/// Errors that can occur while dispatching or analysing audio
#[derive(Debug, Clone)]
pub enum AnalysisError {
    /// Invalid input or construction parameters
    InvalidInput(String),

    /// The audio source failed while reading, skipping or closing
    SourceRead(String),

    /// Processing error during analysis
    Processing(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::SourceRead(msg) => write!(f, "Source read error: {}", msg),
            AnalysisError::Processing(msg) => write!(f, "Processing error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}
