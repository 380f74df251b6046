//! Error taxonomy for the reprocessing engine.
//!
//! Every failure a pass can hit maps to one [`ProcessError`] variant. The
//! watch loop only cares about two things: the [`ErrorKind`] category (for
//! logging) and whether the error is fatal. Everything recoverable is turned
//! into a queued (title, message) dialog and the pass is abandoned; only
//! [`ProcessError::Fatal`] terminates the watch loop.

use thiserror::Error;

/// Broad failure categories, matching the stages of a reprocessing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The definition file failed to parse or is missing required content.
    Config,
    /// The definition could not be resolved into a decode plan.
    Compile,
    /// The raw data could not be decoded per the plan.
    Decode,
    /// Alignment cannot proceed (degenerate rates, empty input). Reaching
    /// this from the render path indicates a violated invariant upstream.
    Data,
    /// The decode subsystem is unrecoverable.
    Fatal,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    /// The LFL file could not be parsed at all.
    #[error("error while parsing LFL: {0}")]
    Config(String),

    /// The LFL parsed but defines no `AXIS_1` parameter group.
    #[error("AXIS_1 parameter group is not defined")]
    MissingAxisGroup,

    /// The frame compiler rejected the definition or a parameter name.
    #[error("error while compiling LFL: {0}")]
    Compile(String),

    /// The series store could not decode the raw data file.
    #[error("error while decoding raw data: {0}")]
    Decode(String),

    /// The aligner was handed input it cannot reconcile.
    #[error("cannot align series: {0}")]
    Data(String),

    /// The decode subsystem failed in a way no future pass can recover from.
    #[error("decode subsystem failure: {0}")]
    Fatal(String),
}

pub type Result<T> = std::result::Result<T, ProcessError>;

impl ProcessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::Config(_) | ProcessError::MissingAxisGroup => ErrorKind::Config,
            ProcessError::Compile(_) => ErrorKind::Compile,
            ProcessError::Decode(_) => ErrorKind::Decode,
            ProcessError::Data(_) => ErrorKind::Data,
            ProcessError::Fatal(_) => ErrorKind::Fatal,
        }
    }

    /// Only a fatal error may terminate the watch loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProcessError::Fatal(_))
    }

    /// User-facing dialog content for this error.
    ///
    /// The wording follows the dialogs flight-data engineers already know
    /// from the previous tooling generation.
    pub fn dialog(&self) -> (String, String) {
        match self {
            ProcessError::Config(msg) => ("Error while parsing LFL!".into(), msg.clone()),
            ProcessError::MissingAxisGroup => (
                "AXIS_1 parameter group is not defined!".into(),
                "Please define a parameter group within the LFL named AXIS_1. \
                 Subsequent axes can be defined with groups named AXIS_2, AXIS_3, etc."
                    .into(),
            ),
            ProcessError::Compile(msg) => ("Error while parsing LFL!".into(), msg.clone()),
            ProcessError::Decode(msg) | ProcessError::Fatal(msg) => (
                "Processing failed!".into(),
                format!(
                    "Error occurred during processing. Please ensure both LFL \
                     and raw data file are correct. Exception: {msg}"
                ),
            ),
            ProcessError::Data(msg) => ("Plotting failed!".into(), msg.clone()),
        }
    }
}
