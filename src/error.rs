use std::num::ParseIntError;

use thiserror::Error;

/// A line that cannot be parsed into a [Record](crate::record::Record).
///
/// Every variant carries the offending raw line. The error aborts the enclosing sort, it is never
/// skipped or retried.
#[derive(Debug, Error)]
pub enum MalformedRecordError {
    #[error("missing \". \" separator, line: {line:?}")]
    MissingSeparator { line: String },
    #[error("invalid number {number:?}, line: {line:?}: {source}")]
    InvalidNumber {
        line: String,
        number: String,
        #[source]
        source: ParseIntError,
    },
    #[error("invalid UTF-8, line: {line:?}")]
    InvalidUtf8 { line: String },
}

impl MalformedRecordError {
    /// The raw line that failed to parse. Invalid UTF-8 is replaced lossily.
    pub fn line(&self) -> &str {
        match self {
            MalformedRecordError::MissingSeparator { line } => line,
            MalformedRecordError::InvalidNumber { line, .. } => line,
            MalformedRecordError::InvalidUtf8 { line } => line,
        }
    }
}
