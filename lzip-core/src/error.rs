//! Error types for the lzip engine.
//!
//! The variants mirror lzip's `LZ_Errno` taxonomy (`bad_argument`,
//! `mem_error`, `sequence_error`, `header_error`, `unexpected_eof`,
//! `data_error`, `library_error`) so callers can match on stable error
//! classes instead of parsing messages.

use thiserror::Error;

/// The error type for lzip engine operations.
#[derive(Debug, Error)]
pub enum LzError {
    /// An argument was out of range (e.g. dictionary size, match length limit).
    #[error("bad argument: {message}")]
    BadArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Allocation of an internal buffer failed (e.g. a dictionary-sized
    /// ring could not be sized). Rust's allocator aborts on real OOM, so in
    /// practice this only fires for caller-supplied sizes this crate
    /// refuses to even attempt to allocate.
    #[error("memory error: {message}")]
    MemError {
        /// Description of the allocation failure.
        message: String,
    },

    /// An operation was called in the wrong state (e.g. `write` after `finish`).
    #[error("sequence error: {message}")]
    SequenceError {
        /// Description of the misuse.
        message: String,
    },

    /// The 6-byte member header failed to validate.
    #[error("header error: {message}")]
    HeaderError {
        /// Description of the header problem.
        message: String,
    },

    /// The input ended before a member could be completed.
    #[error("unexpected end of file: {message}")]
    UnexpectedEof {
        /// Description of what was expected.
        message: String,
    },

    /// The compressed stream is corrupt (bad distance, bad trailer, etc.).
    #[error("data error: {message}")]
    DataError {
        /// Description of the corruption.
        message: String,
    },

    /// An internal invariant was violated; indicates a bug in this crate.
    #[error("internal library error: {message}")]
    LibraryError {
        /// Description of the internal inconsistency.
        message: String,
    },
}

/// Result type alias for lzip engine operations.
pub type Result<T> = std::result::Result<T, LzError>;

impl LzError {
    /// The stable numeric error code, matching lzip's `LZ_Errno` ordering.
    pub fn code(&self) -> i32 {
        match self {
            LzError::BadArgument { .. } => 1,
            LzError::MemError { .. } => 2,
            LzError::SequenceError { .. } => 3,
            LzError::HeaderError { .. } => 4,
            LzError::UnexpectedEof { .. } => 5,
            LzError::DataError { .. } => 6,
            LzError::LibraryError { .. } => 7,
        }
    }

    /// Build a [`LzError::BadArgument`].
    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::BadArgument {
            message: message.into(),
        }
    }

    /// Build a [`LzError::MemError`].
    pub fn mem_error(message: impl Into<String>) -> Self {
        Self::MemError {
            message: message.into(),
        }
    }

    /// Build a [`LzError::SequenceError`].
    pub fn sequence_error(message: impl Into<String>) -> Self {
        Self::SequenceError {
            message: message.into(),
        }
    }

    /// Build a [`LzError::HeaderError`].
    pub fn header_error(message: impl Into<String>) -> Self {
        Self::HeaderError {
            message: message.into(),
        }
    }

    /// Build a [`LzError::UnexpectedEof`].
    pub fn unexpected_eof(message: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            message: message.into(),
        }
    }

    /// Build a [`LzError::DataError`].
    pub fn data_error(message: impl Into<String>) -> Self {
        Self::DataError {
            message: message.into(),
        }
    }

    /// Build a [`LzError::LibraryError`].
    pub fn library_error(message: impl Into<String>) -> Self {
        Self::LibraryError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_match_lz_errno_ordering() {
        assert_eq!(LzError::bad_argument("x").code(), 1);
        assert_eq!(LzError::mem_error("x").code(), 2);
        assert_eq!(LzError::sequence_error("x").code(), 3);
        assert_eq!(LzError::header_error("x").code(), 4);
        assert_eq!(LzError::unexpected_eof("x").code(), 5);
        assert_eq!(LzError::data_error("x").code(), 6);
        assert_eq!(LzError::library_error("x").code(), 7);
    }

    #[test]
    fn display_includes_message() {
        let err = LzError::data_error("bad distance");
        assert!(err.to_string().contains("bad distance"));
    }
}
