#![allow(dead_code)]

use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    // Name codec errors.
    #[error("insufficient data for base length type")]
    ErrBaseLen,
    #[error("insufficient data for calculated length type")]
    ErrCalcLen,
    #[error("segment prefix is reserved")]
    ErrReserved,
    #[error("too many pointers (>16)")]
    ErrTooManyPtr,
    #[error("invalid pointer")]
    ErrInvalidPtr,
    #[error("zero length segment")]
    ErrZeroSegLen,
    #[error("segment length too long")]
    ErrSegTooLong,
    #[error("name too long")]
    ErrNameTooLong,
    #[error("name must end with a dot")]
    ErrNonCanonicalName,

    // Message codec errors.
    #[error("parsing/packing of this section has completed")]
    ErrSectionDone,
    #[error("too many Questions to pack (>65535)")]
    ErrTooManyQuestions,
    #[error("too many Answers to pack (>65535)")]
    ErrTooManyAnswers,
    #[error("too many Authorities to pack (>65535)")]
    ErrTooManyAuthorities,
    #[error("too many Additionals to pack (>65535)")]
    ErrTooManyAdditionals,
    #[error("insufficient data for resource body length")]
    ErrResourceLen,
    #[error("resource length too long")]
    ErrResTooLong,
    #[error("string too long for length-prefixed encoding")]
    ErrStringTooLong,

    // Engine errors.
    #[error("no interface could be initialized")]
    ErrTransceiverUnavailable,
    #[error("invalid host name")]
    ErrInvalidHostName,
    #[error("invalid service name")]
    ErrInvalidServiceName,
    #[error("engine already started")]
    ErrAlreadyStarted,
    #[error("engine not started")]
    ErrNotStarted,

    #[error("parse int: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] FromUtf8Error),
    #[error("{0}")]
    Io(#[source] IoError),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}
