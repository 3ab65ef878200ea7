// SPDX-License-Identifier: MIT

pub use vsio::errors::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsParsingError {
    IO(BlockIOError),
    Corrupted,
    Invalid(&'static str),
    Other(&'static str),
}

impl FsParsingError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsParsingError::IO(_) => "IO error",
            FsParsingError::Corrupted => "Corrupted record",
            FsParsingError::Invalid(msg) => msg,
            FsParsingError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsParsingError::IO(e) => Some(FsError::IO(*e)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsCheckerError {
    IO(BlockIOError),
    Parsing(FsParsingError),
    Invalid(&'static str),
    Other(&'static str),
}

impl FsCheckerError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsCheckerError::IO(_) => "IO error",
            FsCheckerError::Parsing(_) => "Parsing error",
            FsCheckerError::Invalid(msg) => msg,
            FsCheckerError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsCheckerError::IO(e) => Some(FsError::IO(*e)),
            FsCheckerError::Parsing(e) => Some(FsError::Parsing(*e)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsRepairError {
    IO(BlockIOError),
    Parsing(FsParsingError),
    Checker(FsCheckerError),
    /// Repair was requested for a session that never ran the matching check.
    NotChecked(&'static str),
    Other(&'static str),
}

impl FsRepairError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsRepairError::IO(_) => "IO error",
            FsRepairError::Parsing(_) => "Parsing error",
            FsRepairError::Checker(_) => "Checker error",
            FsRepairError::NotChecked(msg) => msg,
            FsRepairError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsRepairError::IO(e) => Some(FsError::IO(*e)),
            FsRepairError::Parsing(e) => Some(FsError::Parsing(*e)),
            FsRepairError::Checker(e) => Some(FsError::Checker(*e)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsFormatterError {
    IO(BlockIOError),
    Invalid(&'static str),
    Other(&'static str),
}

impl FsFormatterError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsFormatterError::IO(_) => "IO error",
            FsFormatterError::Invalid(msg) => msg,
            FsFormatterError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsFormatterError::IO(e) => Some(FsError::IO(*e)),
            _ => None,
        }
    }
}

/// Top-level error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    IO(BlockIOError),
    Parsing(FsParsingError),
    Checker(FsCheckerError),
    Repair(FsRepairError),
    Formatter(FsFormatterError),
    Other(&'static str),
}

impl FsError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsError::IO(e) => e.msg(),
            FsError::Parsing(e) => e.msg(),
            FsError::Checker(e) => e.msg(),
            FsError::Repair(e) => e.msg(),
            FsError::Formatter(e) => e.msg(),
            FsError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsError::Parsing(e) => e.source(),
            FsError::Checker(e) => e.source(),
            FsError::Repair(e) => e.source(),
            FsError::Formatter(e) => e.source(),
            FsError::IO(_) => None,
            FsError::Other(_) => None,
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FsError {}

// === type Fs*Result ===

pub type FsResult<T = ()> = Result<T, FsError>;
pub type FsParsingResult<T = ()> = Result<T, FsParsingError>;
pub type FsCheckerResult<T = ()> = Result<T, FsCheckerError>;
pub type FsRepairResult<T = ()> = Result<T, FsRepairError>;
pub type FsFormatterResult<T = ()> = Result<T, FsFormatterError>;

crate::fs_error_display!(
    FsParsingError,
    FsCheckerError,
    FsRepairError,
    FsFormatterError,
    FsError,
);

crate::fs_error_wiring! {
    FsError {
        BlockIOError     => IO,
        FsParsingError   => Parsing,
        FsCheckerError   => Checker,
        FsRepairError    => Repair,
        FsFormatterError => Formatter,
    }
    layers {
        FsParsingError   : IO(BlockIOError);
        FsCheckerError   : IO(BlockIOError), Parsing(FsParsingError);
        FsRepairError    : IO(BlockIOError), Parsing(FsParsingError), Checker(FsCheckerError);
        FsFormatterError : IO(BlockIOError);
    }
}
