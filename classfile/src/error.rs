use thiserror::Error;

/// Errors produced while decoding or encoding a class file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassFileError {
    /// The byte stream does not follow the class file grammar.
    #[error("malformed class file: {0}")]
    MalformedClassFile(String),

    /// The in-memory record cannot be written out.
    #[error("invalid class record: {0}")]
    InvalidRecord(String),
}

impl ClassFileError {
    /// Re-labels a parse failure of a record's own strings (descriptors,
    /// names) as a problem with the record.
    pub(crate) fn into_invalid_record(self) -> Self {
        match self {
            Self::MalformedClassFile(message) => Self::InvalidRecord(message),
            other => other,
        }
    }
}

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;

/// Returns early with [`ClassFileError::MalformedClassFile`].
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::error::ClassFileError::MalformedClassFile(format!($($arg)*)))
    };
}

/// Returns early with [`ClassFileError::InvalidRecord`].
macro_rules! invalid {
    ($($arg:tt)*) => {
        return Err($crate::error::ClassFileError::InvalidRecord(format!($($arg)*)))
    };
}

pub(crate) use bail;
pub(crate) use invalid;
