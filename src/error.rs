//! Error types for the DFP/ITR reader

use crate::code::AccountCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CvmError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing archive member matching '{0}'")]
    MissingMember(String),

    #[error("missing value at field '{0}'")]
    MissingField(&'static str),

    #[error("malformed account code '{0}'")]
    MalformedCode(String),

    #[error("invalid date '{0}'")]
    InvalidDate(String),

    #[error("invalid value '{value}' at field '{field}'")]
    InvalidValue {
        field: &'static str,
        value: String,
    },

    #[error("unknown value '{value}' at field '{field}'")]
    UnknownEnumValue {
        field: &'static str,
        value: String,
    },

    #[error("account '{0}' has no parent account")]
    OrphanAccount(AccountCode),

    #[error("conflicting rows for account '{code}', both at version {version}")]
    DuplicateUnresolved { code: AccountCode, version: u32 },
}

impl CvmError {
    /// Whether the error concerns a single row rather than the archive as a
    /// whole. Row-level errors ride on the affected [`Document`](crate::Document)
    /// instead of aborting iteration.
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            CvmError::MissingField(_)
                | CvmError::MalformedCode(_)
                | CvmError::InvalidDate(_)
                | CvmError::InvalidValue { .. }
                | CvmError::UnknownEnumValue { .. }
                | CvmError::OrphanAccount(_)
                | CvmError::DuplicateUnresolved { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CvmError>;
