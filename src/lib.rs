//! CVM DFP/ITR Filing Parser
//!
//! Reads the DFP (annual) and ITR (quarterly) disclosure archives published
//! by CVM, the Brazilian securities regulator, and rebuilds each company's
//! financial statements as typed account trees.

mod archive;
mod assembler;
mod code;
mod error;
pub mod normalize;
mod row;
mod tree;
mod types;

pub use archive::{DfpItrFile, ReadOptions};
pub use code::AccountCode;
pub use error::{CvmError, Result};
pub use row::{AccountRow, BatchKey, DocumentHead, RawHeadRecord, RawStatementRecord};
pub use tree::{AccountNode, StatementTree, Walk};
pub use types::{
    CashFlowMethod, Cnpj, Currency, CurrencyScale, Document, DocumentKind, FiscalYear, RowFault,
    Scope, StatementKind,
};

/// Read every document of a DFP/ITR archive into memory.
///
/// Row-level faults ride on each [`Document`]; only structural archive
/// failures abort the read.
pub fn read_documents(path: impl AsRef<std::path::Path>) -> Result<Vec<Document>> {
    DfpItrFile::open(path)?.collect()
}
