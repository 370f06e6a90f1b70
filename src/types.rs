//! Type definitions for parsed DFP/ITR data

use crate::code::AccountCode;
use crate::error::{CvmError, Result};
use crate::row::RawStatementRecord;
use crate::tree::StatementTree;
use chrono::NaiveDate;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Document category of a filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    /// Standardized annual financial statements ("Demonstrações
    /// Financeiras Padronizadas").
    Dfp,
    /// Quarterly report ("Informe Trimestral").
    Itr,
}

/// Perspective of a statement: the company alone or the whole group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    Individual,
    Consolidated,
}

impl Scope {
    pub fn description(&self) -> &'static str {
        match self {
            Scope::Individual => "Individual",
            Scope::Consolidated => "Consolidado",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// The closed set of statement categories found in DFP/ITR archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatementKind {
    BalanceSheetAssets,
    BalanceSheetLiabilities,
    IncomeStatement,
    ComprehensiveIncome,
    CashFlow,
    EquityChange,
    ValueAdded,
}

impl StatementKind {
    /// The regulator's name for the statement.
    pub fn description(&self) -> &'static str {
        match self {
            StatementKind::BalanceSheetAssets => "Balanço Patrimonial Ativo",
            StatementKind::BalanceSheetLiabilities => "Balanço Patrimonial Passivo",
            StatementKind::IncomeStatement => "Demonstração do Resultado",
            StatementKind::ComprehensiveIncome => "Demonstração de Resultado Abrangente",
            StatementKind::CashFlow => "Demonstração do Fluxo de Caixa",
            StatementKind::EquityChange => "Demonstração das Mutações do Patrimônio Líquido",
            StatementKind::ValueAdded => "Demonstração de Valor Adicionado",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// How a cash-flow statement was prepared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CashFlowMethod {
    Direct,
    Indirect,
}

/// Whether a row belongs to the reported fiscal year or to the prior-year
/// comparative that every filing carries alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FiscalYear {
    /// "ÚLTIMO": the fiscal year the filing reports on.
    Current,
    /// "PENÚLTIMO": the comparative figures for the year before.
    Prior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Currency {
    Brl,
}

/// Unit the archive expresses monetary values in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CurrencyScale {
    Unit,
    Thousand,
}

/// A company tax id (CNPJ), stored as its 14 digits.
///
/// Accepts plain digits ("191"), zero-filled digits ("00000000000191") and
/// the separator form ("00.000.000/0001-91"); shorter inputs are
/// zero-filled on the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cnpj([u8; 14]);

impl Cnpj {
    pub fn parse(text: &str) -> Result<Self> {
        let mut digits = [0u8; 14];
        let mut count = 0;

        for b in text.bytes() {
            match b {
                b'0'..=b'9' => {
                    if count == 14 {
                        return Err(Cnpj::invalid(text));
                    }
                    digits[count] = b - b'0';
                    count += 1;
                }
                b'.' | b'/' | b'-' => continue,
                _ => return Err(Cnpj::invalid(text)),
            }
        }

        if count == 0 {
            return Err(Cnpj::invalid(text));
        }

        digits.rotate_right(14 - count);
        Ok(Cnpj(digits))
    }

    fn invalid(text: &str) -> CvmError {
        CvmError::InvalidValue {
            field: "CNPJ_CIA",
            value: text.to_string(),
        }
    }
}

impl fmt::Display for Cnpj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.0.iter().enumerate() {
            match i {
                2 | 5 => f.write_str(".")?,
                8 => f.write_str("/")?,
                12 => f.write_str("-")?,
                _ => {}
            }
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

impl Serialize for Cnpj {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cnpj {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Cnpj::parse(&text).map_err(D::Error::custom)
    }
}

/// A row-level failure preserved on the [`Document`] it affected, together
/// with the raw record that caused it.
#[derive(Debug, Serialize)]
pub struct RowFault {
    #[serde(serialize_with = "serialize_display")]
    pub error: CvmError,
    pub row: RawStatementRecord,
}

fn serialize_display<S: Serializer>(
    error: &CvmError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// One company's statement set for one fiscal period.
///
/// A filing yields one `Document` per (period end, fiscal-year flag)
/// combination it covers: the reported year and the prior-year comparative
/// become separate documents sharing the same head metadata.
#[derive(Debug, Serialize)]
pub struct Document {
    pub cnpj: Cnpj,
    pub company_name: String,
    pub cvm_code: u32,
    pub kind: DocumentKind,
    /// Filing id assigned by the regulator.
    pub id: u64,
    /// Submission version; restatements bump it.
    pub version: u32,
    pub reference_date: NaiveDate,
    pub receipt_date: NaiveDate,
    pub url: String,
    pub period_end: NaiveDate,
    pub fiscal_year: FiscalYear,
    pub statements: Vec<StatementTree>,
    /// Row-level errors encountered while assembling this document.
    pub faults: Vec<RowFault>,
}

impl Document {
    /// The primary tree for a (scope, kind), skipping year-to-date "extra"
    /// income statements that ITR filings carry for intermediate quarters.
    pub fn tree(&self, scope: Scope, kind: StatementKind) -> Option<&StatementTree> {
        self.trees(scope, kind).find(|t| !t.is_year_to_date())
    }

    /// Every tree for a (scope, kind), including year-to-date extras and
    /// the per-column trees of equity-change statements.
    pub fn trees(
        &self,
        scope: Scope,
        kind: StatementKind,
    ) -> impl Iterator<Item = &StatementTree> {
        self.statements
            .iter()
            .filter(move |t| t.scope == scope && t.kind == kind)
    }

    /// Look an account up across every statement of the document.
    pub fn account(&self, scope: Scope, code: &AccountCode) -> Option<&crate::tree::AccountNode> {
        self.statements
            .iter()
            .filter(|t| t.scope == scope)
            .find_map(|t| t.get(code))
    }

    /// Whether any row failed while this document was assembled.
    pub fn is_partial(&self) -> bool {
        !self.faults.is_empty()
    }
}
