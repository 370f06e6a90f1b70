//! Raw CSV records and their validated, typed form
//!
//! The archive's column schema is fixed and versioned; raw records keep the
//! original text of every field so that a failing row can be handed back to
//! the caller untouched. All validation happens in one place, when a raw
//! record is promoted to an [`AccountRow`] or [`DocumentHead`].

use crate::code::AccountCode;
use crate::error::{CvmError, Result};
use crate::normalize;
use crate::types::{CashFlowMethod, Cnpj, Currency, CurrencyScale, DocumentKind, FiscalYear, Scope, StatementKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One undecoded line of a statement member file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStatementRecord {
    #[serde(rename = "CNPJ_CIA", default)]
    pub cnpj: String,
    #[serde(rename = "DT_REFER", default)]
    pub reference_date: String,
    #[serde(rename = "VERSAO", default)]
    pub version: String,
    #[serde(rename = "DENOM_CIA", default)]
    pub company_name: String,
    #[serde(rename = "CD_CVM", default)]
    pub cvm_code: String,
    #[serde(rename = "GRUPO_DFP", default)]
    pub group: String,
    #[serde(rename = "MOEDA", default)]
    pub currency: String,
    #[serde(rename = "ESCALA_MOEDA", default)]
    pub scale: String,
    #[serde(rename = "ORDEM_EXERC", default)]
    pub fiscal_year: String,
    #[serde(rename = "DT_INI_EXERC", default)]
    pub period_start: Option<String>,
    #[serde(rename = "DT_FIM_EXERC", default)]
    pub period_end: String,
    #[serde(rename = "CD_CONTA", default)]
    pub code: String,
    #[serde(rename = "DS_CONTA", default)]
    pub description: String,
    #[serde(rename = "VL_CONTA", default)]
    pub value: String,
    #[serde(rename = "ST_CONTA_FIXA", default)]
    pub fixed: String,
    #[serde(rename = "COLUNA_DF", default)]
    pub column: Option<String>,
}

/// One undecoded line of the head member file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawHeadRecord {
    #[serde(rename = "CNPJ_CIA", default)]
    pub cnpj: String,
    #[serde(rename = "DT_REFER", default)]
    pub reference_date: String,
    #[serde(rename = "VERSAO", default)]
    pub version: String,
    #[serde(rename = "DENOM_CIA", default)]
    pub company_name: String,
    #[serde(rename = "CD_CVM", default)]
    pub cvm_code: String,
    #[serde(rename = "CATEG_DOC", default)]
    pub category: String,
    #[serde(rename = "ID_DOC", default)]
    pub id: String,
    #[serde(rename = "DT_RECEB", default)]
    pub receipt_date: String,
    #[serde(rename = "LINK_DOC", default)]
    pub url: String,
}

/// The repeated fields that tie statement rows to their head row.
///
/// Statement member files carry no document id; the (CNPJ, reference date,
/// version) triple repeats on every row of a filing and is the only link
/// back to the head file. Kept as raw text: both files print the fields
/// identically, so no parsing is needed to match them up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub cnpj: String,
    pub reference_date: String,
    pub version: String,
}

impl BatchKey {
    pub fn of_statement(record: &RawStatementRecord) -> Self {
        Self {
            cnpj: record.cnpj.trim().to_string(),
            reference_date: record.reference_date.trim().to_string(),
            version: record.version.trim().to_string(),
        }
    }

    pub fn of_head(record: &RawHeadRecord) -> Self {
        Self {
            cnpj: record.cnpj.trim().to_string(),
            reference_date: record.reference_date.trim().to_string(),
            version: record.version.trim().to_string(),
        }
    }
}

/// A fully validated statement row.
#[derive(Debug, Clone)]
pub struct AccountRow {
    pub cnpj: Cnpj,
    pub reference_date: NaiveDate,
    pub version: u32,
    pub scope: Scope,
    pub kind: StatementKind,
    pub method: Option<CashFlowMethod>,
    pub fiscal_year: FiscalYear,
    pub currency: Currency,
    pub scale: CurrencyScale,
    pub period_start: Option<NaiveDate>,
    pub period_end: NaiveDate,
    pub code: AccountCode,
    pub description: String,
    pub value: Decimal,
    /// "ST_CONTA_FIXA": whether the account belongs to the regulator's
    /// fixed chart of accounts.
    pub is_fixed: bool,
    /// "COLUNA_DF": the equity-mutation column of an equity-change row.
    pub column: Option<String>,
}

impl AccountRow {
    pub fn from_raw(raw: &RawStatementRecord) -> Result<Self> {
        let group = normalize::statement_group(required("GRUPO_DFP", &raw.group)?)?;

        Ok(AccountRow {
            cnpj: Cnpj::parse(required("CNPJ_CIA", &raw.cnpj)?)?,
            reference_date: normalize::parse_date(required("DT_REFER", &raw.reference_date)?)?,
            version: parse_u32("VERSAO", &raw.version)?,
            scope: group.scope,
            kind: group.kind,
            method: group.method,
            fiscal_year: normalize::fiscal_year(required("ORDEM_EXERC", &raw.fiscal_year)?)?,
            currency: normalize::currency(required("MOEDA", &raw.currency)?)?,
            scale: normalize::currency_scale(required("ESCALA_MOEDA", &raw.scale)?)?,
            period_start: non_empty(&raw.period_start)
                .map(normalize::parse_date)
                .transpose()?,
            period_end: normalize::parse_date(required("DT_FIM_EXERC", &raw.period_end)?)?,
            code: required("CD_CONTA", &raw.code)?.parse()?,
            description: raw.description.trim().to_string(),
            value: normalize::parse_decimal("VL_CONTA", required("VL_CONTA", &raw.value)?)?,
            is_fixed: raw.fixed.trim() == "S",
            column: non_empty(&raw.column).map(str::to_string),
        })
    }
}

/// Validated head metadata of a filing.
#[derive(Debug, Clone)]
pub struct DocumentHead {
    pub cnpj: Cnpj,
    pub reference_date: NaiveDate,
    pub version: u32,
    pub company_name: String,
    pub cvm_code: u32,
    pub kind: DocumentKind,
    pub id: u64,
    pub receipt_date: NaiveDate,
    pub url: String,
}

impl DocumentHead {
    pub fn from_raw(raw: &RawHeadRecord) -> Result<Self> {
        Ok(DocumentHead {
            cnpj: Cnpj::parse(required("CNPJ_CIA", &raw.cnpj)?)?,
            reference_date: normalize::parse_date(required("DT_REFER", &raw.reference_date)?)?,
            version: parse_u32("VERSAO", &raw.version)?,
            company_name: required("DENOM_CIA", &raw.company_name)?.to_string(),
            cvm_code: parse_u32("CD_CVM", &raw.cvm_code)?,
            kind: normalize::document_kind(required("CATEG_DOC", &raw.category)?)?,
            id: required("ID_DOC", &raw.id)?
                .parse()
                .map_err(|_| invalid("ID_DOC", &raw.id))?,
            receipt_date: normalize::parse_date(required("DT_RECEB", &raw.receipt_date)?)?,
            url: raw.url.trim().to_string(),
        })
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(CvmError::MissingField(field))
    } else {
        Ok(value)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_u32(field: &'static str, value: &str) -> Result<u32> {
    required(field, value)?
        .parse()
        .map_err(|_| invalid(field, value))
}

fn invalid(field: &'static str, value: &str) -> CvmError {
    CvmError::InvalidValue {
        field,
        value: value.to_string(),
    }
}
