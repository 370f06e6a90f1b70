//! Normalization of the archive's locale-specific field values
//!
//! Everything the regulator encodes as Portuguese labels or locale-formatted
//! text is turned into typed values here. All lookup tables are closed:
//! an unrecognized value surfaces as an error, never as a silent default.

use crate::error::{CvmError, Result};
use crate::types::{CashFlowMethod, Currency, CurrencyScale, DocumentKind, FiscalYear, Scope, StatementKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

/// The (scope, kind, method) triple a `GRUPO_DFP` label decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementGroup {
    pub scope: Scope,
    pub kind: StatementKind,
    pub method: Option<CashFlowMethod>,
}

impl StatementGroup {
    const fn new(scope: Scope, kind: StatementKind) -> Self {
        Self { scope, kind, method: None }
    }

    const fn cash_flow(scope: Scope, method: CashFlowMethod) -> Self {
        Self { scope, kind: StatementKind::CashFlow, method: Some(method) }
    }
}

static STATEMENT_GROUPS: OnceLock<HashMap<&'static str, StatementGroup>> = OnceLock::new();

fn statement_groups() -> &'static HashMap<&'static str, StatementGroup> {
    use CashFlowMethod::{Direct, Indirect};
    use Scope::{Consolidated, Individual};
    use StatementKind::*;

    STATEMENT_GROUPS.get_or_init(|| {
        let mut m = HashMap::with_capacity(16);

        m.insert("DF Consolidado - Balanço Patrimonial Ativo", StatementGroup::new(Consolidated, BalanceSheetAssets));
        m.insert("DF Individual - Balanço Patrimonial Ativo", StatementGroup::new(Individual, BalanceSheetAssets));
        m.insert("DF Consolidado - Balanço Patrimonial Passivo", StatementGroup::new(Consolidated, BalanceSheetLiabilities));
        m.insert("DF Individual - Balanço Patrimonial Passivo", StatementGroup::new(Individual, BalanceSheetLiabilities));
        m.insert("DF Consolidado - Demonstração do Resultado", StatementGroup::new(Consolidated, IncomeStatement));
        m.insert("DF Individual - Demonstração do Resultado", StatementGroup::new(Individual, IncomeStatement));
        m.insert("DF Consolidado - Demonstração de Resultado Abrangente", StatementGroup::new(Consolidated, ComprehensiveIncome));
        m.insert("DF Individual - Demonstração de Resultado Abrangente", StatementGroup::new(Individual, ComprehensiveIncome));
        m.insert("DF Consolidado - Demonstração do Fluxo de Caixa (Método Direto)", StatementGroup::cash_flow(Consolidated, Direct));
        m.insert("DF Individual - Demonstração do Fluxo de Caixa (Método Direto)", StatementGroup::cash_flow(Individual, Direct));
        m.insert("DF Consolidado - Demonstração do Fluxo de Caixa (Método Indireto)", StatementGroup::cash_flow(Consolidated, Indirect));
        m.insert("DF Individual - Demonstração do Fluxo de Caixa (Método Indireto)", StatementGroup::cash_flow(Individual, Indirect));
        m.insert("DF Consolidado - Demonstração das Mutações do Patrimônio Líquido", StatementGroup::new(Consolidated, EquityChange));
        m.insert("DF Individual - Demonstração das Mutações do Patrimônio Líquido", StatementGroup::new(Individual, EquityChange));
        m.insert("DF Consolidado - Demonstração de Valor Adicionado", StatementGroup::new(Consolidated, ValueAdded));
        m.insert("DF Individual - Demonstração de Valor Adicionado", StatementGroup::new(Individual, ValueAdded));

        m
    })
}

/// Decode a `GRUPO_DFP` label into its (scope, kind, method) triple.
pub fn statement_group(value: &str) -> Result<StatementGroup> {
    statement_groups()
        .get(value.trim())
        .copied()
        .ok_or_else(|| CvmError::UnknownEnumValue {
            field: "GRUPO_DFP",
            value: value.to_string(),
        })
}

/// Parse the archive's fixed `YYYY-MM-DD` date format.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| CvmError::InvalidDate(value.to_string()))
}

/// Parse a monetary value without precision loss.
///
/// When a comma is present it is the decimal separator and any dots are
/// thousands separators ("1.234,56"); otherwise the value is plain decimal
/// text. The currency-scale factor is NOT applied here; it travels as
/// [`CurrencyScale`] and is only multiplied in by
/// [`StatementTree::normalized`](crate::StatementTree::normalized).
pub fn parse_decimal(field: &'static str, value: &str) -> Result<Decimal> {
    let text = value.trim();

    let plain: Cow<'_, str> = if text.contains(',') {
        Cow::Owned(text.replace('.', "").replace(',', "."))
    } else {
        Cow::Borrowed(text)
    };

    Decimal::from_str(&plain).map_err(|_| CvmError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

/// `ORDEM_EXERC`: "ÚLTIMO" or "PENÚLTIMO", case-insensitive.
pub fn fiscal_year(value: &str) -> Result<FiscalYear> {
    match value.trim().to_lowercase().as_str() {
        "último" => Ok(FiscalYear::Current),
        "penúltimo" => Ok(FiscalYear::Prior),
        _ => Err(unknown("ORDEM_EXERC", value)),
    }
}

/// `MOEDA`: only "REAL" appears in published archives.
pub fn currency(value: &str) -> Result<Currency> {
    if value.trim().eq_ignore_ascii_case("REAL") {
        Ok(Currency::Brl)
    } else {
        Err(unknown("MOEDA", value))
    }
}

/// `ESCALA_MOEDA`: "UNIDADE" or "MIL", case-insensitive.
pub fn currency_scale(value: &str) -> Result<CurrencyScale> {
    let v = value.trim();
    if v.eq_ignore_ascii_case("UNIDADE") {
        Ok(CurrencyScale::Unit)
    } else if v.eq_ignore_ascii_case("MIL") {
        Ok(CurrencyScale::Thousand)
    } else {
        Err(unknown("ESCALA_MOEDA", value))
    }
}

/// `CATEG_DOC`: "DFP" or "ITR".
pub fn document_kind(value: &str) -> Result<DocumentKind> {
    let v = value.trim();
    if v.eq_ignore_ascii_case("DFP") {
        Ok(DocumentKind::Dfp)
    } else if v.eq_ignore_ascii_case("ITR") {
        Ok(DocumentKind::Itr)
    } else {
        Err(unknown("CATEG_DOC", value))
    }
}

fn unknown(field: &'static str, value: &str) -> CvmError {
    CvmError::UnknownEnumValue {
        field,
        value: value.to_string(),
    }
}
