//! Groups statement rows into per-period documents
//!
//! One filing's rows mix the reported year with the prior-year comparative,
//! individual with consolidated scope, and every statement kind, in archive
//! order. This module demultiplexes them, resolves restatements, builds the
//! account trees and emits one [`Document`] per (fiscal-year flag, period
//! end) combination.

use crate::code::AccountCode;
use crate::error::CvmError;
use crate::normalize;
use crate::row::{AccountRow, DocumentHead, RawStatementRecord};
use crate::tree::{build_forest, StatementTree};
use crate::types::{CashFlowMethod, Document, FiscalYear, RowFault, Scope, StatementKind};
use chrono::NaiveDate;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// One emitted document per group key; ordering is the emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    fiscal_year: FiscalYear,
    period_end: NaiveDate,
}

/// One statement tree per sub-key within a group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SubKey {
    scope: Scope,
    kind: StatementKind,
    method: Option<CashFlowMethod>,
    period_start: Option<NaiveDate>,
    column: Option<String>,
}

type Bucket = BTreeMap<AccountCode, (AccountRow, RawStatementRecord)>;

#[derive(Debug, Default)]
struct Group {
    buckets: BTreeMap<SubKey, Bucket>,
    faults: Vec<RowFault>,
}

/// Assemble every document of one filing from its statement rows.
///
/// Always yields at least one document: a filing whose statement files are
/// empty (old submission formats) still carries its head metadata.
pub(crate) fn assemble(head: DocumentHead, raw_rows: Vec<RawStatementRecord>) -> Vec<Document> {
    let mut groups: BTreeMap<GroupKey, Group> = BTreeMap::new();
    let mut stray: Vec<RowFault> = Vec::new();

    for raw in raw_rows {
        match AccountRow::from_raw(&raw) {
            Ok(row) => {
                let key = GroupKey {
                    fiscal_year: row.fiscal_year,
                    period_end: row.period_end,
                };
                let sub = SubKey {
                    scope: row.scope,
                    kind: row.kind,
                    method: row.method,
                    period_start: row.period_start,
                    column: row.column.clone(),
                };

                let group = groups.entry(key).or_default();
                let bucket = group.buckets.entry(sub).or_default();
                insert_row(bucket, &mut group.faults, row, raw);
            }
            Err(error) => {
                // Route the fault to its period group when the grouping
                // fields themselves are readable.
                match group_key_of_raw(&raw) {
                    Some(key) => groups.entry(key).or_default().faults.push(RowFault { error, row: raw }),
                    None => stray.push(RowFault { error, row: raw }),
                }
            }
        }
    }

    let mut documents: Vec<Document> = Vec::new();

    for (key, group) in groups {
        let mut faults = group.faults;
        let mut statements = Vec::new();

        for (sub, bucket) in group.buckets {
            let (currency, scale) = match bucket.values().next() {
                Some((first, _)) => (first.currency, first.scale),
                None => continue,
            };

            let rows: Vec<_> = bucket.into_values().collect();
            let (roots, partial) = build_forest(rows, &mut faults);

            statements.push(StatementTree {
                scope: sub.scope,
                kind: sub.kind,
                method: sub.method,
                column: sub.column,
                fiscal_year: key.fiscal_year,
                currency,
                scale,
                period_start: sub.period_start,
                period_end: key.period_end,
                roots,
                partial,
            });
        }

        documents.push(make_document(&head, key, statements, faults));
    }

    if let Some(first) = documents.first_mut() {
        first.faults.extend(stray);
    } else {
        let key = GroupKey {
            fiscal_year: FiscalYear::Current,
            period_end: head.reference_date,
        };
        documents.push(make_document(&head, key, Vec::new(), stray));
    }

    for doc in &documents {
        if doc.is_partial() {
            log::warn!(
                "document #{} ('{}' version {}): {} row fault(s)",
                doc.id,
                doc.company_name,
                doc.version,
                doc.faults.len()
            );
        }
    }

    documents
}

/// Resolve a code collision inside one sub-bucket.
///
/// A higher submission version supersedes a lower one. At equal versions an
/// identical payload is the archive's known row-duplication quirk and the
/// first row stands; a differing payload is ambiguous, so both rows go to
/// the fault list and the first-seen row stands.
fn insert_row(
    bucket: &mut Bucket,
    faults: &mut Vec<RowFault>,
    row: AccountRow,
    raw: RawStatementRecord,
) {
    match bucket.entry(row.code.clone()) {
        Entry::Vacant(slot) => {
            slot.insert((row, raw));
        }
        Entry::Occupied(mut slot) => {
            let (existing, _) = slot.get();

            if row.version > existing.version {
                log::debug!(
                    "account {}: version {} supersedes {}",
                    row.code,
                    row.version,
                    existing.version
                );
                slot.insert((row, raw));
            } else if row.version < existing.version {
                log::debug!(
                    "account {}: keeping version {}, ignoring {}",
                    row.code,
                    existing.version,
                    row.version
                );
            } else if row.value == existing.value && row.description == existing.description {
                // Exact duplicate rows do appear in published archives.
            } else {
                let (existing, existing_raw) = slot.get();
                faults.push(RowFault {
                    error: CvmError::DuplicateUnresolved {
                        code: existing.code.clone(),
                        version: existing.version,
                    },
                    row: existing_raw.clone(),
                });
                faults.push(RowFault {
                    error: CvmError::DuplicateUnresolved {
                        code: row.code.clone(),
                        version: row.version,
                    },
                    row: raw,
                });
            }
        }
    }
}

fn group_key_of_raw(raw: &RawStatementRecord) -> Option<GroupKey> {
    let fiscal_year = normalize::fiscal_year(&raw.fiscal_year).ok()?;
    let period_end = normalize::parse_date(&raw.period_end).ok()?;
    Some(GroupKey { fiscal_year, period_end })
}

fn make_document(
    head: &DocumentHead,
    key: GroupKey,
    statements: Vec<StatementTree>,
    faults: Vec<RowFault>,
) -> Document {
    Document {
        cnpj: head.cnpj,
        company_name: head.company_name.clone(),
        cvm_code: head.cvm_code,
        kind: head.kind,
        id: head.id,
        version: head.version,
        reference_date: head.reference_date,
        receipt_date: head.receipt_date,
        url: head.url.clone(),
        period_end: key.period_end,
        fiscal_year: key.fiscal_year,
        statements,
        faults,
    }
}
