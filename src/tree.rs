//! Account hierarchy reconstruction and traversal
//!
//! Statement rows arrive flat, one account per row, with the hierarchy
//! implicit in the dotted code. Rebuilding is a single pass over the rows
//! in code order: that order is exactly a depth-first walk of the finished
//! tree, so an ancestor stack is all the state needed.

use crate::code::AccountCode;
use crate::error::CvmError;
use crate::row::{AccountRow, RawStatementRecord};
use crate::types::{CashFlowMethod, Currency, CurrencyScale, FiscalYear, RowFault, Scope, StatementKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// One account line of a statement. Children are owned and ordered by
/// their trailing code segment.
#[derive(Debug, Clone, Serialize)]
pub struct AccountNode {
    pub code: AccountCode,
    pub description: String,
    pub value: Decimal,
    pub is_fixed: bool,
    pub children: Vec<AccountNode>,
}

/// The account tree of one statement: one (scope, kind) for one fiscal
/// period, under an implicit statement root that holds the depth-1 codes.
#[derive(Debug, Clone, Serialize)]
pub struct StatementTree {
    pub scope: Scope,
    pub kind: StatementKind,
    /// Set only for cash-flow statements.
    pub method: Option<CashFlowMethod>,
    /// Set only for equity-change statements, which publish one tree per
    /// equity-mutation column.
    pub column: Option<String>,
    pub fiscal_year: FiscalYear,
    pub currency: Currency,
    pub scale: CurrencyScale,
    pub period_start: Option<NaiveDate>,
    pub period_end: NaiveDate,
    pub roots: Vec<AccountNode>,
    /// True when at least one row of this statement failed to place.
    pub partial: bool,
}

impl StatementTree {
    /// Look up a node by its full code, navigating from the roots.
    pub fn get(&self, code: &AccountCode) -> Option<&AccountNode> {
        let mut nodes = &self.roots;
        let mut found = None;

        for segment in code.segments() {
            let index = nodes
                .binary_search_by_key(segment, |n| n.code.last_segment())
                .ok()?;
            let node = &nodes[index];
            found = Some(node);
            nodes = &node.children;
        }

        found
    }

    /// Depth-first traversal over every node of the tree.
    pub fn iter(&self) -> Walk<'_> {
        Walk {
            stack: self.roots.iter().rev().collect(),
        }
    }

    /// Flatten back to (code, value) pairs in depth-first order.
    pub fn flatten(&self) -> Vec<(AccountCode, Decimal)> {
        self.iter().map(|n| (n.code.clone(), n.value)).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Whether this is an "extra" year-to-date income statement. ITR
    /// filings for the second quarter onwards carry, besides the quarter
    /// itself, a statement covering the year so far; a full-year statement
    /// (360+ days) is not an extra.
    pub fn is_year_to_date(&self) -> bool {
        match self.period_start {
            Some(start) => {
                let days = (self.period_end - start).num_days();
                days > 91 && days < 360
            }
            None => false,
        }
    }

    /// A copy with every value scaled to currency units.
    pub fn normalized(&self) -> StatementTree {
        match self.scale {
            CurrencyScale::Unit => self.clone(),
            CurrencyScale::Thousand => {
                let factor = Decimal::from(1000);
                StatementTree {
                    scale: CurrencyScale::Unit,
                    roots: self.roots.iter().map(|r| scale_node(r, factor)).collect(),
                    ..self.clone()
                }
            }
        }
    }
}

fn scale_node(node: &AccountNode, factor: Decimal) -> AccountNode {
    AccountNode {
        code: node.code.clone(),
        description: node.description.clone(),
        value: node.value * factor,
        is_fixed: node.is_fixed,
        children: node.children.iter().map(|c| scale_node(c, factor)).collect(),
    }
}

/// Depth-first iterator over a statement tree.
pub struct Walk<'a> {
    stack: Vec<&'a AccountNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a AccountNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Build the forest of depth-1 subtrees from rows sorted by code.
///
/// A row whose direct parent is absent becomes an `OrphanAccount` fault and
/// is omitted, along with any of its descendants. Returns the roots and
/// whether any row failed to place.
pub(crate) fn build_forest(
    rows: Vec<(AccountRow, RawStatementRecord)>,
    faults: &mut Vec<RowFault>,
) -> (Vec<AccountNode>, bool) {
    let mut roots = Vec::new();
    let mut stack: Vec<AccountNode> = Vec::new();
    let mut partial = false;

    for (row, raw) in rows {
        // Unwind until the top of the stack is an ancestor of this code.
        while let Some(top) = stack.last() {
            if top.code.is_ancestor_of(&row.code) {
                break;
            }
            close(&mut stack, &mut roots);
        }

        let fits = match stack.last() {
            Some(top) => row.code.is_child_of(&top.code),
            None => row.code.depth() == 1,
        };

        if fits {
            stack.push(AccountNode {
                code: row.code,
                description: row.description,
                value: row.value,
                is_fixed: row.is_fixed,
                children: Vec::new(),
            });
        } else {
            partial = true;
            faults.push(RowFault {
                error: CvmError::OrphanAccount(row.code),
                row: raw,
            });
        }
    }

    while !stack.is_empty() {
        close(&mut stack, &mut roots);
    }

    (roots, partial)
}

fn close(stack: &mut Vec<AccountNode>, roots: &mut Vec<AccountNode>) {
    if let Some(node) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}
