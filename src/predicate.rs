//! # Predicates
//!
//! The predicate tree produced by the builder DSL and consumed by three
//! customers: filter execution (evaluation over relation entries), the
//! optimizer (free-table analysis for pushdown, equi-join detection for
//! hash joins), and index selection (range expressibility).
//!
//! Evaluation follows SQL three-valued logic collapsed to two: a
//! comparison involving NULL or incomparable types is UNKNOWN, and
//! UNKNOWN never satisfies a predicate. `is_null` / `is_not_null` are the
//! only NULL-observing tests.

use crate::encoding::{key::coerce_for_column, encode_value, KeyRange};
use crate::relation::RelationEntry;
use crate::schema::{Column, TableDef};
use crate::types::Value;
use eyre::Result;
use hashbrown::HashSet;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparator {
    fn matches(&self, ord: Ordering) -> bool {
        match self {
            Comparator::Eq => ord == Ordering::Equal,
            Comparator::Neq => ord != Ordering::Equal,
            Comparator::Lt => ord == Ordering::Less,
            Comparator::Lte => ord != Ordering::Greater,
            Comparator::Gt => ord == Ordering::Greater,
            Comparator::Gte => ord != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column op literal`.
    Comparison {
        column: Column,
        op: Comparator,
        value: Value,
    },
    /// `column BETWEEN low AND high` (closed on both ends).
    Between {
        column: Column,
        low: Value,
        high: Value,
    },
    /// `column IN (values)`.
    InList { column: Column, values: Vec<Value> },
    IsNull { column: Column },
    IsNotNull { column: Column },
    /// `left op right` across two columns; the join predicate form.
    ColumnComparison {
        left: Column,
        op: Comparator,
        right: Column,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

/// Conjunction helper; flattens nested `And`s.
pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    let mut flat = Vec::new();
    for p in predicates {
        match p {
            Predicate::And(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    if flat.len() == 1 {
        flat.pop().unwrap()
    } else {
        Predicate::And(flat)
    }
}

/// Disjunction helper.
pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    let flat: Vec<Predicate> = predicates.into_iter().collect();
    if flat.len() == 1 {
        flat.into_iter().next().unwrap()
    } else {
        Predicate::Or(flat)
    }
}

impl Predicate {
    pub fn evaluate(&self, entry: &RelationEntry) -> bool {
        match self {
            Predicate::Comparison { column, op, value } => entry
                .get_field(column)
                .and_then(|field| field.compare(value))
                .map(|ord| op.matches(ord))
                .unwrap_or(false),
            Predicate::Between { column, low, high } => {
                let Some(field) = entry.get_field(column) else {
                    return false;
                };
                let ge_low = field
                    .compare(low)
                    .map(|o| o != Ordering::Less)
                    .unwrap_or(false);
                let le_high = field
                    .compare(high)
                    .map(|o| o != Ordering::Greater)
                    .unwrap_or(false);
                ge_low && le_high
            }
            Predicate::InList { column, values } => entry
                .get_field(column)
                .map(|field| {
                    values
                        .iter()
                        .any(|v| field.compare(v) == Some(Ordering::Equal))
                })
                .unwrap_or(false),
            Predicate::IsNull { column } => entry
                .get_field(column)
                .map(Value::is_null)
                .unwrap_or(true),
            Predicate::IsNotNull { column } => entry
                .get_field(column)
                .map(|v| !v.is_null())
                .unwrap_or(false),
            Predicate::ColumnComparison { left, op, right } => {
                let (Some(l), Some(r)) = (entry.get_field(left), entry.get_field(right)) else {
                    return false;
                };
                l.compare(r).map(|ord| op.matches(ord)).unwrap_or(false)
            }
            Predicate::And(ps) => ps.iter().all(|p| p.evaluate(entry)),
            Predicate::Or(ps) => ps.iter().any(|p| p.evaluate(entry)),
        }
    }

    /// Tables whose columns appear anywhere in the predicate.
    pub fn tables(&self) -> HashSet<String> {
        let mut tables = HashSet::new();
        self.collect_tables(&mut tables);
        tables
    }

    fn collect_tables(&self, out: &mut HashSet<String>) {
        match self {
            Predicate::Comparison { column, .. }
            | Predicate::Between { column, .. }
            | Predicate::InList { column, .. }
            | Predicate::IsNull { column }
            | Predicate::IsNotNull { column } => {
                out.insert(column.table().to_string());
            }
            Predicate::ColumnComparison { left, right, .. } => {
                out.insert(left.table().to_string());
                out.insert(right.table().to_string());
            }
            Predicate::And(ps) | Predicate::Or(ps) => {
                for p in ps {
                    p.collect_tables(out);
                }
            }
        }
    }

    /// When this atomic predicate constrains a single column to a key
    /// range, returns `(column, range)`. Conjunctions are handled by the
    /// index-selection rule, which intersects the per-conjunct ranges.
    pub fn as_key_range(&self, table: &TableDef) -> Result<Option<(String, KeyRange)>> {
        match self {
            Predicate::Comparison { column, op, value } => {
                if column.table() != table.name() {
                    return Ok(None);
                }
                let data_type = table.column(column.name())?.data_type();
                let key = encode_value(&coerce_for_column(value, data_type)?);
                let range = match op {
                    Comparator::Eq => KeyRange::only(key),
                    Comparator::Lt => KeyRange::upper_bound(key, true),
                    Comparator::Lte => KeyRange::upper_bound(key, false),
                    Comparator::Gt => KeyRange::lower_bound(key, true),
                    Comparator::Gte => KeyRange::lower_bound(key, false),
                    Comparator::Neq => return Ok(None),
                };
                Ok(Some((column.name().to_string(), range)))
            }
            Predicate::Between { column, low, high } => {
                if column.table() != table.name() {
                    return Ok(None);
                }
                let data_type = table.column(column.name())?.data_type();
                let low_key = encode_value(&coerce_for_column(low, data_type)?);
                let high_key = encode_value(&coerce_for_column(high, data_type)?);
                Ok(Some((
                    column.name().to_string(),
                    KeyRange::new(Some(low_key), Some(high_key), false, false),
                )))
            }
            _ => Ok(None),
        }
    }

    /// Detects the hash-joinable shape: an equality between exactly one
    /// column on each side.
    pub fn as_equi_join(&self) -> Option<(&Column, &Column)> {
        match self {
            Predicate::ColumnComparison {
                left,
                op: Comparator::Eq,
                right,
            } if left.table() != right.table() => Some((left, right)),
            _ => None,
        }
    }

    /// Conjuncts of a conjunction, or the predicate itself.
    pub fn conjuncts(&self) -> Vec<&Predicate> {
        match self {
            Predicate::And(ps) => ps.iter().collect(),
            other => vec![other],
        }
    }
}

// Predicate constructors live on `Column` so the builder DSL reads the
// way queries are written: `users_age.gte(Value::Int(21))`.
impl Column {
    pub fn eq(&self, value: impl Into<Value>) -> Predicate {
        self.compare(Comparator::Eq, value)
    }

    pub fn neq(&self, value: impl Into<Value>) -> Predicate {
        self.compare(Comparator::Neq, value)
    }

    pub fn lt(&self, value: impl Into<Value>) -> Predicate {
        self.compare(Comparator::Lt, value)
    }

    pub fn lte(&self, value: impl Into<Value>) -> Predicate {
        self.compare(Comparator::Lte, value)
    }

    pub fn gt(&self, value: impl Into<Value>) -> Predicate {
        self.compare(Comparator::Gt, value)
    }

    pub fn gte(&self, value: impl Into<Value>) -> Predicate {
        self.compare(Comparator::Gte, value)
    }

    fn compare(&self, op: Comparator, value: impl Into<Value>) -> Predicate {
        Predicate::Comparison {
            column: self.clone(),
            op,
            value: value.into(),
        }
    }

    pub fn between(&self, low: impl Into<Value>, high: impl Into<Value>) -> Predicate {
        Predicate::Between {
            column: self.clone(),
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn in_list(&self, values: impl IntoIterator<Item = Value>) -> Predicate {
        Predicate::InList {
            column: self.clone(),
            values: values.into_iter().collect(),
        }
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::IsNull {
            column: self.clone(),
        }
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::IsNotNull {
            column: self.clone(),
        }
    }

    /// Column-to-column comparison; the join predicate form.
    pub fn eq_col(&self, other: &Column) -> Predicate {
        Predicate::ColumnComparison {
            left: self.clone(),
            op: Comparator::Eq,
            right: other.clone(),
        }
    }
}
