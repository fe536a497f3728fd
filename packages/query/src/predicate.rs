//! Where-clause predicates.
//!
//! Predicates are built as a small tree and rendered to the exact wording
//! the feature service has always received, e.g.
//! `"ISSUED">=DATE '2024-01-01 00:00:00' AND "FINALED" IS null`.
//! The same tree can be evaluated against a record in memory, which is how
//! saved responses are filtered offline.

use std::fmt;

use chrono::NaiveDate;
use pdx_permits_permit_models::{
    DateField, DevTypeCode, FieldValue, IssuanceStage, PermitAttributes, SelectionState,
};

/// Column holding the development type label.
pub const TYPE_COLUMN: &str = "TYPE";

/// Joiner between conjoined fragments.
const AND: &str = " AND ";

/// A literal on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Renders as `DATE 'YYYY-MM-DD 00:00:00'`.
    Date(NaiveDate),
    /// Renders single-quoted, with embedded quotes doubled.
    Text(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write!(f, "DATE '{} 00:00:00'", date.format("%Y-%m-%d")),
            Self::Text(text) => write!(f, "'{}'", text.replace('\'', "''")),
        }
    }
}

/// A boolean filter over permit attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `"COLUMN">=literal`
    AtLeast {
        /// Column name.
        column: String,
        /// Lower bound (inclusive).
        bound: Literal,
    },
    /// `"COLUMN" IS null`
    IsNull {
        /// Column name.
        column: String,
    },
    /// `"COLUMN" IN (v1, v2, ...)`. An empty list renders as `IN ()`.
    In {
        /// Column name.
        column: String,
        /// Accepted values.
        values: Vec<Literal>,
    },
    /// Fragments joined with ` AND `.
    And(Vec<Self>),
}

impl Predicate {
    /// `"COLUMN">=bound`
    #[must_use]
    pub fn at_least(column: impl Into<String>, bound: Literal) -> Self {
        Self::AtLeast {
            column: column.into(),
            bound,
        }
    }

    /// `"COLUMN" IS null`
    #[must_use]
    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull {
            column: column.into(),
        }
    }

    /// Conjoins `self` with `other`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Evaluates the predicate against one record, following SQL
    /// semantics for `null`: a comparison against a missing value is false.
    #[must_use]
    pub fn evaluate(&self, attributes: &PermitAttributes) -> bool {
        match self {
            Self::AtLeast { column, bound } => {
                match (attributes.field(column), bound) {
                    (FieldValue::Date(value), Literal::Date(date)) => {
                        value >= date.and_time(chrono::NaiveTime::MIN).and_utc()
                    }
                    (FieldValue::Text(value), Literal::Text(text)) => value >= *text,
                    _ => false,
                }
            }
            Self::IsNull { column } => attributes.field(column).is_null(),
            Self::In { column, values } => match attributes.field(column) {
                FieldValue::Text(value) => values
                    .iter()
                    .any(|v| matches!(v, Literal::Text(text) if *text == value)),
                _ => false,
            },
            Self::And(parts) => parts.iter().all(|p| p.evaluate(attributes)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtLeast { column, bound } => write!(f, "\"{column}\">={bound}"),
            Self::IsNull { column } => write!(f, "\"{column}\" IS null"),
            Self::In { column, values } => {
                write!(f, "\"{column}\" IN (")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str(")")
            }
            Self::And(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(AND)?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
        }
    }
}

/// Stage filter: the stage's own date is on or after `cutoff`, and later
/// stages have not happened yet.
#[must_use]
pub fn stage_predicate(stage: IssuanceStage, cutoff: &Literal) -> Predicate {
    let since = |field: DateField| Predicate::at_least(field.column(), cutoff.clone());
    let unset = |field: DateField| Predicate::is_null(field.column());

    match stage {
        IssuanceStage::Review => since(DateField::IntakeComplete)
            .and(unset(DateField::Issued))
            .and(unset(DateField::Finaled)),
        IssuanceStage::Issued => since(DateField::Issued).and(unset(DateField::Finaled)),
        IssuanceStage::Finaled => since(DateField::Finaled),
    }
}

/// Development type filter over the checked codes, in `sfr, thrh, duplex`
/// order. With nothing checked this is `"TYPE" IN ()`, which the service
/// treats as matching nothing.
#[must_use]
pub fn dev_type_predicate(selection: &SelectionState) -> Predicate {
    let values = DevTypeCode::ALL
        .iter()
        .filter(|code| selection.includes(**code))
        .flat_map(|code| code.type_labels())
        .map(|label| Literal::Text((*label).to_string()))
        .collect::<Vec<_>>();

    if values.is_empty() {
        log::warn!("No development types selected; the type filter will match nothing");
    }

    Predicate::In {
        column: TYPE_COLUMN.to_string(),
        values,
    }
}

/// Full where clause for a selection: stage filter ` AND ` type filter.
#[must_use]
pub fn where_predicate(selection: &SelectionState, cutoff: &Literal) -> Predicate {
    Predicate::And(vec![
        stage_predicate(selection.issuance, cutoff),
        dev_type_predicate(selection),
    ])
}
