//! Index keys, key ranges and cursor options.
//!
//! ```text
//! KeyRange::only("ps-1")                   value == "ps-1"
//! KeyRange::lower_bound(10, true)          value >  10
//! KeyRange::upper_bound("2024-06", false)  value <= "2024-06"
//! KeyRange::bound(a, b, false, true)       a <= value < b
//! ```
//!
//! Ordering follows SQLite: every number sorts before every string, and
//! integers compare numerically with reals.

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};
use serde_json::Value;

/// A value an index can hold.
///
/// Only numbers and strings are indexable. `null`, booleans and objects
/// are skipped when index entries are computed, so records carrying them
/// in an indexed field are simply absent from that index.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexKey {
    /// Whole number
    Integer(i64),
    /// Floating point number
    Real(f64),
    /// Text
    Text(String),
}

impl IndexKey {
    /// Convert a scalar JSON value. Returns `None` for anything that is not
    /// indexable.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(IndexKey::Text(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(IndexKey::Integer(i))
                } else {
                    n.as_f64().map(IndexKey::Real)
                }
            }
            _ => None,
        }
    }

    /// The key as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            IndexKey::Text(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn from_sql(value: SqlValue) -> Option<Self> {
        match value {
            SqlValue::Integer(i) => Some(IndexKey::Integer(i)),
            SqlValue::Real(r) => Some(IndexKey::Real(r)),
            SqlValue::Text(s) => Some(IndexKey::Text(s)),
            _ => None,
        }
    }
}

impl ToSql for IndexKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            IndexKey::Integer(i) => ToSqlOutput::from(*i),
            IndexKey::Real(r) => ToSqlOutput::from(*r),
            IndexKey::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

impl From<&str> for IndexKey {
    fn from(s: &str) -> Self {
        IndexKey::Text(s.to_string())
    }
}

impl From<String> for IndexKey {
    fn from(s: String) -> Self {
        IndexKey::Text(s)
    }
}

impl From<&String> for IndexKey {
    fn from(s: &String) -> Self {
        IndexKey::Text(s.clone())
    }
}

impl From<i64> for IndexKey {
    fn from(i: i64) -> Self {
        IndexKey::Integer(i)
    }
}

impl From<i32> for IndexKey {
    fn from(i: i32) -> Self {
        IndexKey::Integer(i64::from(i))
    }
}

impl From<f64> for IndexKey {
    fn from(r: f64) -> Self {
        IndexKey::Real(r)
    }
}

/// One end of a [`KeyRange`].
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBound {
    /// The boundary value
    pub key: IndexKey,
    /// Exclude the boundary value itself
    pub open: bool,
}

/// A contiguous interval over index (or primary key) values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyRange {
    /// Lower end, unbounded when `None`
    pub lower: Option<RangeBound>,
    /// Upper end, unbounded when `None`
    pub upper: Option<RangeBound>,
}

impl KeyRange {
    /// Exactly one value.
    pub fn only(key: impl Into<IndexKey>) -> Self {
        let key = key.into();
        Self {
            lower: Some(RangeBound {
                key: key.clone(),
                open: false,
            }),
            upper: Some(RangeBound { key, open: false }),
        }
    }

    /// Everything above `key`.
    pub fn lower_bound(key: impl Into<IndexKey>, open: bool) -> Self {
        Self {
            lower: Some(RangeBound {
                key: key.into(),
                open,
            }),
            upper: None,
        }
    }

    /// Everything below `key`.
    pub fn upper_bound(key: impl Into<IndexKey>, open: bool) -> Self {
        Self {
            lower: None,
            upper: Some(RangeBound {
                key: key.into(),
                open,
            }),
        }
    }

    /// Everything between `lower` and `upper`.
    pub fn bound(
        lower: impl Into<IndexKey>,
        upper: impl Into<IndexKey>,
        lower_open: bool,
        upper_open: bool,
    ) -> Self {
        Self {
            lower: Some(RangeBound {
                key: lower.into(),
                open: lower_open,
            }),
            upper: Some(RangeBound {
                key: upper.into(),
                open: upper_open,
            }),
        }
    }

    /// Append the SQL conditions for this range on `column` to `clauses`,
    /// pushing the bound values onto `params` in placeholder order.
    pub(crate) fn push_sql(
        &self,
        column: &str,
        clauses: &mut Vec<String>,
        params: &mut Vec<IndexKey>,
    ) {
        if let Some(lower) = &self.lower {
            let op = if lower.open { ">" } else { ">=" };
            params.push(lower.key.clone());
            clauses.push(format!("{column} {op} ?"));
        }
        if let Some(upper) = &self.upper {
            let op = if upper.open { "<" } else { "<=" };
            params.push(upper.key.clone());
            clauses.push(format!("{column} {op} ?"));
        }
    }
}

/// Cursor direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending
    #[default]
    Next,
    /// Ascending, first record per distinct index value
    NextUnique,
    /// Descending
    Prev,
    /// Descending, first record per distinct index value
    PrevUnique,
}

impl Direction {
    /// True for the descending variants.
    pub fn is_reverse(self) -> bool {
        matches!(self, Direction::Prev | Direction::PrevUnique)
    }

    /// True for the de-duplicating variants.
    pub fn is_unique(self) -> bool {
        matches!(self, Direction::NextUnique | Direction::PrevUnique)
    }
}

/// Options for [`StoreTxn::query`](super::StoreTxn::query).
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Query this index instead of the primary key
    pub index: Option<String>,
    /// Restrict to this range of (index or primary key) values
    pub range: Option<KeyRange>,
    /// Iteration order
    pub direction: Direction,
    /// Stop after this many records
    pub limit: Option<usize>,
}

impl QueryOptions {
    /// Query the primary key in ascending order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a secondary index.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Restrict to a key range.
    pub fn range(mut self, range: KeyRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Set the direction.
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Cap the number of records returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
