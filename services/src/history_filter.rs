use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{ColumnTrait, Condition, QueryFilter};
use std::fmt;
use std::str::FromStr;

use crate::entity::request_history;

/// How a submitted status value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilterMode {
    /// 200/300/400/500 select the whole hundred-range, anything else matches exactly
    #[default]
    Class,
    Exact,
}

impl FromStr for StatusFilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "class" => Ok(StatusFilterMode::Class),
            "exact" => Ok(StatusFilterMode::Exact),
            other => Err(format!("unknown status filter mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPredicate {
    Exact(i32),
    /// Inclusive start, exclusive end
    Range { start: i32, end: i32 },
}

impl StatusPredicate {
    pub fn from_value(value: i32, mode: StatusFilterMode) -> Self {
        match (mode, value) {
            (StatusFilterMode::Class, 200 | 300 | 400 | 500) => StatusPredicate::Range {
                start: value,
                end: value + 100,
            },
            _ => StatusPredicate::Exact(value),
        }
    }
}

impl fmt::Display for StatusPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusPredicate::Exact(code) => write!(f, "{}", code),
            StatusPredicate::Range { start, end } => write!(f, "{}-{}", start, end),
        }
    }
}

/// Optional constraints on the history list, ANDed together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub method: Option<String>,
    pub status: Option<StatusPredicate>,
    pub search: Option<String>,
}

impl HistoryFilter {
    pub fn is_empty(&self) -> bool {
        self.method.is_none() && self.status.is_none() && self.search.is_none()
    }

    /// Constrain `select`; an empty filter leaves it without a WHERE clause
    pub fn apply<S: QueryFilter>(&self, select: S) -> S {
        if self.is_empty() {
            select
        } else {
            select.filter(self.to_condition())
        }
    }

    /// Translate into a parameterized condition on `request_history`
    pub fn to_condition(&self) -> Condition {
        let mut condition = Condition::all();

        if let Some(method) = &self.method {
            condition = condition.add(request_history::Column::Method.eq(method.as_str()));
        }

        match self.status {
            Some(StatusPredicate::Exact(code)) => {
                condition = condition.add(request_history::Column::Status.eq(code));
            }
            Some(StatusPredicate::Range { start, end }) => {
                condition = condition
                    .add(request_history::Column::Status.gte(start))
                    .add(request_history::Column::Status.lt(end));
            }
            None => {}
        }

        if let Some(term) = &self.search {
            let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
            condition = condition.add(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(request_history::Column::Url)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(request_history::Column::Response)))
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }

        condition
    }

    /// Stable textual form, used to build cache keys
    pub fn cache_fragment(&self) -> String {
        format!(
            "m={}|s={}|q={}",
            self.method.as_deref().unwrap_or(""),
            self.status.map(|s| s.to_string()).unwrap_or_default(),
            self.search.as_deref().unwrap_or("")
        )
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
