use anyhow::{Result, anyhow};
use restbench_services::{HistoryFilter, HistoryQuery, StatusFilterMode, StatusPredicate};

/// Raw query string of the history endpoint. Everything arrives as text so
/// that empty values can be told apart from malformed ones.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

/// Validate and normalize history query parameters
pub struct HistoryQueryValidator {
    status_mode: StatusFilterMode,
}

impl HistoryQueryValidator {
    pub fn new(status_mode: StatusFilterMode) -> Self {
        Self { status_mode }
    }

    pub fn validate(&self, params: &HistoryParams) -> Result<HistoryQuery> {
        let page = parse_integer("page", params.page.as_deref())?;
        let limit = parse_integer("limit", params.limit.as_deref())?;

        let status = parse_integer("status", params.status.as_deref())?
            .map(|value| {
                i32::try_from(value)
                    .map(|code| StatusPredicate::from_value(code, self.status_mode))
                    .map_err(|_| anyhow!("'status' is out of range"))
            })
            .transpose()?;

        let filter = HistoryFilter {
            method: non_empty(params.method.as_deref()),
            status,
            search: non_empty(params.search.as_deref()),
        };

        let query = HistoryQuery::new(page, limit, filter);
        if let Some(requested) = page {
            if u64::try_from(requested).is_ok_and(|requested| requested > query.page) {
                return Err(anyhow!(
                    "'page' must not exceed {} for a limit of {}",
                    query.page,
                    query.limit
                ));
            }
        }

        Ok(query)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn parse_integer(name: &str, value: Option<&str>) -> Result<Option<i64>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| anyhow!("'{}' must be an integer, got '{}'", name, raw)),
    }
}
