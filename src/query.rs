//! Query-string conventions for listing endpoints: `filter.<field>[.<op>]=v`, `sort=a,-b`, `page`, `per_page`.
//! Parsing is pure and never fails except for explicit pagination values.

use crate::error::AppError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PER_PAGE: u64 = 10;

const FILTER_PREFIX: &str = "filter.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    /// Case-insensitive substring match.
    Like,
    // Reserved, accepted by the parser but not evaluated by any store.
    Gte,
    Lte,
    Start,
    End,
}

impl FilterOp {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Some(FilterOp::Eq),
            "like" => Some(FilterOp::Like),
            "gte" => Some(FilterOp::Gte),
            "lte" => Some(FilterOp::Lte),
            "start" => Some(FilterOp::Start),
            "end" => Some(FilterOp::End),
            _ => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, FilterOp::Eq | FilterOp::Like)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn like(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter {
            field: field.into(),
            op: FilterOp::Like,
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub descending: bool,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        SortField {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        SortField {
            field: field.into(),
            descending: true,
        }
    }
}

/// Filters and sort order for a listing, independent of pagination.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortField>,
}

impl ListQuery {
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_sort(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaginationParams {
    pub page: u64,
    pub per_page: u64,
}

impl Default for PaginationParams {
    fn default() -> Self {
        PaginationParams {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PaginationParams {
    pub fn new(page: u64, per_page: u64) -> Self {
        PaginationParams {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.per_page)
    }
}

/// Parse `filter.*` and `sort` parameters. Malformed tokens are ignored.
pub fn parse_query_params<K, V>(pairs: &[(K, V)]) -> ListQuery
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut query = ListQuery::default();
    let mut sort_param: Option<&str> = None;

    for (k, v) in pairs {
        let key = k.as_ref();
        if key == "sort" {
            sort_param = Some(v.as_ref());
            continue;
        }
        let Some(rest) = key.strip_prefix(FILTER_PREFIX) else {
            continue;
        };
        let mut parts = rest.splitn(2, '.');
        let field = parts.next().unwrap_or("").trim();
        if field.is_empty() {
            continue;
        }
        let op = match parts.next() {
            None => FilterOp::Eq,
            Some(op) => match FilterOp::parse(op) {
                Some(op) => op,
                None => continue,
            },
        };
        query.filters.push(Filter {
            field: field.to_string(),
            op,
            value: v.as_ref().to_string(),
        });
    }

    if let Some(sort) = sort_param {
        query.sort = parse_sort(sort);
    }
    query
}

fn parse_sort(s: &str) -> Vec<SortField> {
    s.split(',')
        .map(str::trim)
        .filter_map(|token| {
            let (field, descending) = match token.strip_prefix('-') {
                Some(f) => (f.trim(), true),
                None => (token, false),
            };
            if field.is_empty() {
                None
            } else {
                Some(SortField {
                    field: field.to_string(),
                    descending,
                })
            }
        })
        .collect()
}

/// `page` / `per_page`; absent means default, anything but a positive integer is rejected.
pub fn parse_pagination<K, V>(pairs: &[(K, V)]) -> Result<PaginationParams, AppError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut params = PaginationParams::default();
    for (k, v) in pairs {
        match k.as_ref() {
            "page" => params.page = positive(v.as_ref(), "page")?,
            "per_page" => params.per_page = positive(v.as_ref(), "per_page")?,
            _ => {}
        }
    }
    Ok(params)
}

fn positive(raw: &str, name: &str) -> Result<u64, AppError> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(AppError::BadRequest(format!("Invalid pagination param: {}", name))),
    }
}
