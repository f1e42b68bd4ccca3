//! 列表查询参数：`filter[<列>]=<值>`、`orderBy`、`ascending`、`limit`。

use std::{cmp::Ordering, collections::HashMap};

use serde_json::Value;
use softclin_protocol::codes;

use crate::api::error::ApiError;

const FILTER_PREFIX: &str = "filter[";

/// 解析后的列表查询。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListQuery {
    pub(crate) filters: Vec<(String, String)>,
    pub(crate) order_by: Option<String>,
    pub(crate) ascending: bool,
    pub(crate) limit: Option<usize>,
}

impl ListQuery {
    /// 从 query 参数解析；列名必须在 `columns` 内，未知的非过滤参数忽略。
    pub(crate) fn parse(
        params: &HashMap<String, String>,
        columns: &[&str],
    ) -> Result<Self, ApiError> {
        let mut filters = Vec::new();
        for (key, value) in params {
            let Some(column) = filter_column(key) else {
                continue;
            };
            ensure_column(column, columns)?;
            filters.push((column.to_string(), value.clone()));
        }
        filters.sort();

        let order_by = match params.get("orderBy").map(|raw| raw.trim()) {
            None | Some("") => None,
            Some(column) => {
                ensure_column(column, columns)?;
                Some(column.to_string())
            }
        };

        let ascending = match params.get("ascending").map(String::as_str) {
            None | Some("true") => true,
            Some("false") => false,
            Some(other) => {
                return Err(ApiError::bad_request(
                    codes::INVALID_QUERY,
                    format!("`ascending` must be true or false, got `{other}`"),
                ));
            }
        };

        let limit = match params.get("limit") {
            None => None,
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|_| {
                ApiError::bad_request(
                    codes::INVALID_QUERY,
                    format!("`limit` must be a non-negative integer, got `{raw}`"),
                )
            })?),
        };

        Ok(Self {
            filters,
            order_by,
            ascending,
            limit,
        })
    }

    /// 行是否满足全部等值过滤。
    pub(crate) fn matches(&self, row: &Value) -> bool {
        self.filters
            .iter()
            .all(|(column, expected)| value_matches(row.get(column), expected))
    }

    /// 按 `orderBy` 比较两行；未指定时保持原顺序。
    pub(crate) fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let Some(column) = &self.order_by else {
            return Ordering::Equal;
        };
        let ordering = compare_json(a.get(column), b.get(column));
        if self.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    }
}

/// 更新/删除接口要求的 `filter[id]`。
pub(crate) fn id_filter(params: &HashMap<String, String>) -> Result<u64, ApiError> {
    let Some(raw) = params.get("filter[id]").map(|raw| raw.trim()) else {
        return Err(ApiError::bad_request(
            codes::MISSING_ID,
            "`filter[id]` is required",
        ));
    };
    if raw.is_empty() {
        return Err(ApiError::bad_request(
            codes::MISSING_ID,
            "`filter[id]` is required",
        ));
    }
    raw.parse::<u64>().map_err(|_| {
        ApiError::bad_request(
            codes::INVALID_QUERY,
            format!("`filter[id]` must be a numeric id, got `{raw}`"),
        )
    })
}

fn filter_column(key: &str) -> Option<&str> {
    key.strip_prefix(FILTER_PREFIX)?.strip_suffix(']')
}

fn ensure_column(column: &str, columns: &[&str]) -> Result<(), ApiError> {
    if columns.contains(&column) {
        return Ok(());
    }
    Err(ApiError::bad_request(
        codes::INVALID_QUERY,
        format!("unknown column `{column}`"),
    ))
}

/// 按文本形式比较单元格与过滤值。
fn value_matches(cell: Option<&Value>, expected: &str) -> bool {
    match cell {
        None | Some(Value::Null) => expected == "null",
        Some(Value::String(text)) => text == expected,
        Some(Value::Bool(flag)) => expected.parse::<bool>().is_ok_and(|v| v == *flag),
        Some(Value::Number(number)) => match (number.as_f64(), expected.parse::<f64>()) {
            (Some(left), Ok(right)) => left == right,
            _ => false,
        },
        Some(other) => other.to_string() == expected,
    }
}

/// 空值排在最前；不同类型之间按类型序比较。
fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
