use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::MySql;
use sqlx::mysql::MySqlArguments;
use sqlx::query::{QueryAs, QueryScalar};

use crate::error::{ApiError, ApiResult};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

fn to_sql_value(value: &Value) -> ApiResult<SqlValue> {
    Ok(match value {
        Value::String(s) => {
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                SqlValue::Date(d)
            } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                SqlValue::DateTime(dt)
            } else {
                SqlValue::String(s.clone())
            }
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::I64(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::F64(f)
            } else {
                return Err(ApiError::bad_request("Unsupported number"));
            }
        }
        Value::Bool(b) => SqlValue::Bool(*b),
        Value::Null => SqlValue::Null,
        _ => return Err(ApiError::bad_request("Unsupported JSON value type")),
    })
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Only keys listed in `allowed` may become columns.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_column: &str,
    id_value: u64,
) -> ApiResult<SqlUpdate> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ApiError::bad_request("No fields provided for update"));
    }

    if let Some(unknown) = obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(ApiError::bad_request(format!("Field '{unknown}' cannot be updated")));
    }

    let set_clause = obj
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values = Vec::with_capacity(obj.len() + 1);
    for value in obj.values() {
        values.push(to_sql_value(value)?);
    }

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &sqlx::MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// ===============================
/// Pagination and list filters
/// ===============================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(20).clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// `WHERE` conditions with their bind values, kept in the same order.
#[derive(Debug, Default)]
pub struct Filters {
    conditions: Vec<String>,
    args: Vec<SqlValue>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, condition: &str, value: SqlValue) -> &mut Self {
        self.conditions.push(condition.to_string());
        self.args.push(value);
        self
    }

    /// `(a LIKE ? OR b LIKE ?)` with the same `%term%` bound to every placeholder.
    /// Wildcards typed by the user match literally.
    pub fn search(&mut self, columns: &[&str], term: &str) -> &mut Self {
        let like = format!("%{}%", escape_like(term.trim()));
        let condition = columns
            .iter()
            .map(|c| format!("{c} LIKE ?"))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.conditions.push(format!("({condition})"));
        for _ in columns {
            self.args.push(SqlValue::String(like.clone()));
        }
        self
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn args(&self) -> &[SqlValue] {
        &self.args
    }
}

/// Escapes backslash, `%` and `_` for MySQL's default LIKE escape character.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

macro_rules! bind_values {
    ($query:expr, $values:expr) => {{
        let mut q = $query;
        for value in $values.iter().cloned() {
            q = match value {
                SqlValue::String(v) => q.bind(v),
                SqlValue::I64(v) => q.bind(v),
                SqlValue::U64(v) => q.bind(v),
                SqlValue::F64(v) => q.bind(v),
                SqlValue::Bool(v) => q.bind(v),
                SqlValue::Date(v) => q.bind(v),
                SqlValue::DateTime(v) => q.bind(v),
                SqlValue::Null => q.bind(None::<String>),
            };
        }
        q
    }};
}

pub fn bind_as<'q, O>(
    query: QueryAs<'q, MySql, O, MySqlArguments>,
    values: &[SqlValue],
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    bind_values!(query, values)
}

pub fn bind_scalar<'q, O>(
    query: QueryScalar<'q, MySql, O, MySqlArguments>,
    values: &[SqlValue],
) -> QueryScalar<'q, MySql, O, MySqlArguments> {
    bind_values!(query, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: [&str; 3] = ["full_name", "hire_date", "base_salary"];

    #[test]
    fn builds_update_for_allowed_columns() {
        let update = build_update_sql(
            "employees",
            &json!({ "full_name": "Maria", "hire_date": "2024-01-02", "base_salary": 3100.5 }),
            &COLUMNS,
            "id",
            9,
        )
        .unwrap();

        // serde_json maps iterate in key order
        assert_eq!(
            update.sql,
            "UPDATE employees SET base_salary = ?, full_name = ?, hire_date = ? WHERE id = ?"
        );
        assert_eq!(
            update.values,
            vec![
                SqlValue::F64(3100.5),
                SqlValue::String("Maria".into()),
                SqlValue::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
                SqlValue::U64(9),
            ]
        );
    }

    #[test]
    fn rejects_columns_outside_the_allow_list() {
        let err = build_update_sql("employees", &json!({ "id = 1; --": 1 }), &COLUMNS, "id", 1)
            .unwrap_err();
        assert!(err.to_string().contains("cannot be updated"));
    }

    #[test]
    fn rejects_empty_and_non_object_payloads() {
        assert!(build_update_sql("employees", &json!({}), &COLUMNS, "id", 1).is_err());
        assert!(build_update_sql("employees", &json!([1, 2]), &COLUMNS, "id", 1).is_err());
        assert!(build_update_sql("employees", &json!({ "full_name": ["x"] }), &COLUMNS, "id", 1).is_err());
    }

    #[test]
    fn page_is_clamped() {
        let page = Page::new(Some(0), Some(500));
        assert_eq!(page, Page { page: 1, per_page: 100 });
        assert_eq!(Page::new(Some(3), Some(10)).offset(), 20);
        assert_eq!(Page::new(None, None).limit(), 20);
    }

    #[test]
    fn filters_keep_conditions_and_args_aligned() {
        let mut filters = Filters::new();
        assert_eq!(filters.where_clause(), "");

        filters
            .push("company_id = ?", SqlValue::U64(1))
            .search(&["full_name", "email"], " maria ");
        assert_eq!(
            filters.where_clause(),
            " WHERE company_id = ? AND (full_name LIKE ? OR email LIKE ?)"
        );
        assert_eq!(filters.args().len(), 3);
        assert_eq!(filters.args()[2], SqlValue::String("%maria%".into()));
    }

    #[test]
    fn search_terms_match_wildcards_literally() {
        assert_eq!(escape_like("50%_off"), r"50\%\_off");
        assert_eq!(escape_like(r"a\b"), r"a\\b");

        let mut filters = Filters::new();
        filters.search(&["legal_name"], "100%");
        assert_eq!(filters.args()[0], SqlValue::String(r"%100\%%".into()));
    }
}
