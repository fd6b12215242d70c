//! Readable rendering of parameterized SQL for the query log

use chrono::{DateTime, SecondsFormat, Utc};

/// A positional SQL parameter as the database layer binds it
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

const SQL_MASK: &str = "'*******'";

/// Substitute `?` placeholders with rendered parameters, in source order
///
/// Queries that mention "password" (any case) get string values longer than
/// 10 characters masked outright, so credentials never reach the log stream.
/// Leftover placeholders stay as literal `?`; surplus parameters are
/// ignored. Never fails.
pub fn fill_sql_params(sql: &str, params: &[SqlParam]) -> String {
    if params.is_empty() {
        return sql.to_string();
    }

    let mentions_password = sql.to_lowercase().contains("password");
    let mut filled = String::with_capacity(sql.len() + params.len() * 8);
    let mut remaining = params.iter();

    for ch in sql.chars() {
        if ch != '?' {
            filled.push(ch);
            continue;
        }
        match remaining.next() {
            None => filled.push('?'),
            Some(param) => {
                if mentions_password && matches!(param, SqlParam::Text(s) if s.len() > 10) {
                    filled.push_str(SQL_MASK);
                } else {
                    filled.push_str(&render_param(param));
                }
            }
        }
    }

    filled
}

fn render_param(param: &SqlParam) -> String {
    match param {
        SqlParam::Null => "NULL".to_string(),
        SqlParam::Text(s) => format!("'{}'", s.replace('\'', "''")),
        SqlParam::Int(v) => v.to_string(),
        SqlParam::Float(v) => v.to_string(),
        SqlParam::Bool(v) => if *v { "1" } else { "0" }.to_string(),
        SqlParam::Timestamp(ts) => {
            format!("'{}'", ts.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fill_basic_types() {
        let sql = "INSERT INTO orders (id, name, price, active, note) VALUES (?, ?, ?, ?, ?)";
        let params = [
            SqlParam::Int(5),
            SqlParam::Text("Veggie".to_string()),
            SqlParam::Float(0.05),
            SqlParam::Bool(true),
            SqlParam::Null,
        ];

        assert_eq!(
            fill_sql_params(sql, &params),
            "INSERT INTO orders (id, name, price, active, note) VALUES (5, 'Veggie', 0.05, 1, NULL)"
        );
    }

    #[test]
    fn test_fill_int_param() {
        assert_eq!(
            fill_sql_params("SELECT * FROM t WHERE id = ?", &[SqlParam::Int(5)]),
            "SELECT * FROM t WHERE id = 5"
        );
    }

    #[test]
    fn test_single_quotes_doubled() {
        assert_eq!(
            fill_sql_params(
                "SELECT * FROM users WHERE name = ?",
                &[SqlParam::Text("O'Brien".to_string())]
            ),
            "SELECT * FROM users WHERE name = 'O''Brien'"
        );
    }

    #[test]
    fn test_password_query_masks_long_strings() {
        assert_eq!(
            fill_sql_params(
                "SELECT * FROM users WHERE password = ?",
                &[SqlParam::Text("longsecretvalue".to_string())]
            ),
            "SELECT * FROM users WHERE password = '*******'"
        );
    }

    #[test]
    fn test_password_query_leaves_short_strings() {
        // The length heuristic only kicks in past 10 characters
        assert_eq!(
            fill_sql_params(
                "SELECT * FROM users WHERE password = ?",
                &[SqlParam::Text("short".to_string())]
            ),
            "SELECT * FROM users WHERE password = 'short'"
        );
    }

    #[test]
    fn test_password_mask_is_case_insensitive_on_query() {
        assert_eq!(
            fill_sql_params(
                "UPDATE users SET PASSWORD = ? WHERE id = ?",
                &[
                    SqlParam::Text("averylongsecret".to_string()),
                    SqlParam::Int(7),
                ]
            ),
            "UPDATE users SET PASSWORD = '*******' WHERE id = 7"
        );
    }

    #[test]
    fn test_leftover_placeholders_stay_literal() {
        assert_eq!(
            fill_sql_params("SELECT * FROM t WHERE a = ? AND b = ?", &[SqlParam::Int(1)]),
            "SELECT * FROM t WHERE a = 1 AND b = ?"
        );
    }

    #[test]
    fn test_surplus_params_ignored() {
        assert_eq!(
            fill_sql_params(
                "SELECT 1",
                &[SqlParam::Int(1), SqlParam::Int(2)]
            ),
            "SELECT 1"
        );
    }

    #[test]
    fn test_no_params_returns_query_unchanged() {
        assert_eq!(
            fill_sql_params("SELECT * FROM t WHERE a = ?", &[]),
            "SELECT * FROM t WHERE a = ?"
        );
    }

    #[test]
    fn test_timestamp_rendered_iso8601() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 29, 12, 30, 45).unwrap();
        assert_eq!(
            fill_sql_params("UPDATE t SET created = ?", &[SqlParam::Timestamp(ts)]),
            "UPDATE t SET created = '2026-08-29T12:30:45.000Z'"
        );
    }
}
