//! Rendering of repository queries into MySQL statements
//!
//! Identifiers are validated and backtick-quoted segment by segment, so a
//! qualified `users.name` becomes `` `users`.`name` ``. Every value is sent
//! as a bind parameter.

use repository_core::{Predicate, Query, Row, Value};
use sqlx::{MySql, QueryBuilder};

use crate::error::DatabaseError;

/// Quotes a possibly table-qualified identifier
pub fn quote_identifier(name: &str) -> Result<String, DatabaseError> {
    let valid_segment = |segment: &str| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    if !name.split('.').all(valid_segment) {
        return Err(DatabaseError::InvalidIdentifier(name.to_string()));
    }
    Ok(name
        .split('.')
        .map(|segment| format!("`{}`", segment))
        .collect::<Vec<_>>()
        .join("."))
}

/// Binds one value, mapping each variant onto its MySQL type
pub fn push_value(builder: &mut QueryBuilder<'static, MySql>, value: &Value) {
    match value.clone() {
        Value::Null => builder.push_bind(None::<String>),
        Value::Bool(b) => builder.push_bind(b),
        Value::Int(n) => builder.push_bind(n),
        Value::UInt(n) => builder.push_bind(n),
        Value::Float(n) => builder.push_bind(n),
        Value::Text(s) => builder.push_bind(s),
    };
}

fn push_where(
    builder: &mut QueryBuilder<'static, MySql>,
    predicates: &[Predicate],
) -> Result<(), DatabaseError> {
    for (i, predicate) in predicates.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        match predicate {
            Predicate::Compare { column, op, value } => {
                builder.push(format!("{} {} ", quote_identifier(column)?, op.as_sql()));
                push_value(builder, value);
            }
            Predicate::Like { column, pattern } => {
                builder.push(format!("{} LIKE ", quote_identifier(column)?));
                builder.push_bind(pattern.clone());
            }
            Predicate::In { column, values } if values.is_empty() => {
                // Validate the column even though the predicate is constant
                quote_identifier(column)?;
                builder.push("1 = 0");
            }
            Predicate::In { column, values } => {
                builder.push(format!("{} IN (", quote_identifier(column)?));
                for (j, value) in values.iter().enumerate() {
                    if j > 0 {
                        builder.push(", ");
                    }
                    push_value(builder, value);
                }
                builder.push(")");
            }
        }
    }
    Ok(())
}

/// `SELECT * FROM ... WHERE ... ORDER BY ... LIMIT ... OFFSET ...`
pub fn select(query: &Query) -> Result<QueryBuilder<'static, MySql>, DatabaseError> {
    let mut builder = QueryBuilder::new(format!("SELECT * FROM {}", quote_identifier(&query.table)?));
    push_where(&mut builder, &query.predicates)?;

    for (i, term) in query.order.iter().enumerate() {
        builder.push(if i == 0 { " ORDER BY " } else { ", " });
        builder.push(format!(
            "{} {}",
            quote_identifier(&term.column)?,
            term.direction.as_sql()
        ));
    }

    match (query.limit, query.offset) {
        (Some(limit), offset) => {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
            if let Some(offset) = offset {
                builder.push(" OFFSET ");
                builder.push_bind(offset);
            }
        }
        // MySQL has no OFFSET without LIMIT; this is its documented idiom
        (None, Some(offset)) => {
            builder.push(" LIMIT 18446744073709551615 OFFSET ");
            builder.push_bind(offset);
        }
        (None, None) => {}
    }
    Ok(builder)
}

/// `SELECT COUNT(*) FROM ... WHERE ...`
pub fn count(query: &Query) -> Result<QueryBuilder<'static, MySql>, DatabaseError> {
    let mut builder =
        QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", quote_identifier(&query.table)?));
    push_where(&mut builder, &query.predicates)?;
    Ok(builder)
}

/// Multi-row `INSERT INTO ... (...) VALUES (...), (...)`
///
/// Every row must have the same columns.
pub fn insert(table: &str, rows: &[Row]) -> Result<QueryBuilder<'static, MySql>, DatabaseError> {
    let first = rows
        .first()
        .ok_or_else(|| DatabaseError::InvalidInsert("no rows to insert".to_string()))?;
    let columns: Vec<&String> = first.keys().collect();
    if let Some(row) = rows
        .iter()
        .find(|row| row.len() != columns.len() || !columns.iter().all(|c| row.contains_key(*c)))
    {
        return Err(DatabaseError::InvalidInsert(format!(
            "row columns {:?} differ from {:?}",
            row.keys().collect::<Vec<_>>(),
            columns
        )));
    }

    let quoted = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Result<Vec<_>, _>>()?;
    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) VALUES ",
        quote_identifier(table)?,
        quoted.join(", ")
    ));

    for (i, row) in rows.iter().enumerate() {
        builder.push(if i == 0 { "(" } else { ", (" });
        for (j, column) in columns.iter().enumerate() {
            if j > 0 {
                builder.push(", ");
            }
            push_value(&mut builder, &row[*column]);
        }
        builder.push(")");
    }
    Ok(builder)
}

/// `UPDATE ... SET ... WHERE ...`
pub fn update(query: &Query, data: &Row) -> Result<QueryBuilder<'static, MySql>, DatabaseError> {
    if data.is_empty() {
        return Err(DatabaseError::InvalidInsert("no columns to update".to_string()));
    }
    let mut builder = QueryBuilder::new(format!("UPDATE {} SET ", quote_identifier(&query.table)?));
    for (i, (column, value)) in data.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(format!("{} = ", quote_identifier(column)?));
        push_value(&mut builder, value);
    }
    push_where(&mut builder, &query.predicates)?;
    Ok(builder)
}

/// `DELETE FROM ... WHERE ...`
pub fn delete(query: &Query) -> Result<QueryBuilder<'static, MySql>, DatabaseError> {
    let mut builder = QueryBuilder::new(format!("DELETE FROM {}", quote_identifier(&query.table)?));
    push_where(&mut builder, &query.predicates)?;
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use repository_core::{FilterAction, FilterParam, Page, QueryParams, Sort, SortDirection};

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users").unwrap(), "`users`");
        assert_eq!(quote_identifier("users.name").unwrap(), "`users`.`name`");
        assert!(quote_identifier("name; DROP TABLE users").is_err());
        assert!(quote_identifier("name`").is_err());
        assert!(quote_identifier("users.").is_err());
        assert!(quote_identifier("").is_err());
    }

    #[test]
    fn test_select_with_query_params() {
        let params = QueryParams::new(
            Page::new(3, 10),
            Sort::new("name", SortDirection::Ascending),
            vec![
                FilterParam::new("name", FilterAction::Like, "bon"),
                FilterParam::new("id", FilterAction::In, "1,2"),
                FilterParam::new("age", FilterAction::GreaterThan, "18"),
            ],
        );
        let query = Query::table("users").scopes([
            &params.filter_modifier("users"),
            &params.pagination_modifier(),
            &params.sort_modifier(),
        ]);

        let builder = select(&query).unwrap();
        assert_eq!(
            builder.sql(),
            "SELECT * FROM `users` WHERE `users`.`name` LIKE ? AND `users`.`id` IN (?, ?) \
             AND `users`.`age` > ? ORDER BY `name` ASC LIMIT ? OFFSET ?"
        );
    }

    #[test]
    fn test_select_unfiltered() {
        let builder = select(&Query::table("users")).unwrap();
        assert_eq!(builder.sql(), "SELECT * FROM `users`");
    }

    #[test]
    fn test_select_rejects_unsafe_sort_column() {
        let query = Query::table("users").order_by("id; DROP TABLE users", SortDirection::Descending);
        assert!(matches!(select(&query), Err(DatabaseError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_empty_in_list_matches_nothing() {
        let query = Query::table("users").filter(Predicate::In {
            column: "id".to_string(),
            values: Vec::new(),
        });
        assert_eq!(select(&query).unwrap().sql(), "SELECT * FROM `users` WHERE 1 = 0");
    }

    #[test]
    fn test_count_ignores_window() {
        let query = Query::table("users")
            .filter(Predicate::eq("city", "dhaka"))
            .limit(10);
        assert_eq!(
            count(&query).unwrap().sql(),
            "SELECT COUNT(*) FROM `users` WHERE `city` = ?"
        );
    }

    #[test]
    fn test_multi_row_insert() {
        let rows = vec![
            row(&[("id", Value::Int(1)), ("name", Value::from("nafi"))]),
            row(&[("id", Value::Int(2)), ("name", Value::from("rafi"))]),
        ];
        assert_eq!(
            insert("users", &rows).unwrap().sql(),
            "INSERT INTO `users` (`id`, `name`) VALUES (?, ?), (?, ?)"
        );
    }

    #[test]
    fn test_insert_rejects_mismatched_rows() {
        let rows = vec![
            row(&[("id", Value::Int(1))]),
            row(&[("name", Value::from("x"))]),
        ];
        assert!(matches!(insert("users", &rows), Err(DatabaseError::InvalidInsert(_))));
        assert!(insert("users", &[]).is_err());
    }

    #[test]
    fn test_update_and_delete() {
        let query = Query::table("users").filter(Predicate::eq("id", 1));
        let data = row(&[("city", Value::from("dhaka")), ("name", Value::from("nafi"))]);

        assert_eq!(
            update(&query, &data).unwrap().sql(),
            "UPDATE `users` SET `city` = ?, `name` = ? WHERE `id` = ?"
        );
        assert_eq!(delete(&query).unwrap().sql(), "DELETE FROM `users` WHERE `id` = ?");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn safe_identifiers_are_quoted(table in "[a-z_][a-z0-9_]{0,15}", column in "[a-z_][a-z0-9_]{0,15}") {
                let quoted = quote_identifier(&format!("{}.{}", table, column)).unwrap();
                prop_assert_eq!(quoted, format!("`{}`.`{}`", table, column));
            }

            #[test]
            fn identifiers_with_other_characters_are_rejected(
                prefix in "[a-z]{1,8}",
                bad in "[ `;'\"()*-]",
                suffix in "[a-z]{0,8}",
            ) {
                let name = format!("{}{}{}", prefix, bad, suffix);
                prop_assert!(quote_identifier(&name).is_err());
            }
        }
    }
}
