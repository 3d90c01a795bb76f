//! Conversion between backend-native rows and the dynamic value model.

use sqlx::any::{Any, AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use crate::value::{Row, Value};

/// Convert an AnyRow to a [`Row`] keyed by column name.
///
/// Columns sharing a name collapse into one entry holding the later value.
pub fn row_to_map(row: &AnyRow) -> Result<Row, sqlx::Error> {
    let mut map = Row::with_capacity(row.columns().len());

    for (i, column) in row.columns().iter().enumerate() {
        let value = column_value(row, i)?;
        map.insert(column.name().to_string(), value);
    }

    Ok(map)
}

/// Decode column `index` of `row`, dispatching on the value's reported type.
///
/// The names are the closed set of kinds the `Any` driver reports.
pub fn column_value(row: &AnyRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_info = raw.type_info();

    let value = match type_info.name() {
        "NULL" => Value::Null,
        "BOOLEAN" => Value::Boolean(row.try_get::<bool, _>(index)?),
        "SMALLINT" => Value::Number(row.try_get::<i16, _>(index)? as f64),
        "INTEGER" => Value::Number(row.try_get::<i32, _>(index)? as f64),
        "BIGINT" => Value::Number(row.try_get::<i64, _>(index)? as f64),
        "REAL" => Value::Number(row.try_get::<f32, _>(index)? as f64),
        "DOUBLE" => Value::Number(row.try_get::<f64, _>(index)?),
        "BLOB" => Value::Bytes(row.try_get::<Vec<u8>, _>(index)?),
        "TEXT" => Value::String(row.try_get::<String, _>(index)?),
        other => {
            return Err(sqlx::Error::ColumnDecode {
                index: index.to_string(),
                source: format!("unsupported column type {}", other).into(),
            });
        }
    };

    Ok(value)
}

/// Bind dynamic values as positional parameters.
///
/// Integral numbers bind as integers so they compare equal to integer
/// columns; everything else keeps its natural SQL type.
pub fn bind_params<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: &[Value],
) -> Query<'q, Any, AnyArguments<'q>> {
    for param in params {
        query = match param {
            Value::String(s) => query.bind(s.clone()),
            Value::Number(n) => match Value::exact_integer(*n) {
                Some(i) => query.bind(i),
                None => query.bind(*n),
            },
            Value::Boolean(b) => query.bind(*b),
            Value::Null => query.bind(Option::<String>::None),
            Value::Bytes(b) => query.bind(b.clone()),
        };
    }
    query
}
