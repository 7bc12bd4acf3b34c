//! Operation → SQL translation.
//!
//! Supports the subset the client needs: flat equality filters (`null`
//! becomes `IS NULL`, arrays become `IN`), `take`/`skip`/`orderBy` on reads,
//! and flat `data` objects on writes. No relations, no nested writes.
//!
//! Single-record `update`/`delete` run in a transaction and roll back unless
//! exactly one row matched.

use sea_orm::sea_query::{
    Alias, Asterisk, ConditionalStatement, Expr, Func, Order, Query, SimpleExpr,
    Value as SqlValue,
};
use sea_orm::{
    ConnectionTrait, FromQueryResult, JsonValue, QueryResult, Statement, TransactionTrait,
};
use serde_json::{json, Map, Value};

use crate::error::ClientError;
use crate::operation::{Action, Operation};

/// Arguments after validation.
#[derive(Debug, Default)]
struct QueryArgs<'a> {
    filter: Option<&'a Map<String, Value>>,
    data: Option<&'a Map<String, Value>>,
    take: Option<u64>,
    skip: Option<u64>,
    order_by: Vec<(String, Order)>,
}

impl<'a> QueryArgs<'a> {
    fn parse(op: &'a Operation) -> Result<Self, ClientError> {
        let args = op
            .args
            .as_object()
            .ok_or_else(|| ClientError::invalid(&op.model, op.action, "args must be an object"))?;

        let filter = match args.get("where") {
            None => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                return Err(ClientError::invalid(
                    &op.model,
                    op.action,
                    "`where` must be an object",
                ))
            }
        };
        let data = match args.get("data") {
            None => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                return Err(ClientError::invalid(
                    &op.model,
                    op.action,
                    "`data` must be an object",
                ))
            }
        };

        Ok(Self {
            filter,
            data,
            take: unsigned_arg(op, args, "take")?,
            skip: unsigned_arg(op, args, "skip")?,
            order_by: order_by_arg(op, args.get("orderBy"))?,
        })
    }

    fn require_filter(&self, op: &Operation) -> Result<&'a Map<String, Value>, ClientError> {
        self.filter
            .filter(|f| !f.is_empty())
            .ok_or_else(|| ClientError::invalid(&op.model, op.action, "`where` is required"))
    }

    fn require_data(&self, op: &Operation) -> Result<&'a Map<String, Value>, ClientError> {
        self.data
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ClientError::invalid(&op.model, op.action, "`data` is required"))
    }
}

fn unsigned_arg(
    op: &Operation,
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<u64>, ClientError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_u64().map(Some).ok_or_else(|| {
            ClientError::invalid(
                &op.model,
                op.action,
                format!("`{key}` must be a non-negative integer"),
            )
        }),
    }
}

fn order_by_arg(op: &Operation, raw: Option<&Value>) -> Result<Vec<(String, Order)>, ClientError> {
    let entries: Vec<&Map<String, Value>> = match raw {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(map)) => vec![map],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        Some(_) => {
            return Err(ClientError::invalid(
                &op.model,
                op.action,
                "`orderBy` must be an object or a list of objects",
            ))
        }
    };

    let mut order = Vec::new();
    for entry in entries {
        for (column, direction) in entry {
            let dir = match direction.as_str() {
                Some("asc") => Order::Asc,
                Some("desc") => Order::Desc,
                _ => {
                    return Err(ClientError::invalid(
                        &op.model,
                        op.action,
                        format!("`orderBy.{column}` must be \"asc\" or \"desc\""),
                    ))
                }
            };
            order.push((column.clone(), dir));
        }
    }
    Ok(order)
}

fn sql_value(op: &Operation, value: &Value) -> Result<SqlValue, ClientError> {
    let bound = match value {
        Value::Null => SqlValue::String(None),
        Value::Bool(b) => SqlValue::Bool(Some(*b)),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => SqlValue::BigInt(Some(i)),
            // Integers past i64::MAX have no column type on either backend.
            _ if n.is_u64() => {
                return Err(ClientError::invalid(
                    &op.model,
                    op.action,
                    format!("integer {n} is out of range"),
                ))
            }
            (None, f) => SqlValue::Double(f),
        },
        Value::String(s) => SqlValue::String(Some(Box::new(s.clone()))),
        Value::Array(_) | Value::Object(_) => SqlValue::Json(Some(Box::new(value.clone()))),
    };
    Ok(bound)
}

/// Value expression for writes; JSON `null` writes SQL `NULL` untyped.
fn write_expr(op: &Operation, value: &Value) -> Result<SimpleExpr, ClientError> {
    if value.is_null() {
        Ok(Expr::cust("NULL"))
    } else {
        Ok(sql_value(op, value)?.into())
    }
}

fn apply_filter<S: ConditionalStatement>(
    stmt: &mut S,
    op: &Operation,
    filter: Option<&Map<String, Value>>,
) -> Result<(), ClientError> {
    let Some(filter) = filter else {
        return Ok(());
    };
    for (column, value) in filter {
        let col = Expr::col(Alias::new(column.as_str()));
        let cond = match value {
            Value::Null => col.is_null(),
            Value::Array(items) => col.is_in(
                items
                    .iter()
                    .map(|item| sql_value(op, item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            other => col.eq(sql_value(op, other)?),
        };
        stmt.and_where(cond);
    }
    Ok(())
}

fn row_to_json(row: &QueryResult) -> Result<Value, ClientError> {
    Ok(JsonValue::from_query_result(row, "")?)
}

fn not_found(op: &Operation) -> ClientError {
    ClientError::NotFound {
        model: op.model.clone(),
        action: op.action,
    }
}

/// Run a `RETURNING *` write that must touch exactly one row.
async fn write_one<C>(conn: &C, op: &Operation, stmt: Statement) -> Result<Value, ClientError>
where
    C: TransactionTrait,
{
    let txn = conn.begin().await?;
    let mut rows = txn.query_all(stmt).await?;
    match rows.len() {
        1 => {
            txn.commit().await?;
            row_to_json(&rows.remove(0))
        }
        0 => {
            txn.rollback().await?;
            Err(not_found(op))
        }
        matched => {
            txn.rollback().await?;
            Err(ClientError::AmbiguousTarget {
                model: op.model.clone(),
                action: op.action,
                matched,
            })
        }
    }
}

/// Run one operation against a connection and return its JSON result.
///
/// Reads return an object (`findUnique`/`findFirst`, `null` when nothing
/// matches), an array (`findMany`) or `{ "count": n }`. Single-row writes
/// return the affected row; `updateMany`/`deleteMany` return `{ "count": n }`.
pub async fn execute<C>(conn: &C, op: &Operation) -> Result<Value, ClientError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let args = QueryArgs::parse(op)?;
    let backend = conn.get_database_backend();
    let table = Alias::new(op.model.as_str());

    match op.action {
        Action::FindUnique | Action::FindFirst | Action::FindMany => {
            let mut q = Query::select();
            q.column(Asterisk).from(table);
            apply_filter(&mut q, op, args.filter)?;
            for (column, dir) in &args.order_by {
                q.order_by(Alias::new(column.as_str()), dir.clone());
            }

            if op.action == Action::FindMany {
                match (args.take, args.skip) {
                    (Some(take), _) => {
                        q.limit(take);
                    }
                    // OFFSET needs a LIMIT on SQLite
                    (None, Some(_)) => {
                        q.limit(i64::MAX as u64);
                    }
                    (None, None) => {}
                }
                if let Some(skip) = args.skip {
                    q.offset(skip);
                }
                let rows = conn.query_all(backend.build(&q)).await?;
                let items = rows.iter().map(row_to_json).collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(items))
            } else {
                q.limit(1);
                match conn.query_one(backend.build(&q)).await? {
                    Some(row) => row_to_json(&row),
                    None => Ok(Value::Null),
                }
            }
        }
        Action::Count => {
            let mut q = Query::select();
            q.expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
                .from(table);
            apply_filter(&mut q, op, args.filter)?;
            let count = match conn.query_one(backend.build(&q)).await? {
                Some(row) => row.try_get::<i64>("", "count")?,
                None => 0,
            };
            Ok(json!({ "count": count }))
        }
        Action::Create => {
            let data = args.require_data(op)?;
            let values = data
                .values()
                .map(|v| write_expr(op, v))
                .collect::<Result<Vec<_>, _>>()?;
            let mut q = Query::insert();
            q.into_table(table)
                .columns(data.keys().map(|k| Alias::new(k.as_str())));
            q.values(values)
                .map_err(|e| ClientError::invalid(&op.model, op.action, e.to_string()))?;
            q.returning_all();

            let row = conn
                .query_one(backend.build(&q))
                .await?
                .ok_or_else(|| not_found(op))?;
            row_to_json(&row)
        }
        Action::Update | Action::UpdateMany => {
            let data = args.require_data(op)?;
            let values = data
                .iter()
                .map(|(k, v)| Ok((Alias::new(k.as_str()), write_expr(op, v)?)))
                .collect::<Result<Vec<_>, ClientError>>()?;
            let mut q = Query::update();
            q.table(table).values(values);

            if op.action == Action::Update {
                apply_filter(&mut q, op, Some(args.require_filter(op)?))?;
                q.returning_all();
                return write_one(conn, op, backend.build(&q)).await;
            }

            apply_filter(&mut q, op, args.filter)?;
            let res = conn.execute(backend.build(&q)).await?;
            Ok(json!({ "count": res.rows_affected() }))
        }
        Action::Delete | Action::DeleteMany => {
            let mut q = Query::delete();
            q.from_table(table);

            if op.action == Action::Delete {
                apply_filter(&mut q, op, Some(args.require_filter(op)?))?;
                q.returning_all();
                return write_one(conn, op, backend.build(&q)).await;
            }

            apply_filter(&mut q, op, args.filter)?;
            let res = conn.execute(backend.build(&q)).await?;
            Ok(json!({ "count": res.rows_affected() }))
        }
    }
}
