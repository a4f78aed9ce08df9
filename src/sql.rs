use std::collections::HashMap;

use chrono::NaiveDate;
use sqlparser::ast::{
    self, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value,
    ValueWithSpan,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::model::*;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    SelectServices,
    SelectSlots {
        day: NaiveDate,
    },
    SelectAvailableStarts {
        day: NaiveDate,
        service_id: String,
    },
    SelectBookings {
        filter: BookingFilter,
    },
    SelectNotifications {
        day: Option<NaiveDate>,
    },
    InsertBooking {
        details: BookingDetails,
        returning: bool,
    },
    BlockSlot {
        id: SlotId,
    },
    UnblockSlot {
        id: SlotId,
    },
}

/// Which row shape a statement answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultTable {
    Services,
    Slots,
    Bookings,
    Notifications,
}

impl Command {
    pub fn result_table(&self) -> Option<ResultTable> {
        match self {
            Command::SelectServices => Some(ResultTable::Services),
            Command::SelectSlots { .. } | Command::SelectAvailableStarts { .. } => {
                Some(ResultTable::Slots)
            }
            Command::SelectBookings { .. } => Some(ResultTable::Bookings),
            Command::SelectNotifications { .. } => Some(ResultTable::Notifications),
            Command::InsertBooking { returning: true, .. } => Some(ResultTable::Bookings),
            Command::InsertBooking { .. }
            | Command::BlockSlot { .. }
            | Command::UnblockSlot { .. } => None,
        }
    }
}

/// Row shape of a statement from its table alone, without reading any
/// values. Works on statements that still carry `$n` placeholders.
pub fn result_table(sql: &str) -> Result<Option<ResultTable>, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    match stmts.first() {
        Some(Statement::Query(query)) => {
            let SetExpr::Select(select) = query.body.as_ref() else {
                return Err(SqlError::Unsupported("non-SELECT query".into()));
            };
            let from = select
                .from
                .first()
                .ok_or_else(|| SqlError::Parse("SELECT without FROM".into()))?;
            match table_factor_name(&from.relation)?.as_str() {
                "services" => Ok(Some(ResultTable::Services)),
                "slots" | "available_starts" => Ok(Some(ResultTable::Slots)),
                "bookings" => Ok(Some(ResultTable::Bookings)),
                "notifications" => Ok(Some(ResultTable::Notifications)),
                other => Err(SqlError::UnknownTable(other.to_string())),
            }
        }
        Some(Statement::Insert(insert))
            if insert.returning.is_some() && insert_table_name(insert)? == "bookings" =>
        {
            Ok(Some(ResultTable::Bookings))
        }
        Some(_) => Ok(None),
        None => Err(SqlError::Empty),
    }
}

/// Columns accepted by `INSERT INTO bookings`.
pub const BOOKING_INSERT_COLUMNS: [&str; 13] = [
    "service_id",
    "client_name",
    "client_email",
    "client_phone",
    "zip_code",
    "street",
    "number",
    "complement",
    "neighborhood",
    "city",
    "state",
    "start_time",
    "notes",
];

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let values = extract_insert_values(insert)?;

    match table.as_str() {
        "bookings" => {
            if insert.columns.is_empty() {
                return Err(SqlError::Parse(
                    "INSERT INTO bookings requires a column list".into(),
                ));
            }
            if insert.columns.len() != values.len() {
                return Err(SqlError::WrongArity("bookings", insert.columns.len(), values.len()));
            }
            let mut row = HashMap::with_capacity(values.len());
            for (col, expr) in insert.columns.iter().zip(&values) {
                let name = col.value.to_lowercase();
                if !BOOKING_INSERT_COLUMNS.contains(&name.as_str()) {
                    return Err(SqlError::UnknownColumn(name));
                }
                row.insert(name, parse_text_or_null(expr)?);
            }
            Ok(Command::InsertBooking {
                details: booking_details(row)?,
                returning: insert.returning.is_some(),
            })
        }
        "blocks" => {
            let idx = match insert.columns.as_slice() {
                [] => 0,
                cols => cols
                    .iter()
                    .position(|c| c.value.eq_ignore_ascii_case("id"))
                    .ok_or(SqlError::MissingColumn("id"))?,
            };
            let expr = values.get(idx).ok_or(SqlError::WrongArity("blocks", 1, 0))?;
            Ok(Command::BlockSlot {
                id: parse_slot_id_expr(expr)?,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn booking_details(
    mut row: HashMap<String, Option<String>>,
) -> Result<BookingDetails, SqlError> {
    let start = required(&mut row, "start_time")?;
    let start_time = parse_timestamp(&start)
        .map_err(|e| SqlError::Parse(format!("bad start_time {start:?}: {e}")))?;

    Ok(BookingDetails {
        service_id: required(&mut row, "service_id")?,
        client_name: required(&mut row, "client_name")?,
        client_email: required(&mut row, "client_email")?,
        client_phone: row.remove("client_phone").flatten(),
        address: Address {
            zip_code: required(&mut row, "zip_code")?,
            street: required(&mut row, "street")?,
            number: required(&mut row, "number")?,
            complement: row.remove("complement").flatten(),
            neighborhood: required(&mut row, "neighborhood")?,
            city: required(&mut row, "city")?,
            state: required(&mut row, "state")?,
        },
        start_time,
        notes: row.remove("notes").flatten(),
    })
}

fn required(
    row: &mut HashMap<String, Option<String>>,
    col: &'static str,
) -> Result<String, SqlError> {
    row.remove(col).flatten().ok_or(SqlError::MissingColumn(col))
}

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;

    match table.as_str() {
        "blocks" => Ok(Command::UnblockSlot {
            id: extract_where_slot_id(&delete.selection)?,
        }),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    let mut filters = HashMap::new();
    if let Some(selection) = &select.selection {
        extract_eq_filters(selection, &mut filters)?;
    }
    let allowed: &[&str] = match table.as_str() {
        "services" => &[],
        "slots" | "notifications" => &["day"],
        "available_starts" => &["day", "service_id"],
        "bookings" => &["day", "view", "search"],
        _ => return Err(SqlError::UnknownTable(table)),
    };
    if let Some(col) = filters.keys().find(|c| !allowed.contains(&c.as_str())) {
        return Err(SqlError::UnknownColumn(col.clone()));
    }

    let day = filters.remove("day").map(|d| parse_day_text(&d)).transpose()?;
    match table.as_str() {
        "services" => Ok(Command::SelectServices),
        "slots" => Ok(Command::SelectSlots {
            day: day.ok_or(SqlError::MissingFilter("day"))?,
        }),
        "available_starts" => Ok(Command::SelectAvailableStarts {
            day: day.ok_or(SqlError::MissingFilter("day"))?,
            service_id: filters
                .remove("service_id")
                .ok_or(SqlError::MissingFilter("service_id"))?,
        }),
        "notifications" => Ok(Command::SelectNotifications { day }),
        _ => {
            let view = match filters.remove("view") {
                Some(v) => v.parse().map_err(SqlError::Parse)?,
                None => BookingView::default(),
            };
            Ok(Command::SelectBookings {
                filter: BookingFilter {
                    day,
                    view,
                    search: filters.remove("search"),
                },
            })
        }
    }
}

/// Collect `column = 'value'` terms joined by AND.
fn extract_eq_filters(expr: &Expr, out: &mut HashMap<String, String>) -> Result<(), SqlError> {
    match expr {
        Expr::Nested(inner) => extract_eq_filters(inner, out),
        Expr::BinaryOp { left, op, right } => match op {
            ast::BinaryOperator::And => {
                extract_eq_filters(left, out)?;
                extract_eq_filters(right, out)
            }
            ast::BinaryOperator::Eq => {
                let col = expr_column_name(left)
                    .ok_or_else(|| SqlError::Unsupported(format!("filter on {left}")))?;
                let value = parse_text_or_null(right)?
                    .ok_or_else(|| SqlError::Unsupported(format!("{col} = NULL")))?;
                out.insert(col, value);
                Ok(())
            }
            other => Err(SqlError::Unsupported(format!("operator {other}"))),
        },
        other => Err(SqlError::Unsupported(format!("filter {other}"))),
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    if let Some(first) = tables_with_joins.first() {
        table_factor_name(&first.relation)
    } else {
        Err(SqlError::Parse("DELETE without table".into()))
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

/// First row of `INSERT ... VALUES`. Multi-row inserts are rejected.
fn extract_insert_values(insert: &ast::Insert) -> Result<Vec<Expr>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => match values.rows.as_slice() {
            [] => Err(SqlError::Parse("empty VALUES".into())),
            [row] => Ok(row.clone()),
            _ => Err(SqlError::Unsupported("multi-row INSERT".into())),
        },
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn extract_where_slot_id(selection: &Option<Expr>) -> Result<SlotId, SqlError> {
    let sel = selection.as_ref().ok_or(SqlError::MissingFilter("id"))?;
    match sel {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } if expr_column_name(left).as_deref() == Some("id") => parse_slot_id_expr(right),
        _ => Err(SqlError::MissingFilter("id")),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

/// String or number literal as text; `NULL` as `None`.
fn parse_text_or_null(expr: &Expr) -> Result<Option<String>, SqlError> {
    match extract_value(expr) {
        Some(Value::Null) => Ok(None),
        Some(Value::SingleQuotedString(s)) | Some(Value::Number(s, _)) => Ok(Some(s.clone())),
        Some(value) => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr}"))),
    }
}

fn parse_slot_id_expr(expr: &Expr) -> Result<SlotId, SqlError> {
    let text = parse_text_or_null(expr)?.ok_or(SqlError::MissingFilter("id"))?;
    text.parse()
        .map_err(|e| SqlError::Parse(format!("bad slot id {text:?}: {e}")))
}

fn parse_day_text(s: &str) -> Result<NaiveDate, SqlError> {
    parse_day(s).map_err(|e| SqlError::Parse(format!("bad day {s:?}: {e}")))
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    UnknownColumn(String),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
    MissingColumn(&'static str),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::UnknownColumn(c) => write!(f, "unknown column: {c}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
            SqlError::MissingColumn(col) => write!(f, "missing column: {col}"),
        }
    }
}

impl std::error::Error for SqlError {}
