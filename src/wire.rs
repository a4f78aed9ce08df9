use std::fmt::Debug;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream;
use futures::Sink;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{
    AuthSource, DefaultServerParameterProvider, LoginInfo, Password, StartupHandler,
};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use pgwire::messages::data::DataRow;
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;

use crate::engine::{Engine, EngineError};
use crate::model::*;
use crate::notify::Notice;
use crate::observability::{command_label, QUERIES_TOTAL, QUERY_DURATION_SECONDS};
use crate::sql::{self, Command, ResultTable, SqlError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Serve one client connection until it closes.
pub async fn process_connection(
    socket: TcpStream,
    engine: Arc<Engine>,
    password: String,
    tls: Option<TlsAcceptor>,
) -> std::io::Result<()> {
    let factory = BookingFactory::new(engine, password);
    pgwire::tokio::process_socket(socket, tls, factory).await
}

pub struct BookingHandler {
    engine: Arc<Engine>,
    query_parser: Arc<BookingQueryParser>,
}

impl BookingHandler {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            query_parser: Arc::new(BookingQueryParser),
        }
    }

    /// Parse, execute and record metrics for one statement.
    async fn run(&self, sql: &str) -> PgWireResult<Vec<Response>> {
        let cmd = sql::parse_sql(sql).map_err(|e| {
            metrics::counter!(QUERIES_TOTAL, "command" => "unparsed", "status" => "error")
                .increment(1);
            sql_err(e)
        })?;
        let label = command_label(&cmd);
        let started = Instant::now();
        let result = self.execute_command(cmd).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(QUERIES_TOTAL, "command" => label, "status" => status).increment(1);
        metrics::histogram!(QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn execute_command(&self, cmd: Command) -> PgWireResult<Vec<Response>> {
        let engine = &self.engine;
        match cmd {
            Command::SelectServices => {
                let schema = Arc::new(service_schema());
                let rows: Vec<PgWireResult<_>> = engine
                    .services()
                    .iter()
                    .map(|s| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&s.id)?;
                        encoder.encode_field(&s.name)?;
                        encoder.encode_field(&s.description)?;
                        encoder.encode_field(&s.duration_minutes)?;
                        encoder.encode_field(&s.base_price.to_string())?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![query_response(schema, rows)])
            }
            Command::SelectSlots { day } => {
                let slots = engine.get_day_slots(day).await.map_err(engine_err)?;
                Ok(vec![slot_rows(&slots)])
            }
            Command::SelectAvailableStarts { day, service_id } => {
                let slots = engine
                    .find_available_starts(day, &service_id)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![slot_rows(&slots)])
            }
            Command::SelectBookings { filter } => {
                let bookings = engine.list_bookings(&filter).map_err(engine_err)?;
                Ok(vec![booking_rows(&bookings)])
            }
            Command::SelectNotifications { day } => {
                let notices = engine.recent_notifications(day);
                Ok(vec![notice_rows(&notices)])
            }
            Command::InsertBooking { details, returning } => {
                let booking = engine.book(details).await.map_err(engine_err)?;
                if returning {
                    Ok(vec![booking_rows(std::slice::from_ref(&booking))])
                } else {
                    Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
                }
            }
            Command::BlockSlot { id } => {
                engine.set_blocked(id, true).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UnblockSlot { id } => {
                engine.set_blocked(id, false).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
        }
    }
}

// ── Result schemas ───────────────────────────────────────────────

fn text_field(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::VARCHAR, FieldFormat::Text)
}

fn service_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id"),
        text_field("name"),
        text_field("description"),
        FieldInfo::new("duration_minutes".into(), None, None, Type::INT8, FieldFormat::Text),
        text_field("base_price"),
    ]
}

fn slot_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id"),
        text_field("start"),
        text_field("end"),
        FieldInfo::new("is_booked".into(), None, None, Type::BOOL, FieldFormat::Text),
        FieldInfo::new("is_blocked".into(), None, None, Type::BOOL, FieldFormat::Text),
    ]
}

fn booking_schema() -> Vec<FieldInfo> {
    [
        "id",
        "service_id",
        "service_name",
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
        "end_time",
        "notes",
        "created_at",
    ]
    .into_iter()
    .map(text_field)
    .collect()
}

fn notice_schema() -> Vec<FieldInfo> {
    vec![text_field("day"), text_field("at"), text_field("message")]
}

/// Result columns of a statement, taken from the parsed command. Prepared
/// statements with unbound `$n` placeholders do not parse into a command,
/// so for those the table named in the statement decides.
fn result_schema(sql: &str) -> Vec<FieldInfo> {
    let table = match sql::parse_sql(sql) {
        Ok(cmd) => cmd.result_table(),
        Err(_) if count_params(sql) > 0 => sql::result_table(sql).ok().flatten(),
        Err(_) => None,
    };
    match table {
        Some(ResultTable::Services) => service_schema(),
        Some(ResultTable::Slots) => slot_schema(),
        Some(ResultTable::Bookings) => booking_schema(),
        Some(ResultTable::Notifications) => notice_schema(),
        None => vec![],
    }
}

fn query_response(schema: Arc<Vec<FieldInfo>>, rows: Vec<PgWireResult<DataRow>>) -> Response {
    Response::Query(QueryResponse::new(schema, stream::iter(rows)))
}

fn slot_rows(slots: &[TimeSlot]) -> Response {
    let schema = Arc::new(slot_schema());
    let rows: Vec<PgWireResult<_>> = slots
        .iter()
        .map(|s| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&s.id.to_string())?;
            encoder.encode_field(&s.start.format(TIMESTAMP_FORMAT).to_string())?;
            encoder.encode_field(&s.end.format(TIMESTAMP_FORMAT).to_string())?;
            encoder.encode_field(&s.is_booked)?;
            encoder.encode_field(&s.is_blocked)?;
            Ok(encoder.take_row())
        })
        .collect();
    query_response(schema, rows)
}

fn booking_rows(bookings: &[Booking]) -> Response {
    let schema = Arc::new(booking_schema());
    let rows: Vec<PgWireResult<_>> = bookings
        .iter()
        .map(|b| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&b.id.to_string())?;
            encoder.encode_field(&b.service_id)?;
            encoder.encode_field(&b.service_name)?;
            encoder.encode_field(&b.client_name)?;
            encoder.encode_field(&b.client_email)?;
            encoder.encode_field(&b.client_phone)?;
            encoder.encode_field(&b.address.zip_code)?;
            encoder.encode_field(&b.address.street)?;
            encoder.encode_field(&b.address.number)?;
            encoder.encode_field(&b.address.complement)?;
            encoder.encode_field(&b.address.neighborhood)?;
            encoder.encode_field(&b.address.city)?;
            encoder.encode_field(&b.address.state)?;
            encoder.encode_field(&b.start_time.format(TIMESTAMP_FORMAT).to_string())?;
            encoder.encode_field(&b.end_time.format(TIMESTAMP_FORMAT).to_string())?;
            encoder.encode_field(&b.notes)?;
            encoder.encode_field(&b.created_at.format("%Y-%m-%dT%H:%M:%S").to_string())?;
            Ok(encoder.take_row())
        })
        .collect();
    query_response(schema, rows)
}

fn notice_rows(notices: &[Notice]) -> Response {
    let schema = Arc::new(notice_schema());
    let rows: Vec<PgWireResult<_>> = notices
        .iter()
        .map(|n| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&n.day.to_string())?;
            encoder.encode_field(&n.at.format("%Y-%m-%dT%H:%M:%S").to_string())?;
            encoder.encode_field(&n.message)?;
            Ok(encoder.take_row())
        })
        .collect();
    query_response(schema, rows)
}

#[async_trait]
impl SimpleQueryHandler for BookingHandler {
    async fn do_query<C>(
        &self,
        _client: &mut C,
        query: &str,
    ) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        self.run(query).await
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct BookingQueryParser;

#[async_trait]
impl QueryParser for BookingQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(result_schema(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for BookingHandler {
    type Statement = String;
    type QueryParser = BookingQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        _client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let sql = substitute_params(portal);
        let mut responses = self.run(&sql).await?;
        Ok(responses.remove(0))
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            result_schema(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(result_schema(
            &target.statement.statement,
        )))
    }
}

/// `$n` placeholders outside quoted text, as (byte range, n).
fn placeholders(sql: &str) -> Vec<(Range<usize>, usize)> {
    let bytes = sql.as_bytes();
    let mut found = Vec::new();
    let mut quote = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'\'' || b == b'"' => quote = Some(b),
            None if b == b'$' => {
                let digits = bytes[i + 1..]
                    .iter()
                    .take_while(|d| d.is_ascii_digit())
                    .count();
                if let Ok(n) = sql[i + 1..i + 1 + digits].parse::<usize>() {
                    found.push((i..i + 1 + digits, n));
                }
                i += digits;
            }
            None => {}
        }
        i += 1;
    }
    found
}

/// Highest `$n` placeholder index in the statement.
fn count_params(sql: &str) -> usize {
    placeholders(sql).iter().map(|(_, n)| *n).max().unwrap_or(0)
}

/// Splice bound values (text format) into the statement as quoted literals.
/// The statement is scanned once, so placeholder-like text inside a value is
/// never substituted again.
fn bind_params(sql: &str, params: &[Option<String>]) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut copied = 0;
    for (range, n) in placeholders(sql) {
        let Some(param) = n.checked_sub(1).and_then(|i| params.get(i)) else {
            continue;
        };
        out.push_str(&sql[copied..range.start]);
        match param {
            Some(text) => {
                out.push('\'');
                out.push_str(&text.replace('\'', "''"));
                out.push('\'');
            }
            None => out.push_str("NULL"),
        }
        copied = range.end;
    }
    out.push_str(&sql[copied..]);
    out
}

fn substitute_params(portal: &Portal<String>) -> String {
    let params: Vec<Option<String>> = portal
        .parameters
        .iter()
        .map(|p| p.as_ref().map(|bytes| String::from_utf8_lossy(bytes).into_owned()))
        .collect();
    bind_params(&portal.statement.statement, &params)
}

// ── Auth ─────────────────────────────────────────────────────────

/// Single shared password; any user name is accepted.
#[derive(Debug)]
pub struct PasswordAuthSource {
    password: String,
}

impl PasswordAuthSource {
    pub fn new(password: String) -> Self {
        Self { password }
    }
}

#[async_trait]
impl AuthSource for PasswordAuthSource {
    async fn get_password(&self, _login: &LoginInfo) -> PgWireResult<Password> {
        Ok(Password::new(None, self.password.as_bytes().to_vec()))
    }
}

// ── Factory ──────────────────────────────────────────────────────

type AuthHandler =
    CleartextPasswordAuthStartupHandler<PasswordAuthSource, DefaultServerParameterProvider>;

pub struct BookingFactory {
    handler: Arc<BookingHandler>,
    auth_handler: Arc<AuthHandler>,
    noop: Arc<NoopHandler>,
}

impl BookingFactory {
    pub fn new(engine: Arc<Engine>, password: String) -> Self {
        let auth_source = PasswordAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(BookingHandler::new(engine)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for BookingFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

fn engine_err(e: EngineError) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        "P0001".into(),
        e.to_string(),
    )))
}

fn sql_err(e: SqlError) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        "42601".into(),
        e.to_string(),
    )))
}
