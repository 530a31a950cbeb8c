use std::{fmt, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use sqlx::{
    Column, Connection, PgConnection, Postgres, Row, TypeInfo,
    postgres::{
        PgConnectOptions, PgRow, PgTypeInfo, PgTypeKind,
        types::{Oid, PgInterval},
    },
    types::BigDecimal,
};
use tracing::{debug, trace, warn};

use crate::{
    Result, ToolflowError,
    common::Vars,
    store::{Credential, CredentialType},
};

use super::ClientError;

/// SQL dialect spoken by a target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SqlDialect {
    Postgres,
    Mssql,
}

impl SqlDialect {
    pub fn default_port(&self) -> u16 {
        match self {
            SqlDialect::Postgres => 5432,
            SqlDialect::Mssql => 1433,
        }
    }
}

/// Connection parameters of an external database.
#[derive(Clone, PartialEq)]
pub struct SqlConnection {
    pub dialect: SqlDialect,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl fmt::Debug for SqlConnection {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SqlConnection")
            .field("dialect", &self.dialect)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl SqlConnection {
    /// Reads `host`, `port`, `username`, `password` and `database` from a SQL credential.
    pub fn from_credential(credential: &Credential) -> Result<Self> {
        let dialect = match credential.credential_type {
            CredentialType::Postgres => SqlDialect::Postgres,
            CredentialType::Mssql => SqlDialect::Mssql,
            other => {
                return Err(ToolflowError::Credential(format!("credential {} of type '{}' is not a SQL credential", credential.id, other)));
            }
        };
        let host = credential.data_str("host").ok_or_else(|| ToolflowError::Config(format!("credential {} has no host", credential.id)))?;

        Ok(Self {
            dialect,
            host: host.to_string(),
            port: credential.data_port("port").unwrap_or(dialect.default_port()),
            username: credential.data_str("username").map(str::to_string),
            password: credential.data_str("password").map(str::to_string),
            database: credential.data_str("database").map(str::to_string),
        })
    }
}

/// Database a query runs against.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlTarget {
    /// The database managed by the client itself.
    Internal,
    /// A database described by a credential.
    External(SqlConnection),
}

#[async_trait]
pub trait SqlClient: Send + Sync {
    /// Runs `sql` against `target` and materializes every returned row.
    ///
    /// The connection is opened for this call only and released before returning.
    async fn query(
        &self,
        target: &SqlTarget,
        sql: &str,
    ) -> std::result::Result<Vec<Vars>, ClientError>;
}

/// Maps `sqlx` failures to collaborator errors.
///
/// `RowNotFound` is the driver's "no result set" signal and is reported as
/// [`ClientError::NoResultSet`] so callers can treat it as an empty result.
pub fn classify_sql_error(err: sqlx::Error) -> ClientError {
    match err {
        sqlx::Error::RowNotFound => ClientError::NoResultSet,
        other => ClientError::Failed(other.to_string()),
    }
}

/// PostgreSQL client opening one connection per query.
#[derive(Debug, Clone)]
pub struct PgSqlClient {
    internal: Option<PgConnectOptions>,
    connect_timeout: Duration,
}

impl PgSqlClient {
    pub fn new(
        internal_url: Option<&str>,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let internal = internal_url
            .map(|url| url.parse::<PgConnectOptions>().map_err(|err| ToolflowError::Config(format!("invalid internal database url: {}", err))))
            .transpose()?;

        Ok(Self {
            internal,
            connect_timeout,
        })
    }

    fn connect_options(
        &self,
        target: &SqlTarget,
    ) -> std::result::Result<PgConnectOptions, ClientError> {
        match target {
            SqlTarget::Internal => self.internal.clone().ok_or_else(|| ClientError::Failed("no internal database is configured".to_string())),
            SqlTarget::External(conn) if conn.dialect == SqlDialect::Postgres => {
                let mut options = PgConnectOptions::new().host(&conn.host).port(conn.port);
                if let Some(username) = &conn.username {
                    options = options.username(username);
                }
                if let Some(password) = &conn.password {
                    options = options.password(password);
                }
                if let Some(database) = &conn.database {
                    options = options.database(database);
                }
                Ok(options)
            }
            SqlTarget::External(conn) => Err(ClientError::Failed(format!("{} connections are not supported by the postgres client", conn.dialect))),
        }
    }
}

#[async_trait]
impl SqlClient for PgSqlClient {
    async fn query(
        &self,
        target: &SqlTarget,
        sql: &str,
    ) -> std::result::Result<Vec<Vars>, ClientError> {
        let options = self.connect_options(target)?;
        trace!("pg_sql_client::query({:?})", target);

        let mut conn = tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&options))
            .await
            .map_err(|_| ClientError::Failed(format!("timed out after {:?} connecting to database", self.connect_timeout)))?
            .map_err(classify_sql_error)?;

        let rows = sqlx::query(sql).fetch_all(&mut conn).await;
        if let Err(err) = conn.close().await {
            debug!("failed to close database connection: {}", err);
        }

        Ok(rows.map_err(classify_sql_error)?.iter().map(row_to_vars).collect())
    }
}

fn row_to_vars(row: &PgRow) -> Vars {
    let mut vars = Vars::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info());
        vars.insert(column.name().to_string(), value);
    }
    vars
}

/// Scalar column types with a JSON rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    /// Rendered as a decimal string so no precision is lost.
    Numeric,
    Oid,
    Text,
    Json,
    Uuid,
    TimestampTz,
    Timestamp,
    Date,
    Time,
    Interval,
    Bytea,
}

impl ScalarKind {
    fn from_type_name(name: &str) -> Option<Self> {
        let kind = match name {
            "BOOL" => Self::Bool,
            "INT2" => Self::Int2,
            "INT4" => Self::Int4,
            "INT8" => Self::Int8,
            "FLOAT4" => Self::Float4,
            "FLOAT8" => Self::Float8,
            "NUMERIC" => Self::Numeric,
            "OID" => Self::Oid,
            "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" | "UNKNOWN" | "XML" => Self::Text,
            "JSON" | "JSONB" => Self::Json,
            "UUID" => Self::Uuid,
            "TIMESTAMPTZ" => Self::TimestampTz,
            "TIMESTAMP" => Self::Timestamp,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "INTERVAL" => Self::Interval,
            "BYTEA" => Self::Bytea,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Scalar(ScalarKind),
    Array(ScalarKind),
    Unsupported,
}

impl ColumnKind {
    fn from_type_name(name: &str) -> Self {
        let kind = match name.strip_suffix("[]") {
            Some(element) => ScalarKind::from_type_name(element).map(Self::Array),
            None => ScalarKind::from_type_name(name).map(Self::Scalar),
        };
        kind.unwrap_or(Self::Unsupported)
    }

    /// Domains decode as their base type, enums as their label.
    fn of(type_info: &PgTypeInfo) -> Self {
        match type_info.kind() {
            PgTypeKind::Domain(base) => Self::of(base),
            PgTypeKind::Enum(_) => Self::Scalar(ScalarKind::Text),
            _ => Self::from_type_name(type_info.name()),
        }
    }
}

type Decoded = std::result::Result<Value, sqlx::Error>;

fn get<'r, T>(
    row: &'r PgRow,
    index: usize,
    render: impl Fn(T) -> Value,
) -> Decoded
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    Ok(row.try_get::<Option<T>, _>(index)?.map(render).unwrap_or(Value::Null))
}

fn get_array<'r, T>(
    row: &'r PgRow,
    index: usize,
    render: impl Fn(T) -> Value,
) -> Decoded
where
    Vec<Option<T>>: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    get::<Vec<Option<T>>>(row, index, |items| Value::Array(items.into_iter().map(|item| item.map(&render).unwrap_or(Value::Null)).collect()))
}

fn decode_scalar(
    row: &PgRow,
    index: usize,
    kind: ScalarKind,
) -> Decoded {
    match kind {
        ScalarKind::Bool => get::<bool>(row, index, Value::from),
        ScalarKind::Int2 => get::<i16>(row, index, Value::from),
        ScalarKind::Int4 => get::<i32>(row, index, Value::from),
        ScalarKind::Int8 => get::<i64>(row, index, Value::from),
        ScalarKind::Float4 => get::<f32>(row, index, Value::from),
        ScalarKind::Float8 => get::<f64>(row, index, Value::from),
        ScalarKind::Numeric => get::<BigDecimal>(row, index, render_numeric),
        ScalarKind::Oid => get::<Oid>(row, index, |oid| Value::from(oid.0)),
        // enums and text domains fail the strict String type check
        ScalarKind::Text => Ok(row.try_get_unchecked::<Option<String>, _>(index)?.map(Value::from).unwrap_or(Value::Null)),
        ScalarKind::Json => get::<Value>(row, index, |value| value),
        ScalarKind::Uuid => get::<uuid::Uuid>(row, index, |u| Value::from(u.to_string())),
        ScalarKind::TimestampTz => get::<DateTime<Utc>>(row, index, |t| Value::from(t.to_rfc3339())),
        ScalarKind::Timestamp => get::<NaiveDateTime>(row, index, |t| Value::from(t.to_string())),
        ScalarKind::Date => get::<NaiveDate>(row, index, |d| Value::from(d.to_string())),
        ScalarKind::Time => get::<NaiveTime>(row, index, |t| Value::from(t.to_string())),
        ScalarKind::Interval => get::<PgInterval>(row, index, |i| Value::from(render_interval(&i))),
        ScalarKind::Bytea => get::<Vec<u8>>(row, index, |bytes| Value::from(render_bytea(&bytes))),
    }
}

fn decode_array(
    row: &PgRow,
    index: usize,
    kind: ScalarKind,
) -> Option<Decoded> {
    let decoded = match kind {
        ScalarKind::Bool => get_array::<bool>(row, index, Value::from),
        ScalarKind::Int2 => get_array::<i16>(row, index, Value::from),
        ScalarKind::Int4 => get_array::<i32>(row, index, Value::from),
        ScalarKind::Int8 => get_array::<i64>(row, index, Value::from),
        ScalarKind::Float4 => get_array::<f32>(row, index, Value::from),
        ScalarKind::Float8 => get_array::<f64>(row, index, Value::from),
        ScalarKind::Numeric => get_array::<BigDecimal>(row, index, render_numeric),
        ScalarKind::Text => get_array::<String>(row, index, Value::from),
        ScalarKind::Json => get_array::<Value>(row, index, |value| value),
        ScalarKind::Uuid => get_array::<uuid::Uuid>(row, index, |u| Value::from(u.to_string())),
        ScalarKind::TimestampTz => get_array::<DateTime<Utc>>(row, index, |t| Value::from(t.to_rfc3339())),
        ScalarKind::Timestamp => get_array::<NaiveDateTime>(row, index, |t| Value::from(t.to_string())),
        ScalarKind::Date => get_array::<NaiveDate>(row, index, |d| Value::from(d.to_string())),
        ScalarKind::Oid | ScalarKind::Time | ScalarKind::Interval | ScalarKind::Bytea => return None,
    };
    Some(decoded)
}

/// Decodes one column into JSON.
///
/// Types without a rendering come back as an `<unsupported type X>` marker
/// instead of their binary wire bytes.
fn decode_column(
    row: &PgRow,
    index: usize,
    type_info: &PgTypeInfo,
) -> Value {
    let type_name = type_info.name();
    let decoded = match ColumnKind::of(type_info) {
        ColumnKind::Scalar(kind) => Some(decode_scalar(row, index, kind)),
        ColumnKind::Array(kind) => decode_array(row, index, kind),
        ColumnKind::Unsupported => None,
    };

    match decoded {
        Some(Ok(value)) => value,
        Some(Err(err)) => {
            warn!("failed to decode column {} of type {}: {}", index, type_name, err);
            Value::from(format!("<undecodable {}>", type_name))
        }
        None => {
            debug!("column {} has unsupported type {}", index, type_name);
            Value::from(format!("<unsupported type {}>", type_name))
        }
    }
}

fn render_numeric(value: BigDecimal) -> Value {
    Value::from(value.to_string())
}

fn render_bytea(bytes: &[u8]) -> String {
    bytes.iter().fold(String::from("\\x"), |mut out, byte| {
        out.push_str(&format!("{:02x}", byte));
        out
    })
}

fn plural(
    count: i64,
    unit: &str,
) -> String {
    if count.abs() == 1 { format!("{} {}", count, unit) } else { format!("{} {}s", count, unit) }
}

/// Renders an interval the way `psql` prints it, e.g. `1 year 2 mons 3 days 04:05:06`.
fn render_interval(interval: &PgInterval) -> String {
    let mut parts = Vec::new();
    let (years, months) = (interval.months / 12, interval.months % 12);
    if years != 0 {
        parts.push(plural(years.into(), "year"));
    }
    if months != 0 {
        parts.push(plural(months.into(), "mon"));
    }
    if interval.days != 0 {
        parts.push(plural(interval.days.into(), "day"));
    }
    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let micros = interval.microseconds.unsigned_abs();
        let secs = micros / 1_000_000;
        let mut time = format!("{}{:02}:{:02}:{:02}", sign, secs / 3600, secs / 60 % 60, secs % 60);
        let fraction = micros % 1_000_000;
        if fraction != 0 {
            time.push_str(format!(".{:06}", fraction).trim_end_matches('0'));
        }
        parts.push(time);
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::*;
    use crate::{store::CredentialStore, store::MemStore};

    #[test]
    fn test_classify_row_not_found() {
        assert_eq!(classify_sql_error(sqlx::Error::RowNotFound), ClientError::NoResultSet);
        assert!(matches!(classify_sql_error(sqlx::Error::PoolTimedOut), ClientError::Failed(_)));
    }

    #[test]
    fn test_connection_from_credential() {
        let store = MemStore::new();
        store.insert("pg", CredentialType::Postgres, json!({"host": "db", "username": "u", "password": "p", "database": "app"}).into()).unwrap();
        store.insert("ms", CredentialType::Mssql, json!({"host": "ms", "port": "1500"}).into()).unwrap();
        store.insert("hook", CredentialType::Slack, json!({}).into()).unwrap();

        let pg = SqlConnection::from_credential(&store.get_credential(1).unwrap().unwrap()).unwrap();
        assert_eq!(pg.dialect, SqlDialect::Postgres);
        assert_eq!(pg.port, 5432);
        assert_eq!(pg.database.as_deref(), Some("app"));
        assert!(!format!("{:?}", pg).contains("\"p\""));

        let ms = SqlConnection::from_credential(&store.get_credential(2).unwrap().unwrap()).unwrap();
        assert_eq!(ms.dialect, SqlDialect::Mssql);
        assert_eq!(ms.port, 1500);

        let err = SqlConnection::from_credential(&store.get_credential(3).unwrap().unwrap()).unwrap_err();
        assert!(matches!(err, ToolflowError::Credential(_)));
    }

    #[test]
    fn test_connection_requires_host() {
        let store = MemStore::new();
        let credential = store.insert("pg", CredentialType::Postgres, Vars::new()).unwrap();
        let err = SqlConnection::from_credential(&credential).unwrap_err();
        assert_eq!(err, ToolflowError::Config("credential 1 has no host".to_string()));
    }

    #[tokio::test]
    async fn test_internal_target_without_database() {
        let client = PgSqlClient::new(None, Duration::from_secs(1)).unwrap();
        let err = client.query(&SqlTarget::Internal, "SELECT 1").await.unwrap_err();
        assert_eq!(err, ClientError::Failed("no internal database is configured".to_string()));
    }

    #[tokio::test]
    async fn test_mssql_target_rejected() {
        let client = PgSqlClient::new(None, Duration::from_secs(1)).unwrap();
        let target = SqlTarget::External(SqlConnection {
            dialect: SqlDialect::Mssql,
            host: "ms".to_string(),
            port: 1433,
            username: None,
            password: None,
            database: None,
        });
        let err = client.query(&target, "SELECT 1").await.unwrap_err();
        assert!(err.to_string().contains("mssql"));
    }

    #[test]
    fn test_column_kind_from_type_name() {
        assert_eq!(ColumnKind::from_type_name("NUMERIC"), ColumnKind::Scalar(ScalarKind::Numeric));
        assert_eq!(ColumnKind::from_type_name("INTERVAL"), ColumnKind::Scalar(ScalarKind::Interval));
        assert_eq!(ColumnKind::from_type_name("OID"), ColumnKind::Scalar(ScalarKind::Oid));
        assert_eq!(ColumnKind::from_type_name("VARCHAR"), ColumnKind::Scalar(ScalarKind::Text));
        assert_eq!(ColumnKind::from_type_name("INT4[]"), ColumnKind::Array(ScalarKind::Int4));
        assert_eq!(ColumnKind::from_type_name("NUMERIC[]"), ColumnKind::Array(ScalarKind::Numeric));
        assert_eq!(ColumnKind::from_type_name("MONEY"), ColumnKind::Unsupported);
        assert_eq!(ColumnKind::from_type_name("INET[]"), ColumnKind::Unsupported);
    }

    #[test]
    fn test_render_numeric() {
        assert_eq!(render_numeric(BigDecimal::from_str("12.5").unwrap()), json!("12.5"));
        assert_eq!(render_numeric(BigDecimal::from_str("3").unwrap()), json!("3"));
        assert_eq!(render_numeric(BigDecimal::from_str("12345678901234567890.123").unwrap()), json!("12345678901234567890.123"));
    }

    #[test]
    fn test_render_interval() {
        let interval = |months, days, microseconds| PgInterval {
            months,
            days,
            microseconds,
        };
        assert_eq!(render_interval(&interval(0, 1, 0)), "1 day");
        assert_eq!(render_interval(&interval(14, 3, 14_706_000_000)), "1 year 2 mons 3 days 04:05:06");
        assert_eq!(render_interval(&interval(0, 0, -5_400_000_000)), "-01:30:00");
        assert_eq!(render_interval(&interval(0, 0, 1_500_000)), "00:00:01.5");
        assert_eq!(render_interval(&interval(0, 0, 0)), "00:00:00");
    }

    #[test]
    fn test_render_bytea() {
        assert_eq!(render_bytea(&[0xde, 0xad, 0x01]), "\\xdead01");
        assert_eq!(render_bytea(&[]), "\\x");
    }

    // Needs a reachable postgres, e.g. TOOLFLOW_TEST_DATABASE_URL=postgres://postgres@localhost/postgres
    #[tokio::test]
    async fn test_decode_aggregates_against_database() {
        let Ok(url) = std::env::var("TOOLFLOW_TEST_DATABASE_URL") else {
            return;
        };
        let client = PgSqlClient::new(Some(&url), Duration::from_secs(5)).unwrap();
        let rows = client
            .query(
                &SqlTarget::Internal,
                "SELECT 12.5::numeric AS n, AVG(x) AS avg, SUM(x::int8) AS sum8, ARRAY[1, 2] AS arr, '1 day'::interval AS iv, 'pg_class'::regclass::oid AS id \
                 FROM (VALUES (1), (2)) AS v(x)",
            )
            .await
            .unwrap();

        let row = &rows[0];
        assert_eq!(row.get::<Value>("n"), Some(json!("12.5")));
        assert!(row.get_str("avg").unwrap().starts_with("1.5"));
        assert_eq!(row.get::<Value>("sum8"), Some(json!("3")));
        assert_eq!(row.get::<Value>("arr"), Some(json!([1, 2])));
        assert_eq!(row.get::<Value>("iv"), Some(json!("1 day")));
        assert!(row.get::<u32>("id").is_some());
    }

    #[test]
    fn test_invalid_internal_url() {
        assert!(PgSqlClient::new(Some("not a url"), Duration::from_secs(1)).is_err());
    }
}
