use async_trait::async_trait;
use sea_query::{Alias as SeaAlias, Asterisk, Expr as SeaExpr, Func as SeaFunc, Iden, PostgresQueryBuilder, Query as SeaQuery};
use serde_json::{Value, json};

use crate::{Result, ToolflowError, common::Vars, workflow::Envelope};

use super::{CREDENTIAL_ID_KEY, Services, Tool, ToolDescriptor, credential_id, operation_names, parse_operation, required_str};

#[derive(Iden)]
#[iden = "information_schema"]
enum InformationSchemaIden {
    Table,

    Tables,
    Columns,
    TableName,
    TableSchema,
    ColumnName,
    DataType,
}

pub struct SqlQueryTool;

#[async_trait]
impl Tool for SqlQueryTool {
    fn descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "sql_query".to_string(),
            description: "Execute a SQL query against a registered database credential or the internal database. Use this tool instead of writing custom code for SQL tasks.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The SQL query to execute" },
                    "credentialId": { "type": ["integer", "string", "null"], "description": "Optional ID of the database credential from list_credentials to use" }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(
        &self,
        services: &Services,
        request: Vars,
    ) -> Result<Envelope> {
        let mut data = Vars::new().with("query", request.get_str("query").unwrap_or_default());
        if let Some(id) = request.lookup(CREDENTIAL_ID_KEY) {
            data.set(CREDENTIAL_ID_KEY, id.clone());
        }
        services.run_sql("sql", data).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::EnumIter, strum::IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum InspectOperation {
    GetSchema,
    GetTableInfo,
    CountRows,
    QueryLimited,
}

/// Splits `schema.table` into its parts.
fn split_table(table: &str) -> (Option<&str>, &str) {
    match table.split_once('.') {
        Some((schema, name)) => (Some(schema), name),
        None => (None, table),
    }
}

/// Builds the statement an inspection operation runs.
fn inspect_query(
    operation: InspectOperation,
    request: &Vars,
    row_limit: u64,
) -> Result<String> {
    let sql = match operation {
        InspectOperation::GetSchema => SeaQuery::select()
            .column(InformationSchemaIden::TableName)
            .from((InformationSchemaIden::Table, InformationSchemaIden::Tables))
            .and_where(SeaExpr::col(InformationSchemaIden::TableSchema).eq("public"))
            .to_string(PostgresQueryBuilder),
        InspectOperation::GetTableInfo => {
            let (schema, name) = split_table(required_str(request, "table", operation.as_ref())?);
            let mut query = SeaQuery::select();
            query
                .columns([InformationSchemaIden::ColumnName, InformationSchemaIden::DataType])
                .from((InformationSchemaIden::Table, InformationSchemaIden::Columns))
                .and_where(SeaExpr::col(InformationSchemaIden::TableName).eq(name));
            if let Some(schema) = schema {
                query.and_where(SeaExpr::col(InformationSchemaIden::TableSchema).eq(schema));
            }
            query.to_string(PostgresQueryBuilder)
        }
        InspectOperation::CountRows => {
            let table = required_str(request, "table", operation.as_ref())?;
            let mut query = SeaQuery::select();
            query.expr_as(SeaFunc::count(SeaExpr::col(Asterisk)), SeaAlias::new("count"));
            match split_table(table) {
                (Some(schema), name) => query.from((SeaAlias::new(schema), SeaAlias::new(name))),
                (None, name) => query.from(SeaAlias::new(name)),
            };
            query.to_string(PostgresQueryBuilder)
        }
        InspectOperation::QueryLimited => {
            let statement = required_str(request, "query", operation.as_ref())?;
            let statement = statement.trim().trim_end_matches(';').trim_end();
            if statement.is_empty() {
                return Err(ToolflowError::Config("'query' is required for operation 'query_limited'".to_string()));
            }
            let limit = request.get::<u64>("limit").unwrap_or(row_limit).min(row_limit);
            // newline keeps a trailing `--` comment inside the subquery
            format!("SELECT * FROM ({}\n) AS limited LIMIT {}", statement, limit)
        }
    };
    Ok(sql)
}

pub struct SqlInspectTool;

#[async_trait]
impl Tool for SqlInspectTool {
    fn descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "sql_inspect".to_string(),
            description: "Inspect database schema, table info, rows, etc.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "operation": { "type": "string", "enum": operation_names::<InspectOperation>() },
                    "credentialId": { "type": ["integer", "string"], "description": "The ID of the database credential from list_credentials" },
                    "table": { "type": "string", "description": "Table name, optionally schema-qualified" },
                    "query": { "type": "string", "description": "SELECT statement for query_limited, run as a subquery capped at the row limit" },
                    "limit": { "type": "integer", "minimum": 0, "default": 100 }
                },
                "required": ["operation", "credentialId"]
            }),
        }
    }

    async fn call(
        &self,
        services: &Services,
        request: Vars,
    ) -> Result<Envelope> {
        let operation: InspectOperation = parse_operation(&request)?;
        let id = credential_id(&request)?;
        let query = inspect_query(operation, &request, services.config.inspect_row_limit)?;

        let data = Vars::new().with("query", query).with(CREDENTIAL_ID_KEY, Value::from(id));
        services.run_sql("sql_inspect", data).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        Config,
        clients::{ClientError, Clients, SqlTarget},
        store::{CredentialType, MemStore},
        testing::{MockOrchestrator, MockSql, MockWebhook},
        workflow::NodeRegistry,
    };

    fn services(
        store: MemStore,
        sql: Arc<MockSql>,
    ) -> Services {
        Services {
            config: Arc::new(Config::default()),
            credentials: Arc::new(store),
            clients: Clients::new(sql, MockWebhook::returning("ok"), MockOrchestrator::returning(Value::Null)),
            nodes: Arc::new(NodeRegistry::new()),
        }
    }

    fn request(value: Value) -> Vars {
        value.into()
    }

    #[test]
    fn test_inspect_queries() {
        assert_eq!(
            inspect_query(InspectOperation::GetSchema, &Vars::new(), 100).unwrap(),
            r#"SELECT "table_name" FROM "information_schema"."tables" WHERE "table_schema" = 'public'"#
        );
        assert_eq!(
            inspect_query(InspectOperation::GetTableInfo, &request(json!({"table": "users"})), 100).unwrap(),
            r#"SELECT "column_name", "data_type" FROM "information_schema"."columns" WHERE "table_name" = 'users'"#
        );
        assert_eq!(
            inspect_query(InspectOperation::GetTableInfo, &request(json!({"table": "sales.orders"})), 100).unwrap(),
            r#"SELECT "column_name", "data_type" FROM "information_schema"."columns" WHERE "table_name" = 'orders' AND "table_schema" = 'sales'"#
        );
        assert_eq!(
            inspect_query(InspectOperation::CountRows, &request(json!({"table": "sales.orders"})), 100).unwrap(),
            r#"SELECT COUNT(*) AS "count" FROM "sales"."orders""#
        );
    }

    #[test]
    fn test_table_name_is_quoted() {
        let sql = inspect_query(InspectOperation::GetTableInfo, &request(json!({"table": "x' OR '1'='1"})), 100).unwrap();
        assert!(sql.starts_with(r#"SELECT "column_name", "data_type" FROM "information_schema"."columns" WHERE "table_name" = "#), "{}", sql);
        assert!(!sql.contains("'x' OR '1'='1'"), "{}", sql);
    }

    #[test]
    fn test_query_limited_caps_limit() {
        let limited = |query: Value| inspect_query(InspectOperation::QueryLimited, &request(query), 100).unwrap();
        assert_eq!(limited(json!({"query": "SELECT * FROM t;"})), "SELECT * FROM (SELECT * FROM t\n) AS limited LIMIT 100");
        assert_eq!(limited(json!({"query": "SELECT * FROM t", "limit": 5})), "SELECT * FROM (SELECT * FROM t\n) AS limited LIMIT 5");
        assert_eq!(limited(json!({"query": "SELECT * FROM t", "limit": 5000})), "SELECT * FROM (SELECT * FROM t\n) AS limited LIMIT 100");
    }

    #[test]
    fn test_query_limited_wraps_existing_limit_and_comment() {
        let sql = inspect_query(InspectOperation::QueryLimited, &request(json!({"query": "SELECT * FROM t LIMIT 1000 -- all rows"})), 100).unwrap();
        assert_eq!(sql, "SELECT * FROM (SELECT * FROM t LIMIT 1000 -- all rows\n) AS limited LIMIT 100");
    }

    #[test]
    fn test_missing_table() {
        let err = inspect_query(InspectOperation::CountRows, &Vars::new(), 100).unwrap_err();
        assert_eq!(err, ToolflowError::Config("'table' is required for operation 'count_rows'".to_string()));
    }

    #[tokio::test]
    async fn test_sql_query_tool_routes_through_node() {
        let sql = MockSql::returning(vec![Vars::new().with("n", 1)]);
        let envelope = SqlQueryTool.call(&services(MemStore::new(), sql.clone()), request(json!({"query": "SELECT 1 AS n"}))).await.unwrap();

        assert_eq!(envelope.into_value(), json!({"status": "success", "count": 1, "results": [{"n": 1}]}));
        assert_eq!(sql.calls(), vec![(SqlTarget::Internal, "SELECT 1 AS n".to_string())]);
    }

    #[tokio::test]
    async fn test_sql_query_tool_no_result_set() {
        let sql = MockSql::failing(ClientError::NoResultSet);
        let envelope = SqlQueryTool.call(&services(MemStore::new(), sql), request(json!({"query": "DELETE FROM t"}))).await.unwrap();
        assert_eq!(envelope.into_value(), json!({"status": "success", "count": 0, "results": []}));
    }

    #[tokio::test]
    async fn test_sql_inspect_uses_credential() {
        let store = MemStore::new();
        let credential = store.insert("warehouse", CredentialType::Mssql, json!({"host": "mssql"}).into()).unwrap();
        let sql = MockSql::returning(vec![Vars::new().with("count", 3)]);

        let envelope = SqlInspectTool
            .call(&services(store, sql.clone()), request(json!({"operation": "count_rows", "credentialId": credential.id, "table": "orders"})))
            .await
            .unwrap();
        assert!(envelope.is_success());

        let (target, statement) = &sql.calls()[0];
        let SqlTarget::External(conn) = target else {
            panic!("expected external target");
        };
        assert_eq!(conn.port, 1433);
        assert_eq!(statement, r#"SELECT COUNT(*) AS "count" FROM "orders""#);
    }

    #[tokio::test]
    async fn test_sql_inspect_missing_credential() {
        let sql = MockSql::returning(Vec::new());
        let err = SqlInspectTool.call(&services(MemStore::new(), sql.clone()), request(json!({"operation": "get_schema", "credentialId": 3}))).await.unwrap_err();

        assert_eq!(err, ToolflowError::Credential("Credential 3 not found".to_string()));
        assert!(sql.calls().is_empty());
    }
}
