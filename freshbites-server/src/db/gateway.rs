//! Query gateway - resolves the pool for a request and runs SQL verbatim
//!
//! - No descriptor: the registry's default pool, never disposed here
//! - Descriptor: a fresh ephemeral pool, disposed after the statement on
//!   every path
//! - Driver errors come back as [`GatewayError`], never as panics

use std::sync::Arc;

use freshbites_core::{ConnectionDescriptor, Row};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgTypeInfo, Postgres};
use sqlx::postgres::types::Oid;
use sqlx::query::Query;
use sqlx::{Either, Executor, PgPool};

use super::decode::row_to_json;
use super::error::GatewayError;
use super::pool::PoolRegistry;

/// Rows returned by a statement plus the server's row count.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub row_count: u64,
}

/// A positional statement parameter (`$1`, `$2`, ...).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum QueryParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl TryFrom<Value> for QueryParam {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Self::Int(i)),
                None => n
                    .as_f64()
                    .map(Self::Float)
                    .ok_or_else(|| format!("unsupported number parameter: {}", n)),
            },
            Value::String(s) => Ok(Self::Text(s)),
            other => Err(format!("query parameters must be scalars, got {}", other)),
        }
    }
}

/// NULL sent with an unspecified type so the server infers it from context.
struct UntypedNull;

impl sqlx::Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}

impl<'q> sqlx::Encode<'q, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

impl QueryParam {
    fn bind<'q>(&self, query: Query<'q, Postgres, PgArguments>) -> Query<'q, Postgres, PgArguments> {
        match self {
            Self::Null => query.bind(UntypedNull),
            Self::Bool(b) => query.bind(*b),
            Self::Int(i) => query.bind(*i),
            Self::Float(f) => query.bind(*f),
            Self::Text(s) => query.bind(s.clone()),
        }
    }
}

/// Run `sql` against `pool` and collect every row it returns.
///
/// Without parameters the text goes through the simple query protocol,
/// so several `;`-separated statements are allowed and their rows are
/// concatenated. With parameters it is prepared and bound.
pub async fn execute(pool: &PgPool, sql: &str, params: &[QueryParam]) -> Result<QueryResult, GatewayError> {
    let mut stream = if params.is_empty() {
        pool.fetch_many(sqlx::raw_sql(sql))
    } else {
        let query = params
            .iter()
            .fold(sqlx::query(sql), |query, param| param.bind(query));
        pool.fetch_many(query)
    };

    let mut result = QueryResult::default();
    let mut affected = 0u64;
    while let Some(item) = stream.try_next().await? {
        match item {
            Either::Left(done) => affected += done.rows_affected(),
            Either::Right(row) => result.rows.push(row_to_json(&row)),
        }
    }
    result.row_count = affected.max(result.rows.len() as u64);

    Ok(result)
}

/// Chooses the pool for each call and enforces the disposal rule.
#[derive(Clone)]
pub struct QueryGateway {
    registry: Arc<PoolRegistry>,
    allow_raw_sql: bool,
}

impl QueryGateway {
    pub fn new(registry: Arc<PoolRegistry>, allow_raw_sql: bool) -> Self {
        Self {
            registry,
            allow_raw_sql,
        }
    }

    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }

    pub fn allows_raw_sql(&self) -> bool {
        self.allow_raw_sql
    }

    /// Run a fixed statement on the default pool or on an ephemeral pool
    /// built from `target`.
    pub async fn run(
        &self,
        target: Option<&ConnectionDescriptor>,
        sql: &str,
        params: &[QueryParam],
    ) -> Result<QueryResult, GatewayError> {
        match target {
            None => {
                tracing::debug!(params = params.len(), "Executing on default pool");
                let pool = self.registry.default_pool();
                match execute(pool, sql, params).await {
                    Ok(result) => Ok(result),
                    Err(e) => Err(self.registry.explain(pool, e).await),
                }
            }
            Some(descriptor) => {
                let lease = self.registry.create_pool(descriptor)?;
                tracing::debug!(params = params.len(), "Executing on ephemeral pool");
                let outcome = match execute(lease.pool(), sql, params).await {
                    Ok(result) => Ok(result),
                    Err(e) => Err(self.registry.explain(lease.pool(), e).await),
                };
                lease.dispose().await;
                outcome
            }
        }
    }

    /// Run caller-supplied SQL, subject to the raw SQL capability flag.
    pub async fn run_raw(
        &self,
        target: Option<&ConnectionDescriptor>,
        sql: &str,
        params: &[QueryParam],
    ) -> Result<QueryResult, GatewayError> {
        if !self.allow_raw_sql {
            return Err(GatewayError::Disabled);
        }
        self.run(target, sql, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshbites_core::{GatewayConfig, PoolConfig};
    use serde_json::json;
    use std::time::Duration;

    fn gateway(allow_raw_sql: bool) -> QueryGateway {
        let registry = PoolRegistry::new(
            GatewayConfig::default().database,
            PoolConfig {
                max_connections: 1,
                acquire_timeout: Duration::from_millis(300),
                connect_timeout: Duration::from_millis(300),
            },
        );
        QueryGateway::new(Arc::new(registry), allow_raw_sql)
    }

    fn unreachable() -> ConnectionDescriptor {
        serde_json::from_value(json!({"host": "127.0.0.1", "port": 1, "database": "erp"})).unwrap()
    }

    #[test]
    fn params_deserialize_from_json_scalars() {
        let params: Vec<QueryParam> =
            serde_json::from_value(json!([null, true, 7, 2.5, "SKU003_Cheese"])).unwrap();
        assert_eq!(
            params,
            vec![
                QueryParam::Null,
                QueryParam::Bool(true),
                QueryParam::Int(7),
                QueryParam::Float(2.5),
                QueryParam::Text("SKU003_Cheese".into()),
            ]
        );
        assert!(serde_json::from_value::<Vec<QueryParam>>(json!([[1]])).is_err());
        assert!(serde_json::from_value::<Vec<QueryParam>>(json!([{"a": 1}])).is_err());
    }

    #[tokio::test]
    async fn failed_query_still_disposes_ephemeral_pool() {
        let gateway = gateway(true);
        let err = gateway
            .run(Some(&unreachable()), "SELECT 1", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Connection(_)));
        assert!(err.to_string().to_lowercase().contains("refused"), "{}", err);
        let stats = gateway.registry().stats();
        assert_eq!(stats.ephemeral_created, 1);
        assert_eq!(stats.ephemeral_disposed, 1);
    }

    #[tokio::test]
    async fn invalid_descriptor_creates_nothing() {
        let gateway = gateway(true);
        let descriptor: ConnectionDescriptor = serde_json::from_value(json!({"database": "erp"})).unwrap();
        let err = gateway.run(Some(&descriptor), "SELECT 1", &[]).await.unwrap_err();

        assert!(matches!(err, GatewayError::Configuration(_)));
        assert_eq!(gateway.registry().stats().ephemeral_created, 0);
    }

    #[tokio::test]
    async fn raw_sql_can_be_disabled() {
        let gateway = gateway(false);
        let err = gateway
            .run_raw(Some(&unreachable()), "DROP TABLE baseline_forecast", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Disabled));
        assert_eq!(gateway.registry().stats().ephemeral_created, 0);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn executes_against_default_pool() {
        let config = GatewayConfig::from_env();
        let gateway = QueryGateway::new(Arc::new(PoolRegistry::from_config(&config)), true);

        let result = gateway
            .run(None, "SELECT 1::int4 AS one, 'x'::text AS letter, NULL::int8 AS nothing", &[])
            .await
            .expect("query failed");
        assert_eq!(result.row_count, 1);
        assert_eq!(
            serde_json::to_value(&result.rows[0]).unwrap(),
            json!({"one": 1, "letter": "x", "nothing": null})
        );

        let result = gateway
            .run(None, "SELECT $1::int8 + 1 AS next, $2::text AS label", &[QueryParam::Int(41), QueryParam::Text("a".into())])
            .await
            .expect("bound query failed");
        assert_eq!(serde_json::to_value(&result.rows[0]).unwrap(), json!({"next": 42, "label": "a"}));

        let err = gateway.run(None, "SELEC 1", &[]).await.unwrap_err();
        assert!(matches!(err, GatewayError::Query(_)));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn numerics_beyond_f64_keep_their_digits() {
        let config = GatewayConfig::from_env();
        let gateway = QueryGateway::new(Arc::new(PoolRegistry::from_config(&config)), true);
        let sql = "SELECT 123456789012345678901234567890123::numeric AS big, \
                   'NaN'::numeric AS nan, 1.5::numeric AS small";
        let expected = json!({"big": "123456789012345678901234567890123", "nan": "NaN", "small": 1.5});

        let simple = gateway.run(None, sql, &[]).await.expect("simple query failed");
        assert_eq!(serde_json::to_value(&simple.rows[0]).unwrap(), expected);

        let bound_sql = format!("{}, $1::int4 AS p", sql);
        let bound = gateway
            .run(None, &bound_sql, &[QueryParam::Int(1)])
            .await
            .expect("bound query failed");
        let mut row = bound.rows[0].clone();
        row.remove("p");
        assert_eq!(serde_json::to_value(&row).unwrap(), expected);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn bound_and_unbound_queries_decode_alike() {
        let config = GatewayConfig::from_env();
        let gateway = QueryGateway::new(Arc::new(PoolRegistry::from_config(&config)), true);
        let select = "SELECT '1 year 2 mons 3 days 04:05:06.5'::interval AS span, \
                      '-1 days +01:00'::interval AS back, \
                      '18:42:15.12+05:30'::timetz AS at, \
                      '\\x01ab'::bytea AS blob, \
                      '192.168.0.1'::inet AS host, '10.0.0.0/8'::cidr AS net, \
                      ARRAY[1.5, NULL]::float4[] AS ratios, \
                      ARRAY[2.25, 123456789012345678901234567890]::numeric[] AS amounts";

        let simple = gateway.run(None, select, &[]).await.expect("simple query failed");
        let bound_sql = format!("{}, $1::text AS p", select);
        let bound = gateway
            .run(None, &bound_sql, &[QueryParam::Text("x".into())])
            .await
            .expect("bound query failed");

        let mut row = bound.rows[0].clone();
        assert_eq!(row.remove("p"), Some(json!("x")));
        assert_eq!(row, simple.rows[0]);
        assert_eq!(
            serde_json::to_value(&simple.rows[0]).unwrap(),
            json!({
                "span": "1 year 2 mons 3 days 04:05:06.5",
                "back": "-1 days +01:00:00",
                "at": "18:42:15.12+05:30",
                "blob": "\\x01ab",
                "host": "192.168.0.1",
                "net": "10.0.0.0/8",
                "ratios": [1.5, null],
                "amounts": [2.25, "123456789012345678901234567890"]
            })
        );
    }
}
