//! PostgreSQL implementation of [`Store`] and [`SchemaCatalog`] on the
//! synchronous `postgres` client.

use log::{debug, info};
use postgres::{Client, NoTls};

use crate::{
    config::DatabaseConfig,
    schema::ColumnDescriptor,
    store::{SchemaCatalog, Store, StoreError},
};

const SYSTEM_SCHEMAS: &[&str] = &["information_schema", "pg_catalog", "pg_toast"];

const QUERY_SCHEMAS_SQL: &str =
    "SELECT schema_name::text FROM information_schema.schemata ORDER BY schema_name";
const QUERY_TABLES_SQL: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema::text = $1 ORDER BY table_name";
const QUERY_COLUMNS_SQL: &str = "SELECT column_name::text, data_type::text \
     FROM information_schema.columns WHERE table_schema::text = $1 AND table_name::text = $2 \
     ORDER BY ordinal_position";

pub struct PgStore {
    client: Client,
}

impl PgStore {
    pub fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let mut pg = postgres::Config::new();
        pg.host(&config.host).port(config.port);
        if let Some(name) = &config.name {
            pg.dbname(name);
        }
        if let Some(user) = &config.user {
            pg.user(user);
        }
        if let Some(password) = &config.password {
            pg.password(password);
        }
        let client = pg.connect(NoTls)?;
        info!("Connected to Postgres at {}:{}", config.host, config.port);
        Ok(Self { client })
    }
}

impl Store for PgStore {
    fn begin(&mut self) -> Result<(), StoreError> {
        self.client.batch_execute("BEGIN")?;
        Ok(())
    }

    fn execute(&mut self, statement: &str) -> Result<(), StoreError> {
        self.client.batch_execute(statement)?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.client.batch_execute("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.client.batch_execute("ROLLBACK")?;
        Ok(())
    }

    fn truncate(&mut self, schema: &str, table: &str) -> Result<(), StoreError> {
        let mut tx = self.client.transaction()?;
        tx.batch_execute(&format!("TRUNCATE TABLE {schema}.{table};"))?;
        tx.commit()?;
        debug!("Truncated {schema}.{table}");
        Ok(())
    }
}

impl SchemaCatalog for PgStore {
    fn schemas(&mut self) -> Result<Vec<String>, StoreError> {
        let rows = self.client.query(QUERY_SCHEMAS_SQL, &[])?;
        Ok(rows
            .iter()
            .map(|row| row.get::<_, String>(0))
            .filter(|name| !SYSTEM_SCHEMAS.contains(&name.as_str()))
            .collect())
    }

    fn tables(&mut self, schema: &str) -> Result<Vec<String>, StoreError> {
        let rows = self.client.query(QUERY_TABLES_SQL, &[&schema])?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    fn columns(&mut self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>, StoreError> {
        let rows = self.client.query(QUERY_COLUMNS_SQL, &[&schema, &table])?;
        Ok(rows
            .iter()
            .map(|row| ColumnDescriptor::new(row.get::<_, String>(0), row.get::<_, String>(1)))
            .collect())
    }
}
