use crate::config::DBSettings;
use log::debug;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Row, Sqlite, SqlitePool,
};
use std::{
    hash::{DefaultHasher, Hash, Hasher},
    time::Duration as StdDuration,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    Wal,    // Best for concurrent access
    Delete, // Default, good for single writer
    Memory, // In-memory journal
}

impl JournalMode {
    fn pragma(&self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
            JournalMode::Memory => "MEMORY",
        }
    }
}

impl From<&str> for JournalMode {
    fn from(value: &str) -> Self {
        match value.to_uppercase().as_str() {
            "DELETE" => JournalMode::Delete,
            "MEMORY" => JournalMode::Memory,
            _ => JournalMode::Wal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynchronousMode {
    Off,
    Normal,
    Full,
}

impl SynchronousMode {
    fn pragma(&self) -> &'static str {
        match self {
            SynchronousMode::Off => "OFF",
            SynchronousMode::Normal => "NORMAL",
            SynchronousMode::Full => "FULL",
        }
    }
}

impl From<&str> for SynchronousMode {
    fn from(value: &str) -> Self {
        match value.to_uppercase().as_str() {
            "OFF" => SynchronousMode::Off,
            "FULL" => SynchronousMode::Full,
            _ => SynchronousMode::Normal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub in_memory: bool,
    pub busy_timeout_ms: u32,
    pub journal_mode: JournalMode,
    pub synchronous: SynchronousMode,
    pub foreign_keys: bool,
}

impl SqliteConfig {
    pub fn build_connect_options(&self, database_path: &str, read_only: bool) -> SqliteConnectOptions {
        let options = if self.in_memory {
            // Read and write pools must land on the same shared in-memory database,
            // so derive a stable name from the path
            let mut hasher = DefaultHasher::new();
            database_path.hash(&mut hasher);
            SqliteConnectOptions::new()
                .filename(format!("file:memdb_{}?mode=memory&cache=shared", hasher.finish()))
                .shared_cache(true)
        } else {
            SqliteConnectOptions::new()
                .filename(database_path)
                .read_only(read_only)
                .create_if_missing(!read_only)
        };

        options
            .busy_timeout(StdDuration::from_millis(self.busy_timeout_ms as u64))
            .pragma("journal_mode", self.journal_mode.pragma())
            .pragma("synchronous", self.synchronous.pragma())
            .foreign_keys(self.foreign_keys)
    }
}

#[derive(Debug, Clone)]
pub struct DatabasePoolConfig {
    pub read_max_connections: u32,
    pub read_min_connections: u32,
    pub write_max_connections: u32,
    pub write_min_connections: u32,
    pub idle_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
    pub sqlite_config: SqliteConfig,
}

impl From<DBSettings> for DatabasePoolConfig {
    fn from(config: DBSettings) -> Self {
        Self {
            read_max_connections: config.read_max_connections,
            read_min_connections: config.read_min_connections,
            write_max_connections: config.write_max_connections,
            write_min_connections: config.write_min_connections,
            idle_timeout_secs: config.idle_timeout_secs,
            acquire_timeout_secs: config.acquire_timeout_secs,
            sqlite_config: SqliteConfig {
                in_memory: config.in_memory,
                busy_timeout_ms: config.busy_timeout_ms,
                journal_mode: config.journal_mode.as_str().into(),
                synchronous: config.synchronous.as_str().into(),
                foreign_keys: config.foreign_keys,
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct DBConnection {
    pub database_name: String,
    pub database_path: String,
    read_pool: SqlitePool,
    write_pool: SqlitePool,
}

impl DBConnection {
    pub async fn new(
        path: &str,
        db_name: &str,
        database_pool_config: DatabasePoolConfig,
    ) -> Result<Self, sqlx::Error> {
        let database_path = format!("{}/{}.db", path, db_name);

        if !database_pool_config.sqlite_config.in_memory {
            let database_url = format!("sqlite:{}", database_path);
            if !Sqlite::database_exists(&database_url).await? {
                Sqlite::create_database(&database_url).await?;
            }
        }

        // Writes funnel through a small pool so SQLite's single writer is not fought over
        let write_pool = Self::create_pool(
            &database_path,
            &database_pool_config,
            false,
            database_pool_config.write_max_connections,
            database_pool_config.write_min_connections,
        )
        .await?;

        MIGRATOR
            .run(&write_pool)
            .await
            .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;

        let read_pool = Self::create_pool(
            &database_path,
            &database_pool_config,
            true,
            database_pool_config.read_max_connections,
            database_pool_config.read_min_connections,
        )
        .await?;

        Ok(Self {
            database_name: db_name.to_string(),
            database_path,
            read_pool,
            write_pool,
        })
    }

    /// Wrap already-migrated pools, used by tests that get their pool from `sqlx::test`.
    pub fn from_pools(
        database_name: String,
        database_path: String,
        read_pool: SqlitePool,
        write_pool: SqlitePool,
    ) -> Self {
        Self {
            database_name,
            database_path,
            read_pool,
            write_pool,
        }
    }

    async fn create_pool(
        database_path: &str,
        database_pool_config: &DatabasePoolConfig,
        read_only: bool,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<SqlitePool, sqlx::Error> {
        let connect_options = database_pool_config
            .sqlite_config
            .build_connect_options(database_path, read_only);
        debug!(
            "{} connection: {:?}",
            if read_only { "Read" } else { "Write" },
            connect_options
        );

        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(StdDuration::from_secs(
                database_pool_config.acquire_timeout_secs,
            ))
            .idle_timeout(StdDuration::from_secs(
                database_pool_config.idle_timeout_secs,
            ))
            .connect_with(connect_options)
            .await
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        let _: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.read_pool)
            .await?;
        let _: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.write_pool)
            .await?;

        Ok(())
    }

    pub fn read(&self) -> &SqlitePool {
        &self.read_pool
    }

    pub fn write(&self) -> &SqlitePool {
        &self.write_pool
    }
}

pub fn format_datetime(value: OffsetDateTime) -> Result<String, sqlx::Error> {
    value
        .format(&Rfc3339)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

pub fn parse_required_datetime(
    row: &SqliteRow,
    column: &str,
) -> Result<OffsetDateTime, sqlx::Error> {
    let date_str: String = row.try_get(column)?;
    OffsetDateTime::parse(&date_str, &Rfc3339).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub fn parse_unix_datetime(row: &SqliteRow, column: &str) -> Result<OffsetDateTime, sqlx::Error> {
    let seconds: i64 = row.try_get(column)?;
    OffsetDateTime::from_unix_timestamp(seconds).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub fn parse_required_uuid(row: &SqliteRow, column: &str) -> Result<Uuid, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub fn parse_optional_uuid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>, sqlx::Error> {
    row.try_get::<Option<String>, _>(column)?
        .map(|raw| Uuid::parse_str(&raw))
        .transpose()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
}

/// Decode a text column through `FromStr`, used for the status/outcome vocabulary.
pub fn parse_text_enum<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
