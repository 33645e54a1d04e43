//! PostgreSQL citizen store for production use.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)
//!
//! ## Schema
//!
//! Relatives are stored once per pair with `citizen_id < relative_id` and
//! expanded to both directions on read.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row, Transaction};
use std::collections::BTreeSet;
use std::time::Duration;

use super::{batch_edges, CitizenStore, IntegrityError};
use crate::graph::ImportGraph;
use crate::types::{BirthDate, Citizen, CitizenId, CitizenPatch, Gender, ImportId, RelativeEdge, RelativesMap};

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS imports (
        import_id BIGINT PRIMARY KEY
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS citizens (
        import_id BIGINT NOT NULL REFERENCES imports (import_id),
        citizen_id BIGINT NOT NULL,
        town TEXT NOT NULL,
        street TEXT NOT NULL,
        building TEXT NOT NULL,
        apartment BIGINT NOT NULL,
        name TEXT NOT NULL,
        birth_date DATE NOT NULL,
        gender TEXT NOT NULL CHECK (gender IN ('male', 'female')),
        PRIMARY KEY (import_id, citizen_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS relatives (
        import_id BIGINT NOT NULL,
        citizen_id BIGINT NOT NULL,
        relative_id BIGINT NOT NULL,
        PRIMARY KEY (import_id, citizen_id, relative_id),
        FOREIGN KEY (import_id, citizen_id) REFERENCES citizens (import_id, citizen_id),
        FOREIGN KEY (import_id, relative_id) REFERENCES citizens (import_id, citizen_id),
        CHECK (citizen_id < relative_id)
    )
    "#,
];

const CITIZEN_COLUMNS: &str = "citizen_id, town, street, building, apartment, name, birth_date, gender";

/// Configuration for PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 2).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
    /// Maximum connection lifetime in seconds (default: 1800 = 30 min).
    pub max_lifetime_secs: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Load configuration from environment variables with production defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/citizens".to_string()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// PostgreSQL citizen store.
///
/// Every write runs in one transaction. Import ids are assigned under an
/// exclusive lock on `imports`, so an id is consumed only by a commit that
/// succeeds.
pub struct PostgresCitizenStore {
    pool: PgPool,
}

impl PostgresCitizenStore {
    /// Create a new store with the given configuration and ensure the schema exists.
    pub async fn new(config: PostgresConfig) -> Result<Self, sqlx::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_lifetime_secs = config.max_lifetime_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create a store from environment variables.
    pub async fn from_env() -> Result<Self, sqlx::Error> {
        Self::new(PostgresConfig::from_env()).await
    }

    /// Get the connection pool for health checks.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get pool statistics for monitoring.
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max: self.pool.options().get_max_connections(),
        }
    }

    async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!("Citizen schema ready");
        Ok(())
    }

    /// Open a read transaction that sees one consistent snapshot.
    async fn snapshot(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn import_exists(
        tx: &mut Transaction<'static, Postgres>,
        import_id: ImportId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM imports WHERE import_id = $1)")
            .bind(import_id.get())
            .fetch_one(&mut **tx)
            .await
    }

    async fn fetch_edges(
        tx: &mut Transaction<'static, Postgres>,
        import_id: ImportId,
    ) -> Result<Vec<RelativeEdge>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT citizen_id, relative_id
            FROM relatives
            WHERE import_id = $1
            ORDER BY citizen_id, relative_id
            "#,
        )
        .bind(import_id.get())
        .fetch_all(&mut **tx)
        .await?;

        rows.iter().map(parse_edge_row).collect()
    }

    async fn insert_edges(
        tx: &mut Transaction<'static, Postgres>,
        import_id: ImportId,
        edges: &BTreeSet<RelativeEdge>,
    ) -> Result<(), sqlx::Error> {
        if edges.is_empty() {
            return Ok(());
        }
        let (lows, highs) = edge_columns(edges);
        sqlx::query(
            r#"
            INSERT INTO relatives (import_id, citizen_id, relative_id)
            SELECT $1, low, high FROM UNNEST($2::bigint[], $3::bigint[]) AS e (low, high)
            "#,
        )
        .bind(import_id.get())
        .bind(&lows)
        .bind(&highs)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    /// Current pool size.
    pub size: u32,
    /// Number of idle connections.
    pub idle: usize,
    /// Maximum pool size.
    pub max: u32,
}

/// Error type for PostgreSQL store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Batch or patch would break import consistency.
    #[error("Integrity violation: {0}")]
    Integrity(#[from] IntegrityError),
    /// A stored row holds a value the registry cannot represent.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

fn parse_citizen_row(row: &PgRow) -> Result<Citizen, PostgresError> {
    let gender: String = row.try_get("gender")?;
    let gender = Gender::from_str(&gender).ok_or_else(|| PostgresError::CorruptRow(format!("gender {:?}", gender)))?;
    let birth_date: NaiveDate = row.try_get("birth_date")?;

    Ok(Citizen {
        citizen_id: CitizenId::new(row.try_get("citizen_id")?),
        town: row.try_get("town")?,
        street: row.try_get("street")?,
        building: row.try_get("building")?,
        apartment: row.try_get("apartment")?,
        name: row.try_get("name")?,
        birth_date: BirthDate::new(birth_date),
        gender,
        relatives: Vec::new(),
    })
}

fn parse_edge_row(row: &PgRow) -> Result<RelativeEdge, sqlx::Error> {
    let low = CitizenId::new(row.try_get("citizen_id")?);
    let high = CitizenId::new(row.try_get("relative_id")?);
    RelativeEdge::new(low, high).ok_or_else(|| sqlx::Error::Decode(format!("self-referencing relative {}", low).into()))
}

/// Split an edge set into the two bigint columns of an `UNNEST` insert.
fn edge_columns(edges: &BTreeSet<RelativeEdge>) -> (Vec<i64>, Vec<i64>) {
    edges.iter().map(|e| (e.low().get(), e.high().get())).unzip()
}

#[async_trait]
impl CitizenStore for PostgresCitizenStore {
    type Error = PostgresError;

    async fn next_import_id(&self) -> Result<ImportId, Self::Error> {
        let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(import_id) + 1, 0) FROM imports")
            .fetch_one(&self.pool)
            .await?;
        Ok(ImportId::new(next))
    }

    async fn commit_import(&self, citizens: Vec<Citizen>) -> Result<ImportId, Self::Error> {
        let edges = batch_edges(&citizens)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("LOCK TABLE imports IN EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(import_id) + 1, 0) FROM imports")
            .fetch_one(&mut *tx)
            .await?;
        let import_id = ImportId::new(next);

        sqlx::query("INSERT INTO imports (import_id) VALUES ($1)")
            .bind(import_id.get())
            .execute(&mut *tx)
            .await?;

        let ids: Vec<i64> = citizens.iter().map(|c| c.citizen_id.get()).collect();
        let towns: Vec<&str> = citizens.iter().map(|c| c.town.as_str()).collect();
        let streets: Vec<&str> = citizens.iter().map(|c| c.street.as_str()).collect();
        let buildings: Vec<&str> = citizens.iter().map(|c| c.building.as_str()).collect();
        let apartments: Vec<i64> = citizens.iter().map(|c| c.apartment).collect();
        let names: Vec<&str> = citizens.iter().map(|c| c.name.as_str()).collect();
        let births: Vec<NaiveDate> = citizens.iter().map(|c| c.birth_date.date()).collect();
        let genders: Vec<&str> = citizens.iter().map(|c| c.gender.as_str()).collect();

        sqlx::query(
            r#"
            INSERT INTO citizens (import_id, citizen_id, town, street, building, apartment, name, birth_date, gender)
            SELECT $1, * FROM UNNEST(
                $2::bigint[], $3::text[], $4::text[], $5::text[],
                $6::bigint[], $7::text[], $8::date[], $9::text[]
            )
            "#,
        )
        .bind(import_id.get())
        .bind(&ids)
        .bind(&towns)
        .bind(&streets)
        .bind(&buildings)
        .bind(&apartments)
        .bind(&names)
        .bind(&births)
        .bind(&genders)
        .execute(&mut *tx)
        .await?;

        Self::insert_edges(&mut tx, import_id, &edges).await?;
        tx.commit().await?;

        tracing::debug!(
            import_id = %import_id,
            citizens = citizens.len(),
            edges = edges.len(),
            "Import rows written"
        );
        Ok(import_id)
    }

    async fn replace_citizen(
        &self,
        import_id: ImportId,
        citizen_id: CitizenId,
        patch: &CitizenPatch,
    ) -> Result<Option<Citizen>, Self::Error> {
        let mut tx = self.pool.begin().await?;

        // Serializes replaces within one import.
        let locked: Option<i64> = sqlx::query_scalar("SELECT import_id FROM imports WHERE import_id = $1 FOR UPDATE")
            .bind(import_id.get())
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let present: Option<i64> =
            sqlx::query_scalar("SELECT citizen_id FROM citizens WHERE import_id = $1 AND citizen_id = $2 FOR UPDATE")
                .bind(import_id.get())
                .bind(citizen_id.get())
                .fetch_optional(&mut *tx)
                .await?;
        if present.is_none() {
            return Ok(None);
        }

        if patch.has_scalars() {
            let mut update = QueryBuilder::<Postgres>::new("UPDATE citizens SET ");
            {
                let mut set = update.separated(", ");
                if let Some(town) = &patch.town {
                    set.push("town = ").push_bind_unseparated(town.clone());
                }
                if let Some(street) = &patch.street {
                    set.push("street = ").push_bind_unseparated(street.clone());
                }
                if let Some(building) = &patch.building {
                    set.push("building = ").push_bind_unseparated(building.clone());
                }
                if let Some(apartment) = patch.apartment {
                    set.push("apartment = ").push_bind_unseparated(apartment);
                }
                if let Some(name) = &patch.name {
                    set.push("name = ").push_bind_unseparated(name.clone());
                }
                if let Some(birth_date) = patch.birth_date {
                    set.push("birth_date = ").push_bind_unseparated(birth_date.date());
                }
                if let Some(gender) = patch.gender {
                    set.push("gender = ").push_bind_unseparated(gender.as_str());
                }
            }
            update
                .push(" WHERE import_id = ")
                .push_bind(import_id.get())
                .push(" AND citizen_id = ")
                .push_bind(citizen_id.get());
            update.build().execute(&mut *tx).await?;
        }

        if let Some(relatives) = &patch.relatives {
            let wanted: Vec<i64> = relatives.iter().map(|r| r.get()).collect();
            let found: BTreeSet<i64> = sqlx::query_scalar(
                "SELECT citizen_id FROM citizens WHERE import_id = $1 AND citizen_id = ANY($2)",
            )
            .bind(import_id.get())
            .bind(&wanted)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .collect();
            if let Some(unknown) = relatives.iter().find(|r| !found.contains(&r.get())) {
                return Err(IntegrityError::UnknownRelative {
                    citizen: citizen_id,
                    relative: *unknown,
                }
                .into());
            }

            sqlx::query("DELETE FROM relatives WHERE import_id = $1 AND (citizen_id = $2 OR relative_id = $2)")
                .bind(import_id.get())
                .bind(citizen_id.get())
                .execute(&mut *tx)
                .await?;

            let edges: BTreeSet<RelativeEdge> = relatives
                .iter()
                .filter_map(|relative| RelativeEdge::new(citizen_id, *relative))
                .collect();
            Self::insert_edges(&mut tx, import_id, &edges).await?;
        }

        let row = sqlx::query(&format!(
            "SELECT {} FROM citizens WHERE import_id = $1 AND citizen_id = $2",
            CITIZEN_COLUMNS
        ))
        .bind(import_id.get())
        .bind(citizen_id.get())
        .fetch_one(&mut *tx)
        .await?;
        let mut citizen = parse_citizen_row(&row)?;

        let edge_rows = sqlx::query(
            r#"
            SELECT citizen_id, relative_id
            FROM relatives
            WHERE import_id = $1 AND (citizen_id = $2 OR relative_id = $2)
            "#,
        )
        .bind(import_id.get())
        .bind(citizen_id.get())
        .fetch_all(&mut *tx)
        .await?;
        let mut relatives = edge_rows
            .iter()
            .map(parse_edge_row)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter_map(|edge| edge.other(citizen_id))
            .collect::<Vec<_>>();
        relatives.sort();
        citizen.relatives = relatives;

        tx.commit().await?;
        Ok(Some(citizen))
    }

    async fn get_import_citizens(&self, import_id: ImportId) -> Result<Option<Vec<Citizen>>, Self::Error> {
        let mut tx = self.snapshot().await?;
        if !Self::import_exists(&mut tx, import_id).await? {
            return Ok(None);
        }

        let rows = sqlx::query(&format!(
            "SELECT {} FROM citizens WHERE import_id = $1 ORDER BY citizen_id",
            CITIZEN_COLUMNS
        ))
        .bind(import_id.get())
        .fetch_all(&mut *tx)
        .await?;
        let edges = Self::fetch_edges(&mut tx, import_id).await?;
        tx.commit().await?;

        let mut citizens = rows
            .iter()
            .map(parse_citizen_row)
            .collect::<Result<Vec<_>, _>>()?;
        let graph = ImportGraph::new(citizens.iter().map(|c| c.citizen_id).collect(), edges);
        for citizen in &mut citizens {
            citizen.relatives = graph.relatives_of(citizen.citizen_id);
        }
        Ok(Some(citizens))
    }

    async fn get_relatives_map(&self, import_id: ImportId) -> Result<Option<RelativesMap>, Self::Error> {
        let mut tx = self.snapshot().await?;
        if !Self::import_exists(&mut tx, import_id).await? {
            return Ok(None);
        }
        let edges = Self::fetch_edges(&mut tx, import_id).await?;
        tx.commit().await?;

        let mut map = RelativesMap::new();
        for edge in edges {
            map.entry(edge.low()).or_default().push(edge.high());
        }
        Ok(Some(map))
    }

    async fn citizen_ids(&self, import_id: ImportId) -> Result<Option<BTreeSet<CitizenId>>, Self::Error> {
        let mut tx = self.snapshot().await?;
        if !Self::import_exists(&mut tx, import_id).await? {
            return Ok(None);
        }
        let ids: Vec<i64> = sqlx::query_scalar("SELECT citizen_id FROM citizens WHERE import_id = $1")
            .bind(import_id.get())
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(ids.into_iter().map(CitizenId::new).collect()))
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_columns_are_canonical() {
        let edges: BTreeSet<RelativeEdge> = [(3, 1), (1, 2), (2, 1)]
            .into_iter()
            .filter_map(|(a, b)| RelativeEdge::new(CitizenId::new(a), CitizenId::new(b)))
            .collect();
        let (lows, highs) = edge_columns(&edges);
        assert_eq!(lows, vec![1, 1]);
        assert_eq!(highs, vec![2, 3]);
    }

    #[test]
    fn test_env_or_falls_back() {
        assert_eq!(env_or("CITIZEN_REGISTRY_TEST_UNSET_VAR", 7u32), 7);
    }

    #[test]
    fn test_schema_keeps_one_row_per_pair() {
        assert!(SCHEMA[2].contains("CHECK (citizen_id < relative_id)"));
    }
}
