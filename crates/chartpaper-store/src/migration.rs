//! Catalog schema migrations.
//!
//! The schema version lives in `PRAGMA user_version`. Each step runs in its
//! own transaction and bumps the version as its last statement, so an
//! interrupted migration resumes at the first step that did not commit.

use crate::StoreError;
use rusqlite::Connection;
use tracing::{debug, info};

/// Schema version this binary reads and writes.
pub const SCHEMA_VERSION: u32 = 3;

/// Result of a migration that applied at least one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationResult {
    pub from_version: u32,
    pub to_version: u32,
    pub steps_applied: usize,
}

type Step = fn(&Connection) -> Result<(), StoreError>;

const STEPS: [(u32, Step); 3] = [(1, migrate_v1), (2, migrate_v2), (3, migrate_v3)];

pub fn schema_version(conn: &Connection) -> Result<u32, StoreError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Bring the database up to [`SCHEMA_VERSION`].
///
/// - Returns `Ok(None)` if the database is already current.
/// - Returns `Err(SchemaVersionMismatch)` if it was written by a newer binary.
pub fn migrate(conn: &mut Connection) -> Result<Option<MigrationResult>, StoreError> {
    let found = schema_version(conn)?;

    if found == SCHEMA_VERSION {
        return Ok(None);
    }
    if found > SCHEMA_VERSION {
        return Err(StoreError::SchemaVersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        });
    }

    let mut applied = 0;
    for (version, step) in STEPS.iter().filter(|(v, _)| *v > found) {
        let tx = conn.transaction()?;
        step(&tx)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        applied += 1;
    }

    info!("migrated catalog schema from v{found} to v{SCHEMA_VERSION}");

    Ok(Some(MigrationResult {
        from_version: found,
        to_version: SCHEMA_VERSION,
        steps_applied: applied,
    }))
}

/// v1: charts, their dependency edges, and their applications.
fn migrate_v1(conn: &Connection) -> Result<(), StoreError> {
    debug!("creating catalog schema v1");

    conn.execute_batch(
        "
        CREATE TABLE charts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            version TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            kind TEXT NOT NULL DEFAULT 'application' CHECK(kind IN ('application', 'library')),
            source TEXT NOT NULL,
            image_tag TEXT,
            canary_tag TEXT,
            container_images TEXT,
            ingress_paths TEXT,
            service_ports TEXT,
            manifest_digest TEXT,
            fetched_at TEXT NOT NULL,
            is_current INTEGER NOT NULL DEFAULT 0,
            UNIQUE(name, version)
        );

        CREATE INDEX idx_charts_name ON charts(name);
        CREATE UNIQUE INDEX idx_charts_one_current ON charts(name) WHERE is_current = 1;

        CREATE TABLE dependencies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chart_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            version TEXT NOT NULL DEFAULT '',
            repository TEXT,
            condition TEXT,
            FOREIGN KEY (chart_id) REFERENCES charts(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_dependencies_chart_id ON dependencies(chart_id);
        CREATE INDEX idx_dependencies_name ON dependencies(name);

        CREATE TABLE apps (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chart_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            image TEXT,
            app_type TEXT,
            ports TEXT,
            configs TEXT,
            mounts TEXT,
            FOREIGN KEY (chart_id) REFERENCES charts(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_apps_chart_id ON apps(chart_id);
        ",
    )?;

    Ok(())
}

/// v2: tags learned by enriching each dependency edge.
fn migrate_v2(conn: &Connection) -> Result<(), StoreError> {
    debug!("migrating catalog schema to v2");

    conn.execute_batch(
        "
        ALTER TABLE dependencies ADD COLUMN image_tag TEXT;
        ALTER TABLE dependencies ADD COLUMN canary_tag TEXT;
        ",
    )?;

    Ok(())
}

/// v3: named registry endpoints with credentials.
fn migrate_v3(conn: &Connection) -> Result<(), StoreError> {
    debug!("migrating catalog schema to v3");

    conn.execute_batch(
        "
        CREATE TABLE registry_configs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            registry_url TEXT NOT NULL,
            username TEXT,
            password TEXT,
            is_default INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX idx_registry_configs_one_default
            ON registry_configs(is_default) WHERE is_default = 1;
        ",
    )?;

    Ok(())
}
