use crate::layout::StoreLayout;
use crate::migration::migrate;
use crate::records::{
    tag_column, ApplicationRecord, ChartRecord, DependencyEdge, DependencyTags,
    APP_QUERY, CHART_COLUMNS, EDGE_QUERY,
};
use crate::{validate_chart_name, StoreError};
use chartpaper_schema::{Application, ChartSummary, Location};
use chrono::SecondsFormat;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Result of a fetch-or-update write.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub chart: ChartRecord,
    /// `false` when an existing `(name, version)` row was refreshed.
    pub created: bool,
    pub applications_skipped: usize,
}

/// SQLite-backed catalog of chart versions.
///
/// Every public write is one transaction. The connection is guarded by a
/// mutex; callers must not hold it across network calls, which is why the
/// API takes fully materialized summaries rather than fetch callbacks.
pub struct CatalogStore {
    conn: Mutex<Connection>,
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl CatalogStore {
    /// Open (creating if needed) the catalog under `layout` and migrate it.
    pub fn open(layout: &StoreLayout) -> Result<Self, StoreError> {
        layout.initialize()?;
        let conn = Connection::open(layout.db_path())?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA busy_timeout=30000;
            PRAGMA synchronous=NORMAL;
            ",
        )?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        if let Some(result) = migrate(&mut conn)? {
            debug!(
                "catalog schema v{} -> v{} ({} steps)",
                result.from_version, result.to_version, result.steps_applied
            );
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Write `summary` as the current version of its chart.
    ///
    /// An existing `(name, version)` row keeps its id; its attributes are
    /// refreshed and its edges and applications replaced. `tags[i]` holds the
    /// enrichment tags for the i-th declared dependency, missing entries mean
    /// none were learned.
    pub fn upsert_chart(
        &self,
        summary: &ChartSummary,
        source: &Location,
        tags: &[DependencyTags],
    ) -> Result<UpsertOutcome, StoreError> {
        let chart = &summary.chart;
        validate_chart_name(&chart.name)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = now_rfc3339();
        let kind = chart.kind.to_string();

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM charts WHERE name = ?1 AND version = ?2",
                params![chart.name.as_str(), chart.version],
                |row| row.get(0),
            )
            .optional()?;

        let (chart_id, created) = if let Some(id) = existing {
            tx.execute(
                "UPDATE charts SET description = ?1, kind = ?2, source = ?3, image_tag = ?4, \
                 canary_tag = ?5, container_images = NULL, ingress_paths = NULL, \
                 service_ports = NULL, manifest_digest = NULL, fetched_at = ?6 WHERE id = ?7",
                params![
                    chart.description,
                    kind,
                    source.as_str(),
                    tag_column(&summary.image_tag),
                    tag_column(&summary.canary_tag),
                    now,
                    id
                ],
            )?;
            tx.execute("DELETE FROM dependencies WHERE chart_id = ?1", [id])?;
            tx.execute("DELETE FROM apps WHERE chart_id = ?1", [id])?;
            debug!("refreshing {} {} (id {id})", chart.name, chart.version);
            (id, false)
        } else {
            tx.execute(
                "INSERT INTO charts (name, version, description, kind, source, image_tag, \
                 canary_tag, fetched_at, is_current) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
                params![
                    chart.name.as_str(),
                    chart.version,
                    chart.description,
                    kind,
                    source.as_str(),
                    tag_column(&summary.image_tag),
                    tag_column(&summary.canary_tag),
                    now
                ],
            )?;
            (tx.last_insert_rowid(), true)
        };

        tx.execute(
            "UPDATE charts SET is_current = 0 WHERE name = ?1",
            [chart.name.as_str()],
        )?;
        tx.execute("UPDATE charts SET is_current = 1 WHERE id = ?1", [chart_id])?;

        for (i, dep) in chart.dependencies.iter().enumerate() {
            let dep_tags = tags.get(i).cloned().unwrap_or_default();
            tx.execute(
                "INSERT INTO dependencies (chart_id, name, version, repository, condition, \
                 image_tag, canary_tag) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    chart_id,
                    dep.name,
                    dep.version,
                    (!dep.repository.is_empty()).then_some(dep.repository.as_str()),
                    dep.condition,
                    dep_tags.image_tag,
                    dep_tags.canary_tag
                ],
            )?;
        }

        let mut applications_skipped = 0;
        for app in &summary.applications {
            if let Err(e) = insert_application(&tx, chart_id, app) {
                warn!("failed to store application {}: {e}", app.name);
                applications_skipped += 1;
            }
        }

        if let Some(facts) = &summary.facts {
            tx.execute(
                "UPDATE charts SET container_images = ?1, ingress_paths = ?2, \
                 service_ports = ?3, manifest_digest = ?4 WHERE id = ?5",
                params![
                    serde_json::to_string(&facts.container_images)?,
                    serde_json::to_string(&facts.ingress_paths)?,
                    serde_json::to_string(&facts.service_ports)?,
                    summary.manifest_digest,
                    chart_id
                ],
            )?;
        }

        let record = chart_by_id(&tx, chart_id)?;
        tx.commit()?;

        info!(
            "stored {} {} (id {chart_id}, {} dependencies, {} applications)",
            record.name,
            record.version,
            chart.dependencies.len(),
            summary.applications.len() - applications_skipped
        );

        Ok(UpsertOutcome {
            chart: record,
            created,
            applications_skipped,
        })
    }

    /// The current version of `name`, or its most recently fetched version
    /// when none is marked current.
    pub fn current(&self, name: &str) -> Result<Option<ChartRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {CHART_COLUMNS} FROM charts WHERE name = ?1 \
             ORDER BY is_current DESC, fetched_at DESC, id DESC LIMIT 1"
        );
        Ok(conn
            .query_row(&sql, [name], ChartRecord::from_row)
            .optional()?)
    }

    pub fn get_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Option<ChartRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {CHART_COLUMNS} FROM charts WHERE name = ?1 AND version = ?2");
        Ok(conn
            .query_row(&sql, [name, version], ChartRecord::from_row)
            .optional()?)
    }

    /// Whether any version of `name` is stored.
    pub fn chart_exists(&self, name: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        Ok(conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM charts WHERE name = ?1)",
            [name],
            |row| row.get(0),
        )?)
    }

    pub fn list_current(&self) -> Result<Vec<ChartRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {CHART_COLUMNS} FROM charts WHERE is_current = 1 ORDER BY name");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], ChartRecord::from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Every stored version of `name`, newest fetch first.
    pub fn versions(&self, name: &str) -> Result<Vec<ChartRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {CHART_COLUMNS} FROM charts WHERE name = ?1 ORDER BY fetched_at DESC, id DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([name], ChartRecord::from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn dependencies(&self, chart_id: i64) -> Result<Vec<DependencyEdge>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(EDGE_QUERY)?;
        let rows = stmt.query_map([chart_id], DependencyEdge::from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn applications(&self, chart_id: i64) -> Result<Vec<ApplicationRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(APP_QUERY)?;
        let rows = stmt.query_map([chart_id], ApplicationRecord::from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Make `version` the current version of `name`. On a missing version
    /// nothing changes.
    pub fn switch_version(&self, name: &str, version: &str) -> Result<ChartRecord, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("UPDATE charts SET is_current = 0 WHERE name = ?1", [name])?;
        let updated = tx.execute(
            "UPDATE charts SET is_current = 1 WHERE name = ?1 AND version = ?2",
            [name, version],
        )?;
        if updated == 0 {
            // dropping `tx` rolls back the clear above
            let any: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM charts WHERE name = ?1)",
                [name],
                |row| row.get(0),
            )?;
            return Err(if any {
                StoreError::VersionNotFound {
                    name: name.to_owned(),
                    version: version.to_owned(),
                }
            } else {
                StoreError::ChartNotFound(name.to_owned())
            });
        }

        let sql = format!("SELECT {CHART_COLUMNS} FROM charts WHERE name = ?1 AND version = ?2");
        let record = tx.query_row(&sql, [name, version], ChartRecord::from_row)?;
        tx.commit()?;

        info!("switched {name} to version {version}");
        Ok(record)
    }

    /// Delete every version of `name`. Returns the number of versions removed.
    pub fn delete_chart(&self, name: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM charts WHERE name = ?1", [name])?;
        if removed == 0 {
            return Err(StoreError::ChartNotFound(name.to_owned()));
        }
        info!("deleted chart {name} ({removed} versions)");
        Ok(removed)
    }

    /// Delete one version. The remaining versions are left as they are, so
    /// deleting the current one leaves `name` without a current version.
    pub fn delete_version(&self, name: &str, version: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM charts WHERE name = ?1 AND version = ?2",
            [name, version],
        )?;
        if removed == 0 {
            return Err(StoreError::VersionNotFound {
                name: name.to_owned(),
                version: version.to_owned(),
            });
        }
        info!("deleted {name} version {version}");
        Ok(())
    }

    /// Number of distinct chart names stored.
    pub fn count_charts(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(DISTINCT name) FROM charts", [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }
}

fn chart_by_id(conn: &Connection, id: i64) -> Result<ChartRecord, StoreError> {
    let sql = format!("SELECT {CHART_COLUMNS} FROM charts WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], ChartRecord::from_row)?)
}

fn insert_application(
    tx: &Transaction<'_>,
    chart_id: i64,
    app: &Application,
) -> Result<(), StoreError> {
    let ports = (!app.ports.is_empty())
        .then(|| serde_json::to_string(&app.ports))
        .transpose()?;
    let configs = (!app.configs.is_empty())
        .then(|| serde_json::to_string(&app.configs))
        .transpose()?;
    let mounts = (!app.mounts.is_empty())
        .then(|| serde_json::to_string(&app.mounts))
        .transpose()?;

    tx.execute(
        "INSERT INTO apps (chart_id, name, image, app_type, ports, configs, mounts) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            chart_id,
            app.name,
            app.image.as_deref().filter(|s| !s.is_empty()),
            app.kind.as_deref().filter(|s| !s.is_empty()),
            ports,
            configs,
            mounts
        ],
    )?;
    Ok(())
}
