//! Registry endpoint configs. At most one config is the default.

use crate::catalog::{now_rfc3339, CatalogStore};
use crate::records::{RegistryConfig, RegistryConfigInput, REGISTRY_COLUMNS};
use crate::StoreError;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

fn registry_by_id(conn: &Connection, id: i64) -> Result<RegistryConfig, StoreError> {
    let sql = format!("SELECT {REGISTRY_COLUMNS} FROM registry_configs WHERE id = ?1");
    conn.query_row(&sql, [id], RegistryConfig::from_row)
        .optional()?
        .ok_or(StoreError::RegistryNotFound(id))
}

fn validate_input(input: &RegistryConfigInput) -> Result<(), StoreError> {
    if input.name.trim().is_empty() {
        return Err(StoreError::InvalidName(
            "registry config name must not be empty".to_owned(),
        ));
    }
    if input.registry_url.trim().is_empty() {
        return Err(StoreError::InvalidName(format!(
            "registry config '{}' has no registry URL",
            input.name
        )));
    }
    Ok(())
}

/// Config names are unique; `except` skips the row being updated.
fn ensure_name_free(conn: &Connection, name: &str, except: Option<i64>) -> Result<(), StoreError> {
    let taken: Option<i64> = conn
        .query_row(
            "SELECT id FROM registry_configs WHERE name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    match taken {
        Some(id) if Some(id) != except => Err(StoreError::RegistryExists(name.to_owned())),
        _ => Ok(()),
    }
}

impl CatalogStore {
    /// All registry configs, the default first, then by name.
    pub fn list_registries(&self) -> Result<Vec<RegistryConfig>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {REGISTRY_COLUMNS} FROM registry_configs ORDER BY is_default DESC, name ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], RegistryConfig::from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn default_registry(&self) -> Result<Option<RegistryConfig>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {REGISTRY_COLUMNS} FROM registry_configs WHERE is_default = 1");
        Ok(conn
            .query_row(&sql, [], RegistryConfig::from_row)
            .optional()?)
    }

    pub fn create_registry(&self, input: &RegistryConfigInput) -> Result<RegistryConfig, StoreError> {
        validate_input(input)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = now_rfc3339();

        ensure_name_free(&tx, &input.name, None)?;
        if input.is_default {
            tx.execute("UPDATE registry_configs SET is_default = 0", [])?;
        }
        tx.execute(
            "INSERT INTO registry_configs (name, registry_url, username, password, is_default, \
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                input.name,
                input.registry_url,
                input.username,
                input.password,
                input.is_default,
                now
            ],
        )?;
        let config = registry_by_id(&tx, tx.last_insert_rowid())?;
        tx.commit()?;

        info!("created registry config {} ({})", config.name, config.id);
        Ok(config)
    }

    /// Replaces the config's fields. An omitted password keeps the stored
    /// one, since configs are served without it.
    pub fn update_registry(
        &self,
        id: i64,
        input: &RegistryConfigInput,
    ) -> Result<RegistryConfig, StoreError> {
        validate_input(input)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        ensure_name_free(&tx, &input.name, Some(id))?;
        if input.is_default {
            tx.execute(
                "UPDATE registry_configs SET is_default = 0 WHERE id != ?1",
                [id],
            )?;
        }
        let updated = tx.execute(
            "UPDATE registry_configs SET name = ?1, registry_url = ?2, username = ?3, \
             password = COALESCE(?4, password), is_default = ?5, updated_at = ?6 WHERE id = ?7",
            params![
                input.name,
                input.registry_url,
                input.username,
                input.password,
                input.is_default,
                now_rfc3339(),
                id
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::RegistryNotFound(id));
        }
        let config = registry_by_id(&tx, id)?;
        tx.commit()?;

        info!("updated registry config {} ({id})", config.name);
        Ok(config)
    }

    pub fn delete_registry(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM registry_configs WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(StoreError::RegistryNotFound(id));
        }
        info!("deleted registry config {id}");
        Ok(())
    }

    /// Make `id` the only default registry.
    pub fn set_default_registry(&self, id: i64) -> Result<RegistryConfig, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("UPDATE registry_configs SET is_default = 0", [])?;
        let updated = tx.execute(
            "UPDATE registry_configs SET is_default = 1, updated_at = ?1 WHERE id = ?2",
            params![now_rfc3339(), id],
        )?;
        if updated == 0 {
            return Err(StoreError::RegistryNotFound(id));
        }
        let config = registry_by_id(&tx, id)?;
        tx.commit()?;

        info!("default registry is now {} ({id})", config.name);
        Ok(config)
    }
}
