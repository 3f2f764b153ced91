//! On-disk catalog store behavior: persistence, migration, and the
//! one-current-version invariant across reopen.

use chartpaper_schema::{parse_chart_yaml, Application, ChartSummary, Location};
use chartpaper_store::{
    migration::schema_version, CatalogStore, StoreError, StoreLayout, SCHEMA_VERSION,
};
use rusqlite::Connection;

fn summary(yaml: &str) -> ChartSummary {
    ChartSummary::new(parse_chart_yaml(yaml).unwrap())
}

fn loc(s: &str) -> Location {
    Location::new(s)
}

#[test]
fn catalog_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StoreLayout::new(dir.path().join("store"));

    {
        let store = CatalogStore::open(&layout).unwrap();
        let mut s = summary(
            "name: web\nversion: 1.0.0\ndependencies:\n  - name: common\n    version: 2.x.x\n    repository: oci://r/charts\n",
        );
        s.applications = vec![Application::new("web")];
        store.upsert_chart(&s, &loc("oci://r/charts/web"), &[]).unwrap();
        store
            .upsert_chart(&summary("name: web\nversion: 1.1.0\n"), &loc("oci://r/charts/web"), &[])
            .unwrap();
        store.switch_version("web", "1.0.0").unwrap();
    }

    assert!(layout.exists());
    let store = CatalogStore::open(&layout).unwrap();
    let current = store.current("web").unwrap().unwrap();
    assert_eq!(current.version, "1.0.0");
    assert_eq!(store.versions("web").unwrap().len(), 2);
    assert_eq!(store.dependencies(current.id).unwrap().len(), 1);
    assert_eq!(store.applications(current.id).unwrap().len(), 1);
}

#[test]
fn database_is_at_current_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StoreLayout::new(dir.path());
    drop(CatalogStore::open(&layout).unwrap());

    let conn = Connection::open(layout.db_path()).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
}

#[test]
fn newer_database_is_refused_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StoreLayout::new(dir.path());
    layout.initialize().unwrap();
    {
        let conn = Connection::open(layout.db_path()).unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 5)
            .unwrap();
    }

    let err = CatalogStore::open(&layout).err().unwrap();
    assert!(matches!(err, StoreError::SchemaVersionMismatch { .. }));
}

#[test]
fn invariant_holds_after_mixed_operations() {
    let dir = tempfile::tempdir().unwrap();
    let store = CatalogStore::open(&StoreLayout::new(dir.path())).unwrap();
    let src = loc("oci://r/charts/api");

    for v in ["1.0.0", "1.1.0", "2.0.0"] {
        store
            .upsert_chart(&summary(&format!("name: api\nversion: {v}\n")), &src, &[])
            .unwrap();
    }
    store.switch_version("api", "1.1.0").unwrap();
    store.delete_version("api", "2.0.0").unwrap();
    store
        .upsert_chart(&summary("name: api\nversion: 1.0.0\n"), &src, &[])
        .unwrap();
    let _ = store.switch_version("api", "2.0.0");

    let current: Vec<_> = store
        .versions("api")
        .unwrap()
        .into_iter()
        .filter(|r| r.is_current)
        .collect();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].version, "1.0.0");
}
