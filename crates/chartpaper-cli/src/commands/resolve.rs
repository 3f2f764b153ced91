use super::{describe, json_pretty, spin_fail, spin_ok, spinner, EXIT_FAILURE, EXIT_SUCCESS};
use chartpaper_core::Catalog;

/// Exits non-zero when any dependency could not be fetched; the ones
/// that could are stored either way.
pub fn run(catalog: &Catalog, name: &str, json: bool) -> Result<u8, String> {
    let pb = spinner(&format!("resolving dependencies of {name}…"), json);
    let report = catalog.resolve_dependencies(name).map_err(|e| {
        spin_fail(&pb, "resolve failed");
        describe(&e)
    })?;
    if report.errors.is_empty() {
        spin_ok(&pb, "dependencies resolved");
    } else {
        spin_fail(&pb, "some dependencies could not be fetched");
    }

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        println!(
            "{name}: {} dependencies, {} fetched, {} failed",
            report.total_dependencies,
            report.fetched.len(),
            report.errors.len()
        );
        for summary in &report.fetched {
            println!("  fetched {} {}", summary.chart.name, summary.chart.version);
        }
        for error in &report.errors {
            println!("  failed  {error}");
        }
    }

    if report.errors.is_empty() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILURE)
    }
}
