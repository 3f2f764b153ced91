use super::{colorize_current, describe, json_pretty, EXIT_SUCCESS};
use chartpaper_core::Catalog;

pub fn run(catalog: &Catalog, name: &str, json: bool) -> Result<u8, String> {
    let versions = catalog.versions(name).map_err(|e| describe(&e))?;
    if json {
        println!("{}", json_pretty(&versions)?);
    } else {
        println!("{:<14} {:<9} {:<26} SOURCE", "VERSION", "STATE", "FETCHED_AT");
        for v in &versions {
            println!(
                "{:<14} {:<9} {:<26} {}",
                v.version,
                colorize_current(v.is_current),
                v.fetched_at,
                v.source
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
