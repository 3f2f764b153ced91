use super::{describe, json_pretty, EXIT_SUCCESS};
use chartpaper_core::Catalog;

pub fn run(catalog: &Catalog, name: &str, version: &str, json: bool) -> Result<u8, String> {
    let chart = catalog
        .switch_version(name, version)
        .map_err(|e| describe(&e))?;
    if json {
        println!("{}", json_pretty(&chart)?);
    } else {
        println!("switched {} to version {}", chart.name, chart.version);
    }
    Ok(EXIT_SUCCESS)
}
