use super::{describe, json_pretty, or_dash, EXIT_SUCCESS};
use chartpaper_core::Catalog;

pub fn run(catalog: &Catalog, json: bool) -> Result<u8, String> {
    let charts = catalog.list().map_err(|e| describe(&e))?;
    if json {
        println!("{}", json_pretty(&charts)?);
    } else if charts.is_empty() {
        println!("no charts stored");
    } else {
        println!(
            "{:<24} {:<14} {:<12} {:<14} SOURCE",
            "NAME", "VERSION", "KIND", "IMAGE_TAG"
        );
        for chart in &charts {
            println!(
                "{:<24} {:<14} {:<12} {:<14} {}",
                chart.name.as_str(),
                chart.version,
                chart.kind.to_string(),
                or_dash(chart.image_tag.as_deref()),
                chart.source
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
