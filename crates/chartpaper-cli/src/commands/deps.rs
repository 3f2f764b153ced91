use super::{colorize_resolved, describe, json_pretty, or_dash, EXIT_SUCCESS};
use chartpaper_core::Catalog;

pub fn run(catalog: &Catalog, name: &str, json: bool) -> Result<u8, String> {
    let deps = catalog.dependencies(name).map_err(|e| describe(&e))?;
    if json {
        let payload = serde_json::json!({
            "chart": name,
            "count": deps.len(),
            "dependencies": deps,
        });
        println!("{}", json_pretty(&payload)?);
    } else if deps.is_empty() {
        println!("{name} declares no dependencies");
    } else {
        println!(
            "{:<20} {:<12} {:<9} {:<12} REPOSITORY",
            "NAME", "VERSION", "STATE", "IMAGE_TAG"
        );
        for dep in &deps {
            println!(
                "{:<20} {:<12} {:<9} {:<12} {}",
                dep.name,
                dep.version,
                colorize_resolved(dep.resolved),
                or_dash(dep.image_tag.as_deref()),
                or_dash(dep.repository.as_deref())
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
