use super::{colorize_current, colorize_resolved, describe, json_pretty, or_dash, EXIT_SUCCESS};
use chartpaper_core::Catalog;

pub fn run(catalog: &Catalog, name: &str, json: bool) -> Result<u8, String> {
    let detail = catalog.get(name).map_err(|e| describe(&e))?;
    if json {
        println!("{}", json_pretty(&detail)?);
        return Ok(EXIT_SUCCESS);
    }

    let chart = &detail.chart;
    println!("name:         {}", chart.name);
    println!("version:      {} ({})", chart.version, colorize_current(chart.is_current));
    println!("kind:         {}", chart.kind);
    println!("description:  {}", chart.description);
    println!("source:       {}", chart.source);
    println!("image_tag:    {}", or_dash(chart.image_tag.as_deref()));
    println!("canary_tag:   {}", or_dash(chart.canary_tag.as_deref()));
    println!("digest:       {}", or_dash(chart.manifest_digest.as_deref()));
    println!("fetched_at:   {}", chart.fetched_at);

    if let Some(facts) = &chart.facts {
        if !facts.container_images.is_empty() {
            println!("images:");
            for image in &facts.container_images {
                println!("  {image}");
            }
        }
        if !facts.ingress_paths.is_empty() {
            println!("ingress:      {}", facts.ingress_paths.join(", "));
        }
        if !facts.service_ports.is_empty() {
            println!("ports:        {}", facts.service_ports.join(", "));
        }
    }

    if !detail.dependencies.is_empty() {
        println!("dependencies:");
        for dep in &detail.dependencies {
            println!(
                "  {} {} [{}]",
                dep.name,
                dep.version,
                colorize_resolved(dep.resolved)
            );
        }
    }
    if !detail.applications.is_empty() {
        println!("applications:");
        for app in &detail.applications {
            println!(
                "  {} {} {}",
                app.name,
                or_dash(app.kind.as_deref()),
                or_dash(app.image.as_deref())
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
