use super::{describe, json_pretty, or_dash, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use chartpaper_core::{Catalog, FetchRequest};
use std::path::PathBuf;

pub fn run(
    catalog: &Catalog,
    location: &str,
    values: Option<PathBuf>,
    set_values: Vec<String>,
    host_network: bool,
    json: bool,
) -> Result<u8, String> {
    let request = FetchRequest {
        chart_url: location.to_owned(),
        values_path: values,
        set_values,
        // only override the configured mode when the flag is given
        use_host_network: host_network.then_some(true),
    };

    let pb = spinner(&format!("fetching {location}…"), json);
    let outcome = catalog.fetch(&request).map_err(|e| {
        spin_fail(&pb, "fetch failed");
        describe(&e)
    })?;
    spin_ok(&pb, "fetch complete");

    let chart = &outcome.stored;
    if json {
        let payload = serde_json::json!({
            "chart": outcome.summary,
            "stored": chart,
            "created": outcome.created,
            "applications_skipped": outcome.applications_skipped,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        let verb = if outcome.created { "stored" } else { "updated" };
        println!("{verb} {} {} (id {})", chart.name, chart.version, chart.id);
        println!("image tag:     {}", or_dash(chart.image_tag.as_deref()));
        println!("canary tag:    {}", or_dash(chart.canary_tag.as_deref()));
        println!(
            "dependencies:  {}",
            outcome.summary.chart.dependencies.len()
        );
        println!("applications:  {}", outcome.summary.applications.len());
        if outcome.applications_skipped > 0 {
            println!(
                "warning: {} applications without a name were skipped",
                outcome.applications_skipped
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
