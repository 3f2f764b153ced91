use super::{describe, is_interactive, json_pretty, EXIT_FAILURE, EXIT_SUCCESS};
use chartpaper_core::Catalog;
use dialoguer::Confirm;

fn confirm(target: &str) -> Result<bool, String> {
    if !is_interactive() {
        return Err(format!(
            "refusing to delete {target} without --yes (stdin is not a TTY)"
        ));
    }
    Confirm::new()
        .with_prompt(format!("delete {target}?"))
        .default(false)
        .interact()
        .map_err(|e| format!("prompt failed: {e}"))
}

pub fn run(
    catalog: &Catalog,
    name: &str,
    version: Option<&str>,
    yes: bool,
    json: bool,
) -> Result<u8, String> {
    let target = match version {
        Some(v) => format!("{name} {v}"),
        None => format!("every version of {name}"),
    };
    if !yes && !confirm(&target)? {
        eprintln!("aborted");
        return Ok(EXIT_FAILURE);
    }

    let deleted = match version {
        Some(v) => {
            catalog
                .delete_version(name, v)
                .map_err(|e| describe(&e))?;
            1
        }
        None => catalog.delete(name).map_err(|e| describe(&e))?,
    };

    if json {
        let payload = serde_json::json!({
            "chart": name,
            "version": version,
            "deleted": deleted,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("deleted {target} ({deleted} rows)");
    }
    Ok(EXIT_SUCCESS)
}
