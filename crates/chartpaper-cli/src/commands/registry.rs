use super::{describe, json_pretty, or_dash, read_password_stdin, EXIT_SUCCESS};
use crate::RegistryAction;
use chartpaper_core::Catalog;
use chartpaper_store::{RegistryConfig, RegistryConfigInput};

fn print_registries(registries: &[RegistryConfig]) {
    if registries.is_empty() {
        println!("no registry configurations");
        return;
    }
    println!(
        "{:<5} {:<16} {:<32} {:<16} DEFAULT",
        "ID", "NAME", "URL", "USERNAME"
    );
    for r in registries {
        println!(
            "{:<5} {:<16} {:<32} {:<16} {}",
            r.id,
            r.name,
            r.registry_url,
            or_dash(r.username.as_deref()),
            if r.is_default { "yes" } else { "" }
        );
    }
}

pub fn run(catalog: &Catalog, action: RegistryAction, json: bool) -> Result<u8, String> {
    match action {
        RegistryAction::List => {
            let registries = catalog.list_registries().map_err(|e| describe(&e))?;
            if json {
                println!("{}", json_pretty(&registries)?);
            } else {
                print_registries(&registries);
            }
        }
        RegistryAction::Add {
            name,
            url,
            username,
            password_stdin,
            default,
        } => {
            let password = if password_stdin {
                Some(read_password_stdin()?)
            } else {
                None
            };
            let input = RegistryConfigInput {
                name,
                registry_url: url,
                username,
                password,
                is_default: default,
            };
            let created = catalog
                .create_registry(&input)
                .map_err(|e| describe(&e))?;
            if json {
                println!("{}", json_pretty(&created)?);
            } else {
                println!("added registry {} (id {})", created.name, created.id);
            }
        }
        RegistryAction::Remove { id } => {
            catalog.delete_registry(id).map_err(|e| describe(&e))?;
            if json {
                println!("{}", json_pretty(&serde_json::json!({ "deleted": id }))?);
            } else {
                println!("removed registry {id}");
            }
        }
        RegistryAction::SetDefault { id } => {
            let updated = catalog
                .set_default_registry(id)
                .map_err(|e| describe(&e))?;
            if json {
                println!("{}", json_pretty(&updated)?);
            } else {
                println!("default registry is now {} (id {})", updated.name, updated.id);
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
