use super::{describe, is_interactive, json_pretty, read_password_stdin, EXIT_SUCCESS};
use chartpaper_core::Catalog;
use chartpaper_render::Credentials;
use dialoguer::Password;
use std::path::Path;

fn prompt_password(registry: &str, password_stdin: bool) -> Result<String, String> {
    if password_stdin {
        return read_password_stdin();
    }
    if !is_interactive() {
        return Err("no TTY for the password prompt (use --password-stdin)".to_owned());
    }
    Password::new()
        .with_prompt(format!("password for {registry}"))
        .interact()
        .map_err(|e| format!("prompt failed: {e}"))
}

/// `new_login` is `(registry, username)`; when given, the credentials file
/// is rewritten before logging in.
pub fn run(
    catalog: &Catalog,
    credentials_path: Option<&Path>,
    new_login: Option<(&str, &str)>,
    password_stdin: bool,
    json: bool,
) -> Result<u8, String> {
    let path = match credentials_path {
        Some(p) => p.to_path_buf(),
        None => catalog.credentials_path().map_err(|e| describe(&e))?,
    };

    let credentials = if let Some((registry, username)) = new_login {
        let password = prompt_password(registry, password_stdin)?;
        let creds = Credentials::new(registry, username, &password);
        creds.save(&path).map_err(|e| e.to_string())?;
        if !json {
            println!("saved credentials to {}", path.display());
        }
        creds
    } else {
        Credentials::load(&path).map_err(|e| e.to_string())?
    };

    catalog
        .authenticate(&credentials)
        .map_err(|e| format!("login to {} failed: {e}", credentials.registry))?;

    if json {
        let payload = serde_json::json!({
            "registry": credentials.registry,
            "username": credentials.username,
            "status": "authenticated",
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "logged in to {} as {}",
            credentials.registry, credentials.username
        );
    }
    Ok(EXIT_SUCCESS)
}
