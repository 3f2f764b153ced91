pub mod completions;
pub mod delete;
pub mod deps;
pub mod fetch;
pub mod list;
pub mod login;
pub mod man_pages;
pub mod registry;
pub mod resolve;
pub mod show;
pub mod switch;
pub mod versions;

use chartpaper_core::CoreError;
use chartpaper_store::StoreError;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{stderr, stdin, IsTerminal, Read};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_FETCH_ERROR: u8 = 2;
pub const EXIT_STORE_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Not-found and conflict errors raised by the store drop the `store error:`
/// prefix, so they exit with `EXIT_FAILURE` rather than `EXIT_STORE_ERROR`.
pub fn describe(e: &CoreError) -> String {
    match e {
        CoreError::Store(inner)
            if e.is_not_found()
                || matches!(
                    inner,
                    StoreError::RegistryExists(_) | StoreError::InvalidName(_)
                ) =>
        {
            inner.to_string()
        }
        other => other.to_string(),
    }
}

/// Spinner on stderr; hidden when stderr is not a terminal or output is JSON.
pub fn spinner(msg: &str, json: bool) -> ProgressBar {
    if json || !stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_current(is_current: bool) -> String {
    use console::Style;
    if is_current {
        Style::new().green().bold().apply_to("current").to_string()
    } else {
        Style::new().dim().apply_to("-").to_string()
    }
}

pub fn colorize_resolved(resolved: bool) -> String {
    use console::Style;
    if resolved {
        Style::new().green().apply_to("stored").to_string()
    } else {
        Style::new().yellow().apply_to("missing").to_string()
    }
}

/// `None` renders as `-`.
pub fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

pub fn is_interactive() -> bool {
    stdin().is_terminal() && stderr().is_terminal()
}

/// First line of stdin, without the trailing newline.
pub fn read_password_stdin() -> Result<String, String> {
    let mut input = String::new();
    stdin()
        .read_to_string(&mut input)
        .map_err(|e| format!("failed to read password from stdin: {e}"))?;
    let password = input.lines().next().unwrap_or_default().to_owned();
    if password.is_empty() {
        return Err("empty password on stdin".to_owned());
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"chart": "nginx"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"chart\""));
        assert!(result.contains("\"nginx\""));
    }

    #[test]
    fn colorize_current_keeps_label() {
        assert!(colorize_current(true).contains("current"));
        assert!(colorize_current(false).contains('-'));
    }

    #[test]
    fn colorize_resolved_keeps_label() {
        assert!(colorize_resolved(true).contains("stored"));
        assert!(colorize_resolved(false).contains("missing"));
    }

    #[test]
    fn or_dash_fills_missing() {
        assert_eq!(or_dash(None), "-");
        assert_eq!(or_dash(Some("1.2.3")), "1.2.3");
    }

    #[test]
    fn describe_strips_store_prefix_for_not_found() {
        let missing = CoreError::Store(StoreError::VersionNotFound {
            name: "api".to_owned(),
            version: "9.9.9".to_owned(),
        });
        assert_eq!(describe(&missing), "version 9.9.9 of chart 'api' not found");
        let taken = CoreError::Store(StoreError::RegistryExists("ghcr".to_owned()));
        assert_eq!(describe(&taken), "registry config 'ghcr' already exists");
        let locked = CoreError::Store(StoreError::LockPoisoned);
        assert!(describe(&locked).starts_with("store error:"));
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_FETCH_ERROR);
        assert_ne!(EXIT_FETCH_ERROR, EXIT_STORE_ERROR);
    }

    #[test]
    fn hidden_spinner_for_json() {
        let pb = spinner("fetching…", true);
        assert!(pb.is_hidden());
        spin_ok(&pb, "done");
    }

    #[test]
    fn spinner_fail_finishes() {
        let pb = spinner("fetching…", false);
        spin_fail(&pb, "failed");
    }
}
